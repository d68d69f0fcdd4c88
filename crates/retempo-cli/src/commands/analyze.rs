//! Signal measurement command.

use clap::Args;
use retempo_analysis::{
    Window, dominant_frequency, left_channel, magnitude_spectrum, rms, spectral_centroid,
};
use retempo_io::read_wav_interleaved;
use serde::Serialize;
use std::path::PathBuf;

use super::common::{format_duration, linear_to_db};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// FFT size for frequency measurements
    #[arg(long, default_value = "8192")]
    fft_size: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Measurements reported by `analyze`.
#[derive(Debug, Serialize)]
struct Report {
    sample_rate: u32,
    frames: usize,
    duration_secs: f64,
    rms: f32,
    rms_db: f32,
    peak: f32,
    dominant_frequency_hz: Option<f32>,
    spectral_centroid_hz: f32,
}

fn measure(samples: &[f32], sample_rate: u32, fft_size: usize) -> Report {
    let frames = samples.len() / 2;
    let level = rms(samples);
    let peak = samples.iter().map(|s| s.abs()).fold(0.0, f32::max);

    // Frequency measurements use a window from the middle of the file
    let left = left_channel(samples);
    let start = left.len().saturating_sub(fft_size) / 2;
    let middle = &left[start..];
    let spectrum = magnitude_spectrum(middle, fft_size, Window::Hann);

    Report {
        sample_rate,
        frames,
        duration_secs: frames as f64 / f64::from(sample_rate),
        rms: level,
        rms_db: linear_to_db(level),
        peak,
        dominant_frequency_hz: dominant_frequency(middle, sample_rate as f32, fft_size),
        spectral_centroid_hz: spectral_centroid(&spectrum, sample_rate as f32),
    }
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    if args.fft_size < 16 || !args.fft_size.is_power_of_two() {
        anyhow::bail!("FFT size must be a power of two of at least 16");
    }

    let (samples, spec) = read_wav_interleaved(&args.input)?;
    let report = measure(&samples, spec.sample_rate, args.fft_size);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File:        {}", args.input.display());
    println!(
        "Duration:    {} ({:.3}s, {} frames)",
        format_duration(report.duration_secs),
        report.duration_secs,
        report.frames
    );
    println!("RMS:         {:.1} dB", report.rms_db);
    println!("Peak:        {:.1} dB", linear_to_db(report.peak));
    match report.dominant_frequency_hz {
        Some(freq) => println!("Dominant:    {freq:.1} Hz"),
        None => println!("Dominant:    (silent)"),
    }
    println!("Centroid:    {:.1} Hz", report.spectral_centroid_hz);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retempo_analysis::sine_stereo;

    #[test]
    fn measures_tone() {
        let tone = sine_stereo(44100, 441.0, 1.0, 0.5);
        let report = measure(&tone, 44100, 8192);
        assert_eq!(report.frames, 44100);
        assert!((report.duration_secs - 1.0).abs() < 1e-9);
        assert!((report.peak - 0.5).abs() < 1e-3);
        assert!((report.dominant_frequency_hz.unwrap() - 441.0).abs() < 1.0);
    }

    #[test]
    fn silent_file_has_no_dominant_frequency() {
        let report = measure(&[0.0; 2000], 44100, 1024);
        assert!(report.dominant_frequency_hz.is_none());
        assert_eq!(report.rms_db, -120.0);
    }
}
