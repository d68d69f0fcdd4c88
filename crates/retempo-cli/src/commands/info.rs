//! WAV header summary, with the output length a tempo/rate change would give.

use clap::Args;
use retempo_io::{WavFormat, WavInfo, read_wav_info};
use std::path::PathBuf;

use super::common::format_duration;

#[derive(Args)]
pub struct InfoArgs {
    /// WAV file to inspect
    pub file: PathBuf,

    /// Also show the length after processing at this tempo
    #[arg(short, long)]
    pub tempo: Option<f64>,

    /// Also show the length after processing at this rate
    #[arg(short, long)]
    pub rate: Option<f64>,
}

impl InfoArgs {
    /// Combined tempo and rate speed-up, if either was given.
    fn speed(&self) -> anyhow::Result<Option<f64>> {
        if self.tempo.is_none() && self.rate.is_none() {
            return Ok(None);
        }
        let speed = self.tempo.unwrap_or(1.0) * self.rate.unwrap_or(1.0);
        if !(speed.is_finite() && speed > 0.0) {
            anyhow::bail!("tempo and rate must be positive");
        }
        Ok(Some(speed))
    }
}

fn channel_layout(channels: u16) -> String {
    match channels {
        1 => "1 (mono, duplicated to stereo when processed)".to_string(),
        2 => "2".to_string(),
        n => format!("{n} (only the first two are processed)"),
    }
}

/// Frames produced from `info` at the given speed-up.
fn processed_frames(info: &WavInfo, speed: f64) -> u64 {
    (info.num_frames as f64 / speed + 0.5).floor() as u64
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let speed = args.speed()?;
    let info = read_wav_info(&args.file)?;
    let encoding = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };
    let size = std::fs::metadata(&args.file)?.len();

    println!("File:        {}", args.file.display());
    println!("Format:      {encoding} {}-bit", info.bits_per_sample);
    println!("Channels:    {}", channel_layout(info.channels));
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {} ({:.3}s, {} frames)",
        format_duration(info.duration_secs),
        info.duration_secs,
        info.num_frames
    );
    println!("File Size:   {}", human_size(size));

    if let Some(speed) = speed {
        let frames = processed_frames(&info, speed);
        let secs = frames as f64 / f64::from(info.sample_rate);
        println!(
            "Processed:   {} ({secs:.3}s, {frames} frames at {speed:.3}x)",
            format_duration(secs)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(num_frames: u64) -> WavInfo {
        WavInfo {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            num_frames,
            duration_secs: num_frames as f64 / 44100.0,
            format: WavFormat::Pcm,
        }
    }

    #[test]
    fn processed_length_rounds_half_up() {
        assert_eq!(processed_frames(&info(44100), 0.5), 88200);
        assert_eq!(processed_frames(&info(3), 2.0), 2);
        assert_eq!(processed_frames(&info(20_000), 1.5), 13_333);
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(human_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn speed_requires_positive_values() {
        let args = |tempo, rate| InfoArgs {
            file: PathBuf::new(),
            tempo,
            rate,
        };
        assert_eq!(args(None, None).speed().unwrap(), None);
        assert_eq!(args(Some(2.0), Some(1.5)).speed().unwrap(), Some(3.0));
        assert!(args(Some(0.0), None).speed().is_err());
        assert!(args(None, Some(-1.0)).speed().is_err());
    }
}
