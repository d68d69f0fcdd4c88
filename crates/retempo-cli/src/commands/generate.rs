//! Test tone generation command.

use clap::Args;
use retempo_analysis::sine_stereo;
use retempo_io::{WavSpec, write_wav_interleaved};
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Frequency in Hz
    #[arg(long, default_value = "440.0")]
    freq: f32,

    /// Duration in seconds
    #[arg(long, default_value = "2.0")]
    duration: f32,

    /// Sample rate
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Amplitude (0-1)
    #[arg(long, default_value = "0.8")]
    amplitude: f32,

    /// Output bit depth (16, 24 or 32)
    #[arg(long, default_value = "16")]
    bit_depth: u16,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    if args.sample_rate == 0 {
        anyhow::bail!("sample rate must be greater than zero");
    }
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        anyhow::bail!("duration must be a non-negative number of seconds");
    }
    if args.freq <= 0.0 || args.freq >= args.sample_rate as f32 / 2.0 {
        anyhow::bail!(
            "frequency must be between 0 and Nyquist ({} Hz)",
            args.sample_rate / 2
        );
    }

    println!(
        "Generating {:.1} Hz sine, {:.2}s at {} Hz...",
        args.freq, args.duration, args.sample_rate
    );

    let samples = sine_stereo(args.sample_rate, args.freq, args.duration, args.amplitude.clamp(0.0, 1.0));
    let spec = WavSpec {
        channels: 2,
        sample_rate: args.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    write_wav_interleaved(&args.output, &samples, spec)?;

    println!("Wrote {} frames to {}", samples.len() / 2, args.output.display());
    Ok(())
}
