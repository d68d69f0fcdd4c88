//! File-based tempo, pitch and rate processing command.

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use retempo_config::Preset;
use retempo_core::PositionObserver;
use retempo_io::{WavSource, WavSpec, render_to_wav};
use std::path::PathBuf;

use super::common::{format_duration, load_preset};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Tempo ratio (speed without pitch change; 2.0 = twice as fast)
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Pitch ratio (2.0 = one octave up)
    #[arg(long)]
    pitch: Option<f64>,

    /// Pitch offset in semitones
    #[arg(short, long, allow_hyphen_values = true)]
    semitones: Option<f64>,

    /// Rate ratio (speed and pitch together, like a turntable)
    #[arg(short, long)]
    rate: Option<f64>,

    /// Preset name or TOML file; flags override its values
    #[arg(short, long)]
    preset: Option<String>,

    /// Segment length in ms (default: automatic)
    #[arg(long)]
    sequence_ms: Option<f64>,

    /// Seam search width in ms (default: automatic)
    #[arg(long)]
    seek_window_ms: Option<f64>,

    /// Crossfade length in ms
    #[arg(long)]
    overlap_ms: Option<f64>,

    /// Scan every seam offset instead of the coarse-to-fine search
    #[arg(long)]
    exhaustive_seek: bool,

    /// Frames pulled per block
    #[arg(long, default_value = "4096")]
    block_size: usize,

    /// Output bit depth (16, 24 or 32); defaults to the input's when writable
    #[arg(long)]
    bit_depth: Option<u16>,
}

impl ProcessArgs {
    /// Preset with every command-line override applied.
    fn preset(&self) -> anyhow::Result<Preset> {
        let mut preset = match &self.preset {
            Some(name) => load_preset(name)?,
            None => Preset::new("command line"),
        };

        if let Some(tempo) = self.tempo {
            preset.tempo = tempo;
        }
        if let Some(pitch) = self.pitch {
            preset.pitch = pitch;
        }
        if let Some(semitones) = self.semitones {
            preset.pitch_semitones = semitones;
        }
        if let Some(rate) = self.rate {
            preset.rate = rate;
        }
        if self.sequence_ms.is_some() {
            preset.stretch.sequence_ms = self.sequence_ms;
        }
        if self.seek_window_ms.is_some() {
            preset.stretch.seek_window_ms = self.seek_window_ms;
        }
        if let Some(overlap) = self.overlap_ms {
            preset.stretch.overlap_ms = overlap;
        }
        if self.exhaustive_seek {
            preset.stretch.quick_seek = false;
        }
        Ok(preset)
    }
}

/// Moves the progress bar as the filter reads the source.
struct ProgressObserver(ProgressBar);

impl PositionObserver for ProgressObserver {
    fn on_position(&mut self, source_position: usize) {
        self.0.set_position(source_position as u64);
    }

    fn on_end(&mut self) {
        self.0.finish_and_clear();
    }
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let mut preset = args.preset()?;

    let source = WavSource::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let in_spec = source.spec();
    let in_frames = source.len_frames();
    let sample_rate = f64::from(in_spec.sample_rate);
    preset.sample_rate = in_spec.sample_rate;

    println!(
        "Reading {}: {} frames, {} Hz, {}",
        args.input.display(),
        in_frames,
        in_spec.sample_rate,
        format_duration(in_frames as f64 / sample_rate)
    );

    let mut filter = preset.build_filter(source).context("invalid settings")?;
    let engine = filter.engine();
    println!(
        "Tempo {:.4}, rate {:.4}, pitch {:.4} ({:+.2} semitones)",
        engine.virtual_tempo(),
        engine.virtual_rate(),
        engine.pitch(),
        12.0 * engine.pitch().log2()
    );
    tracing::debug!(
        "process: stretch {:.1} ms sequence, {:.1} ms seek window, {} frame overlap, {:?} order",
        engine.stretcher().sequence_ms(),
        engine.stretcher().seek_window_ms(),
        engine.stretcher().overlap_length(),
        engine.chain_order()
    );

    let bit_depth = args.bit_depth.unwrap_or(match in_spec.bits_per_sample {
        bits @ (16 | 24 | 32) => bits,
        _ => 16,
    });
    let out_spec = WavSpec {
        channels: 2,
        sample_rate: in_spec.sample_rate,
        bits_per_sample: bit_depth,
    };

    let pb = ProgressBar::new(in_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    filter.set_observer(Box::new(ProgressObserver(pb)));

    let out_frames = render_to_wav(&mut filter, &args.output, out_spec, args.block_size)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let in_secs = in_frames as f64 / sample_rate;
    let out_secs = out_frames as f64 / sample_rate;
    println!("\nSummary:");
    println!("  Input:  {in_frames} frames ({in_secs:.3}s)");
    println!("  Output: {out_frames} frames ({out_secs:.3}s)");
    if in_frames > 0 {
        println!("  Length ratio: {:.4}", out_frames as f64 / in_frames as f64);
    }
    println!("Wrote {}", args.output.display());

    Ok(())
}
