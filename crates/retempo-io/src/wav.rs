//! WAV file reading and writing.
//!
//! Everything here speaks interleaved stereo `f32`, the frame layout of the
//! processing pipeline. Mono files are duplicated to both channels on read;
//! files with more than two channels contribute their first two.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (16 or 24 for PCM, 32 for float).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Full-scale value for integer PCM of the given bit depth.
pub(crate) fn int_scale(bits_per_sample: u16) -> f32 {
    (1i64 << (bits_per_sample - 1)) as f32
}

/// Folds `channels`-interleaved samples into interleaved stereo.
pub(crate) fn to_stereo(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    match channels {
        2 => samples,
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        _ => samples
            .chunks_exact(channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Read a WAV file as interleaved stereo `f32` along with its spec.
///
/// The returned spec describes the file as stored (its original channel
/// count), while the samples are always two-channel.
///
/// # Example
/// ```ignore
/// let (samples, spec) = read_wav_interleaved("input.wav")?;
/// println!("Loaded {} frames at {} Hz", samples.len() / 2, spec.sample_rate);
/// ```
pub fn read_wav_interleaved<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    if spec.channels == 0 {
        return Err(Error::UnsupportedFormat("WAV file has no channels".into()));
    }

    let samples: Vec<f32> = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = int_scale(spec.bits_per_sample);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((to_stereo(samples, spec.channels as usize), spec))
}

/// Checks that `spec` describes a format this crate can write.
pub(crate) fn check_writable(spec: WavSpec) -> Result<()> {
    match spec.bits_per_sample {
        16 | 24 | 32 => Ok(()),
        bits => Err(Error::UnsupportedFormat(format!(
            "cannot write {bits}-bit WAV (use 16, 24 or 32)"
        ))),
    }
}

/// Writes interleaved stereo samples to an open writer in `bits_per_sample`.
pub(crate) fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    bits_per_sample: u16,
) -> Result<()> {
    if bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = int_scale(bits_per_sample);
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }
    Ok(())
}

/// Write interleaved stereo samples to a WAV file.
///
/// The file is always stereo; `spec.channels` is ignored.
///
/// # Example
/// ```ignore
/// let samples = vec![0.0f32; 2 * 44100]; // 1 second of stereo silence
/// write_wav_interleaved("output.wav", &samples, WavSpec::default())?;
/// ```
pub fn write_wav_interleaved<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    check_writable(spec)?;
    let stereo_spec = WavSpec { channels: 2, ..spec };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(stereo_spec))?;
    write_samples(&mut writer, samples, spec.bits_per_sample)?;
    writer.finalize()?;
    Ok(())
}
