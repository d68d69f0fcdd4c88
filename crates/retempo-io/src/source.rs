//! Streaming WAV source.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use retempo_core::Source;

use crate::wav::{WavSpec, int_scale};
use crate::{Error, Result};

/// Decodes a WAV file on demand as interleaved stereo.
///
/// Only the frames asked for are read from disk. A request at a position
/// other than the reader's cursor seeks first. Decode errors are logged and
/// end the stream: every later request returns zero frames.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    format: SampleFormat,
    num_frames: usize,
    cursor: usize,
    failed: bool,
}

impl WavSource {
    /// Opens `path` for streaming.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let hound_spec = reader.spec();
        if hound_spec.channels == 0 {
            return Err(Error::UnsupportedFormat("WAV file has no channels".into()));
        }
        let num_frames = reader.duration() as usize;

        tracing::debug!(
            "wav_source: opened {} ({} ch, {} Hz, {} frames)",
            path.display(),
            hound_spec.channels,
            hound_spec.sample_rate,
            num_frames
        );

        Ok(Self {
            spec: WavSpec::from(hound_spec),
            format: hound_spec.sample_format,
            reader,
            num_frames,
            cursor: 0,
            failed: false,
        })
    }

    /// Spec of the file as stored.
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    /// Length of the file in frames.
    pub fn len_frames(&self) -> usize {
        self.num_frames
    }

    /// Returns `true` once a decode error has ended the stream.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    fn read_frames(&mut self, target: &mut [f32], frames: usize) -> std::result::Result<usize, hound::Error> {
        let channels = self.spec.channels as usize;
        match self.format {
            SampleFormat::Float => fill_stereo::<f32, _>(&mut self.reader, target, frames, channels, |s| s),
            SampleFormat::Int => {
                let max_val = int_scale(self.spec.bits_per_sample);
                fill_stereo::<i32, _>(&mut self.reader, target, frames, channels, |s| s as f32 / max_val)
            }
        }
    }
}

/// Reads up to `frames` frames into `target` as stereo, returning whole frames read.
fn fill_stereo<S, F>(
    reader: &mut WavReader<BufReader<File>>,
    target: &mut [f32],
    frames: usize,
    channels: usize,
    convert: F,
) -> std::result::Result<usize, hound::Error>
where
    S: hound::Sample,
    F: Fn(S) -> f32,
{
    let mut samples = reader.samples::<S>();
    let mut frame = [0.0f32; 2];
    for i in 0..frames {
        for ch in 0..channels {
            let Some(sample) = samples.next() else {
                return Ok(i);
            };
            let value = convert(sample?);
            if ch < 2 {
                frame[ch] = value;
            }
        }
        if channels == 1 {
            frame[1] = frame[0];
        }
        target[2 * i] = frame[0];
        target[2 * i + 1] = frame[1];
    }
    Ok(frames)
}

impl Source for WavSource {
    fn extract(&mut self, target: &mut [f32], frames: usize, position: usize) -> usize {
        if self.failed || position >= self.num_frames {
            return 0;
        }
        let frames = frames.min(self.num_frames - position).min(target.len() / 2);

        if position != self.cursor {
            tracing::debug!("wav_source: seek {} -> {}", self.cursor, position);
            let Ok(time) = u32::try_from(position) else {
                return 0;
            };
            if let Err(e) = self.reader.seek(time) {
                tracing::warn!("wav_source: seek to frame {} failed: {}", position, e);
                self.failed = true;
                return 0;
            }
            self.cursor = position;
        }

        match self.read_frames(target, frames) {
            Ok(read) => {
                self.cursor += read;
                read
            }
            Err(e) => {
                tracing::warn!("wav_source: decode error at frame {}: {}", self.cursor, e);
                self.failed = true;
                0
            }
        }
    }
}

impl std::fmt::Debug for WavSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSource")
            .field("spec", &self.spec)
            .field("format", &self.format)
            .field("num_frames", &self.num_frames)
            .field("cursor", &self.cursor)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
