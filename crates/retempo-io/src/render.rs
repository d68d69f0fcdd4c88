//! Offline rendering of a stream filter.

use std::path::Path;

use hound::WavWriter;
use retempo_core::{Source, StreamFilter};

use crate::Result;
use crate::wav::{WavSpec, check_writable, write_samples};

/// Pulls every frame out of `filter` in blocks of `block_frames`.
///
/// Returns the interleaved stereo output. The filter flushes its engine when
/// the source runs dry, so the tail is included.
pub fn render<S: Source>(filter: &mut StreamFilter<S>, block_frames: usize) -> Vec<f32> {
    let block_frames = block_frames.max(1);
    let mut out = Vec::new();
    let mut block = vec![0.0f32; 2 * block_frames];
    loop {
        let n = filter.extract(&mut block, block_frames);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&block[..2 * n]);
    }
    out
}

/// Streams `filter` into a stereo WAV file at `path`.
///
/// Output is written block by block, so memory use does not grow with the
/// length of the source. Returns the number of frames written.
pub fn render_to_wav<S: Source, P: AsRef<Path>>(
    filter: &mut StreamFilter<S>,
    path: P,
    spec: WavSpec,
    block_frames: usize,
) -> Result<usize> {
    check_writable(spec)?;
    let block_frames = block_frames.max(1);
    let stereo_spec = WavSpec { channels: 2, ..spec };
    let mut writer = WavWriter::create(path.as_ref(), hound::WavSpec::from(stereo_spec))?;

    let mut block = vec![0.0f32; 2 * block_frames];
    let mut written = 0;
    loop {
        let n = filter.extract(&mut block, block_frames);
        if n == 0 {
            break;
        }
        write_samples(&mut writer, &block[..2 * n], spec.bits_per_sample)?;
        written += n;
    }
    writer.finalize()?;

    tracing::debug!("render: wrote {} frames to {}", written, path.as_ref().display());
    Ok(written)
}
