//! Pull-based frame sources.
//!
//! A [`Source`] hands out interleaved stereo frames on request, addressed by
//! absolute frame position. [`StreamFilter`](crate::StreamFilter) drives one
//! from its fill loop. [`BufferSource`] is the in-memory implementation.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::fifo::CHANNELS;

/// Supplies interleaved stereo frames by absolute position.
pub trait Source {
    /// Copies up to `frames` frames starting at frame `position` into
    /// `target`, returning the number copied.
    ///
    /// Returns 0 once `position` is at or past the end of the stream. A
    /// return of 0 ends the stream for the caller.
    fn extract(&mut self, target: &mut [f32], frames: usize, position: usize) -> usize;
}

impl<S: Source + ?Sized> Source for &mut S {
    fn extract(&mut self, target: &mut [f32], frames: usize, position: usize) -> usize {
        (**self).extract(target, frames, position)
    }
}

#[cfg(feature = "std")]
impl<S: Source + ?Sized> Source for std::boxed::Box<S> {
    fn extract(&mut self, target: &mut [f32], frames: usize, position: usize) -> usize {
        (**self).extract(target, frames, position)
    }
}

/// In-memory source over interleaved stereo frames.
///
/// # Example
///
/// ```rust
/// use retempo_core::{BufferSource, Source};
///
/// let mut source = BufferSource::from_mono(&[0.1, 0.2, 0.3]);
/// let mut out = [0.0; 4];
/// assert_eq!(source.extract(&mut out, 2, 1), 2);
/// assert_eq!(out, [0.2, 0.2, 0.3, 0.3]);
/// assert_eq!(source.extract(&mut out, 2, 3), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferSource {
    samples: Vec<f32>,
}

impl BufferSource {
    /// Wraps interleaved stereo samples. A trailing half frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>) -> Self {
        let whole = samples.len() - samples.len() % CHANNELS;
        samples.truncate(whole);
        Self { samples }
    }

    /// Interleaves two channel slices. The longer one is cut to the shorter.
    pub fn from_channels(left: &[f32], right: &[f32]) -> Self {
        let samples = left.iter().zip(right).flat_map(|(&l, &r)| [l, r]).collect();
        Self { samples }
    }

    /// Duplicates a mono signal to both channels.
    pub fn from_mono(samples: &[f32]) -> Self {
        Self::from_channels(samples, samples)
    }

    /// Length in frames.
    #[inline]
    pub fn len_frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// The interleaved samples.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

impl Source for BufferSource {
    fn extract(&mut self, target: &mut [f32], frames: usize, position: usize) -> usize {
        let count = frames
            .min(self.len_frames().saturating_sub(position))
            .min(target.len() / CHANNELS);
        if count == 0 {
            return 0;
        }
        let start = position * CHANNELS;
        target[..count * CHANNELS].copy_from_slice(&self.samples[start..start + count * CHANNELS]);
        count
    }
}
