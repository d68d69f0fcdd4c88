//! Growable FIFO of interleaved stereo frames.
//!
//! [`SampleFifo`] is the transport between every pipeline stage. Frames are
//! appended at the logical end and consumed from the logical front. Consuming
//! only advances a read cursor; the valid region is shifted back to offset 0
//! lazily, when an append would otherwise need more room. Storage grows
//! geometrically, so once a stream reaches its steady block sizes no further
//! allocation happens.
//!
//! All counts and offsets in this API are **frames** (L/R pairs), never raw
//! samples. Requests for more frames than are available are clamped to what
//! is there.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Number of interleaved channels in every buffer of the pipeline.
pub const CHANNELS: usize = 2;

/// Growable, self-compacting queue of interleaved stereo frames.
///
/// Invariant: `position() + frame_count() <= capacity()`.
///
/// # Example
///
/// ```rust
/// use retempo_core::SampleFifo;
///
/// let mut fifo = SampleFifo::new();
/// fifo.append(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 0, 3);
/// assert_eq!(fifo.frame_count(), 3);
///
/// let mut out = [0.0; 4];
/// assert_eq!(fifo.drain(&mut out, 2), 2);
/// assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
/// assert_eq!(fifo.frame_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SampleFifo {
    /// Backing storage, `capacity * CHANNELS` samples.
    data: Vec<f32>,
    /// Index of the first valid frame.
    position: usize,
    /// Number of valid frames starting at `position`.
    frames: usize,
}

impl SampleFifo {
    /// Creates an empty FIFO without allocating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty FIFO with room for `frames` frames.
    pub fn with_capacity(frames: usize) -> Self {
        let mut fifo = Self::new();
        fifo.ensure_capacity(frames);
        fifo
    }

    /// Number of valid frames.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Returns true if no frames are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Index of the first valid frame within the backing storage.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Capacity of the backing storage in frames.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// The valid region as interleaved samples.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data[self.start_index()..self.end_index()]
    }

    /// Returns the frame at `index` (relative to the front), if present.
    pub fn frame(&self, index: usize) -> Option<(f32, f32)> {
        if index >= self.frames {
            return None;
        }
        let i = self.start_index() + index * CHANNELS;
        Some((self.data[i], self.data[i + 1]))
    }

    /// Appends `frame_count` frames read from `samples`, starting at frame
    /// `frame_offset`.
    ///
    /// The count is clamped to the frames actually present in `samples`.
    /// Returns the number of frames appended.
    pub fn append(&mut self, samples: &[f32], frame_offset: usize, frame_count: usize) -> usize {
        let available = (samples.len() / CHANNELS).saturating_sub(frame_offset);
        let count = frame_count.min(available);
        if count == 0 {
            return 0;
        }
        self.ensure_additional_capacity(count);
        let src = frame_offset * CHANNELS;
        let dst = self.end_index();
        self.data[dst..dst + count * CHANNELS].copy_from_slice(&samples[src..src + count * CHANNELS]);
        self.frames += count;
        count
    }

    /// Appends frames copied from the valid region of another FIFO.
    ///
    /// `frame_offset` is relative to the front of `other`. The source FIFO is
    /// not modified. Returns the number of frames appended.
    pub fn append_from(&mut self, other: &SampleFifo, frame_offset: usize, frame_count: usize) -> usize {
        self.append(other.as_slice(), frame_offset, frame_count)
    }

    /// Discards up to `frame_count` frames from the front.
    ///
    /// Consuming more than is available empties the FIFO. Returns the number
    /// of frames discarded.
    pub fn consume(&mut self, frame_count: usize) -> usize {
        let count = frame_count.min(self.frames);
        self.frames -= count;
        self.position += count;
        if self.frames == 0 {
            self.position = 0;
        }
        count
    }

    /// Copies up to `frame_count` frames from the front into `out`, then
    /// consumes them.
    ///
    /// Returns the number of frames moved, which is also limited by the
    /// length of `out`.
    pub fn drain(&mut self, out: &mut [f32], frame_count: usize) -> usize {
        let copied = self.peek(out, 0, frame_count);
        self.consume(copied);
        copied
    }

    /// Copies up to `frame_count` frames starting `offset_frames` from the
    /// front into `out` without changing the FIFO.
    pub fn peek(&self, out: &mut [f32], offset_frames: usize, frame_count: usize) -> usize {
        let count = frame_count
            .min(self.frames.saturating_sub(offset_frames))
            .min(out.len() / CHANNELS);
        if count == 0 {
            return 0;
        }
        let src = self.start_index() + offset_frames * CHANNELS;
        out[..count * CHANNELS].copy_from_slice(&self.data[src..src + count * CHANNELS]);
        count
    }

    /// Shifts the valid frames to offset 0.
    pub fn compact(&mut self) {
        if self.position > 0 {
            let (start, end) = (self.start_index(), self.end_index());
            self.data.copy_within(start..end, 0);
            self.position = 0;
        }
    }

    /// Makes room for `frames` valid frames in total.
    ///
    /// Compacts when that alone frees enough room, otherwise reallocates to
    /// at least twice the current capacity, copying the valid region to
    /// offset 0.
    pub fn ensure_capacity(&mut self, frames: usize) {
        let capacity = self.capacity();
        if self.position + frames <= capacity {
            return;
        }
        if frames <= capacity {
            self.compact();
            return;
        }

        let new_capacity = frames.max(capacity * 2);
        #[cfg(feature = "tracing")]
        tracing::trace!("fifo_grow: {capacity} -> {new_capacity} frames");

        let mut data = vec![0.0; new_capacity * CHANNELS];
        let len = self.frames * CHANNELS;
        data[..len].copy_from_slice(self.as_slice());
        self.data = data;
        self.position = 0;
    }

    /// Makes room for `frames` frames beyond the current content.
    #[inline]
    pub fn ensure_additional_capacity(&mut self, frames: usize) {
        self.ensure_capacity(self.frames + frames);
    }

    /// Returns writable storage for `frames` frames at the logical end.
    ///
    /// Nothing becomes valid until [`commit`](Self::commit) is called with
    /// the number of frames actually written.
    pub fn spare_mut(&mut self, frames: usize) -> &mut [f32] {
        self.ensure_additional_capacity(frames);
        let start = self.end_index();
        &mut self.data[start..start + frames * CHANNELS]
    }

    /// Marks `frames` frames written through [`spare_mut`](Self::spare_mut)
    /// as valid.
    pub fn commit(&mut self, frames: usize) {
        debug_assert!(self.position + self.frames + frames <= self.capacity());
        self.frames += frames;
    }

    /// Drops up to `frames` frames from the back. Returns the number dropped.
    pub fn truncate(&mut self, frames: usize) -> usize {
        let count = frames.min(self.frames);
        self.frames -= count;
        count
    }

    /// Empties the FIFO, keeping its storage.
    pub fn clear(&mut self) {
        self.position = 0;
        self.frames = 0;
    }

    #[inline]
    fn start_index(&self) -> usize {
        self.position * CHANNELS
    }

    #[inline]
    fn end_index(&self) -> usize {
        (self.position + self.frames) * CHANNELS
    }
}
