//! Pull-driven streaming adapter with a rewindable output history.
//!
//! [`StreamFilter`] sits between a [`Source`] and a consumer that asks for
//! blocks of processed frames. Each [`extract`](StreamFilter::extract) tops
//! up the [`Engine`]'s output by reading from the source and processing, then
//! hands out the next frames.
//!
//! Delivered frames are not discarded immediately: the most recent
//! `history_limit` of them stay in the engine's output FIFO, so the consumer
//! can step its position back without reprocessing.
//!
//! ```text
//!   output FIFO:  [ ...history...  | undelivered ]
//!                 ^                ^
//!                 head             output_position
//! ```

#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::engine::Engine;
use crate::error::PositionError;
use crate::fifo::CHANNELS;
use crate::source::Source;

/// Default number of delivered frames kept for rewinding.
pub const DEFAULT_HISTORY_FRAMES: usize = 22_050;

/// Default number of frames requested from the source per read.
pub const DEFAULT_FILL_FRAMES: usize = 16_384;

/// Receives progress notifications from a [`StreamFilter`].
pub trait PositionObserver {
    /// Called after every non-empty extract with the current source position.
    fn on_position(&mut self, source_position: usize);

    /// Called when an extract returns no frames.
    fn on_end(&mut self) {}
}

/// Drives an [`Engine`] from a [`Source`] on demand.
///
/// # Example
///
/// ```rust
/// use retempo_core::{BufferSource, Engine, StreamFilter};
///
/// let tone: Vec<f32> = (0..44100).map(|i| (i as f32 * 0.06).sin()).collect();
/// let mut engine = Engine::new();
/// engine.set_tempo(2.0);
///
/// let mut filter = StreamFilter::new(BufferSource::from_mono(&tone), engine);
/// let mut block = vec![0.0f32; 2 * 1024];
/// let mut total = 0;
/// loop {
///     let n = filter.extract(&mut block, 1024);
///     if n == 0 {
///         break;
///     }
///     total += n;
/// }
/// assert!((total as i64 - 22050).abs() <= 1);
/// ```
pub struct StreamFilter<S> {
    engine: Engine,
    source: S,
    observer: Option<Box<dyn PositionObserver + Send>>,
    scratch: Vec<f32>,

    source_position: usize,
    position: usize,
    output_position: usize,
    history_limit: usize,
    fill_frames: usize,

    flush_on_end: bool,
    finished: bool,
}

impl<S: Source> StreamFilter<S> {
    /// Creates a filter reading from `source` through `engine`.
    pub fn new(source: S, engine: Engine) -> Self {
        Self {
            engine,
            source,
            observer: None,
            scratch: vec![0.0; DEFAULT_FILL_FRAMES * CHANNELS],
            source_position: 0,
            position: 0,
            output_position: 0,
            history_limit: DEFAULT_HISTORY_FRAMES,
            fill_frames: DEFAULT_FILL_FRAMES,
            flush_on_end: true,
            finished: false,
        }
    }

    /// Sets how many delivered frames stay available for rewinding.
    pub fn with_history_limit(mut self, frames: usize) -> Self {
        self.set_history_limit(frames);
        self
    }

    /// Reads the source until the output holds `target_frames` frames or
    /// the source is exhausted.
    ///
    /// On exhaustion the engine is flushed once (unless disabled with
    /// [`set_flush_on_end`](Self::set_flush_on_end)).
    pub fn fill_output(&mut self, target_frames: usize) {
        while !self.finished && self.engine.frames_available() < target_frames {
            let read = self
                .source
                .extract(&mut self.scratch, self.fill_frames, self.source_position);
            if read == 0 {
                if self.flush_on_end {
                    self.engine.flush();
                }
                self.finished = true;
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "filter_end: source exhausted at frame {}",
                    self.source_position
                );
                break;
            }
            self.source_position += read;
            self.engine.put_frames(&self.scratch, 0, read);
            self.engine.process();
        }
    }

    /// Copies up to `frames` processed frames into `target` and advances the
    /// position.
    ///
    /// Returns the number of frames copied. 0 means the stream has ended.
    pub fn extract(&mut self, target: &mut [f32], frames: usize) -> usize {
        let frames = frames.min(target.len() / CHANNELS);
        self.fill_output(self.output_position + frames);

        let available = self
            .engine
            .frames_available()
            .saturating_sub(self.output_position);
        let extracted = frames.min(available);
        self.engine
            .output()
            .peek(target, self.output_position, extracted);

        let current = self.output_position + extracted;
        self.output_position = current.min(self.history_limit);
        self.evict(current.saturating_sub(self.history_limit));
        self.position += extracted;

        if let Some(observer) = self.observer.as_mut() {
            if extracted > 0 {
                observer.on_position(self.source_position);
            } else if self.finished {
                observer.on_end();
            }
        }
        extracted
    }

    fn evict(&mut self, frames: usize) {
        if frames > 0 {
            #[cfg(feature = "tracing")]
            tracing::trace!("filter_evict: {frames} frames");
            self.engine.output_mut().consume(frames);
        }
    }

    /// Frames delivered so far on the output timeline.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the output position back within the retained history.
    ///
    /// # Errors
    ///
    /// [`PositionError::AheadOfCurrent`] if `position` has not been delivered
    /// yet, [`PositionError::OutsideHistory`] if it has already been evicted.
    pub fn set_position(&mut self, position: usize) -> Result<(), PositionError> {
        if position > self.position {
            return Err(PositionError::AheadOfCurrent {
                requested: position,
                current: self.position,
            });
        }
        let back = self.position - position;
        if back > self.output_position {
            return Err(PositionError::OutsideHistory {
                requested: position,
                earliest: self.position - self.output_position,
            });
        }
        self.output_position -= back;
        self.position = position;
        Ok(())
    }

    /// Frames read from the source so far.
    #[inline]
    pub fn source_position(&self) -> usize {
        self.source_position
    }

    /// Clears the pipeline and restarts reading the source at `position`.
    pub fn set_source_position(&mut self, position: usize) {
        self.clear();
        self.source_position = position;
        #[cfg(feature = "tracing")]
        tracing::debug!("filter_seek: source position {position}");
    }

    /// Index of the next frame to deliver within the retained output.
    #[inline]
    pub fn output_position(&self) -> usize {
        self.output_position
    }

    /// Maximum number of delivered frames kept for rewinding.
    #[inline]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Changes the history size, evicting frames beyond the new limit.
    pub fn set_history_limit(&mut self, frames: usize) {
        self.history_limit = frames;
        if self.output_position > frames {
            let excess = self.output_position - frames;
            self.evict(excess);
            self.output_position = frames;
        }
    }

    /// Frames requested from the source per read.
    #[inline]
    pub fn fill_frames(&self) -> usize {
        self.fill_frames
    }

    /// Sets the source read size. Values below 1 are raised to 1.
    pub fn set_fill_frames(&mut self, frames: usize) {
        self.fill_frames = frames.max(1);
        if self.scratch.len() < self.fill_frames * CHANNELS {
            self.scratch.resize(self.fill_frames * CHANNELS, 0.0);
        }
    }

    /// Whether the engine is flushed when the source runs dry.
    pub fn set_flush_on_end(&mut self, flush: bool) {
        self.flush_on_end = flush;
    }

    /// True once the source has reported end of stream.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Installs the progress observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: Box<dyn PositionObserver + Send>) {
        self.observer = Some(observer);
    }

    /// Removes and returns the progress observer.
    pub fn take_observer(&mut self) -> Option<Box<dyn PositionObserver + Send>> {
        self.observer.take()
    }

    /// Empties the engine and the history. The source position is kept.
    pub fn clear(&mut self) {
        self.engine.clear();
        self.output_position = 0;
        self.finished = false;
    }

    /// The engine.
    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the engine, for parameter changes mid-stream.
    #[inline]
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The source.
    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source.
    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Splits the filter into its engine and source.
    pub fn into_parts(self) -> (Engine, S) {
        (self.engine, self.source)
    }
}

// The observer is a trait object, so only its presence is shown.
impl<S: core::fmt::Debug> core::fmt::Debug for StreamFilter<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamFilter")
            .field("engine", &self.engine)
            .field("source", &self.source)
            .field("observer", &self.observer.is_some())
            .field("scratch_frames", &(self.scratch.len() / CHANNELS))
            .field("source_position", &self.source_position)
            .field("position", &self.position)
            .field("output_position", &self.output_position)
            .field("history_limit", &self.history_limit)
            .field("fill_frames", &self.fill_frames)
            .field("flush_on_end", &self.flush_on_end)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;
    use std::sync::{Arc, Mutex};

    fn ramp_source(frames: usize) -> BufferSource {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        BufferSource::from_mono(&samples)
    }

    #[derive(Default)]
    struct Events {
        positions: Vec<usize>,
        ends: usize,
    }

    struct Recorder(Arc<Mutex<Events>>);

    impl PositionObserver for Recorder {
        fn on_position(&mut self, source_position: usize) {
            self.0.lock().unwrap().positions.push(source_position);
        }
        fn on_end(&mut self) {
            self.0.lock().unwrap().ends += 1;
        }
    }

    #[test]
    fn test_extract_until_end() {
        let mut filter = StreamFilter::new(ramp_source(20_000), Engine::new());
        let mut block = vec![0.0; 2 * 4096];
        let mut total = 0;
        loop {
            let n = filter.extract(&mut block, 4096);
            if n == 0 {
                break;
            }
            total += n;
        }
        assert!(filter.is_finished());
        assert_eq!(filter.position(), total);
        assert_eq!(filter.source_position(), 20_000);
        assert!((total as i64 - 20_000).abs() <= 1, "total {total}");
        assert_eq!(filter.extract(&mut block, 4096), 0);
    }

    #[test]
    fn test_history_is_capped() {
        let mut filter =
            StreamFilter::new(ramp_source(50_000), Engine::new()).with_history_limit(1000);
        let mut block = vec![0.0; 2 * 700];
        for _ in 0..5 {
            filter.extract(&mut block, 700);
        }
        assert_eq!(filter.position(), 3500);
        assert_eq!(filter.output_position(), 1000);
        assert!(filter.output_position() <= filter.history_limit());
    }

    #[test]
    fn test_rewind_replays_delivered_frames() {
        let mut filter =
            StreamFilter::new(ramp_source(30_000), Engine::new()).with_history_limit(4000);
        let mut delivered = vec![0.0; 2 * 5000];
        assert_eq!(filter.extract(&mut delivered, 5000), 5000);

        filter.set_position(3000).unwrap();
        let mut replay = [0.0; 2];
        assert_eq!(filter.extract(&mut replay, 1), 1);
        assert_eq!(replay, [delivered[6000], delivered[6001]]);
        assert_eq!(filter.position(), 3001);
    }

    #[test]
    fn test_rewind_outside_history_fails() {
        let mut filter =
            StreamFilter::new(ramp_source(30_000), Engine::new()).with_history_limit(4000);
        let mut delivered = vec![0.0; 2 * 5000];
        filter.extract(&mut delivered, 5000);

        assert_eq!(
            filter.set_position(500),
            Err(PositionError::OutsideHistory {
                requested: 500,
                earliest: 1000
            })
        );
        assert_eq!(
            filter.set_position(6000),
            Err(PositionError::AheadOfCurrent {
                requested: 6000,
                current: 5000
            })
        );
        assert_eq!(filter.position(), 5000);
        assert_eq!(filter.set_position(1000), Ok(()));
        assert_eq!(filter.output_position(), 0);
    }

    #[test]
    fn test_shrinking_history_evicts() {
        let mut filter = StreamFilter::new(ramp_source(30_000), Engine::new());
        let mut block = vec![0.0; 2 * 3000];
        filter.extract(&mut block, 3000);
        let available = filter.engine().frames_available();

        filter.set_history_limit(1000);
        assert_eq!(filter.output_position(), 1000);
        assert_eq!(filter.engine().frames_available(), available - 2000);
    }

    #[test]
    fn test_observer_notified() {
        let events = Arc::new(Mutex::new(Events::default()));
        let mut filter = StreamFilter::new(ramp_source(10_000), Engine::new());
        filter.set_observer(Box::new(Recorder(Arc::clone(&events))));

        let mut block = vec![0.0; 2 * 4096];
        while filter.extract(&mut block, 4096) > 0 {}

        let events = events.lock().unwrap();
        assert!(!events.positions.is_empty());
        assert!(events.positions.iter().all(|&p| p == 10_000));
        assert_eq!(events.ends, 1);
    }

    #[test]
    fn test_debug_lists_state() {
        let mut filter = StreamFilter::new(ramp_source(100), Engine::new());
        filter.set_observer(Box::new(Recorder(Arc::default())));
        let text = format!("{filter:?}");
        assert!(text.contains("observer: true"), "{text}");
        assert!(text.contains("finished: false"), "{text}");
        assert!(text.contains("BufferSource"), "{text}");
    }

    #[test]
    fn test_zero_frame_extract_is_not_end() {
        let events = Arc::new(Mutex::new(Events::default()));
        let mut filter = StreamFilter::new(ramp_source(10_000), Engine::new());
        filter.set_observer(Box::new(Recorder(Arc::clone(&events))));

        let mut block = vec![0.0; 2 * 512];
        assert_eq!(filter.extract(&mut block, 0), 0);
        assert_eq!(filter.extract(&mut [], 512), 0);
        assert!(!filter.is_finished());
        assert_eq!(events.lock().unwrap().ends, 0);

        assert_eq!(filter.extract(&mut block, 512), 512);
        assert_eq!(events.lock().unwrap().ends, 0);
    }

    #[test]
    fn test_set_source_position_restarts() {
        let mut filter = StreamFilter::new(ramp_source(30_000), Engine::new());
        let mut block = vec![0.0; 2 * 2048];
        filter.extract(&mut block, 2048);

        filter.set_source_position(25_000);
        assert_eq!(filter.output_position(), 0);
        assert_eq!(filter.engine().frames_available(), 0);
        assert_eq!(filter.source_position(), 25_000);

        let mut total = 0;
        loop {
            let n = filter.extract(&mut block, 2048);
            if n == 0 {
                break;
            }
            total += n;
        }
        assert!((total as i64 - 5000).abs() <= 1, "total {total}");
    }

    #[test]
    fn test_without_flush_tail_is_held_back() {
        let mut filter = StreamFilter::new(ramp_source(10_000), Engine::new());
        filter.set_flush_on_end(false);
        let mut block = vec![0.0; 2 * 4096];
        let mut total = 0;
        loop {
            let n = filter.extract(&mut block, 4096);
            if n == 0 {
                break;
            }
            total += n;
        }
        assert!(total < 10_000);
        assert!(filter.engine().unprocessed_frames() > 0);
    }

    #[test]
    fn test_extract_clamps_to_target_length() {
        let mut filter = StreamFilter::new(ramp_source(10_000), Engine::new());
        let mut block = vec![0.0; 2 * 100];
        assert_eq!(filter.extract(&mut block, 4096), 100);
    }
}
