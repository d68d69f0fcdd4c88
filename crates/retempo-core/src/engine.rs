//! The two-stage tempo/pitch/rate engine.
//!
//! [`Engine`] owns a [`RateTransposer`], a [`Stretcher`] and the three
//! [`SampleFifo`]s that connect them. Callers set *virtual* parameters:
//!
//! | Parameter | Changes | Default |
//! |-----------|---------|---------|
//! | `tempo` | Duration only | 1.0 |
//! | `pitch` | Pitch only | 1.0 |
//! | `rate` | Both (like changing playback speed of a tape) | 1.0 |
//!
//! and the engine derives the *effective* settings of its stages:
//!
//! ```text
//! effective_rate  = rate * pitch    -> RateTransposer
//! effective_tempo = tempo / pitch   -> Stretcher
//! ```
//!
//! ## Chain order
//!
//! The stretcher runs first when `effective_rate > 1`, the transposer
//! otherwise:
//!
//! ```text
//! StretchFirst:   Input -> Stretcher -> Intermediate -> RateTransposer -> Output
//! TransposeFirst: Input -> RateTransposer -> Intermediate -> Stretcher -> Output
//! ```
//!
//! Switching order only reassigns which [`BufferSlot`] each stage reads and
//! writes. Queued frames stay where they are.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::fifo::{CHANNELS, SampleFifo};
use crate::math::{octaves_to_ratio, percent_to_ratio, round_half_up, semitones_to_ratio};
use crate::stage::PipelineStage;
use crate::stretch::{SeekStrategy, StretchSettings, Stretcher};
use crate::transposer::RateTransposer;

/// Frames of silence pushed per flush round.
const FLUSH_BLOCK_FRAMES: usize = 128;

/// Smallest parameter change that is forwarded to a stage.
const PARAM_EPSILON: f64 = 1e-10;

/// One of the engine's three FIFOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    /// Frames pushed by the caller.
    Input = 0,
    /// Frames between the two stages.
    Intermediate = 1,
    /// Frames ready for the caller.
    Output = 2,
}

/// The FIFOs a stage reads from and writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageWiring {
    /// FIFO the stage consumes.
    pub input: BufferSlot,
    /// FIFO the stage appends to.
    pub output: BufferSlot,
}

/// Order in which the two stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOrder {
    /// Stretcher, then transposer. Used when `effective_rate > 1`.
    StretchFirst,
    /// Transposer, then stretcher.
    TransposeFirst,
}

impl ChainOrder {
    /// The order that minimizes work for `effective_rate`.
    pub fn for_rate(effective_rate: f64) -> Self {
        if effective_rate > 1.0 {
            Self::StretchFirst
        } else {
            Self::TransposeFirst
        }
    }

    /// Wiring of the stretcher under this order.
    pub fn stretcher_wiring(self) -> StageWiring {
        match self {
            Self::StretchFirst => StageWiring {
                input: BufferSlot::Input,
                output: BufferSlot::Intermediate,
            },
            Self::TransposeFirst => StageWiring {
                input: BufferSlot::Intermediate,
                output: BufferSlot::Output,
            },
        }
    }

    /// Wiring of the transposer under this order.
    pub fn transposer_wiring(self) -> StageWiring {
        match self {
            Self::StretchFirst => StageWiring {
                input: BufferSlot::Intermediate,
                output: BufferSlot::Output,
            },
            Self::TransposeFirst => StageWiring {
                input: BufferSlot::Input,
                output: BufferSlot::Intermediate,
            },
        }
    }
}

/// Lends two distinct FIFOs as `(input, output)`.
fn pair_mut(buffers: &mut [SampleFifo; 3], wiring: StageWiring) -> (&mut SampleFifo, &mut SampleFifo) {
    let (i, o) = (wiring.input as usize, wiring.output as usize);
    debug_assert_ne!(i, o, "a stage cannot read and write the same buffer");
    if i < o {
        let (head, tail) = buffers.split_at_mut(o);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = buffers.split_at_mut(i);
        (&mut tail[0], &mut head[o])
    }
}

/// Streaming tempo, pitch and rate changer.
///
/// # Example
///
/// ```rust
/// use retempo_core::Engine;
///
/// let mut engine = Engine::new();
/// engine.set_tempo(1.25);
/// engine.set_pitch_semitones(-3.0);
///
/// let block = vec![0.0f32; 2 * 4096];
/// for _ in 0..8 {
///     engine.put_samples(&block);
///     engine.process();
/// }
///
/// let mut out = vec![0.0f32; 2 * 1024];
/// let received = engine.receive_samples(&mut out, 1024);
/// assert!(received <= 1024);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    transposer: RateTransposer,
    stretcher: Stretcher,
    buffers: [SampleFifo; 3],

    order: ChainOrder,
    transposer_wiring: StageWiring,
    stretcher_wiring: StageWiring,

    virtual_pitch: f64,
    virtual_rate: f64,
    virtual_tempo: f64,
    rate: f64,
    tempo: f64,

    frames_received: u64,
    frames_produced: u64,

    /// Silence block reused by [`flush`](Self::flush).
    silence: Vec<f32>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with every parameter at 1.0 and default stretch
    /// settings.
    pub fn new() -> Self {
        Self::with_settings(StretchSettings::default())
    }

    /// Creates an engine with the given stretch settings.
    pub fn with_settings(settings: StretchSettings) -> Self {
        let order = ChainOrder::for_rate(1.0);
        Self {
            transposer: RateTransposer::new(),
            stretcher: Stretcher::with_settings(settings),
            buffers: Default::default(),
            order,
            transposer_wiring: order.transposer_wiring(),
            stretcher_wiring: order.stretcher_wiring(),
            virtual_pitch: 1.0,
            virtual_rate: 1.0,
            virtual_tempo: 1.0,
            rate: 1.0,
            tempo: 1.0,
            frames_received: 0,
            frames_produced: 0,
            silence: Vec::new(),
        }
    }

    // --- Parameters ---

    /// Sets the virtual rate (tempo and pitch together).
    ///
    /// Ratios that are not finite and positive are ignored, as are they in
    /// [`set_tempo`](Self::set_tempo) and [`set_pitch`](Self::set_pitch).
    pub fn set_rate(&mut self, rate: f64) {
        self.set_virtual(rate, self.virtual_tempo, self.virtual_pitch);
    }

    /// Sets the virtual tempo (duration only).
    pub fn set_tempo(&mut self, tempo: f64) {
        self.set_virtual(self.virtual_rate, tempo, self.virtual_pitch);
    }

    /// Sets the virtual pitch as a frequency ratio.
    pub fn set_pitch(&mut self, pitch: f64) {
        self.set_virtual(self.virtual_rate, self.virtual_tempo, pitch);
    }

    /// Sets the pitch shift in octaves.
    pub fn set_pitch_octaves(&mut self, octaves: f64) {
        self.set_pitch(octaves_to_ratio(octaves));
    }

    /// Sets the pitch shift in semitones.
    pub fn set_pitch_semitones(&mut self, semitones: f64) {
        self.set_pitch(semitones_to_ratio(semitones));
    }

    /// Sets the rate as a percentage change (`+10.0` is 10 % faster).
    pub fn set_rate_change(&mut self, percent: f64) {
        self.set_rate(percent_to_ratio(percent));
    }

    /// Sets the tempo as a percentage change.
    pub fn set_tempo_change(&mut self, percent: f64) {
        self.set_tempo(percent_to_ratio(percent));
    }

    /// Virtual pitch ratio.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.virtual_pitch
    }

    /// Virtual rate ratio.
    #[inline]
    pub fn virtual_rate(&self) -> f64 {
        self.virtual_rate
    }

    /// Virtual tempo ratio.
    #[inline]
    pub fn virtual_tempo(&self) -> f64 {
        self.virtual_tempo
    }

    /// Effective resampling ratio, `rate * pitch`.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Effective stretch ratio, `tempo / pitch`.
    #[inline]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Current stage order.
    #[inline]
    pub fn chain_order(&self) -> ChainOrder {
        self.order
    }

    /// The transposer stage.
    #[inline]
    pub fn transposer(&self) -> &RateTransposer {
        &self.transposer
    }

    /// The stretcher stage.
    #[inline]
    pub fn stretcher(&self) -> &Stretcher {
        &self.stretcher
    }

    fn set_virtual(&mut self, rate: f64, tempo: f64, pitch: f64) {
        // Pitch products can still overflow to infinity or underflow to zero
        let valid = [rate, tempo, pitch, tempo / pitch, rate * pitch]
            .into_iter()
            .all(is_valid_ratio);
        if !valid {
            #[cfg(feature = "tracing")]
            tracing::warn!("engine_params: rejected rate={rate} tempo={tempo} pitch={pitch}");
            return;
        }
        self.virtual_rate = rate;
        self.virtual_tempo = tempo;
        self.virtual_pitch = pitch;
        self.calculate_effective_rate_and_tempo();
    }

    fn calculate_effective_rate_and_tempo(&mut self) {
        let tempo = self.virtual_tempo / self.virtual_pitch;
        let rate = self.virtual_rate * self.virtual_pitch;
        let previous_rate = self.rate;
        let previous_tempo = self.tempo;

        self.tempo = tempo;
        self.rate = rate;

        if (self.rate - previous_rate).abs() > PARAM_EPSILON {
            self.transposer.set_rate(self.rate);
        }
        if (self.tempo - previous_tempo).abs() > PARAM_EPSILON {
            self.stretcher.set_tempo(self.tempo);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine_params: pitch={:.4} rate={:.4} tempo={:.4} -> effective rate={:.4} tempo={:.4}",
            self.virtual_pitch,
            self.virtual_rate,
            self.virtual_tempo,
            self.rate,
            self.tempo
        );

        self.rewire(ChainOrder::for_rate(self.rate));
    }

    fn rewire(&mut self, order: ChainOrder) {
        if order == self.order {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("engine_rewire: {:?} -> {:?}", self.order, order);

        self.order = order;
        self.transposer_wiring = order.transposer_wiring();
        self.stretcher_wiring = order.stretcher_wiring();
    }

    // --- Stretch settings ---

    /// Sets the stream sample rate, keeping the other stretch settings.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let settings = StretchSettings {
            sample_rate,
            ..self.stretcher.settings()
        };
        self.stretcher.set_parameters(settings);
    }

    /// Replaces the stretch tunables.
    pub fn set_stretch_settings(&mut self, settings: StretchSettings) {
        self.stretcher.set_parameters(settings);
    }

    /// Current stretch tunables.
    #[inline]
    pub fn stretch_settings(&self) -> StretchSettings {
        self.stretcher.settings()
    }

    /// Selects the stretcher's seam search strategy.
    pub fn set_seek_strategy(&mut self, strategy: SeekStrategy) {
        self.stretcher.set_seek_strategy(strategy);
    }

    /// Minimum frames the stretcher needs for one work unit.
    #[inline]
    pub fn input_chunk_size(&self) -> usize {
        self.stretcher.input_chunk_size()
    }

    /// Frames the stretcher emits per work unit.
    #[inline]
    pub fn output_chunk_size(&self) -> usize {
        self.stretcher.output_chunk_size()
    }

    // --- Data ---

    /// Queues interleaved stereo samples. Does not process.
    pub fn put_samples(&mut self, samples: &[f32]) {
        self.put_frames(samples, 0, samples.len() / CHANNELS);
    }

    /// Queues `frame_count` frames of `samples` starting at `frame_offset`.
    ///
    /// Returns the number of frames queued.
    pub fn put_frames(&mut self, samples: &[f32], frame_offset: usize, frame_count: usize) -> usize {
        let appended = self.buffers[BufferSlot::Input as usize].append(samples, frame_offset, frame_count);
        self.frames_received += appended as u64;
        appended
    }

    /// Runs both stages in chain order.
    pub fn process(&mut self) {
        let before = self.output().frame_count();
        match self.order {
            ChainOrder::StretchFirst => {
                self.run_stretcher();
                self.run_transposer();
            }
            ChainOrder::TransposeFirst => {
                self.run_transposer();
                self.run_stretcher();
            }
        }
        let after = self.output().frame_count();
        self.frames_produced += after.saturating_sub(before) as u64;
    }

    fn run_stretcher(&mut self) {
        let (input, output) = pair_mut(&mut self.buffers, self.stretcher_wiring);
        self.stretcher.process(input, output);
    }

    fn run_transposer(&mut self) {
        let (input, output) = pair_mut(&mut self.buffers, self.transposer_wiring);
        self.transposer.process(input, output);
    }

    /// Moves up to `frames` processed frames into `out`. Returns the count.
    pub fn receive_samples(&mut self, out: &mut [f32], frames: usize) -> usize {
        self.output_mut().drain(out, frames)
    }

    /// Processed frames ready for the caller.
    #[inline]
    pub fn output(&self) -> &SampleFifo {
        &self.buffers[BufferSlot::Output as usize]
    }

    /// Mutable access to the processed frames.
    #[inline]
    pub fn output_mut(&mut self) -> &mut SampleFifo {
        &mut self.buffers[BufferSlot::Output as usize]
    }

    /// Frames queued by the caller and not yet processed.
    #[inline]
    pub fn input(&self) -> &SampleFifo {
        &self.buffers[BufferSlot::Input as usize]
    }

    /// Number of processed frames ready for the caller.
    #[inline]
    pub fn frames_available(&self) -> usize {
        self.output().frame_count()
    }

    /// Frames still waiting in the input and intermediate FIFOs.
    pub fn unprocessed_frames(&self) -> usize {
        self.input().frame_count() + self.buffers[BufferSlot::Intermediate as usize].frame_count()
    }

    /// Pushes the frames still inside the pipeline out to the output.
    ///
    /// Feeds silence until the output total matches the input total scaled
    /// by `1 / (tempo * rate)`, drops any excess, then resets the stages so
    /// the next frames start a fresh stream.
    pub fn flush(&mut self) {
        if self.frames_received == 0 {
            return;
        }

        let ratio = self.virtual_tempo * self.virtual_rate;
        let target = round_half_up(self.frames_received as f64 / ratio) as u64;
        let deficit = target.saturating_sub(self.frames_produced) as f64;
        let budget = deficit * ratio
            + (4 * (self.stretcher.input_chunk_size() + self.stretcher.overlap_length())) as f64
                * self.rate.max(1.0);
        let max_rounds = libm::ceil(budget / FLUSH_BLOCK_FRAMES as f64) as usize + 1;

        if self.silence.is_empty() {
            self.silence = vec![0.0; FLUSH_BLOCK_FRAMES * CHANNELS];
        }

        let mut rounds = 0;
        while self.frames_produced < target && rounds < max_rounds {
            self.buffers[BufferSlot::Input as usize].append(&self.silence, 0, FLUSH_BLOCK_FRAMES);
            self.process();
            rounds += 1;
        }

        let excess = self.frames_produced.saturating_sub(target) as usize;
        self.output_mut().truncate(excess);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "engine_flush: received={} produced={} target={target} rounds={rounds} excess={excess}",
            self.frames_received,
            self.frames_produced
        );

        self.transposer.reset();
        self.stretcher.reset();
        self.buffers[BufferSlot::Input as usize].clear();
        self.buffers[BufferSlot::Intermediate as usize].clear();
        self.frames_received = 0;
        self.frames_produced = 0;
    }

    /// Empties every FIFO and resets both stages. Parameters are kept.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
        self.transposer.reset();
        self.stretcher.reset();
        self.frames_received = 0;
        self.frames_produced = 0;
    }

    /// Returns a fresh engine running at this engine's effective settings.
    ///
    /// Pitch is folded into the clone's rate and tempo; its own pitch is 1.0.
    pub fn clone_parameters(&self) -> Self {
        let mut result = Self::with_settings(self.stretcher.settings());
        result.set_seek_strategy(self.stretcher.seek_strategy());
        result.set_rate(self.rate);
        result.set_tempo(self.tempo);
        result
    }
}

fn is_valid_ratio(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_block(frames: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = libm::sinf(i as f32 * 0.03);
                [s, s]
            })
            .collect()
    }

    #[test]
    fn test_effective_parameters() {
        let mut engine = Engine::new();
        engine.set_pitch(2.0);
        engine.set_tempo(1.5);
        engine.set_rate(0.8);
        assert!((engine.rate() - 1.6).abs() < 1e-12);
        assert!((engine.tempo() - 0.75).abs() < 1e-12);
        assert_eq!(engine.transposer().rate(), engine.rate());
        assert_eq!(engine.stretcher().tempo(), engine.tempo());
    }

    #[test]
    fn test_percent_and_interval_setters() {
        let mut engine = Engine::new();
        engine.set_rate_change(25.0);
        assert!((engine.virtual_rate() - 1.25).abs() < 1e-12);
        engine.set_tempo_change(-50.0);
        assert!((engine.virtual_tempo() - 0.5).abs() < 1e-12);
        engine.set_pitch_octaves(-1.0);
        assert!((engine.pitch() - 0.5).abs() < 1e-12);
        engine.set_pitch_semitones(12.0);
        assert!((engine.pitch() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_chain_order_follows_effective_rate() {
        let mut engine = Engine::new();
        assert_eq!(engine.chain_order(), ChainOrder::TransposeFirst);
        engine.set_pitch(1.5);
        assert_eq!(engine.chain_order(), ChainOrder::StretchFirst);
        engine.set_rate(0.5);
        assert_eq!(engine.chain_order(), ChainOrder::TransposeFirst);
    }

    #[test]
    fn test_wirings_are_complementary() {
        for order in [ChainOrder::StretchFirst, ChainOrder::TransposeFirst] {
            let first = match order {
                ChainOrder::StretchFirst => order.stretcher_wiring(),
                ChainOrder::TransposeFirst => order.transposer_wiring(),
            };
            let second = match order {
                ChainOrder::StretchFirst => order.transposer_wiring(),
                ChainOrder::TransposeFirst => order.stretcher_wiring(),
            };
            assert_eq!(first.input, BufferSlot::Input);
            assert_eq!(first.output, second.input);
            assert_eq!(second.output, BufferSlot::Output);
        }
    }

    #[test]
    fn test_pair_mut_returns_requested_slots() {
        let mut buffers: [SampleFifo; 3] = Default::default();
        buffers[2].append(&[1.0, 1.0], 0, 1);
        let (input, output) = pair_mut(
            &mut buffers,
            StageWiring {
                input: BufferSlot::Output,
                output: BufferSlot::Input,
            },
        );
        assert_eq!(input.frame_count(), 1);
        assert!(output.is_empty());
    }

    #[test]
    fn test_rewire_keeps_queued_frames() {
        let mut engine = Engine::new();
        engine.put_samples(&sine_block(1000));
        engine.set_pitch(2.0);
        assert_eq!(engine.input().frame_count(), 1000);
    }

    #[test]
    fn test_unity_parameters_pass_audio_through() {
        let mut engine = Engine::new();
        let block = sine_block(4096);
        for _ in 0..10 {
            engine.put_samples(&block);
            engine.process();
        }
        // Every frame is accounted for: output, still queued, or held as the
        // first crossfade partner. The transposer adds one history frame.
        let overlap = engine.stretcher().overlap_length();
        assert!(engine.frames_available() > 0);
        assert_eq!(
            engine.frames_available() + engine.unprocessed_frames() + overlap,
            10 * 4096 + 1
        );
    }

    #[test]
    fn test_flush_emits_expected_total() {
        let mut engine = Engine::new();
        engine.set_tempo(1.25);
        let block = sine_block(4410);
        let mut total = 0;
        let mut out = vec![0.0; 2 * 8192];
        for _ in 0..10 {
            engine.put_samples(&block);
            engine.process();
            total += engine.receive_samples(&mut out, 8192);
        }
        engine.flush();
        while engine.frames_available() > 0 {
            total += engine.receive_samples(&mut out, 8192);
        }

        let expected = (44100.0 / 1.25) as i64;
        assert!((total as i64 - expected).abs() <= 1, "total {total} expected {expected}");
        assert_eq!(engine.unprocessed_frames(), 0);
    }

    #[test]
    fn test_non_positive_ratios_are_ignored() {
        let mut engine = Engine::new();
        engine.set_tempo(1.25);
        engine.set_pitch(0.0);
        engine.set_tempo(0.0);
        engine.set_rate(-1.0);
        engine.set_pitch(f64::NAN);
        engine.set_tempo(f64::INFINITY);
        assert_eq!(engine.pitch(), 1.0);
        assert_eq!(engine.virtual_tempo(), 1.25);
        assert_eq!(engine.virtual_rate(), 1.0);
        assert_eq!(engine.stretcher().tempo(), 1.25);
        assert_eq!(engine.transposer().rate(), 1.0);

        engine.put_samples(&sine_block(8000));
        engine.process();
        assert!(engine.frames_available() > 0);
    }

    #[test]
    fn test_flush_without_input_is_noop() {
        let mut engine = Engine::new();
        engine.flush();
        assert_eq!(engine.frames_available(), 0);
    }

    #[test]
    fn test_clear_keeps_parameters() {
        let mut engine = Engine::new();
        engine.set_tempo(0.7);
        engine.put_samples(&sine_block(6000));
        engine.process();
        engine.clear();
        assert_eq!(engine.frames_available(), 0);
        assert_eq!(engine.unprocessed_frames(), 0);
        assert_eq!(engine.virtual_tempo(), 0.7);
    }

    #[test]
    fn test_clone_parameters_folds_pitch() {
        let mut engine = Engine::new();
        engine.set_pitch(2.0);
        engine.set_tempo(1.5);
        engine.set_seek_strategy(SeekStrategy::Exhaustive);
        engine.set_sample_rate(48000);

        let clone = engine.clone_parameters();
        assert_eq!(clone.pitch(), 1.0);
        assert!((clone.virtual_rate() - 2.0).abs() < 1e-12);
        assert!((clone.virtual_tempo() - 0.75).abs() < 1e-12);
        assert!((clone.rate() - engine.rate()).abs() < 1e-12);
        assert!((clone.tempo() - engine.tempo()).abs() < 1e-12);
        assert_eq!(clone.stretch_settings().sample_rate, 48000);
        assert_eq!(clone.stretcher().seek_strategy(), SeekStrategy::Exhaustive);
    }
}
