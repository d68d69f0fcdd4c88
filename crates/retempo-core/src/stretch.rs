//! Pitch-preserving time stretcher (overlap-add with seam search).
//!
//! [`Stretcher`] changes the duration of a stereo stream without changing its
//! pitch. The input is cut into segments of `seek_window_length` frames. Each
//! new segment is crossfaded into the tail of the previous one at the offset
//! (within `seek_length` frames) where the two are most alike, and the read
//! cursor then advances by `nominal_skip = tempo * (seek_window_length -
//! overlap_length)` frames. Every work unit emits a constant number of frames
//! while consuming a tempo-dependent number, which is what changes duration.
//!
//! ## Tunables
//!
//! | Setting | Auto value | Meaning |
//! |---------|------------|---------|
//! | `sequence_ms` | 125 ms at tempo 0.5 → 50 ms at tempo 2.0 | Segment length |
//! | `seek_window_ms` | 25 ms at tempo 0.5 → 15 ms at tempo 2.0 | Seam search width |
//! | `overlap_ms` | 8 ms (fixed default) | Crossfade length |
//!
//! Auto values are linear in tempo between those anchors and clamped outside
//! them. A value pinned through [`StretchSettings`] stays fixed across tempo
//! changes.
//!
//! ## Fractional skip
//!
//! Only whole frames can be consumed, so the fractional part of
//! `nominal_skip` is carried in `skip_fract` from one work unit to the next.
//! The long-run average skip therefore equals `nominal_skip` exactly.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::fifo::{CHANNELS, SampleFifo};
use crate::math::{ms_to_frames, round_half_up};
use crate::stage::PipelineStage;

/// Default sample rate assumed until one is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Default crossfade length in milliseconds.
pub const DEFAULT_OVERLAP_MS: f64 = 8.0;

/// Tempo range over which the auto tunables are interpolated.
const AUTO_TEMPO_LOW: f64 = 0.5;
const AUTO_TEMPO_HIGH: f64 = 2.0;

const AUTO_SEQUENCE_AT_LOW: f64 = 125.0;
const AUTO_SEQUENCE_AT_HIGH: f64 = 50.0;
const AUTO_SEQUENCE_K: f64 =
    (AUTO_SEQUENCE_AT_HIGH - AUTO_SEQUENCE_AT_LOW) / (AUTO_TEMPO_HIGH - AUTO_TEMPO_LOW);
const AUTO_SEQUENCE_C: f64 = AUTO_SEQUENCE_AT_LOW - AUTO_SEQUENCE_K * AUTO_TEMPO_LOW;

const AUTO_SEEK_AT_LOW: f64 = 25.0;
const AUTO_SEEK_AT_HIGH: f64 = 15.0;
const AUTO_SEEK_K: f64 =
    (AUTO_SEEK_AT_HIGH - AUTO_SEEK_AT_LOW) / (AUTO_TEMPO_HIGH - AUTO_TEMPO_LOW);
const AUTO_SEEK_C: f64 = AUTO_SEEK_AT_LOW - AUTO_SEEK_K * AUTO_TEMPO_LOW;

/// Smallest crossfade, in frames.
const MIN_OVERLAP_FRAMES: usize = 16;

/// Offset steps for the hierarchical seam search, coarse to fine.
///
/// Each pass is relative to the best offset found by the previous passes.
const QUICK_SEEK_PASSES: [&[isize]; 4] = [
    &[
        124, 186, 248, 310, 372, 434, 496, 558, 620, 682, 744, 806, 868, 930, 992, 1054, 1116,
        1178, 1240, 1302, 1364, 1426, 1488,
    ],
    &[-100, -75, -50, -25, 25, 50, 75, 100],
    &[-20, -15, -10, -5, 5, 10, 15, 20],
    &[-4, -3, -2, -1, 1, 2, 3, 4],
];

/// User-facing stretch tunables.
///
/// `None` for `sequence_ms` or `seek_window_ms` selects the tempo-dependent
/// auto value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchSettings {
    /// Sample rate of the stream in Hz.
    pub sample_rate: u32,
    /// Segment length in milliseconds, or `None` for auto.
    pub sequence_ms: Option<f64>,
    /// Seam search width in milliseconds, or `None` for auto.
    pub seek_window_ms: Option<f64>,
    /// Crossfade length in milliseconds.
    pub overlap_ms: f64,
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sequence_ms: None,
            seek_window_ms: None,
            overlap_ms: DEFAULT_OVERLAP_MS,
        }
    }
}

/// How the seam offset is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekStrategy {
    /// Evaluate every offset in `[0, seek_length)`.
    Exhaustive,
    /// Four coarse-to-fine passes over a fixed offset table.
    #[default]
    Quick,
}

/// Processing state of a [`Stretcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchState {
    /// Waiting for the first `overlap_length` frames to seed the crossfade
    /// partner.
    Priming,
    /// Emitting one segment per work unit.
    Running,
}

/// Overlap-add time stretcher.
///
/// # Example
///
/// ```rust
/// use retempo_core::{PipelineStage, SampleFifo, Stretcher};
///
/// let mut stretcher = Stretcher::new();
/// stretcher.set_tempo(2.0);
///
/// let mut input = SampleFifo::new();
/// let mut output = SampleFifo::new();
/// let tone: Vec<f32> = (0..44100)
///     .flat_map(|i| {
///         let s = (i as f32 * 0.05).sin();
///         [s, s]
///     })
///     .collect();
/// input.append(&tone, 0, 44100);
/// stretcher.process(&mut input, &mut output);
///
/// // Roughly half the consumed input comes out
/// let consumed = 44100 - input.frame_count();
/// assert!(output.frame_count() < consumed);
/// ```
#[derive(Debug, Clone)]
pub struct Stretcher {
    settings: StretchSettings,
    tempo: f64,
    strategy: SeekStrategy,
    state: StretchState,

    sequence_ms: f64,
    seek_window_ms: f64,
    overlap_length: usize,
    seek_window_length: usize,
    seek_length: usize,
    nominal_skip: f64,
    skip_fract: f64,
    sample_req: usize,

    /// Tail of the previous segment, `overlap_length` frames.
    mid_buffer: Vec<f32>,
    /// `mid_buffer` weighted by `i * (overlap_length - i)`.
    ref_buffer: Vec<f32>,
}

impl Default for Stretcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Stretcher {
    /// Creates a stretcher with tempo 1.0 and default settings.
    pub fn new() -> Self {
        Self::with_settings(StretchSettings::default())
    }

    /// Creates a stretcher with tempo 1.0 and the given settings.
    pub fn with_settings(settings: StretchSettings) -> Self {
        let mut stretcher = Self {
            settings: StretchSettings::default(),
            tempo: 1.0,
            strategy: SeekStrategy::default(),
            state: StretchState::Priming,
            sequence_ms: 0.0,
            seek_window_ms: 0.0,
            overlap_length: 0,
            seek_window_length: 0,
            seek_length: 0,
            nominal_skip: 0.0,
            skip_fract: 0.0,
            sample_req: 0,
            mid_buffer: Vec::new(),
            ref_buffer: Vec::new(),
        };
        stretcher.set_parameters(settings);
        stretcher
    }

    /// Current tempo ratio.
    #[inline]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Sets the tempo ratio and recomputes every derived length.
    ///
    /// Resets `skip_fract` to zero.
    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
        self.update_sequence_parameters();

        self.nominal_skip = self.tempo * (self.seek_window_length - self.overlap_length) as f64;
        self.skip_fract = 0.0;
        let int_skip = round_half_up(self.nominal_skip).max(0.0) as usize;
        self.sample_req =
            (int_skip + self.overlap_length).max(self.seek_window_length) + self.seek_length;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "stretch_params: tempo={:.4} sequence={}ms seek={}ms window={} seek_len={} overlap={} skip={:.2} req={}",
            self.tempo,
            self.sequence_ms,
            self.seek_window_ms,
            self.seek_window_length,
            self.seek_length,
            self.overlap_length,
            self.nominal_skip,
            self.sample_req
        );
    }

    /// Replaces the tunables.
    ///
    /// A zero sample rate or a non-positive overlap keeps the previous value.
    /// A non-positive pinned `sequence_ms`/`seek_window_ms` selects auto. The
    /// crossfade buffers are reallocated, and the stretcher re-primes, only
    /// when the overlap length actually changes.
    pub fn set_parameters(&mut self, settings: StretchSettings) {
        if settings.sample_rate > 0 {
            self.settings.sample_rate = settings.sample_rate;
        }
        if settings.overlap_ms > 0.0 {
            self.settings.overlap_ms = settings.overlap_ms;
        }
        self.settings.sequence_ms = settings.sequence_ms.filter(|ms| *ms > 0.0);
        self.settings.seek_window_ms = settings.seek_window_ms.filter(|ms| *ms > 0.0);

        let overlap_length = Self::overlap_frames(self.settings.sample_rate, self.settings.overlap_ms);
        if overlap_length != self.overlap_length {
            self.overlap_length = overlap_length;
            self.mid_buffer = vec![0.0; overlap_length * CHANNELS];
            self.ref_buffer = vec![0.0; overlap_length * CHANNELS];
            self.state = StretchState::Priming;
        }

        self.set_tempo(self.tempo);
    }

    /// The current tunables (pinned values, or `None` where auto).
    #[inline]
    pub fn settings(&self) -> StretchSettings {
        self.settings
    }

    /// Selects the seam search strategy.
    pub fn set_seek_strategy(&mut self, strategy: SeekStrategy) {
        self.strategy = strategy;
    }

    /// Current seam search strategy.
    #[inline]
    pub fn seek_strategy(&self) -> SeekStrategy {
        self.strategy
    }

    /// Processing state.
    #[inline]
    pub fn state(&self) -> StretchState {
        self.state
    }

    /// Resolved segment length in milliseconds.
    #[inline]
    pub fn sequence_ms(&self) -> f64 {
        self.sequence_ms
    }

    /// Resolved seam search width in milliseconds.
    #[inline]
    pub fn seek_window_ms(&self) -> f64 {
        self.seek_window_ms
    }

    /// Crossfade length in frames.
    #[inline]
    pub fn overlap_length(&self) -> usize {
        self.overlap_length
    }

    /// Segment length in frames.
    #[inline]
    pub fn seek_window_length(&self) -> usize {
        self.seek_window_length
    }

    /// Seam search width in frames.
    #[inline]
    pub fn seek_length(&self) -> usize {
        self.seek_length
    }

    /// Ideal (real-valued) input advance per work unit.
    #[inline]
    pub fn nominal_skip(&self) -> f64 {
        self.nominal_skip
    }

    /// Carried fractional part of the input advance, in `[0, 1)`.
    #[inline]
    pub fn skip_fract(&self) -> f64 {
        self.skip_fract
    }

    /// Minimum input frames needed for one work unit.
    #[inline]
    pub fn input_chunk_size(&self) -> usize {
        self.sample_req
    }

    /// Frames emitted per work unit.
    #[inline]
    pub fn output_chunk_size(&self) -> usize {
        self.overlap_length + self.seek_window_length.saturating_sub(2 * self.overlap_length)
    }

    /// Returns a fresh stretcher with the same tempo, tunables and strategy.
    pub fn clone_parameters(&self) -> Self {
        let mut result = Self::with_settings(self.settings);
        result.set_seek_strategy(self.strategy);
        result.set_tempo(self.tempo);
        result
    }

    /// Advances the fractional skip accumulator and returns the whole frames
    /// to consume for this work unit.
    fn take_skip(&mut self) -> usize {
        self.skip_fract += self.nominal_skip;
        let skip = libm::floor(self.skip_fract);
        self.skip_fract -= skip;
        skip as usize
    }

    fn overlap_frames(sample_rate: u32, overlap_ms: f64) -> usize {
        let frames = ms_to_frames(sample_rate, overlap_ms).max(MIN_OVERLAP_FRAMES);
        frames - frames % 8
    }

    fn update_sequence_parameters(&mut self) {
        self.sequence_ms = match self.settings.sequence_ms {
            Some(ms) => ms,
            None => round_half_up(
                (AUTO_SEQUENCE_C + AUTO_SEQUENCE_K * self.tempo)
                    .clamp(AUTO_SEQUENCE_AT_HIGH, AUTO_SEQUENCE_AT_LOW),
            ),
        };
        self.seek_window_ms = match self.settings.seek_window_ms {
            Some(ms) => ms,
            None => round_half_up(
                (AUTO_SEEK_C + AUTO_SEEK_K * self.tempo).clamp(AUTO_SEEK_AT_HIGH, AUTO_SEEK_AT_LOW),
            ),
        };

        // A segment must hold both crossfades.
        self.seek_window_length = ms_to_frames(self.settings.sample_rate, self.sequence_ms)
            .max(2 * self.overlap_length);
        self.seek_length = ms_to_frames(self.settings.sample_rate, self.seek_window_ms);
    }

    /// Weights the crossfade partner so the correlation favours the middle of
    /// the overlap.
    fn prepare_reference(&mut self) {
        let ovl = self.overlap_length;
        for i in 0..ovl {
            let weight = (i * (ovl - i)) as f32;
            let c = CHANNELS * i;
            self.ref_buffer[c] = self.mid_buffer[c] * weight;
            self.ref_buffer[c + 1] = self.mid_buffer[c + 1] * weight;
        }
    }

    /// Stereo cross-correlation of the reference with `input` at `offset`.
    fn correlation(&self, input: &[f32], offset: usize) -> f32 {
        let start = CHANNELS * offset;
        let window = &input[start..start + CHANNELS * self.overlap_length];
        window
            .iter()
            .zip(&self.ref_buffer)
            .skip(CHANNELS)
            .map(|(a, b)| a * b)
            .sum()
    }

    fn seek_exhaustive(&self, input: &[f32]) -> usize {
        let mut best_offset = 0;
        let mut best_correlation = f32::NEG_INFINITY;
        for offset in 0..self.seek_length {
            let correlation = self.correlation(input, offset);
            if correlation > best_correlation {
                best_correlation = correlation;
                best_offset = offset;
            }
        }
        best_offset
    }

    fn seek_quick(&self, input: &[f32]) -> usize {
        let mut best_offset = 0;
        let mut best_correlation = f32::NEG_INFINITY;
        let mut centre = 0isize;
        let seek_length = self.seek_length as isize;

        for pass in QUICK_SEEK_PASSES {
            for step in pass {
                let offset = centre + step;
                if offset >= seek_length {
                    break;
                }
                if offset < 0 {
                    continue;
                }
                let offset = offset as usize;
                let correlation = self.correlation(input, offset);
                if correlation > best_correlation {
                    best_correlation = correlation;
                    best_offset = offset;
                }
            }
            centre = best_offset as isize;
        }
        best_offset
    }

    fn seek_best_offset(&mut self, input: &[f32]) -> usize {
        self.prepare_reference();
        match self.strategy {
            SeekStrategy::Exhaustive => self.seek_exhaustive(input),
            SeekStrategy::Quick => self.seek_quick(input),
        }
    }

    /// Crossfades `mid_buffer` into `input` at `offset`, appending
    /// `overlap_length` frames to `output`.
    fn overlap_mix(&self, input: &[f32], offset: usize, output: &mut SampleFifo) {
        let ovl = self.overlap_length;
        let scale = 1.0 / ovl as f32;
        let dest = output.spare_mut(ovl);
        let src = &input[CHANNELS * offset..];
        for i in 0..ovl {
            let fade_in = i as f32 * scale;
            let fade_out = (ovl - i) as f32 * scale;
            let c = CHANNELS * i;
            dest[c] = src[c] * fade_in + self.mid_buffer[c] * fade_out;
            dest[c + 1] = src[c + 1] * fade_in + self.mid_buffer[c + 1] * fade_out;
        }
        output.commit(ovl);
    }
}

impl PipelineStage for Stretcher {
    /// Runs as many work units as the queued input allows.
    fn process(&mut self, input: &mut SampleFifo, output: &mut SampleFifo) {
        if self.state == StretchState::Priming {
            if input.frame_count() < self.overlap_length {
                return;
            }
            input.drain(&mut self.mid_buffer, self.overlap_length);
            self.state = StretchState::Running;
        }

        if self.nominal_skip <= 0.0 {
            return;
        }

        let ovl = self.overlap_length;
        while input.frame_count() >= self.sample_req {
            let offset = self.seek_best_offset(input.as_slice());

            self.overlap_mix(input.as_slice(), offset, output);

            let copy_through = self.seek_window_length.saturating_sub(2 * ovl);
            if copy_through > 0 {
                output.append_from(input, offset + ovl, copy_through);
            }

            let tail = CHANNELS * (offset + self.seek_window_length - ovl);
            self.mid_buffer
                .copy_from_slice(&input.as_slice()[tail..tail + CHANNELS * ovl]);

            let skip = self.take_skip();
            input.consume(skip);
        }
    }

    /// Returns to [`StretchState::Priming`] and zeroes `skip_fract`.
    fn reset(&mut self) {
        self.state = StretchState::Priming;
        self.skip_fract = 0.0;
        self.mid_buffer.fill(0.0);
    }
}
