//! Linear-interpolation rate transposer.
//!
//! [`RateTransposer`] resamples a stereo stream by an arbitrary real factor.
//! A `rate` above 1.0 produces fewer output frames than input frames (the
//! stream plays faster and higher), below 1.0 produces more. Pitch is *not*
//! preserved here; that is the [`Stretcher`](crate::Stretcher)'s job.
//!
//! The phase accumulator and the last input frame are carried across calls,
//! so block boundaries are invisible in the output. The stage introduces one
//! frame of latency: the first emitted frame of a fresh transposer is the
//! (silent) initial history frame.

use crate::fifo::{CHANNELS, SampleFifo};
use crate::stage::PipelineStage;

/// Resamples its input by `rate` using linear interpolation.
///
/// # Example
///
/// ```rust
/// use retempo_core::{PipelineStage, RateTransposer, SampleFifo};
///
/// let mut transposer = RateTransposer::new();
/// transposer.set_rate(2.0);
///
/// let mut input = SampleFifo::new();
/// let mut output = SampleFifo::new();
/// input.append(&vec![0.5; 2000], 0, 1000);
/// transposer.process(&mut input, &mut output);
///
/// assert!(input.is_empty());
/// assert!((output.frame_count() as i64 - 500).abs() <= 1);
/// ```
#[derive(Debug, Clone)]
pub struct RateTransposer {
    rate: f64,
    /// Fractional read position relative to the previous input frame.
    slope: f64,
    prev_l: f32,
    prev_r: f32,
}

impl Default for RateTransposer {
    fn default() -> Self {
        Self::new()
    }
}

impl RateTransposer {
    /// Creates a transposer with `rate = 1.0`.
    pub fn new() -> Self {
        Self {
            rate: 1.0,
            slope: 0.0,
            prev_l: 0.0,
            prev_r: 0.0,
        }
    }

    /// Current resampling factor.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Sets the resampling factor (input frames advanced per output frame).
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Returns a fresh transposer with the same rate and no history.
    pub fn clone_parameters(&self) -> Self {
        let mut result = Self::new();
        result.set_rate(self.rate);
        result
    }

    /// Upper bound on the frames [`transpose`](Self::transpose) emits for
    /// `frames` input frames.
    fn max_output_frames(&self, frames: usize) -> usize {
        // One frame per `rate` of input span, plus the carried fraction.
        libm::ceil(frames as f64 / self.rate) as usize + 2
    }

    /// Interpolates the first `frames` frames of `src` into `dest`.
    ///
    /// Returns the number of frames written. `src` and `dest` are
    /// interleaved; `dest` must hold [`max_output_frames`] frames.
    fn transpose(&mut self, src: &[f32], dest: &mut [f32], frames: usize) -> usize {
        if frames == 0 {
            return 0;
        }

        let mut i = 0;

        // Bridge from the last frame of the previous call to the first frame
        // of this one.
        while self.slope < 1.0 {
            let t = self.slope as f32;
            dest[CHANNELS * i] = (1.0 - t) * self.prev_l + t * src[0];
            dest[CHANNELS * i + 1] = (1.0 - t) * self.prev_r + t * src[1];
            i += 1;
            self.slope += self.rate;
        }
        self.slope -= 1.0;

        if frames > 1 {
            let mut used = 0;
            'outer: loop {
                while self.slope > 1.0 {
                    self.slope -= 1.0;
                    used += 1;
                    if used >= frames - 1 {
                        break 'outer;
                    }
                }

                let t = self.slope as f32;
                let s = CHANNELS * used;
                dest[CHANNELS * i] = (1.0 - t) * src[s] + t * src[s + 2];
                dest[CHANNELS * i + 1] = (1.0 - t) * src[s + 1] + t * src[s + 3];
                i += 1;
                self.slope += self.rate;
            }
        }

        let last = CHANNELS * (frames - 1);
        self.prev_l = src[last];
        self.prev_r = src[last + 1];

        i
    }
}

impl PipelineStage for RateTransposer {
    /// Resamples every queued input frame.
    fn process(&mut self, input: &mut SampleFifo, output: &mut SampleFifo) {
        let frames = input.frame_count();
        // A non-positive rate never advances through the input
        if frames == 0 || self.rate.is_nan() || self.rate <= 0.0 {
            return;
        }
        let max_out = self.max_output_frames(frames);
        let written = {
            let dest = output.spare_mut(max_out);
            self.transpose(input.as_slice(), dest, frames)
        };
        output.commit(written);
        input.consume(frames);
    }

    fn reset(&mut self) {
        self.slope = 0.0;
        self.prev_l = 0.0;
        self.prev_r = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_ramp(frames: usize) -> Vec<f32> {
        (0..frames).flat_map(|i| [i as f32, -(i as f32)]).collect()
    }

    fn run(transposer: &mut RateTransposer, samples: &[f32]) -> SampleFifo {
        let mut input = SampleFifo::new();
        let mut output = SampleFifo::new();
        input.append(samples, 0, samples.len() / CHANNELS);
        transposer.process(&mut input, &mut output);
        assert!(input.is_empty());
        output
    }

    #[test]
    fn test_zero_rate_leaves_input_queued() {
        let mut transposer = RateTransposer::new();
        transposer.set_rate(0.0);
        let mut input = SampleFifo::new();
        let mut output = SampleFifo::new();
        input.append(&stereo_ramp(64), 0, 64);
        transposer.process(&mut input, &mut output);
        assert_eq!(input.frame_count(), 64);
        assert!(output.is_empty());
    }

    #[test]
    fn test_unity_rate_delays_by_one_frame() {
        let mut transposer = RateTransposer::new();
        let output = run(&mut transposer, &stereo_ramp(8));

        // Silent history frame, then the input unchanged
        assert_eq!(output.frame_count(), 9);
        assert_eq!(output.frame(0), Some((0.0, 0.0)));
        for i in 0..8 {
            assert_eq!(output.frame(i + 1), Some((i as f32, -(i as f32))));
        }
    }

    #[test]
    fn test_unity_rate_continuous_across_calls() {
        let mut transposer = RateTransposer::new();
        let ramp = stereo_ramp(16);
        let first = run(&mut transposer, &ramp[..16]);
        let second = run(&mut transposer, &ramp[16..]);

        assert_eq!(first.frame_count() + second.frame_count(), 17);
        assert_eq!(second.frame(0), Some((8.0, -8.0)));
        assert_eq!(second.frame(7), Some((15.0, -15.0)));
    }

    #[test]
    fn test_half_rate_interpolates_midpoints() {
        let mut transposer = RateTransposer::new();
        transposer.set_rate(0.5);
        let output = run(&mut transposer, &stereo_ramp(4));

        // Two bridge frames from the silent history, then half-frame steps
        let left: Vec<f32> = (0..output.frame_count())
            .map(|i| output.frame(i).unwrap().0)
            .collect();
        assert_eq!(&left[..2], &[0.0, 0.0]);
        assert_eq!(&left[2..], &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_single_frame_input() {
        let mut transposer = RateTransposer::new();
        transposer.set_rate(0.25);
        let output = run(&mut transposer, &[1.0, 1.0]);
        assert_eq!(output.frame_count(), 4);
        assert_eq!(output.frame(3), Some((0.75, 0.75)));
    }

    #[test]
    fn test_empty_input_is_noop() {
        let mut transposer = RateTransposer::new();
        let mut input = SampleFifo::new();
        let mut output = SampleFifo::new();
        transposer.process(&mut input, &mut output);
        assert!(output.is_empty());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut transposer = RateTransposer::new();
        transposer.set_rate(0.7);
        run(&mut transposer, &stereo_ramp(10));
        transposer.reset();
        let output = run(&mut transposer, &[4.0, 4.0, 4.0, 4.0]);
        assert_eq!(output.frame(0), Some((0.0, 0.0)));
    }

    #[test]
    fn test_clone_parameters_keeps_rate_only() {
        let mut transposer = RateTransposer::new();
        transposer.set_rate(1.5);
        run(&mut transposer, &stereo_ramp(10));
        let clone = transposer.clone_parameters();
        assert_eq!(clone.rate(), 1.5);
        assert_eq!(clone.slope, 0.0);
        assert_eq!(clone.prev_l, 0.0);
    }
}
