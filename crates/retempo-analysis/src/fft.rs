//! FFT wrapper with windowing functions

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
    /// Blackman-Harris window (better sidelobe suppression)
    BlackmanHarris,
}

impl Window {
    /// Weight of sample `i` in a periodic window of length `n`.
    pub fn weight(&self, i: usize, n: usize) -> f32 {
        let x = 2.0 * PI * i as f32 / n.max(1) as f32;
        match self {
            Window::Rectangular => 1.0,
            Window::Hann => 0.5 - 0.5 * x.cos(),
            Window::Hamming => 0.54 - 0.46 * x.cos(),
            Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            Window::BlackmanHarris => {
                0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos() - 0.01168 * (3.0 * x).cos()
            }
        }
    }

    /// Multiply `buffer` by the window in place.
    pub fn apply(&self, buffer: &mut [f32]) {
        if *self == Window::Rectangular {
            return;
        }
        let n = buffer.len();
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample *= self.weight(i, n);
        }
    }

    /// Sum of the window weights, the gain a full-scale sinusoid sees at its
    /// peak bin (times one half).
    pub fn coherent_gain(&self, size: usize) -> f32 {
        (0..size).map(|i| self.weight(i, size)).sum()
    }
}

/// Planned forward FFT of a fixed size.
pub struct Fft {
    plan: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Plans a forward transform of `size` points.
    pub fn new(size: usize) -> Self {
        let plan = FftPlanner::new().plan_fft_forward(size);
        Self { plan, size }
    }

    /// Transform length in points.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of bins returned by [`forward`](Self::forward): DC to Nyquist.
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Forward transform of real input, zero-padded or truncated to the
    /// transform size. Returns the positive-frequency half.
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.plan.process(&mut buffer);

        buffer.truncate(self.bins());
        buffer
    }

    /// Centre frequency of `bin` at `sample_rate`.
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.size as f32
    }
}

impl std::fmt::Debug for Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}
