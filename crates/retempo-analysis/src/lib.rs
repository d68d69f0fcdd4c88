//! Retempo Analysis - spectral checks for tempo and pitch processing
//!
//! This crate measures what the engine did to a signal:
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectrum`] - Magnitude spectrum, peak picking, dominant frequency and
//!   spectral centroid
//! - [`signal`] - Test tones and RMS level
//!
//! ## Example
//!
//! ```rust
//! use retempo_analysis::{dominant_frequency, left_channel, sine_stereo};
//!
//! let tone = sine_stereo(44100, 441.0, 0.5, 0.8);
//! let freq = dominant_frequency(&left_channel(&tone), 44100.0, 8192).unwrap();
//! assert!((freq - 441.0).abs() < 1.0);
//! ```

pub mod fft;
pub mod signal;
pub mod spectrum;

// Re-export main types
pub use fft::{Fft, Window};
pub use signal::{left_channel, rms, rms_db, sine_stereo};
pub use spectrum::{dominant_frequency, find_peaks, magnitude_spectrum, spectral_centroid};
