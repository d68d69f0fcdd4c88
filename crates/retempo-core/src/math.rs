//! Ratio and time conversions for the parameter surface.
//!
//! # Pitch
//!
//! - [`octaves_to_ratio`] / [`semitones_to_ratio`] - musical interval to
//!   frequency ratio
//! - [`percent_to_ratio`] - "+25 %" style change to a multiplicative ratio
//!
//! # Time
//!
//! - [`ms_to_frames`] - milliseconds to whole frames (floored)
//! - [`round_half_up`] - `floor(x + 0.5)`, used for the auto tunables
//!
//! All functions are allocation-free and `no_std`.

use core::f64::consts::LN_2;

/// Converts an interval in octaves to a frequency ratio.
///
/// # Example
/// ```rust
/// use retempo_core::octaves_to_ratio;
///
/// assert!((octaves_to_ratio(1.0) - 2.0).abs() < 1e-12);
/// assert!((octaves_to_ratio(-1.0) - 0.5).abs() < 1e-12);
/// ```
#[inline]
pub fn octaves_to_ratio(octaves: f64) -> f64 {
    libm::exp(LN_2 * octaves)
}

/// Converts an interval in semitones to a frequency ratio.
///
/// # Example
/// ```rust
/// use retempo_core::semitones_to_ratio;
///
/// assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-12);
/// assert!((semitones_to_ratio(7.0) - 1.4983).abs() < 1e-4);
/// ```
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    octaves_to_ratio(semitones / 12.0)
}

/// Converts a percentage change (`-50.0` = half, `100.0` = double) to a ratio.
#[inline]
pub fn percent_to_ratio(percent: f64) -> f64 {
    1.0 + 0.01 * percent
}

/// Converts a duration in milliseconds to whole frames at `sample_rate`.
///
/// # Example
/// ```rust
/// use retempo_core::ms_to_frames;
///
/// assert_eq!(ms_to_frames(44100, 100.0), 4410);
/// assert_eq!(ms_to_frames(44100, 8.0), 352);
/// ```
#[inline]
pub fn ms_to_frames(sample_rate: u32, ms: f64) -> usize {
    let frames = libm::floor(f64::from(sample_rate) * ms / 1000.0);
    if frames > 0.0 { frames as usize } else { 0 }
}

/// Rounds to the nearest integer, halves upward.
#[inline]
pub fn round_half_up(x: f64) -> f64 {
    libm::floor(x + 0.5)
}
