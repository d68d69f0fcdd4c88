//! Test signals and simple time-domain measurements.

use std::f32::consts::PI;

/// Interleaved stereo sine of `seconds` duration at `freq` Hz.
///
/// Both channels carry the same signal.
pub fn sine_stereo(sample_rate: u32, freq: f32, seconds: f32, amplitude: f32) -> Vec<f32> {
    let frames = (seconds * sample_rate as f32).round() as usize;
    let step = 2.0 * PI * freq / sample_rate as f32;
    (0..frames)
        .flat_map(|i| {
            let s = amplitude * (step * i as f32).sin();
            [s, s]
        })
        .collect()
}

/// Left channel of an interleaved stereo buffer.
pub fn left_channel(interleaved: &[f32]) -> Vec<f32> {
    interleaved.iter().step_by(2).copied().collect()
}

/// Root mean square level. Zero for an empty signal.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    (sum_sq / signal.len() as f64).sqrt() as f32
}

/// Level in dBFS for a linear RMS value, floored at -120 dB.
pub fn rms_db(signal: &[f32]) -> f32 {
    20.0 * rms(signal).max(1e-6).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_stereo_length() {
        let s = sine_stereo(44100, 440.0, 0.5, 0.8);
        assert_eq!(s.len(), 2 * 22050);
        assert_eq!(s[100], s[101]);
    }

    #[test]
    fn test_rms_of_sine() {
        let s = left_channel(&sine_stereo(48000, 1000.0, 1.0, 1.0));
        assert!((rms(&s) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_rms_empty() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms_db(&[]) + 120.0).abs() < 1e-3);
    }
}
