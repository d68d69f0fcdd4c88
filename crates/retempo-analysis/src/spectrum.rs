//! Spectral measurements used to check pitch and tempo results.

use crate::fft::{Fft, Window};

/// Magnitude spectrum of the first `fft_size` samples of `signal`.
///
/// Shorter signals are zero-padded. Returns `fft_size / 2 + 1` bins.
pub fn magnitude_spectrum(signal: &[f32], fft_size: usize, window: Window) -> Vec<f32> {
    let fft = Fft::new(fft_size);

    let mut windowed: Vec<f32> = signal.iter().take(fft_size).copied().collect();
    windowed.resize(fft_size, 0.0);
    window.apply(&mut windowed);

    fft.forward(&windowed).iter().map(|c| c.norm()).collect()
}

fn bin_width(spectrum: &[f32], sample_rate: f32) -> f32 {
    let fft_size = spectrum.len().saturating_sub(1) * 2;
    sample_rate / fft_size.max(1) as f32
}

/// Spectral centroid (magnitude-weighted mean frequency) in Hz.
///
/// Returns 0 for a silent spectrum.
pub fn spectral_centroid(spectrum: &[f32], sample_rate: f32) -> f32 {
    let width = bin_width(spectrum, sample_rate);

    let (weighted_sum, magnitude_sum) = spectrum
        .iter()
        .enumerate()
        .fold((0.0f32, 0.0f32), |(w, m), (i, &mag)| (w + i as f32 * width * mag, m + mag));

    if magnitude_sum > 1e-10 {
        weighted_sum / magnitude_sum
    } else {
        0.0
    }
}

/// Local maxima of `spectrum` above `threshold_db` (relative to a linear
/// magnitude of 1), at least `min_distance_hz` apart.
///
/// Returns `(frequency, magnitude)` pairs, strongest first. When two peaks
/// are closer than `min_distance_hz` the stronger one wins.
pub fn find_peaks(
    spectrum: &[f32],
    sample_rate: f32,
    threshold_db: f32,
    min_distance_hz: f32,
) -> Vec<(f32, f32)> {
    if spectrum.len() < 3 {
        return Vec::new();
    }
    let width = bin_width(spectrum, sample_rate);
    let threshold_linear = 10.0_f32.powf(threshold_db / 20.0);

    let mut candidates: Vec<(f32, f32)> = spectrum
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > threshold_linear && w[1] > w[0] && w[1] >= w[2])
        .map(|(i, w)| ((i + 1) as f32 * width, w[1]))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut peaks: Vec<(f32, f32)> = Vec::new();
    for (freq, mag) in candidates {
        if peaks.iter().all(|(f, _)| (f - freq).abs() >= min_distance_hz) {
            peaks.push((freq, mag));
        }
    }
    peaks
}

/// Frequency of the strongest spectral component of `signal`, in Hz.
///
/// Uses a Hann-windowed FFT of `fft_size` points and refines the peak bin by
/// fitting a parabola through it and its neighbours. Returns `None` when the
/// signal is silent.
pub fn dominant_frequency(signal: &[f32], sample_rate: f32, fft_size: usize) -> Option<f32> {
    let spectrum = magnitude_spectrum(signal, fft_size, Window::Hann);
    let (peak, &peak_mag) = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if peak_mag <= 1e-6 {
        return None;
    }

    let width = bin_width(&spectrum, sample_rate);
    if peak + 1 >= spectrum.len() {
        return Some(peak as f32 * width);
    }

    // Parabolic interpolation on log magnitudes
    let a = spectrum[peak - 1].max(1e-12).ln();
    let b = peak_mag.ln();
    let c = spectrum[peak + 1].max(1e-12).ln();
    let denom = a - 2.0 * b + c;
    let offset = if denom.abs() > 1e-12 {
        (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    Some((peak as f32 + offset) * width)
}
