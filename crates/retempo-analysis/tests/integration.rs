//! Integration tests for retempo-analysis.
//!
//! Runs tones through the retempo engine and checks the results in the
//! frequency domain: tempo changes keep the dominant frequency, pitch changes
//! move it by the requested ratio, and durations follow tempo and rate.

use retempo_analysis::fft::{Fft, Window};
use retempo_analysis::{dominant_frequency, left_channel, magnitude_spectrum, rms, sine_stereo};
use retempo_core::{BufferSource, Engine, StreamFilter};

const SAMPLE_RATE: u32 = 44100;
const FFT_SIZE: usize = 8192;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render a whole interleaved buffer through `engine`.
fn process(input: Vec<f32>, engine: Engine) -> Vec<f32> {
    let mut filter = StreamFilter::new(BufferSource::from_interleaved(input), engine);
    let mut out = Vec::new();
    let mut block = vec![0.0; 2 * 1024];
    loop {
        let n = filter.extract(&mut block, 1024);
        if n == 0 {
            break;
        }
        out.extend_from_slice(&block[..2 * n]);
    }
    out
}

/// Dominant frequency of the left channel, measured away from the edges.
fn measure(interleaved: &[f32]) -> f32 {
    let left = left_channel(interleaved);
    let start = left.len().saturating_sub(FFT_SIZE) / 2;
    dominant_frequency(&left[start..], SAMPLE_RATE as f32, FFT_SIZE).unwrap()
}

// ===========================================================================
// 1. FFT sanity
// ===========================================================================

#[test]
fn fft_peak_matches_input_frequency() {
    let freq_hz = 1000.0;
    let signal = left_channel(&sine_stereo(48000, freq_hz, 0.5, 1.0));
    let fft = Fft::new(FFT_SIZE);
    let spectrum = fft.forward(&signal);

    let peak_bin = spectrum
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
        .map(|(i, _)| i)
        .unwrap();
    let peak_freq = fft.bin_frequency(peak_bin, 48000.0);
    assert!((peak_freq - freq_hz).abs() < 48000.0 / FFT_SIZE as f32);
}

#[test]
fn hann_amplitude_matches_coherent_gain() {
    let spectrum = magnitude_spectrum(
        &left_channel(&sine_stereo(SAMPLE_RATE, 441.0, 0.5, 1.0)),
        FFT_SIZE,
        Window::Hann,
    );
    let peak = spectrum.iter().copied().fold(0.0f32, f32::max);
    let expected = Window::Hann.coherent_gain(FFT_SIZE) / 2.0;
    // Scalloping loss of a Hann window is at most 1.42 dB
    assert!(peak <= expected * 1.01 && peak >= expected * 0.84, "peak {peak} expected {expected}");
}

// ===========================================================================
// 2. End-to-end through the engine
// ===========================================================================

#[test]
fn tempo_two_halves_duration_keeps_frequency() {
    let input = sine_stereo(SAMPLE_RATE, 441.0, 1.0, 0.8);
    let before = measure(&input);

    let mut engine = Engine::new();
    engine.set_tempo(2.0);
    let output = process(input, engine);

    let seconds = output.len() as f32 / 2.0 / SAMPLE_RATE as f32;
    assert!((seconds - 0.5).abs() < 0.001, "duration {seconds}");

    let after = measure(&output);
    assert!((after - before).abs() < before * 0.01, "{before} -> {after}");
}

#[test]
fn tempo_slower_keeps_frequency_and_level() {
    let input = sine_stereo(SAMPLE_RATE, 660.0, 1.0, 0.5);
    let mut engine = Engine::new();
    engine.set_tempo(0.75);
    let output = process(input.clone(), engine);

    assert!((output.len() as i64 / 2 - 58800).abs() <= 1);
    assert!((measure(&output) - 660.0).abs() < 660.0 * 0.01);

    let level = rms(&left_channel(&output)) / rms(&left_channel(&input));
    assert!((level - 1.0).abs() < 0.1, "level ratio {level}");
}

#[test]
fn octave_up_doubles_frequency_at_same_duration() {
    let input = sine_stereo(SAMPLE_RATE, 441.0, 1.0, 0.8);
    let mut engine = Engine::new();
    engine.set_pitch_semitones(12.0);
    let output = process(input, engine);

    assert!((output.len() as i64 / 2 - 44100).abs() <= 1);
    let freq = measure(&output);
    assert!((freq - 882.0).abs() < 882.0 * 0.01, "freq {freq}");
}

#[test]
fn fifth_down_scales_frequency() {
    let input = sine_stereo(SAMPLE_RATE, 600.0, 1.0, 0.8);
    let mut engine = Engine::new();
    engine.set_pitch_semitones(-7.0);
    let output = process(input, engine);

    let expected = 600.0 * 2f32.powf(-7.0 / 12.0);
    let freq = measure(&output);
    assert!((freq - expected).abs() < expected * 0.01, "freq {freq} expected {expected}");
}

#[test]
fn rate_moves_pitch_and_duration_together() {
    let input = sine_stereo(SAMPLE_RATE, 500.0, 1.0, 0.8);
    let mut engine = Engine::new();
    engine.set_rate(1.25);
    let output = process(input, engine);

    assert!((output.len() as i64 / 2 - 35280).abs() <= 1);
    let freq = measure(&output);
    assert!((freq - 625.0).abs() < 625.0 * 0.01, "freq {freq}");
}
