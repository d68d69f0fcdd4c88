//! Integration tests for retempo-io WAV I/O, streaming and rendering.

use retempo_core::{Engine, Source, StreamFilter};
use retempo_io::{
    WavFormat, WavSource, WavSpec, read_wav_info, read_wav_interleaved, render, render_to_wav,
    write_wav_interleaved,
};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate interleaved stereo sine, right channel phase-inverted.
fn stereo_sine(sample_rate: u32, freq_hz: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .flat_map(|i| {
            let s = (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin() * 0.8;
            [s, -s]
        })
        .collect()
}

fn write_temp(samples: &[f32], spec: WavSpec) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    write_wav_interleaved(file.path(), samples, spec).unwrap();
    file
}

fn count_crossings(interleaved: &[f32]) -> usize {
    interleaved
        .iter()
        .step_by(2)
        .collect::<Vec<_>>()
        .windows(2)
        .filter(|w| *w[0] < 0.0 && *w[1] >= 0.0)
        .count()
}

// ---------------------------------------------------------------------------
// WAV roundtrip tests
// ---------------------------------------------------------------------------

#[test]
fn wav_roundtrip_i24_48000() {
    let samples = stereo_sine(48000, 1000.0, 4800);
    let spec = WavSpec {
        channels: 2,
        sample_rate: 48000,
        bits_per_sample: 24,
    };
    let file = write_temp(&samples, spec);

    let (loaded, loaded_spec) = read_wav_interleaved(file.path()).unwrap();
    assert_eq!(loaded_spec, spec);
    assert_eq!(loaded.len(), samples.len());
    for (a, b) in samples.iter().zip(loaded.iter()) {
        assert!((a - b).abs() < 1e-5, "sample mismatch: {a} vs {b}");
    }
}

#[test]
fn wav_i16_clamps_full_scale() {
    let samples = vec![1.5, -1.5, 1.0, -1.0];
    let file = write_temp(&samples, WavSpec::default());

    let (loaded, _) = read_wav_interleaved(file.path()).unwrap();
    assert!(loaded[0] < 1.0 && loaded[0] > 0.999);
    assert_eq!(loaded[1], -1.0);
}

#[test]
fn wav_info_float_format() {
    let spec = WavSpec {
        bits_per_sample: 32,
        sample_rate: 22050,
        ..WavSpec::default()
    };
    let file = write_temp(&stereo_sine(22050, 300.0, 22050), spec);

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.format, WavFormat::IeeeFloat);
    assert_eq!(info.sample_rate, 22050);
    assert_eq!(info.num_frames, 22050);
    assert!((info.duration_secs - 1.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Streaming source
// ---------------------------------------------------------------------------

#[test]
fn wav_source_matches_whole_file_read() {
    let samples = stereo_sine(44100, 441.0, 9000);
    let file = write_temp(&samples, WavSpec::default());
    let (whole, _) = read_wav_interleaved(file.path()).unwrap();

    let mut source = WavSource::open(file.path()).unwrap();
    let mut streamed = Vec::new();
    let mut buf = vec![0.0; 2 * 1234];
    let mut position = 0;
    loop {
        let n = source.extract(&mut buf, 1234, position);
        if n == 0 {
            break;
        }
        streamed.extend_from_slice(&buf[..2 * n]);
        position += n;
    }
    assert_eq!(streamed, whole);
}

#[test]
fn wav_source_random_access() {
    let spec = WavSpec {
        bits_per_sample: 32,
        ..WavSpec::default()
    };
    let samples = stereo_sine(44100, 100.0, 5000);
    let file = write_temp(&samples, spec);
    let mut source = WavSource::open(file.path()).unwrap();

    let mut buf = vec![0.0; 2 * 16];
    for position in [4000, 10, 2500, 4990] {
        let n = source.extract(&mut buf, 16, position);
        assert_eq!(n, 16.min(5000 - position));
        assert_eq!(&buf[..2 * n], &samples[2 * position..2 * (position + n)]);
    }
}

// ---------------------------------------------------------------------------
// Rendering through the engine
// ---------------------------------------------------------------------------

#[test]
fn render_file_to_file_slower_tempo() {
    let input = write_temp(&stereo_sine(44100, 441.0, 44100), WavSpec::default());
    let output = NamedTempFile::new().unwrap();

    let source = WavSource::open(input.path()).unwrap();
    let mut engine = Engine::new();
    engine.set_sample_rate(source.sample_rate());
    engine.set_tempo(0.5);
    let mut filter = StreamFilter::new(source, engine);

    let written = render_to_wav(&mut filter, output.path(), WavSpec::default(), 4096).unwrap();
    assert!((written as i64 - 88200).abs() <= 1);

    let info = read_wav_info(output.path()).unwrap();
    assert_eq!(info.num_frames as usize, written);

    // Same pitch over twice the duration. The flushed tail is padded with
    // silence, so only the leading 80000 frames are counted.
    let (rendered, _) = read_wav_interleaved(output.path()).unwrap();
    let crossings = count_crossings(&rendered[..2 * 80_000]);
    assert!((crossings as i64 - 800).abs() < 20, "crossings {crossings}");
}

#[test]
fn render_pitch_shift_from_streamed_source() {
    let spec = WavSpec {
        bits_per_sample: 32,
        ..WavSpec::default()
    };
    let input = write_temp(&stereo_sine(44100, 441.0, 44100), spec);

    let mut engine = Engine::new();
    engine.set_pitch_semitones(-12.0);
    let mut filter = StreamFilter::new(WavSource::open(input.path()).unwrap(), engine);
    let out = render(&mut filter, 1000);

    assert!((out.len() as i64 / 2 - 44100).abs() <= 1);
    let crossings = count_crossings(&out);
    assert!((crossings as i64 - 220).abs() < 10, "crossings {crossings}");
}
