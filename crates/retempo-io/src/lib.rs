//! Audio file I/O for the retempo engine.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_wav_interleaved`] and [`write_wav_interleaved`]
//!   for loading/saving whole files as interleaved stereo
//! - **Streaming input**: [`WavSource`], a [`retempo_core::Source`] that
//!   decodes only the frames the filter asks for
//! - **Offline rendering**: [`render`] and [`render_to_wav`] drain a
//!   [`retempo_core::StreamFilter`] to memory or to disk
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retempo_core::{Engine, StreamFilter};
//! use retempo_io::{WavSource, WavSpec, render_to_wav};
//!
//! let source = WavSource::open("input.wav")?;
//! let spec = WavSpec { sample_rate: source.sample_rate(), ..WavSpec::default() };
//!
//! let mut engine = Engine::new();
//! engine.set_sample_rate(spec.sample_rate);
//! engine.set_tempo(0.9);
//!
//! let mut filter = StreamFilter::new(source, engine);
//! render_to_wav(&mut filter, "output.wav", spec, 4096)?;
//! ```

mod render;
mod source;
mod wav;

pub use render::{render, render_to_wav};
pub use source::WavSource;
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav_info, read_wav_interleaved, write_wav_interleaved};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
