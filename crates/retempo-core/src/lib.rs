//! Retempo Core - streaming tempo, pitch and rate changes for stereo audio
//!
//! This crate changes the playback tempo, the pitch and the sample rate of an
//! interleaved stereo stream independently, in real time, with no allocation
//! once buffers have reached their steady sizes.
//!
//! # Core Abstractions
//!
//! ## Transport
//!
//! - [`SampleFifo`] - Growable, self-compacting queue of interleaved frames
//! - [`PipelineStage`] - Object-safe trait for a stage between two FIFOs
//!
//! ## Stages
//!
//! - [`RateTransposer`] - Linear-interpolation resampler (changes pitch and
//!   duration together)
//! - [`Stretcher`] - Overlap-add time stretcher with correlation seam search
//!   (changes duration, keeps pitch)
//!
//! ## Orchestration
//!
//! - [`Engine`] - Owns both stages and their FIFOs, maps pitch/rate/tempo to
//!   stage settings and picks the stage order
//! - [`StreamFilter`] - Pulls frames from a [`Source`] on demand and keeps a
//!   rewindable output history
//! - [`BufferSource`] - In-memory [`Source`]
//!
//! ## Utilities
//!
//! - Ratio helpers: [`octaves_to_ratio`], [`semitones_to_ratio`],
//!   [`percent_to_ratio`], [`ms_to_frames`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (it needs `alloc`). Disable the default
//! `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! retempo-core = { version = "0.1", default-features = false }
//! ```
//!
//! The optional `tracing` feature logs parameter changes, chain rewiring and
//! flushes at debug level, and buffer growth at trace level.
//!
//! # Example
//!
//! ```rust
//! use retempo_core::{BufferSource, Engine, StreamFilter};
//!
//! let tone: Vec<f32> = (0..22050).map(|i| (i as f32 * 0.05).sin()).collect();
//!
//! let mut engine = Engine::new();
//! engine.set_tempo(0.8);
//! engine.set_pitch_semitones(2.0);
//!
//! let mut filter = StreamFilter::new(BufferSource::from_mono(&tone), engine);
//! let mut block = vec![0.0f32; 2 * 512];
//! let mut frames = 0;
//! loop {
//!     let n = filter.extract(&mut block, 512);
//!     if n == 0 {
//!         break;
//!     }
//!     frames += n;
//! }
//! assert!((frames as i64 - 27563).abs() <= 1);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: steady-state processing does not allocate
//! - **No dependencies on std**: `no_std` + `alloc`, `libm` for math
//! - **Frames everywhere**: every count and offset in the API is in frames

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod engine;
pub mod error;
pub mod fifo;
pub mod filter;
pub mod math;
pub mod source;
pub mod stage;
pub mod stretch;
pub mod transposer;

// Re-export main types at crate root
pub use engine::{BufferSlot, ChainOrder, Engine, StageWiring};
pub use error::PositionError;
pub use fifo::{CHANNELS, SampleFifo};
pub use filter::{DEFAULT_FILL_FRAMES, DEFAULT_HISTORY_FRAMES, PositionObserver, StreamFilter};
pub use math::{ms_to_frames, octaves_to_ratio, percent_to_ratio, round_half_up, semitones_to_ratio};
pub use source::{BufferSource, Source};
pub use stage::PipelineStage;
pub use stretch::{
    DEFAULT_OVERLAP_MS, DEFAULT_SAMPLE_RATE, SeekStrategy, StretchSettings, StretchState, Stretcher,
};
pub use transposer::RateTransposer;
