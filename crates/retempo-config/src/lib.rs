//! Preset management for the retempo engine.
//!
//! A preset is a small TOML file holding tempo, pitch and rate along with
//! the stretcher tuning. This crate loads, validates and saves presets,
//! ships a set of factory presets, and turns a preset into a configured
//! [`retempo_core::Engine`].
//!
//! # Example
//!
//! ```rust,no_run
//! use retempo_config::{Preset, paths};
//!
//! let preset = Preset::new("Slower")
//!     .with_description("Ten percent slower")
//!     .with_tempo(0.9);
//! preset.validate().unwrap();
//!
//! let path = paths::user_presets_dir().join("slower.toml");
//! preset.save(&path).unwrap();
//!
//! let engine = Preset::load(&path).unwrap().build_engine().unwrap();
//! ```

mod error;
mod preset;

/// Factory presets bundled with the library.
pub mod factory_presets;

/// Platform-specific paths for presets.
pub mod paths;

pub use error::ConfigError;
pub use factory_presets::{FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset};
pub use paths::{
    ensure_user_presets_dir, find_preset, list_user_presets, save_user_preset, user_presets_dir,
};
pub use preset::{Preset, StretchConfig};
