//! Preset file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use retempo_core::{
    DEFAULT_FILL_FRAMES, DEFAULT_HISTORY_FRAMES, DEFAULT_OVERLAP_MS, DEFAULT_SAMPLE_RATE, Engine,
    SeekStrategy, Source, StreamFilter, StretchSettings, semitones_to_ratio,
};

use crate::error::ConfigError;

/// Stretcher tuning stored in a preset.
///
/// Leaving `sequence_ms` or `seek_window_ms` out of the file selects the
/// automatic tempo-dependent value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StretchConfig {
    /// Segment length in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_ms: Option<f64>,
    /// Seam search width in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek_window_ms: Option<f64>,
    /// Crossfade length in milliseconds.
    pub overlap_ms: f64,
    /// Coarse-to-fine seam search instead of the exhaustive scan.
    pub quick_seek: bool,
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            sequence_ms: None,
            seek_window_ms: None,
            overlap_ms: DEFAULT_OVERLAP_MS,
            quick_seek: true,
        }
    }
}

impl StretchConfig {
    /// Seek strategy selected by `quick_seek`.
    pub fn seek_strategy(&self) -> SeekStrategy {
        if self.quick_seek {
            SeekStrategy::Quick
        } else {
            SeekStrategy::Exhaustive
        }
    }
}

/// Tempo, pitch and rate settings for a processing run.
///
/// # TOML Format
///
/// ```toml
/// name = "Slow Practice"
/// description = "Three-quarter speed, original pitch"
/// tempo = 0.75
/// sample_rate = 44100
///
/// [stretch]
/// sequence_ms = 60.0
/// overlap_ms = 8.0
/// quick_seek = true
/// ```
///
/// Every field but `name` may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Playback speed without pitch change.
    #[serde(default = "unity")]
    pub tempo: f64,

    /// Playback speed with pitch change.
    #[serde(default = "unity")]
    pub rate: f64,

    /// Pitch ratio.
    #[serde(default = "unity")]
    pub pitch: f64,

    /// Pitch offset in semitones, applied on top of `pitch`.
    #[serde(default)]
    pub pitch_semitones: f64,

    /// Sample rate the stretcher is tuned for; overridden by the input file.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Stretcher tuning.
    #[serde(default)]
    pub stretch: StretchConfig,

    /// Frames of output kept for rewinding.
    #[serde(default = "default_history_frames")]
    pub history_frames: usize,
}

fn unity() -> f64 {
    1.0
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_history_frames() -> usize {
    DEFAULT_HISTORY_FRAMES
}

fn check_ratio(param: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(param, format!("{value} is not a finite number")));
    }
    if value <= 0.0 {
        return Err(ConfigError::invalid(param, format!("{value} must be greater than zero")));
    }
    Ok(())
}

impl Preset {
    /// Create a unity preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tempo: 1.0,
            rate: 1.0,
            pitch: 1.0,
            pitch_semitones: 0.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            stretch: StretchConfig::default(),
            history_frames: DEFAULT_HISTORY_FRAMES,
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tempo.
    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    /// Set the rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the pitch offset in semitones.
    pub fn with_semitones(mut self, semitones: f64) -> Self {
        self.pitch_semitones = semitones;
        self
    }

    /// Set the sample rate hint.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Combined pitch ratio: `pitch × 2^(semitones / 12)`.
    pub fn total_pitch(&self) -> f64 {
        self.pitch * semitones_to_ratio(self.pitch_semitones)
    }

    /// Stretcher settings described by this preset.
    pub fn stretch_settings(&self) -> StretchSettings {
        StretchSettings {
            sample_rate: self.sample_rate,
            sequence_ms: self.stretch.sequence_ms,
            seek_window_ms: self.stretch.seek_window_ms,
            overlap_ms: self.stretch.overlap_ms,
        }
    }

    /// Checks that every value is usable by the engine.
    ///
    /// Ratios and durations must be finite and positive; the semitone offset
    /// must be finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ratio("tempo", self.tempo)?;
        check_ratio("rate", self.rate)?;
        check_ratio("pitch", self.pitch)?;
        if !self.pitch_semitones.is_finite() {
            return Err(ConfigError::invalid("pitch_semitones", "not a finite number"));
        }
        check_ratio("pitch_semitones", self.total_pitch())?;
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be greater than zero"));
        }
        if let Some(ms) = self.stretch.sequence_ms {
            check_ratio("stretch.sequence_ms", ms)?;
        }
        if let Some(ms) = self.stretch.seek_window_ms {
            check_ratio("stretch.seek_window_ms", ms)?;
        }
        check_ratio("stretch.overlap_ms", self.stretch.overlap_ms)?;
        Ok(())
    }

    /// Pushes the preset's settings into an existing engine.
    ///
    /// Does not validate; call [`validate`](Self::validate) first for
    /// untrusted input.
    pub fn apply(&self, engine: &mut Engine) {
        engine.set_stretch_settings(self.stretch_settings());
        engine.set_seek_strategy(self.stretch.seek_strategy());
        engine.set_tempo(self.tempo);
        engine.set_rate(self.rate);
        engine.set_pitch(self.total_pitch());
    }

    /// Validates the preset and builds an engine configured by it.
    pub fn build_engine(&self) -> Result<Engine, ConfigError> {
        self.validate()?;
        let mut engine = Engine::with_settings(self.stretch_settings());
        self.apply(&mut engine);
        Ok(engine)
    }

    /// Validates the preset and builds a stream filter reading from `source`.
    pub fn build_filter<S: Source>(&self, source: S) -> Result<StreamFilter<S>, ConfigError> {
        let engine = self.build_engine()?;
        let mut filter = StreamFilter::new(source, engine).with_history_limit(self.history_frames);
        filter.set_fill_frames(DEFAULT_FILL_FRAMES);
        Ok(filter)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
