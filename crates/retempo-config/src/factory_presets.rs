//! Factory presets bundled with the library.
//!
//! These are embedded at compile time and always available without external
//! files. Lookup accepts either the internal identifier or the display name,
//! case-insensitively.

use crate::Preset;

/// Internal identifiers of the factory presets.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "unity",
    "slow_practice",
    "half_speed",
    "fast_forward",
    "octave_up",
    "octave_down",
    "nightcore",
    "speech",
];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("unity", UNITY_PRESET),
    ("slow_practice", SLOW_PRACTICE_PRESET),
    ("half_speed", HALF_SPEED_PRESET),
    ("fast_forward", FAST_FORWARD_PRESET),
    ("octave_up", OCTAVE_UP_PRESET),
    ("octave_down", OCTAVE_DOWN_PRESET),
    ("nightcore", NIGHTCORE_PRESET),
    ("speech", SPEECH_PRESET),
];

const UNITY_PRESET: &str = r#"
name = "Unity"
description = "No change; useful as a starting point"
"#;

const SLOW_PRACTICE_PRESET: &str = r#"
name = "Slow Practice"
description = "Three-quarter speed at the original pitch"
tempo = 0.75
"#;

const HALF_SPEED_PRESET: &str = r#"
name = "Half Speed"
description = "Half speed at the original pitch, with longer segments"
tempo = 0.5

[stretch]
sequence_ms = 100.0
seek_window_ms = 25.0
"#;

const FAST_FORWARD_PRESET: &str = r#"
name = "Fast Forward"
description = "One and a half times faster at the original pitch"
tempo = 1.5
"#;

const OCTAVE_UP_PRESET: &str = r#"
name = "Octave Up"
description = "Pitch up twelve semitones, duration unchanged"
pitch_semitones = 12.0
"#;

const OCTAVE_DOWN_PRESET: &str = r#"
name = "Octave Down"
description = "Pitch down twelve semitones, duration unchanged"
pitch_semitones = -12.0
"#;

const NIGHTCORE_PRESET: &str = r#"
name = "Nightcore"
description = "Faster playback with raised pitch"
rate = 1.25
pitch_semitones = 1.0
"#;

const SPEECH_PRESET: &str = r#"
name = "Speech"
description = "Short segments tuned for spoken voice"
tempo = 1.2

[stretch]
sequence_ms = 40.0
seek_window_ms = 15.0
overlap_ms = 8.0
"#;

/// Parses every factory preset.
///
/// Presets that fail to parse are skipped; the test suite guarantees none do.
pub fn factory_presets() -> Vec<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .collect()
}

/// Looks up a factory preset by identifier or display name, ignoring case.
///
/// # Example
///
/// ```rust
/// use retempo_config::get_factory_preset;
///
/// let preset = get_factory_preset("Slow Practice").unwrap();
/// assert_eq!(preset.tempo, 0.75);
/// assert!(get_factory_preset("nonexistent").is_none());
/// ```
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    let wanted = name.to_lowercase();

    if let Some((_, toml)) = FACTORY_PRESETS_TOML.iter().find(|(id, _)| *id == wanted) {
        return Preset::from_toml(toml).ok();
    }

    factory_presets()
        .into_iter()
        .find(|preset| preset.name.to_lowercase() == wanted)
}

/// Returns true if `name` names a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_factory_presets_valid() {
        for (id, toml) in FACTORY_PRESETS_TOML {
            let result = Preset::from_toml(toml);
            assert!(result.is_ok(), "factory preset '{id}' should parse: {result:?}");

            let preset = result.unwrap();
            assert!(preset.description.is_some(), "preset '{id}' should have a description");
            assert!(preset.validate().is_ok(), "preset '{id}' should validate");
        }
        assert_eq!(factory_presets().len(), FACTORY_PRESET_NAMES.len());
    }

    #[test]
    fn test_names_match_table() {
        let ids: Vec<&str> = FACTORY_PRESETS_TOML.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, FACTORY_PRESET_NAMES);
    }

    #[test]
    fn test_get_factory_preset() {
        let preset = get_factory_preset("octave_up").expect("octave_up should exist");
        assert_eq!(preset.name, "Octave Up");
        assert!((preset.total_pitch() - 2.0).abs() < 1e-12);

        let preset = get_factory_preset("HALF SPEED").expect("display name lookup");
        assert_eq!(preset.tempo, 0.5);
        assert_eq!(preset.stretch.sequence_ms, Some(100.0));

        assert!(get_factory_preset("nonexistent").is_none());
    }

    #[test]
    fn test_is_factory_preset() {
        assert!(is_factory_preset("speech"));
        assert!(is_factory_preset("Nightcore"));
        assert!(!is_factory_preset("my_custom_preset"));
    }

    #[test]
    fn test_unity_builds_identity_engine() {
        let engine = get_factory_preset("unity").unwrap().build_engine().unwrap();
        assert_eq!(engine.rate(), 1.0);
        assert_eq!(engine.tempo(), 1.0);
    }
}
