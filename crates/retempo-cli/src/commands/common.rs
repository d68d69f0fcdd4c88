//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use retempo_config::{Preset, find_preset, get_factory_preset};

/// Load a preset by name or path.
///
/// Factory presets are tried first, then files in the user presets
/// directory, then `name` as a file path.
pub fn load_preset(name: &str) -> anyhow::Result<Preset> {
    if let Some(preset) = get_factory_preset(name) {
        return Ok(preset);
    }

    if let Some(path) = find_preset(name) {
        return Preset::load(&path).with_context(|| format!("loading preset {}", path.display()));
    }

    anyhow::bail!("Preset '{name}' not found. Use 'retempo presets' to see available presets.")
}

/// Formats seconds as `m:ss`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Converts a linear level to dBFS, floored at -120 dB.
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-6 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
