//! Platform-specific paths for presets.
//!
//! User presets live under the platform configuration directory:
//! `~/.config/retempo/presets/` on Linux,
//! `~/Library/Application Support/retempo/presets/` on macOS and
//! `%APPDATA%\retempo\presets\` on Windows.
//!
//! # Example
//!
//! ```rust,no_run
//! use retempo_config::paths;
//!
//! if let Some(path) = paths::find_preset("my_preset") {
//!     println!("Found preset at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::{ConfigError, Preset};

const APP_NAME: &str = "retempo";
const PRESETS_SUBDIR: &str = "presets";

/// Returns the user-specific presets directory.
///
/// Falls back to `./retempo/presets` if the config directory cannot be
/// determined.
pub fn user_presets_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join(PRESETS_SUBDIR)
}

/// Creates the user presets directory if needed and returns it.
pub fn ensure_user_presets_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_presets_dir())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// Saves `preset` as `<name>.toml` in the user presets directory.
///
/// Returns the path written. An existing file of the same name is replaced.
pub fn save_user_preset(preset: &Preset, name: &str) -> Result<PathBuf, ConfigError> {
    save_preset_in(preset, name, ensure_user_presets_dir()?)
}

fn save_preset_in(preset: &Preset, name: &str, dir: PathBuf) -> Result<PathBuf, ConfigError> {
    let stem = name.strip_suffix(".toml").unwrap_or(name);
    if stem.is_empty() || stem.contains(['/', '\\']) || stem.starts_with('.') {
        return Err(ConfigError::invalid("name", format!("'{name}' is not a file name")));
    }
    let path = ensure_dir(dir)?.join(format!("{stem}.toml"));
    preset.save(&path)?;
    Ok(path)
}

/// Find a preset file by path or name.
///
/// An existing file path is returned as is. Otherwise `name` (with `.toml`
/// appended when missing) is looked up in the user presets directory.
pub fn find_preset(name: &str) -> Option<PathBuf> {
    find_preset_in(name, &user_presets_dir())
}

fn find_preset_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{name}.toml")
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// Lists `.toml` files in the user presets directory.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_user_presets() -> Vec<PathBuf> {
    list_presets_in_dir(&user_presets_dir())
}

fn list_presets_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut presets: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    presets.sort();
    presets
}

/// Preset name of a file path: its file stem.
///
/// ```rust
/// use retempo_config::paths::preset_name_from_path;
/// use std::path::Path;
///
/// let name = preset_name_from_path(Path::new("/path/to/slow_down.toml"));
/// assert_eq!(name, Some("slow_down".to_string()));
/// ```
pub fn preset_name_from_path(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}
