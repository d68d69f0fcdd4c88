//! Preset listing command.

use clap::Args;
use retempo_config::{
    Preset, factory_presets, list_user_presets, save_user_preset, user_presets_dir,
};

use super::common::load_preset;

#[derive(Args)]
pub struct PresetsArgs {
    /// Preset name or path to print as TOML; lists all presets when omitted
    name: Option<String>,

    /// Copy the named preset into the user presets directory under this name
    #[arg(long, value_name = "NAME", requires = "name")]
    save: Option<String>,
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    if let Some(name) = args.name {
        let preset = load_preset(&name)?;
        match args.save {
            Some(target) => {
                let path = save_user_preset(&preset, &target)?;
                println!("Saved '{}' to {}", preset.name, path.display());
            }
            None => print!("{}", preset.to_toml()?),
        }
        return Ok(());
    }

    println!("Factory presets:");
    for preset in factory_presets() {
        print_summary(&preset);
    }

    let user = list_user_presets();
    println!("\nUser presets ({}):", user_presets_dir().display());
    if user.is_empty() {
        println!("  (none)");
    }
    for path in user {
        match Preset::load(&path) {
            Ok(preset) => print_summary(&preset),
            Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
        }
    }

    Ok(())
}

fn print_summary(preset: &Preset) {
    println!(
        "  {:<16} tempo {:<5} rate {:<5} pitch {:<+6.2}st  {}",
        preset.name,
        preset.tempo,
        preset.rate,
        12.0 * preset.total_pitch().log2(),
        preset.description.as_deref().unwrap_or("")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: PresetsArgs,
    }

    #[test]
    fn save_requires_a_preset_name() {
        assert!(Wrapper::try_parse_from(["presets", "--save", "mine"]).is_err());

        let parsed = Wrapper::try_parse_from(["presets", "octave_up", "--save", "mine"]).unwrap();
        assert_eq!(parsed.args.name.as_deref(), Some("octave_up"));
        assert_eq!(parsed.args.save.as_deref(), Some("mine"));
    }
}
