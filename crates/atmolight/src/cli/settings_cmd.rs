//! `groups` / `static-colors` subcommands — list names from the helper settings.

use std::path::{Path, PathBuf};

use atmolight_lib::settings;

use super::{AtmoError, NamesOutput, Result, load_config, print_json};

fn helper_path(config_path: Option<&Path>) -> Result<PathBuf> {
    let config = load_config(config_path);
    if config.hue_path.trim().is_empty() {
        return Err(AtmoError::Config(
            "hue_path is not set; point it at AtmoHue.exe".into(),
        ));
    }
    Ok(PathBuf::from(config.hue_path.trim()))
}

fn print_names(helper: &Path, names: Vec<String>, what: &str, json: bool) -> Result<()> {
    let file = settings::settings_path(helper);
    if json {
        return print_json(&NamesOutput {
            settings_file: file.display().to_string(),
            count: names.len(),
            names,
        });
    }
    if names.is_empty() {
        println!("No {what} found in {}", file.display());
        return Ok(());
    }
    println!("{} {what} in {}:", names.len(), file.display());
    for name in &names {
        println!("  {name}");
    }
    Ok(())
}

pub(super) fn cmd_groups(config_path: Option<&Path>, json: bool) -> Result<()> {
    let helper = helper_path(config_path)?;
    print_names(&helper, settings::load_groups(&helper), "groups", json)
}

pub(super) fn cmd_static_colors(config_path: Option<&Path>, json: bool) -> Result<()> {
    let helper = helper_path(config_path)?;
    print_names(
        &helper,
        settings::load_static_colors(&helper),
        "static colors",
        json,
    )
}
