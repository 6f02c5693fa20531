//! `config` subcommand: show, locate, validate and write the configuration.

use std::path::Path;

use super::{
    AtmoError, ConfigOutput, Result, ValidateOutput, color, config_path, kv, kv_indent, kv_width,
    load_config, print_json,
};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let path = config_path(custom_path);
    let exists = path.as_ref().is_some_and(|p| p.exists());

    if json {
        return print_json(&ConfigOutput {
            config_file: path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: exists,
            settings: config,
        });
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "hue_ip:",
            "hue_path:",
            "hue_reconnect_delay_ms:",
            "hue_min_color_difference:",
            "hue_bridge_disable_on_suspend:",
            "usbdeview_path:",
        ],
    );

    match &path {
        Some(p) if exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Hue:");
    kv_indent("hue_ip:", &config.hue_ip, w);
    kv_indent("hue_port:", config.hue_port, w);
    let helper = if config.hue_path.is_empty() {
        "(not set)"
    } else {
        config.hue_path.as_str()
    };
    kv_indent("hue_path:", helper, w);
    kv_indent("hue_start:", config.hue_start, w);
    kv_indent("hue_is_remote_machine:", config.hue_is_remote_machine, w);
    kv_indent("hue_reconnect_attempts:", config.hue_reconnect_attempts, w);
    kv_indent("hue_reconnect_delay_ms:", config.hue_reconnect_delay_ms, w);
    kv_indent(
        "hue_min_color_difference:",
        config.hue_min_color_difference,
        w,
    );
    kv_indent(
        "hue_bridge_enable_on_resume:",
        config.hue_bridge_enable_on_resume,
        w,
    );
    kv_indent(
        "hue_bridge_disable_on_suspend:",
        config.hue_bridge_disable_on_suspend,
        w,
    );
    println!();

    println!("Colors:");
    let color_display = match color::parse_color(&config.static_color) {
        Ok(c) => format!("{} -> {}", config.static_color, color::format_color(c)),
        Err(_) => format!("{} (invalid)", config.static_color),
    };
    kv_indent("static_color:", &color_display, w);
    kv_indent("min_diversion:", config.min_diversion, w);
    kv_indent("reinit_on_error:", config.reinit_on_error, w);
    println!();

    println!("Serial:");
    kv_indent("atmowin_port:", &config.atmowin_port, w);
    kv_indent("atmowin_baud_rate:", config.atmowin_baud_rate, w);
    kv_indent("atmowin_wake_helper:", config.atmowin_wake_helper, w);
    kv_indent("usbdeview_path:", &config.usbdeview_path, w);
    Ok(())
}

pub(super) fn cmd_config_path(custom_path: Option<&Path>) -> Result<()> {
    match config_path(custom_path) {
        Some(p) => {
            println!("{}", p.display());
            Ok(())
        }
        None => Err(AtmoError::Config("no config directory on this platform".into())),
    }
}

pub(super) fn cmd_config_init(custom_path: Option<&Path>, force: bool) -> Result<()> {
    let Some(path) = config_path(custom_path) else {
        return Err(AtmoError::Config("no config directory on this platform".into()));
    };
    if path.exists() && !force {
        return Err(AtmoError::Config(format!(
            "{} already exists (use --force to rewrite it)",
            path.display()
        )));
    }
    // Existing values survive a rewrite; missing keys get their defaults.
    let config = load_config(Some(&path));
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub(super) fn cmd_validate(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let errors: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errs) => errs.iter().map(ToString::to_string).collect(),
    };

    if json {
        print_json(&ValidateOutput {
            valid: errors.is_empty(),
            errors: errors.clone(),
        })?;
    } else if errors.is_empty() {
        println!("Configuration is valid.");
    } else {
        for e in &errors {
            println!("  - {e}");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AtmoError::Config(format!(
            "{} problem(s) found",
            errors.len()
        )))
    }
}
