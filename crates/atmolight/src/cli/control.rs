//! Target control subcommands — connect, color, effect, power, groups, room.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;

use atmolight_lib::command::ColorCommand;

use super::{
    AtmoError, Config, ContentEffect, RUNNING, Result, SharedEffect, TargetArg,
    TargetEvent, TargetHandler, color, connect_and_wait, load_config, open_target,
};

/// Event/phase poll interval for `connect`.
const HOLD_POLL: Duration = Duration::from_millis(250);

/// Open `target`, connect, run `action`, then shut the handler down.
///
/// `action` returns whether the command was accepted for sending.
fn with_connection(
    config: &Config,
    target: TargetArg,
    effect: ContentEffect,
    action: impl FnOnce(&TargetHandler) -> bool,
) -> Result<()> {
    let mut handler = open_target(config, target, &SharedEffect::new(effect), None)?;
    let result = connect_and_wait(&handler).and_then(|()| {
        if action(&handler) {
            Ok(())
        } else {
            Err(AtmoError::Config(format!(
                "{} rejected the command (not connected)",
                handler.id()
            )))
        }
    });
    handler.dispose();
    result
}

pub(super) fn cmd_connect(
    config_path: Option<&Path>,
    target: TargetArg,
    effect: ContentEffect,
) -> Result<()> {
    let config = load_config(config_path);
    let (tx, rx) = mpsc::channel();
    let shared = SharedEffect::new(effect);
    let mut handler = open_target(&config, target, &shared, Some(tx))?;

    println!("AtmoLight — holding connection to {}.", handler.id());
    println!("  Effect: {effect}");
    println!("Press Ctrl+C to exit.");
    println!();

    handler.initialise(false);
    let mut last = None;
    while RUNNING.load(Ordering::SeqCst) {
        let phase = handler.phase();
        if last != Some(phase) {
            println!("[{}] {phase}", handler.id());
            last = Some(phase);
        }
        match rx.recv_timeout(HOLD_POLL) {
            Ok(TargetEvent::ConnectionLost(id)) => {
                println!("[{id}] connection lost, retries exhausted");
                // Keep trying, like an orchestrator would on its next tick
                handler.reinitialise(true);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    println!();
    println!("Disconnecting...");
    handler.dispose();
    println!("Done.");
    Ok(())
}

pub(super) fn cmd_color(
    config_path: Option<&Path>,
    target: TargetArg,
    value: &str,
    priority: u8,
    brightness: u8,
) -> Result<()> {
    let config = load_config(config_path);
    let rgb = color::parse_color(value)?;
    let cmd = ColorCommand::new(rgb, priority, brightness);
    with_connection(&config, target, ContentEffect::Undefined, |h| {
        h.change_color(cmd)
    })?;
    println!("Sent {} (priority {priority})", color::format_color(rgb));
    Ok(())
}

pub(super) fn cmd_effect(
    config_path: Option<&Path>,
    target: TargetArg,
    effect: ContentEffect,
) -> Result<()> {
    let config = load_config(config_path);
    // The connect sequence already applies the selected effect once.
    with_connection(&config, target, effect, |h| h.change_effect(effect))?;
    println!("Applied {effect}");
    Ok(())
}

pub(super) fn cmd_power(config_path: Option<&Path>, on: bool) -> Result<()> {
    let config = load_config(config_path);
    with_connection(&config, TargetArg::Hue, ContentEffect::Undefined, |h| {
        h.power(on)
    })?;
    println!("Bridge power {}", if on { "on" } else { "off" });
    Ok(())
}

pub(super) fn cmd_group(config_path: Option<&Path>, name: &str) -> Result<()> {
    let config = load_config(config_path);
    with_connection(&config, TargetArg::Hue, ContentEffect::Undefined, |h| {
        h.set_active_group(name)
    })?;
    println!("Active group: {name}");
    Ok(())
}

pub(super) fn cmd_group_color(config_path: Option<&Path>, group: &str, name: &str) -> Result<()> {
    let config = load_config(config_path);
    with_connection(&config, TargetArg::Hue, ContentEffect::Undefined, |h| {
        h.set_group_static_color(group, name)
    })?;
    println!("Group {group} -> {name}");
    Ok(())
}

pub(super) fn cmd_room(config_path: Option<&Path>, name: &str) -> Result<()> {
    let config = load_config(config_path);
    with_connection(&config, TargetArg::Hue, ContentEffect::Undefined, |h| {
        h.set_room(name)
    })?;
    println!("Room: {name}");
    Ok(())
}
