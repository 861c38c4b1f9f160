//! Flat `key=value` persistence.
//!
//! Keys are `section.name`. Blank lines, `#`/`;` comments and `[section]`
//! headers are skipped. Unknown keys and malformed values are logged and
//! leave the default in place.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::settings::{Settings, TargetingMode};

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = fs::read_to_string(&path)?;
    debug!("Loaded settings from {}", path.as_ref().display());
    Ok(parse_settings(&content))
}

pub fn save_settings<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<()> {
    fs::write(path, serialize_settings(settings))?;
    Ok(())
}

pub fn parse_settings(content: &str) -> Settings {
    let mut settings = Settings::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('[')
        {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            warn!("settings line {}: expected key=value, got '{}'", index + 1, line);
            continue;
        };

        match apply(&mut settings, key.trim(), value.trim()) {
            Ok(true) => {}
            Ok(false) => warn!("settings line {}: unknown key '{}'", index + 1, key.trim()),
            Err(e) => warn!("settings line {}: {}, keeping default", index + 1, e),
        }
    }

    settings
}

pub fn serialize_settings(settings: &Settings) -> String {
    let mut out = String::new();
    let mut section = "";

    for (key, value) in entries(settings) {
        let prefix = key.split('.').next().unwrap_or_default();
        if prefix != section {
            if !section.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", prefix);
            section = prefix;
        }
        let _ = writeln!(out, "{}={}", key, value);
    }

    out
}

fn entries(s: &Settings) -> Vec<(&'static str, String)> {
    vec![
        ("esp.enabled", s.esp.enabled.to_string()),
        ("esp.max_distance", s.esp.max_distance.to_string()),
        ("esp.show_distance", s.esp.show_distance.to_string()),
        ("esp.show_team", s.esp.show_team.to_string()),
        ("esp.show_infantry", s.esp.show_infantry.to_string()),
        ("esp.show_powered_armor", s.esp.show_powered_armor.to_string()),
        ("esp.show_ground_vehicles", s.esp.show_ground_vehicles.to_string()),
        ("esp.show_air_vehicles", s.esp.show_air_vehicles.to_string()),
        ("esp.show_turrets", s.esp.show_turrets.to_string()),
        ("esp.show_others", s.esp.show_others.to_string()),
        ("esp.bullets", s.esp.bullets.to_string()),
        ("targeting.enabled", s.targeting.enabled.to_string()),
        ("targeting.mode", s.targeting.mode.to_string()),
        ("targeting.max_distance", s.targeting.max_distance.to_string()),
        ("targeting.fov", s.targeting.fov.to_string()),
        ("targeting.target_team", s.targeting.target_team.to_string()),
        ("targeting.target_name", s.targeting.target_name.clone()),
        (
            "targeting.ignore_powered_armor",
            s.targeting.ignore_powered_armor.to_string(),
        ),
        ("targeting.ignore_vehicles", s.targeting.ignore_vehicles.to_string()),
        ("harvester.freeze_on_sight", s.harvester.freeze_on_sight.to_string()),
        ("harvester.bullet_ttl_ms", s.harvester.bullet_ttl_ms.to_string()),
        ("harvester.batch_size", s.harvester.batch_size.to_string()),
        ("redirect.enabled", s.redirect.enabled.to_string()),
        ("redirect.target_head", s.redirect.target_head.to_string()),
        ("world.matrix_cache_ms", s.world.matrix_cache_ms.to_string()),
    ]
}

/// Returns `Ok(false)` for an unknown key.
fn apply(s: &mut Settings, key: &str, value: &str) -> Result<bool> {
    match key {
        "esp.enabled" => s.esp.enabled = parse_bool(key, value)?,
        "esp.max_distance" => s.esp.max_distance = parse_distance(key, value)?,
        "esp.show_distance" => s.esp.show_distance = parse_bool(key, value)?,
        "esp.show_team" => s.esp.show_team = parse_bool(key, value)?,
        "esp.show_infantry" => s.esp.show_infantry = parse_bool(key, value)?,
        "esp.show_powered_armor" => s.esp.show_powered_armor = parse_bool(key, value)?,
        "esp.show_ground_vehicles" => s.esp.show_ground_vehicles = parse_bool(key, value)?,
        "esp.show_air_vehicles" => s.esp.show_air_vehicles = parse_bool(key, value)?,
        "esp.show_turrets" => s.esp.show_turrets = parse_bool(key, value)?,
        "esp.show_others" => s.esp.show_others = parse_bool(key, value)?,
        "esp.bullets" => s.esp.bullets = parse_bool(key, value)?,
        "targeting.enabled" => s.targeting.enabled = parse_bool(key, value)?,
        "targeting.mode" => s.targeting.mode = parse_value::<TargetingMode>(key, value)?,
        "targeting.max_distance" => s.targeting.max_distance = parse_distance(key, value)?,
        "targeting.fov" => s.targeting.fov = parse_distance(key, value)?,
        "targeting.target_team" => s.targeting.target_team = parse_bool(key, value)?,
        "targeting.target_name" => s.targeting.target_name = value.to_string(),
        "targeting.ignore_powered_armor" => {
            s.targeting.ignore_powered_armor = parse_bool(key, value)?
        }
        "targeting.ignore_vehicles" => s.targeting.ignore_vehicles = parse_bool(key, value)?,
        "harvester.freeze_on_sight" => s.harvester.freeze_on_sight = parse_bool(key, value)?,
        "harvester.bullet_ttl_ms" => s.harvester.bullet_ttl_ms = parse_value(key, value)?,
        "harvester.batch_size" => {
            let batch: usize = parse_value(key, value)?;
            if batch == 0 {
                return Err(invalid(key, "must be at least 1"));
            }
            s.harvester.batch_size = batch;
        }
        "redirect.enabled" => s.redirect.enabled = parse_bool(key, value)?,
        "redirect.target_head" => s.redirect.target_head = parse_bool(key, value)?,
        "world.matrix_cache_ms" => s.world.matrix_cache_ms = parse_value(key, value)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn invalid(key: &str, message: impl Into<String>) -> Error {
    Error::InvalidSetting {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, format!("'{}' is not a boolean", value))),
    }
}

fn parse_distance(key: &str, value: &str) -> Result<f32> {
    let parsed: f32 = parse_value(key, value)?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(invalid(key, format!("'{}' must be a non-negative number", value)));
    }
    Ok(parsed)
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, format!("'{}': {}", value, e)))
}
