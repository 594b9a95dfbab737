//! Minimal TOML reader for penetrometer.toml
//!
//! Handles only the flat subset the configuration uses:
//!
//! - `[section]` headers
//! - `key = value` pairs with integer or boolean values
//! - Comments (# ...), whole-line or trailing
//!
//! Everything else is rejected. Parsing needs no heap.

use penetrometer_core::config::{ControllerConfig, FORCE_LIMIT_MAX, FORCE_LIMIT_MIN};

use super::{BoardConfig, FirmwareConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Key not known in its section
    UnknownKey,
    /// Value has the wrong type or does not fit
    InvalidValue,
    /// Values parse but contradict each other
    OutOfRange,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Board,
    Timeouts,
    Probe,
    Limits,
    Units,
}

/// Parse penetrometer.toml on top of the built-in defaults
pub fn parse_config(input: &str) -> Result<FirmwareConfig, ParseError> {
    let mut config = FirmwareConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        match section {
            Section::Root => return Err(ParseError::UnknownKey),
            Section::Board => apply_board(&mut config.board, key, value)?,
            Section::Timeouts | Section::Probe | Section::Limits | Section::Units => {
                apply_controller(&mut config.controller, section, key, value)?
            }
        }
    }

    validate(&config)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "board" => Ok(Section::Board),
        "timeouts" => Ok(Section::Timeouts),
        "probe" => Ok(Section::Probe),
        "limits" => Ok(Section::Limits),
        "units" => Ok(Section::Units),
        _ => Err(ParseError::InvalidSection),
    }
}

fn apply_board(board: &mut BoardConfig, key: &str, value: &str) -> Result<(), ParseError> {
    match key {
        "tick_ms" => board.tick_ms = parse_int(value)?,
        "baud" => board.baud = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn apply_controller(
    config: &mut ControllerConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ParseError> {
    let timeouts = &mut config.timeouts;
    let probe = &mut config.probe;
    let limits = &mut config.limits;
    let units = &mut config.units;

    match (section, key) {
        (Section::Timeouts, "cnc_ticks") => timeouts.cnc_ticks = parse_int(value)?,
        (Section::Timeouts, "dcell_ticks") => timeouts.dcell_ticks = parse_int(value)?,
        (Section::Timeouts, "robot_watchdog_ticks") => {
            timeouts.robot_watchdog_ticks = parse_int(value)?
        }
        (Section::Timeouts, "home_ticks") => timeouts.home_ticks = parse_int(value)?,
        (Section::Timeouts, "motion_start_ticks") => {
            timeouts.motion_start_ticks = parse_int(value)?
        }

        (Section::Probe, "ground_level") => probe.ground_level = parse_int(value)?,
        (Section::Probe, "probe_depth") => probe.probe_depth = parse_int(value)?,
        (Section::Probe, "max_force") => probe.max_force = parse_int(value)?,
        (Section::Probe, "min_force") => probe.min_force = parse_int(value)?,
        (Section::Probe, "max_force_delta") => probe.max_force_delta = parse_int(value)?,
        (Section::Probe, "min_force_delta") => probe.min_force_delta = parse_int(value)?,
        (Section::Probe, "force_delta_abs") => probe.force_delta_abs = parse_bool(value)?,
        (Section::Probe, "safe_disconnect") => probe.safe_disconnect = parse_bool(value)?,
        (Section::Probe, "lfd_tolerance") => probe.lfd_tolerance = parse_int(value)?,
        (Section::Probe, "lag_compensation") => probe.lag_compensation = parse_bool(value)?,

        (Section::Limits, "steps_per_x_min") => limits.steps_per_x_min = parse_int(value)?,
        (Section::Limits, "steps_per_x_max") => limits.steps_per_x_max = parse_int(value)?,
        (Section::Limits, "force_min") => limits.force_min = parse_int(value)?,
        (Section::Limits, "force_max") => limits.force_max = parse_int(value)?,

        (Section::Units, "steps_per_mm") => units.steps_per_mm = parse_int(value)?,
        (Section::Units, "steps_per_dmm") => units.steps_per_dmm = parse_int(value)?,

        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}

fn validate(config: &FirmwareConfig) -> Result<(), ParseError> {
    let board = &config.board;
    let c = &config.controller;
    let in_force_range = |v: i32| (FORCE_LIMIT_MIN..=FORCE_LIMIT_MAX).contains(&v);

    let ok = board.tick_ms > 0
        && board.baud > 0
        && c.timeouts.cnc_ticks > 0
        && c.timeouts.dcell_ticks > 0
        && c.timeouts.robot_watchdog_ticks > 0
        && c.timeouts.home_ticks > 0
        && c.units.steps_per_mm > 0
        && c.units.steps_per_dmm > 0
        && c.probe.ground_level >= 0
        && c.probe.probe_depth >= 0
        && c.limits.steps_per_x_min > 0
        && c.limits.steps_per_x_min <= c.limits.steps_per_x_max
        && in_force_range(c.limits.force_min)
        && in_force_range(c.limits.force_max)
        && c.limits.force_min <= c.limits.force_max
        && c.probe.min_force <= c.probe.max_force
        && c.probe.min_force_delta <= c.probe.max_force_delta
        && [
            c.probe.max_force,
            c.probe.min_force,
            c.probe.max_force_delta,
            c.probe.min_force_delta,
        ]
        .into_iter()
        .all(in_force_range);

    if ok {
        Ok(())
    } else {
        Err(ParseError::OutOfRange)
    }
}

/// Parse a key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    let value = match value.find('#') {
        Some(hash_pos) => value[..hash_pos].trim(),
        None => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse an integer value, allowing `_` separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let mut digits = heapless::String::<24>::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}
