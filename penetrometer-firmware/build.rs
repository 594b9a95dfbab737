//! Build script for penetrometer-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates penetrometer.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "penetrometer.toml";

/// Accepted value for a key
enum Kind {
    Int(i64, i64),
    Bool,
}

/// Every key the firmware's parser understands
const SCHEMA: &[(&str, &[(&str, Kind)])] = &[
    (
        "board",
        &[
            ("tick_ms", Kind::Int(1, 1000)),
            ("baud", Kind::Int(1200, 921_600)),
        ],
    ),
    (
        "timeouts",
        &[
            ("cnc_ticks", Kind::Int(1, u32::MAX as i64)),
            ("dcell_ticks", Kind::Int(1, u32::MAX as i64)),
            ("robot_watchdog_ticks", Kind::Int(1, u32::MAX as i64)),
            ("home_ticks", Kind::Int(1, u32::MAX as i64)),
            ("motion_start_ticks", Kind::Int(0, u32::MAX as i64)),
        ],
    ),
    (
        "probe",
        &[
            ("ground_level", Kind::Int(0, i32::MAX as i64)),
            ("probe_depth", Kind::Int(0, i32::MAX as i64)),
            ("max_force", Kind::Int(-10_000, 10_000)),
            ("min_force", Kind::Int(-10_000, 10_000)),
            ("max_force_delta", Kind::Int(-10_000, 10_000)),
            ("min_force_delta", Kind::Int(-10_000, 10_000)),
            ("force_delta_abs", Kind::Bool),
            ("safe_disconnect", Kind::Bool),
            ("lfd_tolerance", Kind::Int(0, 255)),
            ("lag_compensation", Kind::Bool),
        ],
    ),
    (
        "limits",
        &[
            ("steps_per_x_min", Kind::Int(1, i32::MAX as i64)),
            ("steps_per_x_max", Kind::Int(1, i32::MAX as i64)),
            ("force_min", Kind::Int(-10_000, 10_000)),
            ("force_max", Kind::Int(-10_000, 10_000)),
        ],
    ),
    (
        "units",
        &[
            ("steps_per_mm", Kind::Int(1, i32::MAX as i64)),
            ("steps_per_dmm", Kind::Int(1, i32::MAX as i64)),
        ],
    ),
];

/// Pairs that must satisfy `low <= high` when both are given
const ORDERED: &[(&str, &str, &str)] = &[
    ("probe", "min_force", "max_force"),
    ("probe", "min_force_delta", "max_force_delta"),
    ("limits", "steps_per_x_min", "steps_per_x_max"),
    ("limits", "force_min", "force_max"),
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate penetrometer.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed={CONFIG_FILE}");

    let config_path = Path::new(CONFIG_FILE);
    if !config_path.exists() {
        report(
            "penetrometer.toml not found",
            &["The firmware embeds penetrometer.toml from the crate directory.".to_string()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => report("Failed to read penetrometer.toml", &[e.to_string()]),
    };

    let config: toml::Table = match content.parse() {
        Ok(table) => table,
        Err(e) => report(
            "Invalid TOML syntax in penetrometer.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    validate_keys(&config, &mut errors);
    validate_ordering(&config, &mut errors);
    if !errors.is_empty() {
        report("Invalid values in penetrometer.toml", &errors);
    }

    println!("cargo:warning=penetrometer.toml validated successfully");
}

fn validate_keys(config: &toml::Table, errors: &mut Vec<String>) {
    for (section, value) in config {
        let Some((_, keys)) = SCHEMA.iter().find(|(name, _)| name == section) else {
            errors.push(format!("unknown section [{section}]"));
            continue;
        };
        let Some(table) = value.as_table() else {
            errors.push(format!("[{section}] must be a table"));
            continue;
        };

        for (key, value) in table {
            let Some((_, kind)) = keys.iter().find(|(name, _)| name == key) else {
                errors.push(format!("[{section}] unknown key '{key}'"));
                continue;
            };
            match (kind, value) {
                (Kind::Bool, toml::Value::Boolean(_)) => {}
                (Kind::Int(min, max), toml::Value::Integer(n)) => {
                    if n < min || n > max {
                        errors.push(format!("[{section}] {key} must be {min}..={max}"));
                    }
                }
                (Kind::Bool, _) => errors.push(format!("[{section}] {key} must be true/false")),
                (Kind::Int(..), _) => errors.push(format!("[{section}] {key} must be an integer")),
            }
        }
    }
}

fn validate_ordering(config: &toml::Table, errors: &mut Vec<String>) {
    let int = |section: &str, key: &str| {
        config
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(toml::Value::as_integer)
    };

    for (section, low, high) in ORDERED {
        if let (Some(l), Some(h)) = (int(section, low), int(section, high)) {
            if l > h {
                errors.push(format!("[{section}] {low} ({l}) exceeds {high} ({h})"));
            }
        }
    }
}

/// Abort the build with a boxed error listing
fn report(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.clone()
            };
            format!("║  • {truncated:<62} ║")
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {title:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {body}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n"
    );
}
