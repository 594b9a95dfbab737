//! Configuration loading and parsing
//!
//! The configuration is penetrometer.toml, embedded at build time and
//! parsed by a small no_std reader. build.rs rejects a broken file before
//! it reaches the board, so the fallback in [`load`] only guards against
//! the two drifting apart.

pub mod toml;

use penetrometer_core::config::ControllerConfig;

pub use toml::{parse_config, ParseError};

/// Board-level settings that never reach the controller core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// Supervisor tick period
    pub tick_ms: u32,
    /// Baud rate shared by the Robot, CNC and DCell links
    pub baud: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            baud: 57_600,
        }
    }
}

/// Everything read from penetrometer.toml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareConfig {
    pub board: BoardConfig,
    pub controller: ControllerConfig,
}

/// Parse the embedded configuration, falling back to defaults
pub fn load(embedded: &str) -> FirmwareConfig {
    match parse_config(embedded) {
        Ok(config) => {
            #[cfg(feature = "defmt")]
            defmt::info!("Parsed embedded configuration");
            config
        }
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("Embedded configuration rejected ({}), using defaults", _e);
            FirmwareConfig::default()
        }
    }
}
