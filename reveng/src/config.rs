//! Reverse-engineering run configuration (§6.4, §10.3).

use crate::error::{Error, Result};
use compact_str::CompactString;
use regex::Regex;
use std::collections::HashSet;

/// User-facing configuration; validate with [`RevengConfig::build`]
/// before starting a run.
#[derive(Debug, Clone)]
pub struct RevengConfig {
    pub repeats_per_pin: usize,
    pub require_symmetric_toggle: bool,
    pub skip_known_jtag_pins: bool,
    pub skip_power_pins: bool,
    pub only_devices: HashSet<CompactString>,
    pub only_pin_pattern: Option<String>,
}

impl Default for RevengConfig {
    fn default() -> Self {
        RevengConfig {
            repeats_per_pin: 1,
            require_symmetric_toggle: false,
            skip_known_jtag_pins: true,
            skip_power_pins: true,
            only_devices: HashSet::new(),
            only_pin_pattern: None,
        }
    }
}

impl RevengConfig {
    /// Validates the configuration, compiling `only_pin_pattern` into a
    /// [`Regex`] and rejecting `repeats_per_pin == 0`.
    pub fn build(self) -> Result<CompiledConfig> {
        if self.repeats_per_pin == 0 {
            return Err(Error::InvalidConfig(
                "RepeatsPerPin must be >= 1".to_string(),
            ));
        }
        let only_pin_pattern = match &self.only_pin_pattern {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };
        Ok(CompiledConfig {
            repeats_per_pin: self.repeats_per_pin,
            require_symmetric_toggle: self.require_symmetric_toggle,
            skip_known_jtag_pins: self.skip_known_jtag_pins,
            skip_power_pins: self.skip_power_pins,
            only_devices: self.only_devices,
            only_pin_pattern,
        })
    }
}

/// A validated [`RevengConfig`], ready to drive a run.
pub struct CompiledConfig {
    pub repeats_per_pin: usize,
    pub require_symmetric_toggle: bool,
    pub skip_known_jtag_pins: bool,
    pub skip_power_pins: bool,
    pub only_devices: HashSet<CompactString>,
    pub only_pin_pattern: Option<Regex>,
}
