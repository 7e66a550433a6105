//! Endstop assignment and polarity.

use serde::Deserialize;

/// Electrical level at which a switch reports "triggered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerLevel {
    /// Triggered when the input reads high.
    #[default]
    High,
    /// Triggered when the input reads low (normally-closed wiring).
    Low,
}

/// One endstop switch attached to an axis end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EndstopConfig {
    /// Switch input number, 1-based. `0` keeps the end's homing role
    /// without a wired switch.
    pub switch: u8,

    /// Polarity of the switch input.
    #[serde(default)]
    pub trigger: TriggerLevel,

    /// Whether this end is the axis' homing reference.
    #[serde(default)]
    pub homing: bool,
}

impl EndstopConfig {
    /// Create a new endstop configuration.
    pub fn new(switch: u8, trigger: TriggerLevel, homing: bool) -> Self {
        Self {
            switch,
            trigger,
            homing,
        }
    }

    /// True if a switch input is assigned.
    #[inline]
    pub fn is_wired(&self) -> bool {
        self.switch != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_wiring() {
        let endstop: EndstopConfig = toml::from_str("switch = 2").unwrap();
        assert_eq!(endstop, EndstopConfig::new(2, TriggerLevel::High, false));
        assert!(endstop.is_wired());
        assert!(!EndstopConfig::new(0, TriggerLevel::Low, true).is_wired());
    }
}
