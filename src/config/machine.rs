//! Machine configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use crate::axis::{AxesRegister, Axis, N_AXES};

use super::axis::AxisConfig;
use super::mapping::MotorMapping;
use super::units::MmPerSec;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Global feedrate multiplier. Must be > 0.
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f32,

    /// Reject motion until the machine has been homed with `G28`.
    #[serde(default)]
    pub require_homing: bool,

    /// Enforce per-axis soft limits.
    #[serde(default = "default_range_check")]
    pub range_check: bool,

    /// Order in which axes are homed by `G28`.
    #[serde(default = "default_home_order")]
    pub home_order: String<16>,

    /// Motor channel to axis assignment, see [`MotorMapping`].
    pub axis_mapping: String<16>,

    /// Feedrate used by moves before any `F` word was seen.
    #[serde(default = "default_feedrate")]
    pub default_feedrate: MmPerSec,

    /// Wait for the queue to drain after every instruction.
    #[serde(default)]
    pub synchronous: bool,

    /// Log every planned segment.
    #[serde(default)]
    pub debug_print: bool,

    /// Per-axis configuration keyed by axis letter.
    pub axes: FnvIndexMap<String<8>, AxisConfig, 16>,
}

fn default_speed_factor() -> f32 {
    1.0
}

fn default_range_check() -> bool {
    true
}

fn default_home_order() -> String<16> {
    String::try_from("ZXY").unwrap_or_default()
}

fn default_feedrate() -> MmPerSec {
    MmPerSec(10.0)
}

impl MachineConfig {
    /// Create a configuration with defaults and no axes.
    pub fn new(axis_mapping: &str) -> Self {
        Self {
            speed_factor: default_speed_factor(),
            require_homing: false,
            range_check: default_range_check(),
            home_order: default_home_order(),
            axis_mapping: String::try_from(axis_mapping).unwrap_or_default(),
            default_feedrate: default_feedrate(),
            synchronous: false,
            debug_print: false,
            axes: FnvIndexMap::new(),
        }
    }

    /// Builder-style axis registration, mostly for tests and tools.
    #[must_use]
    pub fn with_axis(mut self, axis: Axis, config: AxisConfig) -> Self {
        let mut key = String::new();
        let _ = key.push(axis.letter().to_ascii_lowercase());
        let _ = self.axes.insert(key, config);
        self
    }

    /// Get an axis configuration by axis.
    ///
    /// Table keys are matched case-insensitively.
    pub fn axis(&self, axis: Axis) -> Option<&AxisConfig> {
        self.axes
            .iter()
            .find(|(k, _)| key_axis(k.as_str()) == Some(axis))
            .map(|(_, v)| v)
    }

    /// Mutable access to an axis configuration.
    pub fn axis_mut(&mut self, axis: Axis) -> Option<&mut AxisConfig> {
        self.axes
            .iter_mut()
            .find(|(k, _)| key_axis(k.as_str()) == Some(axis))
            .map(|(_, v)| v)
    }

    /// Iterate the configured axes.
    pub fn configured_axes(&self) -> impl Iterator<Item = (Axis, &AxisConfig)> {
        self.axes
            .iter()
            .filter_map(|(k, v)| key_axis(k.as_str()).map(|a| (a, v)))
    }

    /// Parsed motor mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping string is malformed.
    pub fn motor_mapping(&self) -> Result<MotorMapping, crate::error::ConfigError> {
        MotorMapping::parse(self.axis_mapping.as_str())
    }

    /// Axes in homing order, skipping letters that are not axes.
    pub fn home_order_axes(&self) -> impl Iterator<Item = Axis> + '_ {
        self.home_order.chars().filter_map(Axis::from_letter)
    }

    /// Home position of every axis; unconfigured axes home to 0.
    pub fn home_position(&self) -> AxesRegister {
        let mut home = [0.0; N_AXES];
        for (axis, config) in self.configured_axes() {
            home[axis.index()] = config.home_position().value();
        }
        home
    }

    /// Prepare the configuration for a dry run: there are no switches to see,
    /// so unwire every endstop and drop the homing requirement. Homing roles
    /// stay, so home positions are unchanged.
    pub fn disable_endstops(&mut self) {
        for (_, axis) in self.axes.iter_mut() {
            let ends = axis.min_endstop.iter_mut().chain(axis.max_endstop.iter_mut());
            for endstop in ends {
                endstop.switch = 0;
            }
        }
        self.require_homing = false;
    }
}

/// Axis named by a table key; only single letters qualify.
pub(crate) fn key_axis(key: &str) -> Option<Axis> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Axis::from_letter(c),
        _ => None,
    }
}
