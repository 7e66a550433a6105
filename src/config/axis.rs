//! Per-axis configuration from TOML.

use serde::Deserialize;

use super::endstop::EndstopConfig;
use super::limits::SoftLimits;
use super::units::{Millimeters, MmPerSec, MmPerSecSquared};

/// Complete configuration of one logical axis.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Motor steps (including microstepping) per millimeter of travel.
    pub steps_per_mm: f32,

    /// Maximum velocity of this axis in mm/s.
    pub max_feedrate: MmPerSec,

    /// Maximum acceleration in mm/s². Zero means unlimited.
    #[serde(default)]
    pub acceleration: MmPerSecSquared,

    /// Optional soft travel limits.
    #[serde(default)]
    pub limits: Option<SoftLimits>,

    /// Optional endstop at the minimum end.
    #[serde(default)]
    pub min_endstop: Option<EndstopConfig>,

    /// Optional endstop at the maximum end.
    #[serde(default)]
    pub max_endstop: Option<EndstopConfig>,
}

impl AxisConfig {
    /// Create an axis without limits or endstops.
    pub fn new(steps_per_mm: f32, max_feedrate: MmPerSec, acceleration: MmPerSecSquared) -> Self {
        Self {
            steps_per_mm,
            max_feedrate,
            acceleration,
            limits: None,
            min_endstop: None,
            max_endstop: None,
        }
    }

    /// Position the axis is at after homing.
    ///
    /// Homing against the max endstop lands on the upper soft limit, homing
    /// against the min endstop on the lower one; anything else homes to 0.
    pub fn home_position(&self) -> Millimeters {
        let homes_max = self.max_endstop.is_some_and(|e| e.homing);
        let homes_min = self.min_endstop.is_some_and(|e| e.homing);
        match (self.limits, homes_min, homes_max) {
            (Some(limits), _, true) => limits.max,
            (Some(limits), true, false) => limits.min,
            _ => Millimeters(0.0),
        }
    }

    /// True if one of the endstops is used for homing.
    pub fn has_homing_endstop(&self) -> bool {
        self.min_endstop.is_some_and(|e| e.homing) || self.max_endstop.is_some_and(|e| e.homing)
    }
}
