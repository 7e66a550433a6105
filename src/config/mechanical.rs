//! Per-axis constraints derived from the axis configuration.

use super::axis::AxisConfig;
use super::limits::SoftLimits;
use super::units::{Millimeters, MmPerSec, MmPerSecSquared, Steps};

/// What the machine control needs to know about one axis while planning.
///
/// Built once per axis when the machine control starts.
#[derive(Debug, Clone)]
pub struct AxisConstraints {
    /// Steps per millimeter of travel.
    pub steps_per_mm: f32,

    /// Soft limits, if configured.
    pub limits: Option<SoftLimits>,

    /// Position after homing.
    pub home_position: Millimeters,

    /// Fastest feed along this axis.
    pub max_feedrate: MmPerSec,

    /// Acceleration bound; zero means unlimited.
    pub acceleration: MmPerSecSquared,
}

impl AxisConstraints {
    /// Derive the constraints of one configured axis.
    pub fn from_config(config: &AxisConfig) -> Self {
        Self {
            steps_per_mm: config.steps_per_mm,
            limits: config.limits,
            home_position: config.home_position(),
            max_feedrate: config.max_feedrate,
            acceleration: config.acceleration,
        }
    }

    /// Nearest absolute step of a position in mm.
    #[inline]
    pub fn mm_to_steps(&self, mm: f32) -> i64 {
        Steps::from_mm(Millimeters(mm), self.steps_per_mm).value()
    }

    /// True if `mm` is inside the soft limits. Axes without limits accept
    /// every position.
    pub fn within_limits(&self, mm: f32) -> bool {
        self.limits
            .map_or(true, |limits| limits.contains(Millimeters(mm)))
    }
}
