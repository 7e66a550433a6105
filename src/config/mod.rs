//! Configuration module for gcode-motion.
//!
//! Provides types for loading and validating the machine configuration from
//! TOML files: global motion policy, the motor mapping and one table per axis.

mod axis;
mod endstop;
mod limits;
mod loader;
mod machine;
mod mapping;
mod mechanical;
pub mod units;
mod validation;

pub use axis::AxisConfig;
pub use endstop::{EndstopConfig, TriggerLevel};
pub use limits::SoftLimits;
pub use loader::{load_config, parse_config};
pub use machine::MachineConfig;
pub use mapping::{MotorChannel, MotorMapping, MOTOR_COUNT};
pub use mechanical::AxisConstraints;
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::{Millimeters, MmPerSec, MmPerSecSquared, Steps};

/// Number of endstop switch inputs.
pub const ENDSTOP_SWITCH_COUNT: usize = 8;
