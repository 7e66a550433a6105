//! Configuration validation.

use crate::axis::Axis;
use crate::error::{ConfigError, Error, Result};

use super::endstop::{EndstopConfig, TriggerLevel};
use super::machine::key_axis;
use super::{AxisConfig, MachineConfig, ENDSTOP_SWITCH_COUNT};

/// Validate a machine configuration.
///
/// Checks:
/// - Speed factor and default feedrate are positive
/// - Axis tables are keyed by axis letters and have sane values
/// - Soft limits are valid (min < max)
/// - Axis mapping and home order only name axes; mapped axes are configured
/// - Endstops use valid switches with consistent polarity, at most one homing
///   endstop per axis
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    if !(config.speed_factor > 0.0) {
        return Err(Error::Config(ConfigError::InvalidSpeedFactor(
            config.speed_factor,
        )));
    }

    if !(config.default_feedrate.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidDefaultFeedrate(
            config.default_feedrate.0,
        )));
    }

    let mut switch_levels: [Option<TriggerLevel>; ENDSTOP_SWITCH_COUNT] =
        [None; ENDSTOP_SWITCH_COUNT];

    for (key, axis_config) in config.axes.iter() {
        let axis = key_axis(key.as_str())
            .ok_or_else(|| Error::Config(ConfigError::UnknownAxis(key.as_str().into())))?;
        validate_axis(axis, axis_config)?;

        for endstop in [axis_config.min_endstop, axis_config.max_endstop]
            .into_iter()
            .flatten()
        {
            validate_endstop(axis, &endstop, &mut switch_levels)?;
        }
    }

    let mapping = config.motor_mapping()?;
    for axis in mapping.mapped_axes() {
        if config.axis(axis).is_none() {
            return Err(Error::Config(ConfigError::MissingAxisConfig(axis.letter())));
        }
    }

    if config
        .home_order
        .chars()
        .any(|c| Axis::from_letter(c).is_none())
    {
        return Err(Error::Config(ConfigError::InvalidHomeOrder(
            config.home_order.as_str().into(),
        )));
    }

    Ok(())
}

fn validate_axis(axis: Axis, config: &AxisConfig) -> Result<()> {
    let letter = axis.letter();

    // Steps per mm must be positive
    if !(config.steps_per_mm > 0.0) {
        return Err(Error::Config(ConfigError::InvalidStepsPerMm {
            axis: letter,
            value: config.steps_per_mm,
        }));
    }

    // Max feedrate must be positive
    if !(config.max_feedrate.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxFeedrate {
            axis: letter,
            value: config.max_feedrate.0,
        }));
    }

    // Acceleration may be zero (unlimited) but not negative
    if !(config.acceleration.0 >= 0.0) {
        return Err(Error::Config(ConfigError::InvalidAcceleration {
            axis: letter,
            value: config.acceleration.0,
        }));
    }

    // Soft limits: min must be < max
    if let Some(ref limits) = config.limits {
        if !limits.is_valid() {
            return Err(Error::Config(ConfigError::InvalidSoftLimits {
                axis: letter,
                min: limits.min.0,
                max: limits.max.0,
            }));
        }
    }

    let homing_ends = [config.min_endstop, config.max_endstop]
        .into_iter()
        .flatten()
        .filter(|e| e.homing)
        .count();
    if homing_ends > 1 {
        return Err(Error::Config(ConfigError::DuplicateHomingEndstop(letter)));
    }

    Ok(())
}

fn validate_endstop(
    axis: Axis,
    endstop: &EndstopConfig,
    switch_levels: &mut [Option<TriggerLevel>; ENDSTOP_SWITCH_COUNT],
) -> Result<()> {
    if !endstop.is_wired() {
        return Ok(());
    }
    let index = usize::from(endstop.switch);
    if index > ENDSTOP_SWITCH_COUNT {
        return Err(Error::Config(ConfigError::InvalidEndstopSwitch {
            axis: axis.letter(),
            switch: endstop.switch,
        }));
    }

    // A switch shared between axes must agree on its polarity
    let slot = &mut switch_levels[index - 1];
    match slot {
        Some(level) if *level != endstop.trigger => Err(Error::Config(
            ConfigError::ConflictingEndstopTrigger(endstop.switch),
        )),
        _ => {
            *slot = Some(endstop.trigger);
            Ok(())
        }
    }
}
