//! Axis-letter to motor-channel mapping.
//!
//! The mapping string lists, for each motor channel in order, the axis that
//! drives it. A lower-case letter reverses the motor direction, `_` leaves the
//! channel unused. `"XYZE"` drives channels 0-3; `"XYyZ"` drives Y with two
//! motors turning opposite ways. One axis may drive several channels; axes
//! that appear nowhere are not sent to the motors.

use crate::axis::Axis;
use crate::error::ConfigError;

/// Number of motor channels a segment carries.
pub const MOTOR_COUNT: usize = 8;

/// One driven motor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorChannel {
    /// Axis whose steps this motor follows.
    pub axis: Axis,
    /// Motor turns the opposite way.
    pub reversed: bool,
}

/// Parsed axis mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorMapping {
    channels: [Option<MotorChannel>; MOTOR_COUNT],
}

impl MotorMapping {
    /// Parse a mapping string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidAxisMapping` for unknown letters or more
    /// than [`MOTOR_COUNT`] channels.
    pub fn parse(mapping: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidAxisMapping(mapping.into());
        if mapping.chars().count() > MOTOR_COUNT {
            return Err(invalid());
        }

        let mut channels = [None; MOTOR_COUNT];
        for (slot, c) in channels.iter_mut().zip(mapping.chars()) {
            if c == '_' {
                continue;
            }
            let axis = Axis::from_letter(c).ok_or_else(invalid)?;
            *slot = Some(MotorChannel {
                axis,
                reversed: c.is_ascii_lowercase(),
            });
        }
        Ok(Self { channels })
    }

    /// Channel assignment, indexed by motor number.
    #[inline]
    pub fn channels(&self) -> &[Option<MotorChannel>; MOTOR_COUNT] {
        &self.channels
    }

    /// True if at least one motor follows `axis`.
    pub fn is_mapped(&self, axis: Axis) -> bool {
        self.channels.iter().flatten().any(|c| c.axis == axis)
    }

    /// Axes driven by at least one motor, without duplicates.
    pub fn mapped_axes(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ALL.into_iter().filter(|a| self.is_mapped(*a))
    }

    /// Number of channels up to and including the last used one.
    pub fn motor_count(&self) -> usize {
        self.channels
            .iter()
            .rposition(Option::is_some)
            .map_or(0, |i| i + 1)
    }
}
