//! Queue elements: motion segments and the instructions carrying them.

use core::fmt;

use crate::axis::AxesRegister;
use crate::config::MOTOR_COUNT;

/// A straight piece of motion with a linear velocity ramp.
///
/// Velocities are given in steps/sec of the defining channel, the channel
/// with the largest absolute step count. All other channels are slaved to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSegment {
    /// Signed steps per motor channel.
    pub steps: [i32; MOTOR_COUNT],
    /// Velocity at the start of the segment.
    pub v0: f32,
    /// Velocity at the end of the segment.
    pub v1: f32,
    /// Machine position in mm once the whole move completes.
    pub target: AxesRegister,
    /// Path feedrate of the move in mm/s.
    pub feedrate: f32,
}

impl MotionSegment {
    /// Step count of the defining channel.
    pub fn defining_steps(&self) -> u32 {
        self.steps
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// True if no channel moves.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.defining_steps() == 0
    }

    /// Duration assuming the ramp is followed exactly.
    pub fn duration_secs(&self) -> f32 {
        let mean = 0.5 * (self.v0 + self.v1);
        if mean > 0.0 {
            self.defining_steps() as f32 / mean
        } else {
            0.0
        }
    }
}

/// Element of the motion queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Step the motors.
    Move(MotionSegment),
    /// Keep still for the given number of milliseconds.
    Dwell(u32),
    /// Power motors on or off.
    MotorsEnable(bool),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Move(segment) => {
                write!(f, "move")?;
                for steps in &segment.steps {
                    write!(f, " {:6}", steps)?;
                }
                write!(
                    f,
                    " | v0={:.1} v1={:.1} steps/s | {:.3}s",
                    segment.v0,
                    segment.v1,
                    segment.duration_secs()
                )
            }
            Instruction::Dwell(ms) => write!(f, "dwell {} ms", ms),
            Instruction::MotorsEnable(on) => {
                write!(f, "motors {}", if *on { "on" } else { "off" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::N_AXES;

    fn segment(steps: [i32; MOTOR_COUNT], v0: f32, v1: f32) -> MotionSegment {
        MotionSegment {
            steps,
            v0,
            v1,
            target: [0.0; N_AXES],
            feedrate: 10.0,
        }
    }

    #[test]
    fn test_defining_steps() {
        let seg = segment([3, -7, 0, 0, 0, 0, 0, 0], 100.0, 100.0);
        assert_eq!(seg.defining_steps(), 7);
        assert!((seg.duration_secs() - 0.07).abs() < 1e-6);
        assert!(segment([0; MOTOR_COUNT], 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::Dwell(250).to_string(), "dwell 250 ms");
        assert_eq!(Instruction::MotorsEnable(false).to_string(), "motors off");
        let line = Instruction::Move(segment([1, 0, 0, 0, 0, 0, 0, 0], 0.0, 2.0)).to_string();
        assert!(line.starts_with("move      1      0"));
        assert!(line.ends_with("| v0=0.0 v1=2.0 steps/s | 1.000s"));
    }
}
