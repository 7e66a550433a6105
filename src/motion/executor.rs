//! Segment execution - step pulse scheduling.
//!
//! Walks a [`MotionSegment`] step by step: Bresenham distributes the slave
//! channels over the defining channel, and the step interval follows the
//! segment's linear velocity ramp.

use libm::sqrtf;

use crate::config::MOTOR_COUNT;

use super::segment::MotionSegment;

/// Velocity floor in steps/sec so a segment always terminates.
const MIN_VELOCITY: f32 = 1.0;

/// Channels to pulse on one tick, and the time until the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTick {
    /// Bit `n` set: channel `n` steps on this tick.
    pub channels: u8,
    /// Step interval in nanoseconds.
    pub interval_ns: u32,
}

impl StepTick {
    /// True if channel `n` steps on this tick. Channels past
    /// [`MOTOR_COUNT`] never step.
    #[inline]
    pub fn steps(&self, channel: usize) -> bool {
        u32::try_from(channel)
            .ok()
            .and_then(|n| 1u8.checked_shl(n))
            .is_some_and(|bit| self.channels & bit != 0)
    }
}

/// Runtime state during segment execution.
#[derive(Debug, Clone)]
pub struct SegmentExecutor {
    /// Absolute step count per channel.
    steps: [u32; MOTOR_COUNT],

    /// Bresenham error accumulators.
    error: [u32; MOTOR_COUNT],

    /// Steps of the defining channel.
    total_steps: u32,

    /// Ticks already issued.
    current_step: u32,

    v0_squared: f32,
    v1_squared: f32,
}

impl SegmentExecutor {
    /// Create a new executor for a segment.
    pub fn new(segment: &MotionSegment) -> Self {
        let steps = segment.steps.map(i32::unsigned_abs);
        let total_steps = segment.defining_steps();
        Self {
            steps,
            error: [total_steps / 2; MOTOR_COUNT],
            total_steps,
            current_step: 0,
            v0_squared: segment.v0 * segment.v0,
            v1_squared: segment.v1 * segment.v1,
        }
    }

    /// Check if the segment is complete.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.current_step >= self.total_steps
    }

    /// Get the current step number.
    #[inline]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Get the total number of ticks.
    #[inline]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Get ticks remaining.
    #[inline]
    pub fn steps_remaining(&self) -> u32 {
        self.total_steps.saturating_sub(self.current_step)
    }

    /// Get progress as a fraction (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.current_step as f32 / self.total_steps as f32
        }
    }

    /// Velocity in steps/sec at the middle of tick `step`.
    pub fn velocity_at(&self, step: u32) -> f32 {
        let fraction = (step as f32 + 0.5) / self.total_steps.max(1) as f32;
        let v_squared = self.v0_squared + (self.v1_squared - self.v0_squared) * fraction;
        sqrtf(v_squared.max(0.0)).max(MIN_VELOCITY)
    }

    /// Produce the next tick, or `None` when the segment is done.
    pub fn advance(&mut self) -> Option<StepTick> {
        if self.is_complete() {
            return None;
        }

        let mut channels = 0u8;
        for (n, (steps, error)) in self.steps.iter().zip(self.error.iter_mut()).enumerate() {
            *error += steps;
            if *error >= self.total_steps {
                *error -= self.total_steps;
                channels |= 1 << n;
            }
        }

        let interval = 1_000_000_000.0 / self.velocity_at(self.current_step);
        self.current_step += 1;

        Some(StepTick {
            channels,
            interval_ns: interval.min(u32::MAX as f32) as u32,
        })
    }
}
