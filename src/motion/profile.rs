//! Motion profile calculation.
//!
//! Provides symmetric trapezoidal velocity profiles over the step count of
//! the defining motor channel of a move.

use libm::sqrtf;

/// Phase of a trapezoidal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    /// Accelerating from rest toward cruise velocity.
    Accelerating,
    /// Moving at constant cruise velocity.
    Cruising,
    /// Decelerating from cruise velocity to rest.
    Decelerating,
    /// Motion complete.
    Complete,
}

/// One non-empty phase of a profile with its boundary velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSpan {
    /// Which phase this is.
    pub phase: MotionPhase,
    /// Steps of the defining channel spent in this phase.
    pub steps: u32,
    /// Velocity at the start of the phase in steps/sec.
    pub v_start: f32,
    /// Velocity at the end of the phase in steps/sec.
    pub v_end: f32,
}

/// Computed motion profile for a move.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionProfile {
    /// Total steps to move.
    pub total_steps: u32,

    /// Steps in acceleration phase.
    pub accel_steps: u32,

    /// Steps in cruise phase (constant velocity).
    pub cruise_steps: u32,

    /// Steps in deceleration phase.
    pub decel_steps: u32,

    /// Highest velocity reached in steps/sec.
    pub peak_velocity: f32,

    /// Acceleration rate in steps/sec² (0 for constant-velocity profiles).
    pub accel_rate: f32,
}

impl MotionProfile {
    /// Create a symmetric trapezoidal profile starting and ending at rest.
    ///
    /// # Arguments
    ///
    /// * `total_steps` - Step count of the defining channel
    /// * `max_velocity` - Maximum velocity in steps/sec
    /// * `acceleration` - Acceleration and deceleration rate in steps/sec²
    ///
    /// A non-finite or non-positive `acceleration` yields a
    /// [`constant`](Self::constant) profile.
    pub fn symmetric_trapezoidal(total_steps: u32, max_velocity: f32, acceleration: f32) -> Self {
        if total_steps == 0 || !(max_velocity > 0.0) {
            return Self::zero();
        }
        if !(acceleration > 0.0) || !acceleration.is_finite() {
            return Self::constant(total_steps, max_velocity);
        }

        // Distance to reach max velocity from rest: d = v² / 2a
        let ramp_distance = max_velocity * max_velocity / (2.0 * acceleration);

        let (accel_steps, cruise_steps, decel_steps, peak_velocity) =
            if 2.0 * ramp_distance >= total_steps as f32 {
                // Triangle profile: can't reach max velocity
                let accel_steps = total_steps / 2;
                let decel_steps = total_steps - accel_steps;
                let peak = sqrtf(acceleration * total_steps as f32).min(max_velocity);
                (accel_steps, 0, decel_steps, peak)
            } else {
                let ramp_steps = ramp_distance as u32;
                let cruise_steps = total_steps - 2 * ramp_steps;
                (ramp_steps, cruise_steps, ramp_steps, max_velocity)
            };

        Self {
            total_steps,
            accel_steps,
            cruise_steps,
            decel_steps,
            peak_velocity,
            accel_rate: acceleration,
        }
    }

    /// Create a profile that runs all steps at `velocity`.
    pub fn constant(total_steps: u32, velocity: f32) -> Self {
        if total_steps == 0 || !(velocity > 0.0) {
            return Self::zero();
        }
        Self {
            total_steps,
            accel_steps: 0,
            cruise_steps: total_steps,
            decel_steps: 0,
            peak_velocity: velocity,
            accel_rate: 0.0,
        }
    }

    /// Create a zero-length profile (no motion).
    pub fn zero() -> Self {
        Self {
            total_steps: 0,
            accel_steps: 0,
            cruise_steps: 0,
            decel_steps: 0,
            peak_velocity: 0.0,
            accel_rate: 0.0,
        }
    }

    /// Check if this is a zero-length profile.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total_steps == 0
    }

    /// Get the phase at a given step number.
    pub fn phase_at(&self, step: u32) -> MotionPhase {
        if step >= self.total_steps {
            MotionPhase::Complete
        } else if step < self.accel_steps {
            MotionPhase::Accelerating
        } else if step < self.accel_steps + self.cruise_steps {
            MotionPhase::Cruising
        } else {
            MotionPhase::Decelerating
        }
    }

    /// The non-empty phases in execution order.
    pub fn phases(&self) -> impl Iterator<Item = PhaseSpan> {
        let peak = self.peak_velocity;
        [
            PhaseSpan {
                phase: MotionPhase::Accelerating,
                steps: self.accel_steps,
                v_start: 0.0,
                v_end: peak,
            },
            PhaseSpan {
                phase: MotionPhase::Cruising,
                steps: self.cruise_steps,
                v_start: peak,
                v_end: peak,
            },
            PhaseSpan {
                phase: MotionPhase::Decelerating,
                steps: self.decel_steps,
                v_start: peak,
                v_end: 0.0,
            },
        ]
        .into_iter()
        .filter(|span| span.steps > 0)
    }

    /// Estimate total duration of the motion profile in seconds.
    pub fn estimated_duration_secs(&self) -> f32 {
        self.phases()
            .map(|span| {
                let mean = 0.5 * (span.v_start + span.v_end);
                if mean > 0.0 {
                    span.steps as f32 / mean
                } else {
                    0.0
                }
            })
            .sum()
    }
}
