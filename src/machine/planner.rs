//! Segment synthesis for a single straight move.
//!
//! A move is planned stop-to-stop: per-axis feedrate and acceleration limits
//! are projected onto the path, a trapezoid profile is laid over the
//! defining motor channel and every channel's steps are split across the
//! profile phases.

use heapless::Vec;
use libm::sqrtf;

use crate::axis::{AxesRegister, Axis, N_AXES};
use crate::config::{AxisConstraints, MotorMapping, MOTOR_COUNT};
use crate::error::PolicyError;
use crate::motion::{MotionProfile, MotionSegment};

/// At most one segment per trapezoid phase.
pub type SegmentPlan = Vec<MotionSegment, 3>;

/// Inputs for planning one move.
#[derive(Debug)]
pub struct MoveRequest<'a> {
    /// Absolute steps per axis before the move.
    pub from_steps: &'a [i64; N_AXES],
    /// Absolute steps per axis after the move.
    pub to_steps: &'a [i64; N_AXES],
    /// Target position in mm, carried on each segment.
    pub target: &'a AxesRegister,
    /// Requested path speed in mm/s; infinite for "as fast as possible".
    pub feedrate: f32,
}

/// Plan a move. Returns no segments if no mapped channel moves.
///
/// A move whose step count on some motor does not fit a segment is refused
/// with [`PolicyError::StepRange`].
pub fn plan_move(
    constraints: &[Option<AxisConstraints>; N_AXES],
    mapping: &MotorMapping,
    request: &MoveRequest<'_>,
) -> Result<SegmentPlan, PolicyError> {
    let mut plan = SegmentPlan::new();

    // Per-axis travel in steps and mm, mapped axes only.
    let mut delta_steps = [0i64; N_AXES];
    let mut delta_mm = [0.0f32; N_AXES];
    for axis in mapping.mapped_axes() {
        let i = axis.index();
        if let Some(c) = &constraints[i] {
            delta_steps[i] = request.to_steps[i]
                .checked_sub(request.from_steps[i])
                .ok_or(PolicyError::StepRange(axis.letter()))?;
            delta_mm[i] = delta_steps[i] as f32 / c.steps_per_mm;
        }
    }

    let mut channel_steps = [0i32; MOTOR_COUNT];
    for (slot, channel) in channel_steps.iter_mut().zip(mapping.channels()) {
        if let Some(channel) = channel {
            let steps = i32::try_from(delta_steps[channel.axis.index()]).ok();
            let steps = if channel.reversed {
                steps.and_then(i32::checked_neg)
            } else {
                steps
            };
            *slot = steps.ok_or(PolicyError::StepRange(channel.axis.letter()))?;
        }
    }
    let defining = channel_steps
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0);
    if defining == 0 {
        return Ok(plan);
    }

    let length = path_length(&delta_mm);
    let (speed, accel) = path_limits(constraints, &delta_mm, length, request.feedrate);

    // Path mm to steps of the defining channel.
    let steps_per_path_mm = defining as f32 / length;
    let profile = MotionProfile::symmetric_trapezoidal(
        defining,
        speed * steps_per_path_mm,
        accel * steps_per_path_mm,
    );

    let mut done_defining = 0u32;
    let mut done = [0i32; MOTOR_COUNT];
    for span in profile.phases() {
        done_defining += span.steps;
        let mut steps = [0i32; MOTOR_COUNT];
        for ((step, total), prior) in steps.iter_mut().zip(channel_steps).zip(done.iter_mut()) {
            let reached = share(total, done_defining, defining);
            *step = reached - *prior;
            *prior = reached;
        }
        let _ = plan.push(MotionSegment {
            steps,
            v0: span.v_start,
            v1: span.v_end,
            target: *request.target,
            feedrate: speed,
        });
    }
    Ok(plan)
}

/// Euclidean length over X, Y and Z, or over all axes for moves without a
/// linear component.
fn path_length(delta_mm: &AxesRegister) -> f32 {
    let linear: f32 = [Axis::X, Axis::Y, Axis::Z]
        .iter()
        .map(|a| delta_mm[a.index()] * delta_mm[a.index()])
        .sum();
    if linear > 0.0 {
        sqrtf(linear)
    } else {
        sqrtf(delta_mm.iter().map(|d| d * d).sum())
    }
}

/// Path speed and acceleration after clamping every axis to its limits.
fn path_limits(
    constraints: &[Option<AxisConstraints>; N_AXES],
    delta_mm: &AxesRegister,
    length: f32,
    feedrate: f32,
) -> (f32, f32) {
    let mut speed = feedrate;
    let mut accel = f32::INFINITY;
    for (c, d) in constraints.iter().zip(delta_mm) {
        let d = d.abs();
        let Some(c) = c else {
            continue;
        };
        if d == 0.0 {
            continue;
        }
        // Axis share of the path: v_axis = v_path * d / length
        speed = speed.min(c.max_feedrate.value() * length / d);
        if !c.acceleration.is_unlimited() {
            accel = accel.min(c.acceleration.value() * length / d);
        }
    }
    (speed, accel)
}

/// Steps of a channel with `total` steps once the defining channel made
/// `progress` of `defining` steps, rounded to nearest.
fn share(total: i32, progress: u32, defining: u32) -> i32 {
    let scaled = i64::from(total) * i64::from(progress);
    let d = i64::from(defining);
    let rounded = if scaled >= 0 {
        (scaled + d / 2) / d
    } else {
        (scaled - d / 2) / d
    };
    rounded as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxisConfig, MmPerSec, MmPerSecSquared};

    fn constraints(accel: f32) -> [Option<AxisConstraints>; N_AXES] {
        let axis = AxisConfig::new(100.0, MmPerSec(50.0), MmPerSecSquared(accel));
        let mut c: [Option<AxisConstraints>; N_AXES] = Default::default();
        c[Axis::X.index()] = Some(AxisConstraints::from_config(&axis));
        c[Axis::Y.index()] = Some(AxisConstraints::from_config(&axis));
        c
    }

    fn plan(mapping: &str, accel: f32, to: [i64; N_AXES], feed: f32) -> SegmentPlan {
        let mapping = MotorMapping::parse(mapping).unwrap();
        let from = [0; N_AXES];
        let target = [0.0; N_AXES];
        plan_move(
            &constraints(accel),
            &mapping,
            &MoveRequest {
                from_steps: &from,
                to_steps: &to,
                target: &target,
                feedrate: feed,
            },
        )
        .unwrap()
    }

    fn steps_to(x: i64, y: i64) -> [i64; N_AXES] {
        let mut s = [0; N_AXES];
        s[0] = x;
        s[1] = y;
        s
    }

    fn totals(plan: &SegmentPlan) -> [i32; MOTOR_COUNT] {
        let mut t = [0; MOTOR_COUNT];
        for seg in plan {
            for (a, b) in t.iter_mut().zip(seg.steps) {
                *a += b;
            }
        }
        t
    }

    #[test]
    fn test_unlimited_acceleration_single_segment() {
        // 10 mm on X at 20 mm/s, 100 steps/mm
        let plan = plan("XY", 0.0, steps_to(1000, 0), 20.0);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].steps[0], 1000);
        assert_eq!(plan[0].v0, 2000.0);
        assert_eq!(plan[0].v1, 2000.0);
        assert_eq!(plan[0].feedrate, 20.0);
    }

    #[test]
    fn test_trapezoid_preserves_steps() {
        let plan = plan("XY", 100.0, steps_to(1001, -377), 10.0);
        assert_eq!(plan.len(), 3);
        assert_eq!(totals(&plan)[..2], [1001, -377]);
        assert_eq!(plan[0].v0, 0.0);
        assert_eq!(plan[2].v1, 0.0);
        assert_eq!(plan[0].v1, plan[1].v0);
    }

    #[test]
    fn test_feedrate_clamped_per_axis() {
        // Rapid: infinite request clamps to 50 mm/s on X
        let plan = plan("X", 0.0, steps_to(500, 0), f32::INFINITY);
        assert_eq!(plan[0].feedrate, 50.0);
        assert_eq!(plan[0].v0, 5000.0);
    }

    #[test]
    fn test_mapping_reverses_and_duplicates() {
        let plan = plan("xYy", 0.0, steps_to(10, 20), 10.0);
        assert_eq!(totals(&plan)[..3], [-10, 20, -20]);
    }

    #[test]
    fn test_unmapped_axis_not_sent() {
        let plan = plan("X", 0.0, steps_to(0, 500), 10.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_step_overflow_refused() {
        let mapping = MotorMapping::parse("xY").unwrap();
        let target = [0.0; N_AXES];
        let request = |from: &[i64; N_AXES], to: &[i64; N_AXES]| {
            plan_move(
                &constraints(0.0),
                &mapping,
                &MoveRequest {
                    from_steps: from,
                    to_steps: to,
                    target: &target,
                    feedrate: 10.0,
                },
            )
        };

        // Wider than a segment
        let far = steps_to(i64::from(i32::MAX) + 1, 0);
        assert_eq!(request(&[0; N_AXES], &far), Err(PolicyError::StepRange('X')));

        // Difference of saturated positions
        let low = steps_to(i64::MIN, 0);
        let high = steps_to(i64::MAX, 0);
        assert_eq!(request(&low, &high), Err(PolicyError::StepRange('X')));

        // Reversed channel cannot negate i32::MIN
        let min = steps_to(i64::from(i32::MIN), 0);
        assert_eq!(request(&[0; N_AXES], &min), Err(PolicyError::StepRange('X')));

        // Largest forward move still fits
        let edge = steps_to(0, i64::from(i32::MAX));
        assert!(request(&[0; N_AXES], &edge).is_ok());
    }

    #[test]
    fn test_share_rounding() {
        assert_eq!(share(10, 3, 4), 8);
        assert_eq!(share(-10, 3, 4), -8);
        assert_eq!(share(7, 4, 4), 7);
        assert_eq!(share(0, 2, 4), 0);
    }
}
