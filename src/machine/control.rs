//! Machine control pipeline.
//!
//! Receives interpreter events, applies the machine policy (speed factor,
//! homing gate, soft limits) and turns moves into queued instructions.

use heapless::Vec;
use tracing::{debug, info, warn};

use crate::axis::{AxesRegister, Axis, AxisBitmap, N_AXES};
use crate::config::{validate_config, AxisConstraints, MachineConfig, MotorMapping, MmPerSec};
use crate::error::{PolicyError, Result};
use crate::gcode::EventReceiver;
use crate::motion::Instruction;
use crate::queue::MotionQueue;
use crate::sink::MessageSink;

use super::planner::{plan_move, MoveRequest};

/// The machine control pipeline.
///
/// Borrows the motion queue it feeds; the queue outlives any number of
/// sessions driving this pipeline.
pub struct MachineControl<'q> {
    pub(super) config: MachineConfig,
    constraints: [Option<AxisConstraints>; N_AXES],
    mapping: MotorMapping,
    queue: &'q dyn MotionQueue,
    pub(super) sink: MessageSink,

    /// Machine position in mm.
    pub(super) position: AxesRegister,
    /// Machine position in absolute steps.
    steps: [i64; N_AXES],
    /// Modal feedrate before any factor.
    feedrate: MmPerSec,
    /// `M220` override.
    feedrate_factor: f32,
    homed: bool,
    pub(super) line: u32,
    pub(super) temperature: Option<f32>,
    fan_speed: f32,
}

impl<'q> MachineControl<'q> {
    /// Create a pipeline for `config` feeding `queue`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: MachineConfig, queue: &'q dyn MotionQueue) -> Result<Self> {
        validate_config(&config)?;
        let mapping = config.motor_mapping()?;

        let mut constraints: [Option<AxisConstraints>; N_AXES] = Default::default();
        for (axis, axis_config) in config.configured_axes() {
            constraints[axis.index()] = Some(AxisConstraints::from_config(axis_config));
        }

        info!(
            mapping = config.axis_mapping.as_str(),
            speed_factor = config.speed_factor,
            require_homing = config.require_homing,
            range_check = config.range_check,
            "machine control ready"
        );

        Ok(Self {
            feedrate: config.default_feedrate,
            config,
            constraints,
            mapping,
            queue,
            sink: MessageSink::none(),
            position: [0.0; N_AXES],
            steps: [0; N_AXES],
            feedrate_factor: 1.0,
            homed: false,
            line: 0,
            temperature: None,
            fan_speed: 0.0,
        })
    }

    /// Route G-code diagnostics to `sink`.
    pub fn set_msg_out(&mut self, sink: MessageSink) {
        self.sink = sink;
    }

    /// Mutable access to the diagnostic sink, e.g. for acknowledgements.
    pub fn msg_out(&mut self) -> &mut MessageSink {
        &mut self.sink
    }

    /// Position of every axis after homing. Use as the interpreter origin.
    pub fn home_position(&self) -> AxesRegister {
        self.config.home_position()
    }

    /// Current machine position in mm.
    #[inline]
    pub fn position(&self) -> AxesRegister {
        self.position
    }

    /// True once `G28` ran (and motors were not released since, when homing
    /// is required).
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.homed
    }

    /// Current `M220` factor.
    #[inline]
    pub fn feedrate_factor(&self) -> f32 {
        self.feedrate_factor
    }

    /// Current fan speed in 0..=255.
    #[inline]
    pub fn fan_speed(&self) -> f32 {
        self.fan_speed
    }

    /// The active configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The queue this pipeline feeds.
    pub fn queue(&self) -> &'q dyn MotionQueue {
        self.queue
    }

    fn check_policy(&self, target: &AxesRegister) -> core::result::Result<(), PolicyError> {
        if self.config.require_homing && !self.homed {
            return Err(PolicyError::HomingRequired);
        }
        if self.config.range_check {
            for axis in Axis::ALL {
                let i = axis.index();
                let Some(c) = &self.constraints[i] else {
                    continue;
                };
                if let Some(limits) = c.limits.filter(|_| !c.within_limits(target[i])) {
                    return Err(PolicyError::OutOfRange {
                        axis: axis.letter(),
                        target: target[i],
                        min: limits.min.value(),
                        max: limits.max.value(),
                    });
                }
            }
        }
        Ok(())
    }

    fn reject(&mut self, error: PolicyError) {
        warn!(line = self.line, %error, "command rejected");
        self.sink
            .diagnostic(format_args!("ERROR (line {}): {}", self.line, error));
    }

    /// Effective feed in mm/s for a programmed feed.
    fn effective(&self, feed: MmPerSec) -> f32 {
        (feed * self.config.speed_factor * self.feedrate_factor).value()
    }

    fn checked_move(&mut self, target: &AxesRegister, feedrate: f32) -> Result<bool> {
        if let Err(error) = self.check_policy(target) {
            self.reject(error);
            return Ok(false);
        }
        self.move_to(target, feedrate)
    }

    /// Plan and enqueue a move without policy checks. A move the planner
    /// refuses is reported and leaves the position untouched.
    fn move_to(&mut self, target: &AxesRegister, feedrate: f32) -> Result<bool> {
        let mut to_steps = self.steps;
        for (i, c) in self.constraints.iter().enumerate() {
            if let Some(c) = c {
                to_steps[i] = c.mm_to_steps(target[i]);
            }
        }

        let plan = plan_move(
            &self.constraints,
            &self.mapping,
            &MoveRequest {
                from_steps: &self.steps,
                to_steps: &to_steps,
                target,
                feedrate,
            },
        );
        let plan = match plan {
            Ok(plan) => plan,
            Err(error) => {
                self.reject(error);
                return Ok(false);
            }
        };
        for segment in plan {
            if self.config.debug_print {
                debug!(
                    line = self.line,
                    steps = ?segment.steps,
                    v0 = segment.v0,
                    v1 = segment.v1,
                    feedrate = segment.feedrate,
                    "segment"
                );
            }
            self.enqueue(Instruction::Move(segment))?;
        }

        self.steps = to_steps;
        self.position = *target;
        Ok(true)
    }

    fn enqueue(&mut self, instruction: Instruction) -> Result<()> {
        self.queue.enqueue(instruction)?;
        if self.config.synchronous {
            self.queue.wait_queue_empty()?;
        }
        Ok(())
    }

    fn homing_sequence(&self, axes: AxisBitmap) -> Vec<Axis, N_AXES> {
        let mut order: Vec<Axis, N_AXES> = Vec::new();
        for axis in self.config.home_order_axes().chain(axes.iter()) {
            if axes.contains(axis) && !order.contains(&axis) {
                let _ = order.push(axis);
            }
        }
        order
    }
}

impl EventReceiver for MachineControl<'_> {
    fn begin_line(&mut self, line_number: u32) {
        self.line = line_number;
    }

    fn go_home(&mut self, axes: AxisBitmap) -> Result<()> {
        for axis in self.homing_sequence(axes) {
            let i = axis.index();
            let Some(c) = &self.constraints[i] else {
                self.position[i] = 0.0;
                continue;
            };
            let home = c.home_position.value();
            let home_steps = c.mm_to_steps(home);
            let speed = c.max_feedrate.value();

            let mut target = self.position;
            target[i] = home;
            if !self.move_to(&target, speed)? {
                // Axes already homed keep their reference; the rest wait for
                // another G28.
                return Ok(());
            }
            self.steps[i] = home_steps;
            self.position[i] = home;
        }
        self.homed = true;
        info!(axes = axes.bits(), "homed");
        Ok(())
    }

    fn set_feedrate_factor(&mut self, factor: f32) -> Result<()> {
        if factor > 0.0 {
            self.feedrate_factor = factor;
        } else {
            self.reject(PolicyError::InvalidFeedrateFactor(factor));
        }
        Ok(())
    }

    fn set_fanspeed(&mut self, speed: f32) -> Result<()> {
        debug!(speed, "fan");
        self.fan_speed = speed;
        Ok(())
    }

    fn set_temperature(&mut self, degrees_c: f32) -> Result<()> {
        debug!(degrees_c, "heater target");
        self.temperature = Some(degrees_c);
        Ok(())
    }

    fn wait_temperature(&mut self) -> Result<()> {
        // No heater feedback: the target counts as reached.
        Ok(())
    }

    fn dwell(&mut self, ms: f32) -> Result<()> {
        let ms = ms.max(0.0).round() as u32;
        self.enqueue(Instruction::Dwell(ms))
    }

    fn motors_enable(&mut self, enable: bool) -> Result<()> {
        self.enqueue(Instruction::MotorsEnable(enable))?;
        if !enable && self.config.require_homing {
            self.homed = false;
        }
        Ok(())
    }

    fn coordinated_move(&mut self, feed_mm_per_min: Option<f32>, target: &AxesRegister)
        -> Result<bool> {
        if let Some(feed) = feed_mm_per_min.filter(|f| *f > 0.0) {
            self.feedrate = MmPerSec::from_mm_per_min(feed);
        }
        let feedrate = self.effective(self.feedrate);
        self.checked_move(target, feedrate)
    }

    fn rapid_move(&mut self, feed_mm_per_min: Option<f32>, target: &AxesRegister) -> Result<bool> {
        let feedrate = match feed_mm_per_min.filter(|f| *f > 0.0) {
            Some(feed) => {
                self.feedrate = MmPerSec::from_mm_per_min(feed);
                self.effective(self.feedrate)
            }
            None => f32::INFINITY,
        };
        self.checked_move(target, feedrate)
    }

    fn unprocessed<'a>(&mut self, letter: char, value: f32, rest: &'a str)
        -> Result<Option<&'a str>> {
        Ok(self.extra_command(letter, value, rest))
    }
}
