//! Hardware backend driving step/dir pins.
//!
//! Generic over embedded-hal 1.0 pin and delay types. Instructions are
//! buffered in a [`BoundedQueue`] and executed by a dedicated consumer
//! thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{debug, error, info};

use crate::config::MOTOR_COUNT;
use crate::error::QueueError;
use crate::motion::{Instruction, MotionSegment, SegmentExecutor};

use super::{BoundedQueue, MotionQueue, QUEUE_CAPACITY};

/// Step pulse width (typically 1-10 microseconds is sufficient).
pub const PULSE_WIDTH_NS: u32 = 2_000;

/// STEP and DIR pins of one motor channel.
#[derive(Debug)]
pub struct StepperChannel<STEP, DIR> {
    /// Pulsed once per step.
    pub step: STEP,
    /// High for positive steps.
    pub dir: DIR,
}

impl<STEP, DIR> StepperChannel<STEP, DIR> {
    /// Pair up a step and a direction pin.
    pub fn new(step: STEP, dir: DIR) -> Self {
        Self { step, dir }
    }
}

struct Shared {
    queue: BoundedQueue<Instruction, QUEUE_CAPACITY>,
    abort: AtomicBool,
    fault: Mutex<Option<String>>,
}

impl Shared {
    fn fault(&self) -> MutexGuard<'_, Option<String>> {
        self.fault.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_fault(&self) -> Result<(), QueueError> {
        match self.fault().as_ref() {
            Some(msg) => Err(QueueError::BackendFault(msg.clone())),
            None => Ok(()),
        }
    }
}

/// Motion queue executing instructions on stepper drivers.
///
/// Channel `n` of every [`MotionSegment`] drives the `n`-th
/// [`StepperChannel`]; steps for channels without pins are ignored.
pub struct StepperQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StepperQueue {
    /// Spawn the consumer thread.
    ///
    /// `enable` is driven high to power the motors and low to release them.
    ///
    /// # Errors
    ///
    /// Returns an error if more than [`MOTOR_COUNT`] channels are given or
    /// the thread cannot be spawned.
    pub fn start<STEP, DIR, EN, D>(
        channels: Vec<StepperChannel<STEP, DIR>>,
        enable: Option<EN>,
        delay: D,
    ) -> std::io::Result<Self>
    where
        STEP: OutputPin + Send + 'static,
        DIR: OutputPin + Send + 'static,
        EN: OutputPin + Send + 'static,
        D: DelayNs + Send + 'static,
    {
        if channels.len() > MOTOR_COUNT {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "{} stepper channels given, at most {} supported",
                    channels.len(),
                    MOTOR_COUNT
                ),
            ));
        }

        let shared = Arc::new(Shared {
            queue: BoundedQueue::new(),
            abort: AtomicBool::new(false),
            fault: Mutex::new(None),
        });

        let mut driver = PulseDriver {
            channels,
            enable,
            delay,
            directions: [None; MOTOR_COUNT],
        };
        let consumer = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("stepper".into())
            .spawn(move || driver.run(&consumer))?;

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Number of instructions waiting for the consumer.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }
}

impl MotionQueue for StepperQueue {
    fn enqueue(&self, instruction: Instruction) -> Result<(), QueueError> {
        self.shared.check_fault()?;
        self.shared.queue.push(instruction).or_else(|e| {
            // A fault closes the queue under a blocked producer.
            self.shared.check_fault()?;
            Err(e)
        })
    }

    fn wait_queue_empty(&self) -> Result<(), QueueError> {
        let drained = self.shared.queue.wait_drained();
        self.shared.check_fault()?;
        drained
    }

    fn shutdown(&self, flush: bool) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(worker) = worker else {
            return;
        };

        if !flush {
            self.shared.abort.store(true, Ordering::Release);
        }
        let discarded = self.shared.queue.close(!flush);
        if discarded > 0 {
            info!(discarded, "dropped pending motion instructions");
        }
        if worker.join().is_err() {
            error!("stepper thread panicked");
        }
    }
}

impl Drop for StepperQueue {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}

/// Consumer-side state, owned by the stepper thread.
struct PulseDriver<STEP, DIR, EN, D> {
    channels: Vec<StepperChannel<STEP, DIR>>,
    enable: Option<EN>,
    delay: D,
    /// Current direction per channel (cached to avoid unnecessary pin writes).
    directions: [Option<bool>; MOTOR_COUNT],
}

impl<STEP, DIR, EN, D> PulseDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    fn run(&mut self, shared: &Shared) {
        while let Some(instruction) = shared.queue.pop() {
            // A panicking pin driver must not leave waiters blocked forever.
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                self.execute(&instruction, &shared.abort)
            }))
            .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));
            // Record the fault before reporting done so a drained waiter sees it.
            let failed = result.is_err();
            if let Err(msg) = result {
                error!(%msg, "stepper backend fault");
                *shared.fault() = Some(msg);
                shared.queue.close(true);
            }
            shared.queue.task_done();
            if failed {
                break;
            }
        }
        debug!("stepper thread exiting");
    }

    fn execute(&mut self, instruction: &Instruction, abort: &AtomicBool) -> Result<(), String> {
        match instruction {
            Instruction::Move(segment) => self.step_segment(segment, abort),
            Instruction::Dwell(ms) => {
                for _ in 0..*ms {
                    if abort.load(Ordering::Acquire) {
                        break;
                    }
                    self.delay.delay_ms(1);
                }
                Ok(())
            }
            Instruction::MotorsEnable(on) => match self.enable.as_mut() {
                Some(pin) if *on => pin.set_high().map_err(pin_error),
                Some(pin) => pin.set_low().map_err(pin_error),
                None => Ok(()),
            },
        }
    }

    fn step_segment(&mut self, segment: &MotionSegment, abort: &AtomicBool) -> Result<(), String> {
        for (n, (channel, steps)) in self.channels.iter_mut().zip(segment.steps).enumerate() {
            if steps == 0 {
                continue;
            }
            let forward = steps > 0;
            if self.directions[n] != Some(forward) {
                if forward {
                    channel.dir.set_high().map_err(pin_error)?;
                } else {
                    channel.dir.set_low().map_err(pin_error)?;
                }
                self.directions[n] = Some(forward);
            }
        }

        let mut executor = SegmentExecutor::new(segment);
        while let Some(tick) = executor.advance() {
            if abort.load(Ordering::Acquire) {
                debug!(
                    done = executor.current_step(),
                    total = executor.total_steps(),
                    "segment aborted"
                );
                return Ok(());
            }

            for (n, channel) in self.channels.iter_mut().enumerate() {
                if tick.steps(n) {
                    channel.step.set_high().map_err(pin_error)?;
                }
            }
            self.delay.delay_ns(PULSE_WIDTH_NS);
            for (n, channel) in self.channels.iter_mut().enumerate() {
                if tick.steps(n) {
                    channel.step.set_low().map_err(pin_error)?;
                }
            }

            let rest_ns = tick.interval_ns.saturating_sub(PULSE_WIDTH_NS);
            if rest_ns > 0 {
                self.delay.delay_ns(rest_ns);
            }
        }
        Ok(())
    }
}

fn pin_error<E: core::fmt::Debug>(e: E) -> String {
    format!("pin error: {:?}", e)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause");
    format!("stepper driver panicked: {}", detail)
}
