//! Motion queue backends.
//!
//! A [`MotionQueue`] accepts [`Instruction`]s in order and executes them
//! asynchronously. The backend is chosen at startup:
//!
//! - [`StepperQueue`]: drives step/dir pins from a consumer thread
//! - [`NullQueue`]: accepts and discards (dry run)
//! - [`TraceQueue`]: writes one line per instruction (simulation)

mod bounded;
mod null;
mod stepper;
mod trace;

pub use bounded::BoundedQueue;
pub use null::NullQueue;
pub use stepper::{StepperChannel, StepperQueue, PULSE_WIDTH_NS};
pub use trace::TraceQueue;

use crate::error::QueueError;
use crate::motion::Instruction;

/// Number of instructions a hardware queue buffers.
pub const QUEUE_CAPACITY: usize = 128;

/// Ordered sink for motion instructions, shared between the session thread
/// and the signal handler.
pub trait MotionQueue: Send + Sync {
    /// Append an instruction, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// [`QueueError::Shutdown`] after [`shutdown`](Self::shutdown),
    /// [`QueueError::BackendFault`] once the backend failed.
    fn enqueue(&self, instruction: Instruction) -> Result<(), QueueError>;

    /// Block until everything enqueued so far has been executed.
    ///
    /// # Errors
    ///
    /// Same as [`enqueue`](Self::enqueue).
    fn wait_queue_empty(&self) -> Result<(), QueueError> {
        Ok(())
    }

    /// Stop accepting instructions. With `flush` pending instructions are
    /// executed first, otherwise they are dropped and running motion stops.
    ///
    /// Calling it again has no effect.
    fn shutdown(&self, flush: bool);
}
