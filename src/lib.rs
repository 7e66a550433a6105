//! # gcode-motion
//!
//! G-code interpreter and motion pipeline for stepper-driven machines with
//! embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Tokenizer**: letter/value words, comments, line numbers and checksums
//! - **Interpreter**: modal units, absolute/relative positioning, `G92` offsets
//! - **Machine control**: speed factor, homing gate, soft limits, motor mapping
//! - **Trapezoid planning**: acceleration-bounded segments per move
//! - **Motion queues**: embedded-hal stepper backend, dry-run and trace backends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gcode_motion::{load_config, EventReceiver, Interpreter, MachineControl, NullQueue};
//!
//! let config = load_config("machine.toml")?;
//! let queue = NullQueue::new();
//! let mut machine = MachineControl::new(config, &queue)?;
//! let mut interpreter = gcode_motion::session::new_interpreter(&machine);
//!
//! interpreter.parse_line("G28", &mut machine)?;
//! interpreter.parse_line("G1 X10 Y5 F600", &mut machine)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod axis;
pub mod config;
pub mod error;
pub mod gcode;
pub mod machine;
pub mod motion;
pub mod queue;
pub mod session;
pub mod sink;

// Re-exports for ergonomic API
pub use axis::{AxesRegister, Axis, AxisBitmap, N_AXES};
pub use config::{load_config, parse_config, validate_config, MachineConfig};
pub use error::{Error, Result};
pub use gcode::{EventReceiver, Interpreter, InterpreterConfig};
pub use machine::MachineControl;
pub use motion::{Instruction, MotionProfile, MotionSegment};
pub use queue::{MotionQueue, NullQueue, StepperQueue, TraceQueue};
pub use sink::MessageSink;
