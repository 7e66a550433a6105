//! Motion module for gcode-motion.
//!
//! Provides trapezoid profile calculation, the queue element types and step
//! scheduling for a single segment.

mod executor;
mod profile;
mod segment;

pub use executor::{SegmentExecutor, StepTick};
pub use profile::{MotionPhase, MotionProfile, PhaseSpan};
pub use segment::{Instruction, MotionSegment};
