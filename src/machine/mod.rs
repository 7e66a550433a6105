//! Machine control: the [`MachineControl`] pipeline between the G-code
//! interpreter and a motion queue.

mod commands;
mod control;
pub mod planner;

pub use control::MachineControl;
