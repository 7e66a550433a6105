//! Event interface between the interpreter and whatever executes G-code.

use crate::axis::{AxesRegister, AxisBitmap};
use crate::error::Result;

/// Receiver of the semantic events the [`Interpreter`](super::Interpreter)
/// derives from G-code.
///
/// Positions are absolute machine coordinates in millimeters; unit
/// conversion, relative mode and `G92` offsets are already applied.
/// Feedrates are passed in mm/min as written in the program, `None` when the
/// line did not carry a new `F` value.
///
/// An `Err` from any method aborts the current line and is propagated to the
/// caller of [`Interpreter::parse_line`](super::Interpreter::parse_line).
/// Policy rejections are not errors: a move that is refused returns
/// `Ok(false)`.
pub trait EventReceiver {
    /// Called before the words of line `line_number` are dispatched.
    fn begin_line(&mut self, _line_number: u32) {}

    /// Home the given axes (`G28`). Never empty: `G28` alone homes all.
    fn go_home(&mut self, axes: AxisBitmap) -> Result<()>;

    /// Feedrate override factor (`M220 S<percent>`, passed as a fraction).
    fn set_feedrate_factor(&mut self, factor: f32) -> Result<()>;

    /// Fan speed in 0..=255 (`M106`, `M107`).
    fn set_fanspeed(&mut self, _speed: f32) -> Result<()> {
        Ok(())
    }

    /// Heater target in degrees Celsius (`M104`, `M109`).
    fn set_temperature(&mut self, _degrees_c: f32) -> Result<()> {
        Ok(())
    }

    /// Block until the heater reached its target (`M109`, `M116`).
    fn wait_temperature(&mut self) -> Result<()> {
        Ok(())
    }

    /// Pause motion for `ms` milliseconds (`G4`).
    fn dwell(&mut self, ms: f32) -> Result<()>;

    /// Power motors on or off (`M17`, `M18`, `M84`).
    fn motors_enable(&mut self, enable: bool) -> Result<()>;

    /// Straight move at the programmed feedrate (`G1`).
    ///
    /// Returns `Ok(false)` if the move was refused; the interpreter then keeps
    /// its previous position.
    fn coordinated_move(&mut self, feed_mm_per_min: Option<f32>, target: &AxesRegister)
        -> Result<bool>;

    /// Move as fast as the machine allows (`G0`), or at `feed_mm_per_min`
    /// when given.
    fn rapid_move(&mut self, feed_mm_per_min: Option<f32>, target: &AxesRegister) -> Result<bool>;

    /// A word the interpreter does not handle itself.
    ///
    /// `rest` is the unparsed remainder of the line after the word. Return
    /// the part of `rest` that is still to be parsed: `Some(rest)` if nothing
    /// was consumed, a shorter suffix if the handler read operands (with
    /// [`next_word`](super::next_word)), or `None` to drop the remainder.
    fn unprocessed<'a>(&mut self, letter: char, value: f32, rest: &'a str)
        -> Result<Option<&'a str>>;
}
