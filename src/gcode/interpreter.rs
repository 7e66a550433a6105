//! G-code command interpreter.
//!
//! Turns tokenized lines into [`EventReceiver`] calls while tracking the
//! modal session state: units, positioning mode, pending feedrate, `G92`
//! offsets and the logical position in absolute machine millimeters.

use crate::axis::{AxesRegister, Axis, AxisBitmap, N_AXES};
use crate::config::units::MM_PER_INCH;
use crate::error::Result;
use crate::sink::MessageSink;

use super::events::EventReceiver;
use super::tokenizer::{locate_word, next_word, Word};

/// How coordinate words are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    /// Coordinates are positions (`G90`).
    #[default]
    Absolute,
    /// Coordinates are offsets from the current position (`G91`).
    Relative,
}

/// Static interpreter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpreterConfig {
    /// Position every axis takes after `G28`, in machine millimeters.
    pub machine_origin: AxesRegister,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            machine_origin: [0.0; N_AXES],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveKind {
    Rapid,
    Coordinated,
}

/// Stateful G-code interpreter.
///
/// # Example
///
/// ```rust,ignore
/// let mut interpreter = Interpreter::new(InterpreterConfig::default());
/// interpreter.parse_line("G1 X10 Y5 F600", &mut machine)?;
/// ```
#[derive(Debug)]
pub struct Interpreter {
    config: InterpreterConfig,
    unit_to_mm: f32,
    positioning: Positioning,
    pending_feedrate: Option<f32>,
    position: AxesRegister,
    offset: AxesRegister,
    line_number: u32,
    sink: MessageSink,
}

impl Interpreter {
    /// Create an interpreter in metric absolute mode at position 0.
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            config,
            unit_to_mm: 1.0,
            positioning: Positioning::Absolute,
            pending_feedrate: None,
            position: [0.0; N_AXES],
            offset: [0.0; N_AXES],
            line_number: 0,
            sink: MessageSink::none(),
        }
    }

    /// Route lexical diagnostics to `sink`.
    pub fn set_msg_out(&mut self, sink: MessageSink) {
        self.sink = sink;
    }

    /// Logical position in absolute machine millimeters.
    #[inline]
    pub fn position(&self) -> &AxesRegister {
        &self.position
    }

    /// Overwrite the logical position, e.g. to resume where a machine stands.
    pub fn set_position(&mut self, position: AxesRegister) {
        self.position = position;
    }

    /// Current positioning mode.
    #[inline]
    pub fn positioning(&self) -> Positioning {
        self.positioning
    }

    /// Millimeters per programmed unit: 1.0 or 25.4.
    #[inline]
    pub fn unit_to_mm(&self) -> f32 {
        self.unit_to_mm
    }

    /// Number of lines parsed so far.
    #[inline]
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// Interpret one line, dispatching its commands to `receiver`.
    ///
    /// # Errors
    ///
    /// Only errors returned by `receiver` are propagated; malformed input is
    /// reported to the message sink and skipped.
    pub fn parse_line(&mut self, line: &str, receiver: &mut dyn EventReceiver) -> Result<()> {
        self.line_number += 1;
        receiver.begin_line(self.line_number);

        let mut rest = line;
        while let Some((word, after)) = next_word(rest, &mut self.sink) {
            match self.dispatch(word, after, receiver)? {
                Some(remaining) => rest = remaining,
                None => break,
            }
        }
        Ok(())
    }

    fn dispatch<'a>(
        &mut self,
        word: Word,
        rest: &'a str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<Option<&'a str>> {
        let rest = match (word.letter, word.code()) {
            ('G', Some(0)) => self.handle_move(MoveKind::Rapid, rest, receiver)?,
            ('G', Some(1)) => self.handle_move(MoveKind::Coordinated, rest, receiver)?,
            ('G', Some(4)) => self.handle_dwell(rest, receiver)?,
            ('G', Some(20)) => {
                self.unit_to_mm = MM_PER_INCH;
                rest
            }
            ('G', Some(21)) => {
                self.unit_to_mm = 1.0;
                rest
            }
            ('G', Some(28)) => self.handle_home(rest, receiver)?,
            ('G', Some(90)) => {
                self.positioning = Positioning::Absolute;
                rest
            }
            ('G', Some(91)) => {
                self.positioning = Positioning::Relative;
                rest
            }
            ('G', Some(92)) => self.handle_set_position(rest),
            ('M', Some(17)) => {
                receiver.motors_enable(true)?;
                rest
            }
            ('M', Some(18 | 84)) => {
                receiver.motors_enable(false)?;
                rest
            }
            ('M', Some(104)) => {
                let (temp, rest) = self.parameter('S', rest);
                if let Some(temp) = temp {
                    receiver.set_temperature(temp)?;
                }
                rest
            }
            ('M', Some(109)) => {
                let (temp, rest) = self.parameter('S', rest);
                if let Some(temp) = temp {
                    receiver.set_temperature(temp)?;
                }
                receiver.wait_temperature()?;
                rest
            }
            ('M', Some(116)) => {
                receiver.wait_temperature()?;
                rest
            }
            ('M', Some(106)) => {
                let (speed, rest) = self.parameter('S', rest);
                receiver.set_fanspeed(speed.unwrap_or(255.0).clamp(0.0, 255.0))?;
                rest
            }
            ('M', Some(107)) => {
                receiver.set_fanspeed(0.0)?;
                rest
            }
            ('M', Some(220)) => {
                let (percent, rest) = self.parameter('S', rest);
                if let Some(percent) = percent {
                    receiver.set_feedrate_factor(percent / 100.0)?;
                }
                rest
            }
            ('F', _) => {
                self.pending_feedrate = Some(word.value * self.unit_to_mm);
                rest
            }
            _ => return self.delegate(word, rest, receiver),
        };
        Ok(Some(rest))
    }

    fn handle_move<'a>(
        &mut self,
        kind: MoveKind,
        rest: &'a str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<&'a str> {
        let mut target = self.position;
        let mut any_axis = false;
        let unit = self.unit_to_mm;
        let positioning = self.positioning;
        let offset = self.offset;
        let mut feed = None;

        let rest = self.operands(rest, |word| {
            if word.letter == 'F' {
                feed = Some(word.value * unit);
                return true;
            }
            let Some(axis) = Axis::from_letter(word.letter) else {
                return false;
            };
            let i = axis.index();
            let mm = word.value * unit;
            target[i] = match positioning {
                Positioning::Absolute => mm + offset[i],
                Positioning::Relative => target[i] + mm,
            };
            any_axis = true;
            true
        });

        if feed.is_some() {
            self.pending_feedrate = feed;
        }
        if !any_axis {
            return Ok(rest);
        }

        let feed = self.pending_feedrate.take();
        let accepted = match kind {
            MoveKind::Rapid => receiver.rapid_move(feed, &target)?,
            MoveKind::Coordinated => receiver.coordinated_move(feed, &target)?,
        };
        if accepted {
            self.position = target;
        }
        Ok(rest)
    }

    fn handle_dwell<'a>(
        &mut self,
        rest: &'a str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<&'a str> {
        let mut ms = 0.0;
        let rest = self.operands(rest, |word| match word.letter {
            'P' => {
                ms = word.value;
                true
            }
            'S' => {
                ms = word.value * 1000.0;
                true
            }
            _ => false,
        });
        receiver.dwell(ms.max(0.0))?;
        Ok(rest)
    }

    fn handle_home<'a>(
        &mut self,
        rest: &'a str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<&'a str> {
        let mut axes = AxisBitmap::EMPTY;
        let rest = self.operands(rest, |word| match Axis::from_letter(word.letter) {
            Some(axis) => {
                axes.insert(axis);
                true
            }
            None => false,
        });
        if axes.is_empty() {
            axes = AxisBitmap::ALL;
        }

        receiver.go_home(axes)?;
        for axis in axes.iter() {
            let i = axis.index();
            self.position[i] = self.config.machine_origin[i];
            self.offset[i] = 0.0;
        }
        Ok(rest)
    }

    fn handle_set_position<'a>(&mut self, rest: &'a str) -> &'a str {
        let unit = self.unit_to_mm;
        let position = self.position;
        let mut offset = self.offset;
        let mut any_axis = false;

        let rest = self.operands(rest, |word| match Axis::from_letter(word.letter) {
            Some(axis) => {
                let i = axis.index();
                offset[i] = position[i] - word.value * unit;
                any_axis = true;
                true
            }
            None => false,
        });

        self.offset = if any_axis { offset } else { [0.0; N_AXES] };
        rest
    }

    /// Consume consecutive operand words accepted by `accept`; stop before the
    /// first word it declines.
    fn operands<'a>(&mut self, mut rest: &'a str, mut accept: impl FnMut(Word) -> bool) -> &'a str {
        loop {
            match locate_word(rest, &mut self.sink) {
                Some((word, _, after)) if accept(word) => rest = after,
                Some((_, start, _)) => return start,
                None => return &rest[rest.len()..],
            }
        }
    }

    /// Single optional operand named `letter`.
    fn parameter<'a>(&mut self, letter: char, rest: &'a str) -> (Option<f32>, &'a str) {
        let mut value = None;
        let rest = self.operands(rest, |word| {
            if word.letter == letter && value.is_none() {
                value = Some(word.value);
                true
            } else {
                false
            }
        });
        (value, rest)
    }

    fn delegate<'a>(
        &mut self,
        word: Word,
        rest: &'a str,
        receiver: &mut dyn EventReceiver,
    ) -> Result<Option<&'a str>> {
        match receiver.unprocessed(word.letter, word.value, rest)? {
            None => Ok(None),
            Some(remaining) if is_suffix_of(remaining, rest) => Ok(Some(remaining)),
            Some(_) => {
                debug_assert!(
                    false,
                    "handler for {}{} returned text outside its remainder",
                    word.letter, word.value
                );
                self.sink.diagnostic(format_args!(
                    "line {}: handler for {}{} did not advance; dropping rest of line",
                    self.line_number, word.letter, word.value
                ));
                Ok(None)
            }
        }
    }
}

/// True if `part` is a tail of `whole` (same end, same buffer).
fn is_suffix_of(part: &str, whole: &str) -> bool {
    let whole_start = whole.as_ptr() as usize;
    let whole_end = whole_start + whole.len();
    let part_start = part.as_ptr() as usize;
    part_start >= whole_start && part_start + part.len() == whole_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, QueueError};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Home(AxisBitmap),
        Factor(f32),
        Fan(f32),
        Temp(f32),
        WaitTemp,
        Dwell(f32),
        Motors(bool),
        Move(Option<f32>, AxesRegister),
        Rapid(Option<f32>, AxesRegister),
        Unprocessed(char, f32, String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        reject_moves: bool,
        fail_moves: bool,
    }

    impl EventReceiver for Recorder {
        fn go_home(&mut self, axes: AxisBitmap) -> Result<()> {
            self.events.push(Event::Home(axes));
            Ok(())
        }
        fn set_feedrate_factor(&mut self, factor: f32) -> Result<()> {
            self.events.push(Event::Factor(factor));
            Ok(())
        }
        fn set_fanspeed(&mut self, speed: f32) -> Result<()> {
            self.events.push(Event::Fan(speed));
            Ok(())
        }
        fn set_temperature(&mut self, degrees_c: f32) -> Result<()> {
            self.events.push(Event::Temp(degrees_c));
            Ok(())
        }
        fn wait_temperature(&mut self) -> Result<()> {
            self.events.push(Event::WaitTemp);
            Ok(())
        }
        fn dwell(&mut self, ms: f32) -> Result<()> {
            self.events.push(Event::Dwell(ms));
            Ok(())
        }
        fn motors_enable(&mut self, enable: bool) -> Result<()> {
            self.events.push(Event::Motors(enable));
            Ok(())
        }
        fn coordinated_move(&mut self, feed: Option<f32>, target: &AxesRegister) -> Result<bool> {
            if self.fail_moves {
                return Err(Error::Queue(QueueError::Shutdown));
            }
            self.events.push(Event::Move(feed, *target));
            Ok(!self.reject_moves)
        }
        fn rapid_move(&mut self, feed: Option<f32>, target: &AxesRegister) -> Result<bool> {
            self.events.push(Event::Rapid(feed, *target));
            Ok(!self.reject_moves)
        }
        fn unprocessed<'a>(
            &mut self,
            letter: char,
            value: f32,
            rest: &'a str,
        ) -> Result<Option<&'a str>> {
            self.events
                .push(Event::Unprocessed(letter, value, rest.to_string()));
            Ok(Some(rest))
        }
    }

    fn run(lines: &[&str]) -> (Interpreter, Vec<Event>) {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut recorder = Recorder::default();
        for line in lines {
            interpreter.parse_line(line, &mut recorder).unwrap();
        }
        (interpreter, recorder.events)
    }

    fn xyz(x: f32, y: f32, z: f32) -> AxesRegister {
        let mut r = [0.0; N_AXES];
        r[0] = x;
        r[1] = y;
        r[2] = z;
        r
    }

    #[test]
    fn test_feedrate_only_when_given() {
        let (_, events) = run(&["G1 X1 F1200", "G1 X2", "F300", "G1 X3"]);
        assert_eq!(
            events,
            vec![
                Event::Move(Some(1200.0), xyz(1.0, 0.0, 0.0)),
                Event::Move(None, xyz(2.0, 0.0, 0.0)),
                Event::Move(Some(300.0), xyz(3.0, 0.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_g1_without_axes_keeps_feedrate() {
        let (_, events) = run(&["G1 F900", "G1 Y1"]);
        assert_eq!(events, vec![Event::Move(Some(900.0), xyz(0.0, 1.0, 0.0))]);
    }

    #[test]
    fn test_imperial_not_retroactive() {
        let (interp, events) = run(&["G1 X1", "G20", "G1 Y1", "G21", "G91", "G1 Z1"]);
        assert_eq!(interp.position()[0], 1.0);
        assert_eq!(interp.unit_to_mm(), 1.0);
        assert_eq!(run(&["G20"]).0.unit_to_mm(), MM_PER_INCH);
        assert_eq!(events[1], Event::Move(None, xyz(1.0, MM_PER_INCH, 0.0)));
        assert_eq!(events[2], Event::Move(None, xyz(1.0, MM_PER_INCH, 1.0)));
    }

    #[test]
    fn test_g92_offsets_following_moves() {
        let (interp, events) = run(&["G1 X50", "G92 X0", "G1 X10", "G28 X", "G1 X10"]);
        assert_eq!(events[1], Event::Move(None, xyz(60.0, 0.0, 0.0)));
        // Homing clears the offset of the homed axis.
        assert_eq!(events[3], Event::Move(None, xyz(10.0, 0.0, 0.0)));
        assert_eq!(interp.position()[0], 10.0);
    }

    #[test]
    fn test_g92_without_axes_clears_offsets() {
        let (_, events) = run(&["G1 X5", "G92 X0", "G92", "G1 X1"]);
        assert_eq!(events[1], Event::Move(None, xyz(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_home_all_and_origin() {
        let mut origin = [0.0; N_AXES];
        origin[2] = 200.0;
        let mut interpreter = Interpreter::new(InterpreterConfig {
            machine_origin: origin,
        });
        let mut recorder = Recorder::default();
        interpreter.parse_line("G1 X5 Y5 Z5", &mut recorder).unwrap();
        interpreter.parse_line("G28", &mut recorder).unwrap();
        assert_eq!(recorder.events[1], Event::Home(AxisBitmap::ALL));
        assert_eq!(*interpreter.position(), origin);
    }

    #[test]
    fn test_rejected_move_keeps_position() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut recorder = Recorder {
            reject_moves: true,
            ..Default::default()
        };
        interpreter.parse_line("G1 X150", &mut recorder).unwrap();
        assert_eq!(interpreter.position()[0], 0.0);
    }

    #[test]
    fn test_receiver_error_propagates() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let mut recorder = Recorder {
            fail_moves: true,
            ..Default::default()
        };
        assert!(interpreter.parse_line("G1 X1", &mut recorder).is_err());
        assert_eq!(interpreter.position()[0], 0.0);
    }

    #[test]
    fn test_dwell_and_misc_codes() {
        let (_, events) = run(&[
            "G4 P250", "G4 S2", "M17", "M84", "M104 S210", "M109 S215", "M116", "M106", "M107",
            "M220 S50",
        ]);
        assert_eq!(
            events,
            vec![
                Event::Dwell(250.0),
                Event::Dwell(2000.0),
                Event::Motors(true),
                Event::Motors(false),
                Event::Temp(210.0),
                Event::Temp(215.0),
                Event::WaitTemp,
                Event::WaitTemp,
                Event::Fan(255.0),
                Event::Fan(0.0),
                Event::Factor(0.5),
            ]
        );
    }

    #[test]
    fn test_unknown_words_delegated() {
        let (_, events) = run(&["M114", "G38.2 X1", "T1 G90"]);
        assert_eq!(
            events,
            vec![
                Event::Unprocessed('M', 114.0, String::new()),
                Event::Unprocessed('G', 38.2, " X1".into()),
                // The recorder consumes nothing, so X1 is delegated as well.
                Event::Unprocessed('X', 1.0, String::new()),
                Event::Unprocessed('T', 1.0, " G90".into()),
            ]
        );
    }

    #[test]
    fn test_operands_stop_at_next_command() {
        let (interp, events) = run(&["G1 X1 G91 G1 X1"]);
        assert_eq!(events[1], Event::Move(None, xyz(2.0, 0.0, 0.0)));
        assert_eq!(interp.positioning(), Positioning::Relative);
    }

    #[test]
    fn test_line_counter() {
        let (interp, _) = run(&["", "; comment", "G1 X1"]);
        assert_eq!(interp.line_number(), 3);
    }

    struct Misbehaving;

    impl EventReceiver for Misbehaving {
        fn go_home(&mut self, _: AxisBitmap) -> Result<()> {
            Ok(())
        }
        fn set_feedrate_factor(&mut self, _: f32) -> Result<()> {
            Ok(())
        }
        fn dwell(&mut self, _: f32) -> Result<()> {
            Ok(())
        }
        fn motors_enable(&mut self, _: bool) -> Result<()> {
            Ok(())
        }
        fn coordinated_move(&mut self, _: Option<f32>, _: &AxesRegister) -> Result<bool> {
            Ok(true)
        }
        fn rapid_move(&mut self, _: Option<f32>, _: &AxesRegister) -> Result<bool> {
            Ok(true)
        }
        fn unprocessed<'a>(&mut self, _: char, _: f32, _: &'a str) -> Result<Option<&'a str>> {
            Ok(Some("M999 this is not part of the line"))
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside its remainder")]
    fn test_non_advancing_handler_is_a_defect() {
        let mut interpreter = Interpreter::new(InterpreterConfig::default());
        let _ = interpreter.parse_line("M999 X1", &mut Misbehaving);
    }

    #[test]
    fn test_suffix_check() {
        let line = "G1 X1 Y2";
        assert!(is_suffix_of(&line[5..], line));
        assert!(is_suffix_of(&line[line.len()..], line));
        assert!(!is_suffix_of(&line[..5], line));
        let copy = String::from("Y2");
        assert!(!is_suffix_of(&copy, line));
    }
}
