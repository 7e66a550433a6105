//! Commands the interpreter leaves to the machine: status reports and
//! host-interface M codes.

use crate::axis::Axis;
use crate::config::{EndstopConfig, TriggerLevel};
use crate::gcode::next_word;

use super::control::MachineControl;

impl MachineControl<'_> {
    /// Handle a word the interpreter did not recognize.
    ///
    /// Returns the unconsumed rest of the line, `None` when the rest of the
    /// line is consumed.
    pub(super) fn extra_command<'a>(
        &mut self,
        letter: char,
        value: f32,
        rest: &'a str,
    ) -> Option<&'a str> {
        let code = (value >= 0.0 && value.fract() == 0.0).then_some(value as u32);
        match (letter, code) {
            ('M', Some(105)) => {
                let temp = self.temperature.unwrap_or(0.0);
                self.sink.line(format_args!("T:{:.1} /{:.1}", temp, temp));
                Some(rest)
            }
            ('M', Some(111)) => {
                let (level, rest) = match next_word(rest, &mut self.sink) {
                    Some((word, after)) if word.letter == 'S' => (Some(word.value), after),
                    _ => (None, rest),
                };
                if let Some(level) = level {
                    self.config.debug_print = level > 0.0;
                }
                Some(rest)
            }
            ('M', Some(114)) => {
                let mut report = String::new();
                for axis in [Axis::X, Axis::Y, Axis::Z, Axis::E] {
                    if !report.is_empty() {
                        report.push(' ');
                    }
                    report.push_str(&format!("{}:{:.3}", axis, self.position[axis.index()]));
                }
                self.sink.line(format_args!("{}", report));
                Some(rest)
            }
            ('M', Some(115)) => {
                self.sink.line(format_args!(
                    "FIRMWARE_NAME:{} {} PROTOCOL_VERSION:1.0",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                ));
                Some(rest)
            }
            ('M', Some(117)) => {
                self.sink.diagnostic(format_args!("msg: {}", rest.trim()));
                None
            }
            ('M', Some(119)) => {
                self.report_endstops();
                Some(rest)
            }
            _ => {
                self.sink.diagnostic(format_args!(
                    "unrecognized command {}{} (line {}): '{}'",
                    letter,
                    value,
                    self.line,
                    rest.trim()
                ));
                None
            }
        }
    }

    fn report_endstops(&mut self) {
        let mut lines = Vec::new();
        for (axis, config) in self.config.configured_axes() {
            let describe = |end: Option<EndstopConfig>| match end {
                Some(e) if !e.is_wired() => {
                    if e.homing {
                        "unwired (homing)".into()
                    } else {
                        "unwired".into()
                    }
                }
                Some(e) => format!(
                    "switch {} ({}{})",
                    e.switch,
                    match e.trigger {
                        TriggerLevel::Low => "low",
                        TriggerLevel::High => "high",
                    },
                    if e.homing { ", homing" } else { "" }
                ),
                None => "-".into(),
            };
            lines.push(format!(
                "{}_min: {} {}_max: {}",
                axis,
                describe(config.min_endstop),
                axis,
                describe(config.max_endstop)
            ));
        }
        for line in lines {
            self.sink.line(format_args!("{}", line));
        }
    }
}
