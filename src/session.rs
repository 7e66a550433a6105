//! G-code sessions: feed lines from a file or a network client through an
//! [`Interpreter`] into a [`MachineControl`].
//!
//! Every session starts a fresh interpreter (metric, absolute, no offsets)
//! positioned where the machine currently stands. The machine control and
//! its homing state outlive the session.

use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::net::TcpListener;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::gcode::{Interpreter, InterpreterConfig};
use crate::machine::MachineControl;
use crate::sink::MessageSink;

/// Read timeout on client sockets, so the cancel flag is polled.
pub const CLIENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Pause between accept attempts on an idle listener.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input was exhausted.
    EndOfInput,
    /// The cancel flag was raised.
    Cancelled,
}

/// Per-session options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Answer every line with `ok` (host protocol for network clients).
    pub acknowledge: bool,
}

/// Interpreter positioned at the machine's current location.
pub fn new_interpreter(machine: &MachineControl<'_>) -> Interpreter {
    let mut interpreter = Interpreter::new(InterpreterConfig {
        machine_origin: machine.home_position(),
    });
    interpreter.set_position(machine.position());
    interpreter
}

/// Run one line-oriented session from `reader`.
///
/// Stops at end of input, when `cancel` is raised, or on the first error.
/// Lines that are not valid UTF-8 are decoded lossily.
///
/// # Errors
///
/// Returns [`Error::Io`] for read errors and [`Error::Queue`] when the
/// motion backend fails.
pub fn run_stream<R: BufRead>(
    reader: &mut R,
    interpreter: &mut Interpreter,
    machine: &mut MachineControl<'_>,
    options: SessionOptions,
    cancel: &AtomicBool,
) -> Result<SessionEnd> {
    let mut buf = Vec::new();
    loop {
        if cancel.load(Ordering::Acquire) {
            return Ok(SessionEnd::Cancelled);
        }

        match reader.read_until(b'\n', &mut buf) {
            Ok(0) if buf.is_empty() => return Ok(SessionEnd::EndOfInput),
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                // Partial line stays in `buf`.
                continue;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        let line = String::from_utf8_lossy(&buf);
        interpreter.parse_line(line.trim_end_matches(['\r', '\n']), machine)?;
        if options.acknowledge {
            machine.msg_out().line(format_args!("ok"));
        }
        buf.clear();
    }
}

/// Run the G-code file at `path`, `loops` times or forever for `None`.
///
/// Diagnostics go to stderr.
///
/// # Errors
///
/// Returns the first error of any iteration; later iterations are skipped.
pub fn run_file(
    path: &Path,
    loops: Option<u32>,
    machine: &mut MachineControl<'_>,
    cancel: &AtomicBool,
) -> Result<SessionEnd> {
    machine.set_msg_out(MessageSink::stderr());
    let mut iteration = 0u32;
    while loops.map_or(true, |n| iteration < n) {
        iteration += 1;
        let file = File::open(path)
            .map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        let mut reader = BufReader::new(file);

        let mut interpreter = new_interpreter(machine);
        interpreter.set_msg_out(MessageSink::stderr());
        info!(path = %path.display(), iteration, "running file");

        let end = run_stream(
            &mut reader,
            &mut interpreter,
            machine,
            SessionOptions::default(),
            cancel,
        )?;
        if end == SessionEnd::Cancelled {
            return Ok(end);
        }
    }
    Ok(SessionEnd::EndOfInput)
}

/// Serve G-code sessions on `listener`, one connection at a time.
///
/// Returns when `cancel` is raised. A connection that fails with an I/O
/// error only ends that connection; a motion backend failure ends serving.
///
/// # Errors
///
/// Returns listener errors and backend errors.
pub fn serve(
    listener: &TcpListener,
    machine: &mut MachineControl<'_>,
    cancel: &AtomicBool,
) -> Result<()> {
    listener.set_nonblocking(true)?;
    info!(addr = ?listener.local_addr().ok(), "listening");

    loop {
        if cancel.load(Ordering::Acquire) {
            return Ok(());
        }
        let (stream, peer) = match listener.accept() {
            Ok(conn) => conn,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        info!(%peer, "accepted connection");
        let session = (|| -> io::Result<_> {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(CLIENT_POLL_INTERVAL))?;
            Ok((stream.try_clone()?, stream.try_clone()?))
        })();
        let (machine_out, interpreter_out) = match session {
            Ok(writers) => writers,
            Err(e) => {
                warn!(%peer, error = %e, "cannot set up connection");
                continue;
            }
        };

        machine.set_msg_out(MessageSink::new(machine_out));
        let mut interpreter = new_interpreter(machine);
        interpreter.set_msg_out(MessageSink::new(interpreter_out));

        let result = run_stream(
            &mut BufReader::new(stream),
            &mut interpreter,
            machine,
            SessionOptions { acknowledge: true },
            cancel,
        );
        machine.set_msg_out(MessageSink::none());

        match result {
            Ok(SessionEnd::EndOfInput) => info!(%peer, "connection closed"),
            Ok(SessionEnd::Cancelled) => return Ok(()),
            Err(Error::Io(e)) => warn!(%peer, error = %e, "connection failed"),
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::config::{AxisConfig, MachineConfig, MmPerSec, MmPerSecSquared};
    use crate::queue::{MotionQueue, NullQueue};
    use crate::sink::SharedBuffer;
    use std::io::Cursor;

    fn config() -> MachineConfig {
        MachineConfig::new("XY")
            .with_axis(Axis::X, AxisConfig::new(100.0, MmPerSec(100.0), MmPerSecSquared(0.0)))
            .with_axis(Axis::Y, AxisConfig::new(100.0, MmPerSec(100.0), MmPerSecSquared(0.0)))
    }

    #[test]
    fn test_stream_acknowledges_each_line() {
        let queue = NullQueue::new();
        let mut machine = MachineControl::new(config(), &queue).unwrap();
        let out = SharedBuffer::new();
        machine.set_msg_out(MessageSink::new(out.clone()));
        let mut interpreter = new_interpreter(&machine);

        let mut input = Cursor::new("G1 X1\r\nG1 Y1\n; done");
        let end = run_stream(
            &mut input,
            &mut interpreter,
            &mut machine,
            SessionOptions { acknowledge: true },
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(end, SessionEnd::EndOfInput);
        assert_eq!(out.contents(), "ok\nok\nok\n");
        assert_eq!(queue.accepted(), 2);
        assert_eq!(machine.position()[1], 1.0);
    }

    #[test]
    fn test_cancel_stops_before_next_line() {
        let queue = NullQueue::new();
        let mut machine = MachineControl::new(config(), &queue).unwrap();
        let mut interpreter = new_interpreter(&machine);
        let end = run_stream(
            &mut Cursor::new("G1 X1\n"),
            &mut interpreter,
            &mut machine,
            SessionOptions::default(),
            &AtomicBool::new(true),
        )
        .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
        assert_eq!(queue.accepted(), 0);
    }

    #[test]
    fn test_backend_error_ends_session() {
        let queue = NullQueue::new();
        queue.shutdown(false);
        let mut machine = MachineControl::new(config(), &queue).unwrap();
        let mut interpreter = new_interpreter(&machine);
        let result = run_stream(
            &mut Cursor::new("G1 X1\nG1 X2\n"),
            &mut interpreter,
            &mut machine,
            SessionOptions::default(),
            &AtomicBool::new(false),
        );
        assert!(matches!(result, Err(Error::Queue(_))));
        assert_eq!(interpreter.line_number(), 1);
    }
}
