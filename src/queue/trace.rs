//! Backend that prints instructions instead of executing them.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use crate::error::QueueError;
use crate::motion::Instruction;

use super::MotionQueue;

struct Inner {
    out: Option<Box<dyn Write + Send>>,
    count: u64,
}

/// Writes one line per instruction to a writer. Used for simulation runs.
///
/// Output columns: sequence number, then the instruction as formatted by
/// its `Display` impl, with the step columns limited to `motor_count`.
pub struct TraceQueue {
    inner: Mutex<Inner>,
    motor_count: usize,
}

impl TraceQueue {
    /// Trace to `out`, printing the first `motor_count` channels of moves.
    pub fn new<W: Write + Send + 'static>(out: W, motor_count: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out: Some(Box::new(out)),
                count: 0,
            }),
            motor_count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn format(&self, instruction: &Instruction) -> String {
        match instruction {
            Instruction::Move(segment) => {
                let mut line = String::from("move");
                for steps in segment.steps.iter().take(self.motor_count.max(1)) {
                    line.push_str(&format!(" {:6}", steps));
                }
                line.push_str(&format!(
                    " | v0={:.1} v1={:.1} steps/s | {:.3}s | F={:.2}mm/s",
                    segment.v0,
                    segment.v1,
                    segment.duration_secs(),
                    segment.feedrate
                ));
                line
            }
            other => other.to_string(),
        }
    }
}

impl MotionQueue for TraceQueue {
    fn enqueue(&self, instruction: Instruction) -> Result<(), QueueError> {
        let line = self.format(&instruction);
        let mut inner = self.lock();
        let Inner { out, count } = &mut *inner;
        let out = out.as_mut().ok_or(QueueError::Shutdown)?;
        *count += 1;
        writeln!(out, "{:5} {}", count, line)
            .and_then(|_| out.flush())
            .map_err(|e| QueueError::BackendFault(e.to_string()))
    }

    fn shutdown(&self, _flush: bool) {
        if let Some(mut out) = self.lock().out.take() {
            let _ = out.flush();
        }
    }
}
