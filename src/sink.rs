//! Diagnostic output sink.
//!
//! G-code diagnostics ("// ERROR ...", position reports, acknowledgements) are
//! part of the conversation with whoever sent the G-code, so they go to an
//! explicitly passed sink rather than to the process log. A session rebinds the
//! sink to its own stream (stderr for a file run, the socket for a network
//! client).

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Optional destination for diagnostic text. An empty sink drops everything.
#[derive(Default)]
pub struct MessageSink {
    out: Option<Box<dyn Write + Send>>,
}

impl MessageSink {
    /// Sink that silently drops all messages.
    pub fn none() -> Self {
        Self { out: None }
    }

    /// Sink writing to `out`.
    pub fn new<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Some(Box::new(out)),
        }
    }

    /// Sink writing to stderr.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }

    /// True if messages go anywhere.
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.out.is_some()
    }

    /// Write one line. Write failures detach the sink: a client that went
    /// away should not turn into an error on every subsequent line.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Some(out) = self.out.as_mut() {
            let ok = out
                .write_fmt(args)
                .and_then(|_| out.write_all(b"\n"))
                .and_then(|_| out.flush());
            if ok.is_err() {
                self.out = None;
            }
        }
    }

    /// Write a `// `-prefixed diagnostic line.
    pub fn diagnostic(&mut self, args: fmt::Arguments<'_>) {
        self.line(format_args!("// {}", args));
    }
}

impl fmt::Debug for MessageSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// In-memory writer whose contents can be read back after being handed to a
/// [`MessageSink`] or a trace backend.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(std::io::Error::other("buffer poisoned")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefix() {
        let buf = SharedBuffer::new();
        let mut sink = MessageSink::new(buf.clone());
        sink.diagnostic(format_args!("hello {}", 42));
        sink.line(format_args!("ok"));
        assert_eq!(buf.contents(), "// hello 42\nok\n");
    }

    #[test]
    fn test_none_drops() {
        let mut sink = MessageSink::none();
        assert!(!sink.is_attached());
        sink.diagnostic(format_args!("dropped"));
    }
}
