//! Output sinks for the `out` instruction and debug-mode dumps.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::api::OutputSink;
use crate::state::CpuContext;

type SharedWriter = Mutex<Box<dyn Write + Send>>;

/// Console backed by two writers, each behind its own lock.
pub struct Console {
    output: SharedWriter,
    debug: SharedWriter,
}

impl Console {
    /// Program output on stdout, debug dumps on stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Builds a console over arbitrary writers.
    #[must_use]
    pub fn new(output: Box<dyn Write + Send>, debug: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(output),
            debug: Mutex::new(debug),
        }
    }

    /// Flushes both streams.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error reported by either writer.
    pub fn flush(&self) -> io::Result<()> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        self.debug
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl OutputSink for Console {
    fn emit(&self, byte: u8) {
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = out.write_all(&[byte]).and_then(|()| out.flush()) {
            tracing::warn!(%err, "program output write failed");
        }
    }

    fn debug_dump(&self, ctx: &CpuContext) {
        let mut out = self.debug.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = write!(out, "{ctx}") {
            tracing::warn!(%err, "debug dump write failed");
        }
    }
}

/// In-memory sink that records everything written to it.
#[derive(Debug, Default)]
pub struct CaptureConsole {
    output: Mutex<Vec<u8>>,
    debug: Mutex<String>,
}

impl CaptureConsole {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes emitted by `out`, in arrival order.
    #[must_use]
    pub fn output_bytes(&self) -> Vec<u8> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Concatenated debug dumps.
    #[must_use]
    pub fn debug_text(&self) -> String {
        self.debug
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OutputSink for CaptureConsole {
    fn emit(&self, byte: u8) {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(byte);
    }

    fn debug_dump(&self, ctx: &CpuContext) {
        let dump = ctx.to_string();
        self.debug
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(&dump);
    }
}
