//! Input/output plumbing for one invocation.
//!
//! `--input` and `--output` rebind where the stream is read from and where
//! STATE lines, probe results and the `finished` marker are written. The
//! binding is carried as an [`IoContext`] value rather than by swapping the
//! process's file descriptors, so tests can run against in-memory buffers.

use crate::error::TargetError;

use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Where the stream engine reads messages from.
pub enum InputSource {
    /// The process's standard input, resolved by the engine's default entry point
    Stdin,
    /// An explicitly supplied reader
    Reader(Box<dyn BufRead + Send>),
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => f.write_str("Stdin"),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Input and output bindings for one invocation.
pub struct IoContext {
    input: InputSource,
    output: Box<dyn Write + Send>,
}

impl IoContext {
    /// Build a context from an explicit input source and output writer.
    pub fn new(input: InputSource, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    /// Bind input and/or output to files, keeping stdio for absent paths.
    ///
    /// The output file is created or truncated. Fails with `IoOpen` naming
    /// the first path that cannot be opened.
    pub fn from_paths(input: Option<&Path>, output: Option<&Path>) -> Result<Self, TargetError> {
        let input = match input {
            Some(path) => {
                let file = File::open(path).map_err(|e| TargetError::io_open(path, e))?;
                tracing::debug!(path = %path.display(), "Input redirected");
                InputSource::Reader(Box::new(BufReader::new(file)))
            }
            None => InputSource::Stdin,
        };

        let output: Box<dyn Write + Send> = match output {
            Some(path) => {
                let file = File::create(path).map_err(|e| TargetError::io_open(path, e))?;
                tracing::debug!(path = %path.display(), "Output redirected");
                Box::new(BufWriter::new(file))
            }
            None => Box::new(std::io::stdout()),
        };

        Ok(Self { input, output })
    }

    /// Whether input comes from an explicitly supplied reader.
    pub fn has_explicit_input(&self) -> bool {
        matches!(self.input, InputSource::Reader(_))
    }

    /// Split into the input source and a mutable handle to the output.
    pub fn split(&mut self) -> (&mut InputSource, &mut (dyn Write + Send)) {
        (&mut self.input, self.output.as_mut())
    }

    /// Write one line to the output and flush it.
    pub fn write_line(&mut self, line: &str) -> Result<(), TargetError> {
        writeln!(self.output, "{line}")
            .and_then(|_| self.output.flush())
            .map_err(|e| TargetError::internal(format!("Failed to write output: {e}")))
    }
}

impl std::fmt::Debug for IoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoContext").field("input", &self.input).finish_non_exhaustive()
    }
}

/// In-memory output sink whose contents stay readable after the writer moves.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
