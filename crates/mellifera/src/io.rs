//! Output abstraction for the `print` family of builtins.
//!
//! The interpreter writes through a [`PrintWriter`] so hosts and tests can
//! capture or redirect script output. [`StdPrint`] writes to the process
//! stdout/stderr; [`CollectPrint`] accumulates into shared buffers.

use std::{
    cell::RefCell,
    io::{self, Write as _},
    rc::Rc,
};

/// Sink for script output.
pub trait PrintWriter {
    /// Writes bytes to the script's stdout.
    fn stdout_write(&mut self, bytes: &[u8]);

    /// Writes bytes to the script's stderr.
    fn stderr_write(&mut self, bytes: &[u8]);
}

/// Default writer: process stdout/stderr, flushed per write so script
/// output interleaves correctly with diagnostics.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }

    fn stderr_write(&mut self, bytes: &[u8]) {
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(bytes);
        let _ = stderr.flush();
    }
}

/// Writer that collects output into shared buffers.
///
/// Clones share the same buffers, so a test can keep one handle and give
/// the interpreter another.
#[derive(Debug, Clone, Default)]
pub struct CollectPrint {
    stdout: Rc<RefCell<Vec<u8>>>,
    stderr: Rc<RefCell<Vec<u8>>>,
}

impl CollectPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected stdout, decoded with replacement.
    #[must_use]
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout.borrow()).into_owned()
    }

    /// Collected stderr, decoded with replacement.
    #[must_use]
    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr.borrow()).into_owned()
    }
}

impl PrintWriter for CollectPrint {
    fn stdout_write(&mut self, bytes: &[u8]) {
        self.stdout.borrow_mut().extend_from_slice(bytes);
    }

    fn stderr_write(&mut self, bytes: &[u8]) {
        self.stderr.borrow_mut().extend_from_slice(bytes);
    }
}

/// Writer that discards everything.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _bytes: &[u8]) {}

    fn stderr_write(&mut self, _bytes: &[u8]) {}
}
