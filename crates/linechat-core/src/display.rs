//! Sinks for user-visible output.
//!
//! Everything the consoles show a human goes through [`ChatDisplay`].
//! Diagnostics go to `tracing` instead.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

/// Destination for lines shown to the operator or user.
pub trait ChatDisplay: Send {
    /// Show one line.
    fn display(&mut self, line: &str);
}

/// Writes each line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutDisplay;

impl ChatDisplay for StdoutDisplay {
    fn display(&mut self, line: &str) {
        if let Err(e) = writeln!(io::stdout().lock(), "{line}") {
            tracing::warn!("Failed to write to stdout: {e}");
        }
    }
}

/// Collects lines in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryDisplay {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryDisplay {
    /// Create an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line shown so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether `line` has been shown.
    pub fn contains(&self, line: &str) -> bool {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).iter().any(|l| l == line)
    }

    /// Forget all lines.
    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl ChatDisplay for MemoryDisplay {
    fn display(&mut self, line: &str) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_buffer() {
        let display = MemoryDisplay::new();
        let mut writer = display.clone();
        writer.display("one");
        writer.display("two");

        assert_eq!(display.lines(), ["one", "two"]);
        assert!(display.contains("two"));

        display.clear();
        assert!(writer.lines().is_empty());
    }
}
