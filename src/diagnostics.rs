//! Diagnostics sink threaded through the pipeline.
//!
//! Every entry is recorded (so callers and tests can inspect what happened
//! during a run) and forwarded to `tracing` at the matching level.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{message}");
        self.push(Severity::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.push(Severity::Warning, message);
    }

    /// Record a recoverable error as a warning.
    pub fn report(&mut self, error: &Error) {
        self.warn(error.to_string());
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// True if any entry at `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == severity && d.message.contains(needle))
    }

    fn push(&mut self, severity: Severity, message: String) {
        self.entries.push(Diagnostic { severity, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut diag = Diagnostics::new();
        diag.debug("first");
        diag.warn("second");
        diag.info("third");
        let messages: Vec<&str> = diag.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(diag.warnings().count(), 1);
    }

    #[test]
    fn report_uses_error_text() {
        let mut diag = Diagnostics::new();
        diag.report(&Error::UnexpectedNodeShape {
            found: "option".into(),
            parent: "subcommand group `cmd`".into(),
        });
        assert!(diag.contains(Severity::Warning, "unexpected option under subcommand group `cmd`"));
    }
}
