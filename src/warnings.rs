//! Structural warnings collected while parsing and rendering docstrings.

use std::io::{self, Write};

use crate::qualpath::QualPath;

/// One non-fatal problem found at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocWarning {
    pub path: QualPath,
    pub reason: String,
}

impl std::fmt::Display for DocWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocWarning at {}:\n>> {}\n", self.path, self.reason)
    }
}

/// Append-only warning list, drained by [`WarningSink::show_to`].
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Vec<DocWarning>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning for `path`.
    pub fn warn(&mut self, path: &QualPath, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(%path, %reason, "doc warning");
        self.warnings.push(DocWarning {
            path: path.clone(),
            reason,
        });
    }

    /// Record a batch of reasons for the same path.
    pub fn extend(&mut self, path: &QualPath, reasons: impl IntoIterator<Item = String>) {
        for reason in reasons {
            self.warn(path, reason);
        }
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocWarning> {
        self.warnings.iter()
    }

    /// Write every warning to `writer` and clear the list.
    pub fn show_to<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        for warning in self.warnings.drain(..) {
            write!(writer, "{}", warning)?;
        }
        writer.flush()
    }

    /// Take the warnings without printing them.
    pub fn drain(&mut self) -> Vec<DocWarning> {
        std::mem::take(&mut self.warnings)
    }
}
