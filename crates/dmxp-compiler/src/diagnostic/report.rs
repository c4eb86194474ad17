//! Recoverable diagnostics collected across the pipeline.

use std::fmt;
use serde::Serialize;

use super::SourceLocation;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A validation or generation issue.
///
/// Diagnostics are values: stages record them and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Stable identifier, e.g. `dmxp::options::duplicate_channel`.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Other declarations involved (the first definition of a duplicate, ...).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<SourceLocation>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location: None,
            related: Vec::new(),
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn related_to(mut self, location: SourceLocation) -> Self {
        self.related.push(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}: ", location)?;
        }
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        for related in &self.related {
            write!(f, " (see {})", related)?;
        }
        Ok(())
    }
}

/// Ordered accumulator threaded through every stage.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(code = diagnostic.code, "{}", diagnostic.message);
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_related_locations() {
        let first = SourceLocation::new("a.proto", "a.One").with_position(3, 1);
        let second = SourceLocation::new("b.proto", "b.Two").with_position(9, 5);
        let diag = Diagnostic::error("dmxp::options::duplicate_channel", "duplicate channel 'x'")
            .at(second)
            .related_to(first);

        assert_eq!(
            diag.to_string(),
            "b.proto:9:5: error[dmxp::options::duplicate_channel]: duplicate channel 'x' (see a.proto:3:1)"
        );
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("dmxp::config::unknown_key", "unknown key"));
        assert!(!diags.has_errors());

        diags.push(Diagnostic::error("dmxp::registry::unknown_target", "unknown target"));
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.len(), 2);
    }
}
