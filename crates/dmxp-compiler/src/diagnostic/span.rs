//! Source location tracking.

use std::fmt;
use serde::Serialize;

/// Where a declaration lives in the schema.
///
/// Line and column are 1-based and only present when the host supplied
/// `SourceCodeInfo` for the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// Fully-qualified name of the declaration (e.g. `shop.Orders.Place`).
    pub declaration: String,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, declaration: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            declaration: declaration.into(),
        }
    }

    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// `(line, column)` when known; used to order declarations within a file.
    pub fn position(&self) -> Option<(u32, u32)> {
        Some((self.line?, self.column.unwrap_or(1)))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "{}:{}:{}", self.file, line, col),
            (Some(line), None) => write!(f, "{}:{}", self.file, line),
            _ => write!(f, "{} ({})", self.file, self.declaration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let loc = SourceLocation::new("shop.proto", "shop.Order").with_position(12, 3);
        assert_eq!(loc.to_string(), "shop.proto:12:3");
    }

    #[test]
    fn test_display_without_position_names_declaration() {
        let loc = SourceLocation::new("shop.proto", "shop.Order");
        assert_eq!(loc.to_string(), "shop.proto (shop.Order)");
        assert_eq!(loc.position(), None);
    }
}
