//! Diagnostic types for error reporting.

mod error;
mod report;
mod span;

pub use error::CompilerError;
pub use report::{Diagnostic, Diagnostics, Severity};
pub use span::SourceLocation;
