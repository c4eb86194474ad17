//! Unrecoverable compiler errors.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort a generation request outright.
///
/// Everything recoverable travels as [`super::Diagnostic`] data instead.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // Envelope Errors
    // =========================================================================
    #[error("Failed to decode code generator request: {source}")]
    #[diagnostic(
        code(dmxp::host::malformed_request),
        help("protoc-gen-dmxp expects a serialized CodeGeneratorRequest on stdin. Run it through `protoc --dmxp_out=...`.")
    )]
    MalformedRequest {
        #[source]
        source: prost::DecodeError,
    },

    #[error("Failed to decode descriptor set '{}': {source}", path.display())]
    #[diagnostic(
        code(dmxp::host::malformed_descriptor_set),
        help("Produce the descriptor set with `protoc --include_imports --include_source_info --descriptor_set_out=...`")
    )]
    MalformedDescriptorSet {
        path: PathBuf,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Host adapter received a request while another one is still processing")]
    #[diagnostic(code(dmxp::host::busy))]
    AdapterBusy,

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("I/O failure on '{}': {message}", path.display())]
    #[diagnostic(code(dmxp::io::failed))]
    IoError {
        path: PathBuf,
        message: String,
    },
}

impl CompilerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IoError {
            path: path.into(),
            message: message.into(),
        }
    }
}
