//! Host protocol adapter.
//!
//! Speaks the protoc plugin protocol: one serialized `CodeGeneratorRequest`
//! in, one serialized `CodeGeneratorResponse` out. Recoverable problems are
//! reported inside the response; only an undecodable request fails the
//! exchange.

use prost::Message;
use serde::Serialize;

use crate::codegen::GeneratedFile;
use crate::descriptor::code_generator_response::{Feature, File};
use crate::descriptor::{CodeGeneratorRequest, CodeGeneratorResponse};
use crate::diagnostic::{CompilerError, Diagnostic};
use crate::Compiler;

/// Exit status without error diagnostics.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit status when at least one error diagnostic was reported.
pub const EXIT_DIAGNOSTICS: i32 = 1;
/// Exit status when the request could not be decoded.
pub const EXIT_MALFORMED_REQUEST: i32 = 2;

/// Decodes a serialized `CodeGeneratorRequest`.
pub fn decode_request(bytes: &[u8]) -> Result<CodeGeneratorRequest, CompilerError> {
    CodeGeneratorRequest::decode(bytes).map_err(|source| CompilerError::MalformedRequest { source })
}

/// Minimal response carrying only an error message, for requests that
/// could not be processed at all.
pub fn failure_response(message: &str) -> Vec<u8> {
    CodeGeneratorResponse {
        error: Some(message.to_string()),
        supported_features: Some(Feature::Proto3Optional as u64),
        file: Vec::new(),
    }
    .encode_to_vec()
}

/// Everything one generation request produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationResponse {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationResponse {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            EXIT_DIAGNOSTICS
        } else {
            EXIT_SUCCESS
        }
    }

    /// Converts to the plugin envelope.
    ///
    /// Files are kept even when errors exist; error diagnostics are rendered
    /// one per line into the `error` field.
    pub fn to_plugin_response(&self) -> CodeGeneratorResponse {
        let errors: Vec<String> = self.errors().map(ToString::to_string).collect();
        CodeGeneratorResponse {
            error: (!errors.is_empty()).then(|| errors.join("\n")),
            supported_features: Some(Feature::Proto3Optional as u64),
            file: self
                .files
                .iter()
                .map(|f| File {
                    name: Some(f.path.clone()),
                    insertion_point: None,
                    content: Some(f.content.clone()),
                })
                .collect(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_plugin_response().encode_to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Idle,
    Processing,
}

/// Drives one request at a time through the [`Compiler`].
pub struct HostAdapter {
    compiler: Compiler,
    state: AdapterState,
}

impl Default for HostAdapter {
    fn default() -> Self {
        Self::new(Compiler::new())
    }
}

impl HostAdapter {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            state: AdapterState::Idle,
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Decodes `input`, runs the pipeline and returns the response.
    pub fn handle(&mut self, input: &[u8]) -> Result<GenerationResponse, CompilerError> {
        let request = decode_request(input)?;
        self.process(&request)
    }

    /// Runs the pipeline on an already decoded request.
    pub fn process(&mut self, request: &CodeGeneratorRequest) -> Result<GenerationResponse, CompilerError> {
        self.begin()?;
        let response = self.compiler.compile_request(request);
        self.finish();
        Ok(response)
    }

    fn begin(&mut self) -> Result<(), CompilerError> {
        match self.state {
            AdapterState::Processing => Err(CompilerError::AdapterBusy),
            AdapterState::Idle => {
                self.state = AdapterState::Processing;
                tracing::debug!("adapter processing request");
                Ok(())
            }
        }
    }

    fn finish(&mut self) {
        self.state = AdapterState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_request_is_rejected() {
        let mut adapter = HostAdapter::default();
        let err = adapter.handle(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, CompilerError::MalformedRequest { .. }));
        assert_eq!(adapter.state(), AdapterState::Idle);
    }

    #[test]
    fn test_nested_request_is_busy() {
        let mut adapter = HostAdapter::default();
        adapter.begin().unwrap();
        assert_eq!(adapter.state(), AdapterState::Processing);
        assert!(matches!(adapter.begin(), Err(CompilerError::AdapterBusy)));
        adapter.finish();
        assert_eq!(adapter.state(), AdapterState::Idle);
    }

    #[test]
    fn test_empty_request_round_trips() {
        let mut adapter = HostAdapter::default();
        let response = adapter.handle(&CodeGeneratorRequest::default().encode_to_vec()).unwrap();
        assert!(response.files.is_empty());
        assert_eq!(response.exit_code(), EXIT_SUCCESS);
        assert_eq!(adapter.state(), AdapterState::Idle);
    }

    #[test]
    fn test_plugin_response_keeps_files_with_errors() {
        let response = GenerationResponse {
            files: vec![GeneratedFile {
                target: "go".to_string(),
                path: "a/a.go".to_string(),
                content: "package a\n".to_string(),
            }],
            diagnostics: vec![
                Diagnostic::warning("dmxp::config::unknown_key", "ignoring unknown parameter 'x'"),
                Diagnostic::error("dmxp::registry::unknown_target", "unknown target 'cobol'"),
                Diagnostic::error("dmxp::options::missing_name", "channel has no name"),
            ],
        };
        assert_eq!(response.exit_code(), EXIT_DIAGNOSTICS);

        let envelope = response.to_plugin_response();
        assert_eq!(envelope.file.len(), 1);
        assert_eq!(envelope.file[0].name.as_deref(), Some("a/a.go"));
        assert_eq!(envelope.supported_features, Some(1));
        let error = envelope.error.clone().unwrap_or_default();
        assert_eq!(error.lines().count(), 2);
        assert!(!error.contains("unknown_key"));

        let decoded = CodeGeneratorResponse::decode(response.encode().as_slice()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_response_json_shape() {
        let response = GenerationResponse {
            files: vec![],
            diagnostics: vec![Diagnostic::error("dmxp::options::missing_name", "channel has no name")
                .at(crate::diagnostic::SourceLocation::new("a.proto", "a.Msg"))],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "files": [],
                "diagnostics": [{
                    "severity": "error",
                    "code": "dmxp::options::missing_name",
                    "message": "channel has no name",
                    "location": { "file": "a.proto", "declaration": "a.Msg" }
                }]
            })
        );
    }

    #[test]
    fn test_failure_response_has_no_files() {
        let decoded = CodeGeneratorResponse::decode(failure_response("bad input").as_slice()).unwrap();
        assert_eq!(decoded.error.as_deref(), Some("bad input"));
        assert!(decoded.file.is_empty());
    }
}
