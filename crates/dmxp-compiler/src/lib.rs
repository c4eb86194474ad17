//! # DMXP Compiler
//!
//! This crate turns protobuf schemas annotated with DMXP channel options
//! into client stubs for the shared-memory IPC transport. It runs as a
//! protoc plugin, and one request can produce code for several target
//! languages at once.
//!
//! ## Supported Targets
//!
//! - Rust
//! - Go
//! - Python
//! - TypeScript
//!
//! ## Architecture
//!
//! ```text
//! CodeGeneratorRequest
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Options    │  Channel options → typed records
//! │  (extract)   │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │      IR      │  Channels, operations, resolved shapes
//! │   (build)    │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  One backend per target, in parallel
//! │  (registry)  │
//! └──────┬───────┘
//!        │
//!        ▼
//! CodeGeneratorResponse
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dmxp_compiler::host::HostAdapter;
//!
//! let mut adapter = HostAdapter::default();
//! let response = adapter.handle(&request_bytes)?;
//! std::io::stdout().write_all(&response.encode())?;
//! std::process::exit(response.exit_code());
//! ```

pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod diagnostic;
pub mod host;
pub mod ir;
pub mod naming;
pub mod options;

use std::path::Path;

use prost::Message;

pub use codegen::{BackendRegistry, GeneratedFile};
pub use config::{GeneratorConfig, TargetConfig};
pub use diagnostic::{CompilerError, Diagnostic, Diagnostics, Severity};
pub use host::GenerationResponse;
pub use ir::IrModel;

use descriptor::{CodeGeneratorRequest, FileDescriptorProto, FileDescriptorSet};

/// Files that only ever contribute types, never channels.
const LIBRARY_PREFIXES: &[&str] = &["google/protobuf/", "dmxp/"];

/// The generation pipeline: options → IR → backends.
pub struct Compiler {
    registry: BackendRegistry,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler with every built-in backend.
    pub fn new() -> Self {
        Self::with_registry(BackendRegistry::with_builtin())
    }

    pub fn with_registry(registry: BackendRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Runs a decoded plugin request.
    pub fn compile_request(&self, request: &CodeGeneratorRequest) -> GenerationResponse {
        self.compile(
            &request.proto_file,
            &request.file_to_generate,
            request.parameter.as_deref().unwrap_or_default(),
        )
    }

    /// Runs a serialized `FileDescriptorSet` read from `path`.
    ///
    /// With no `files`, every file of the set except the protobuf and DMXP
    /// library files is generated.
    pub fn compile_descriptor_set(
        &self,
        path: &Path,
        bytes: &[u8],
        files: &[String],
        parameter: &str,
    ) -> Result<GenerationResponse, CompilerError> {
        let set = FileDescriptorSet::decode(bytes).map_err(|source| CompilerError::MalformedDescriptorSet {
            path: path.to_path_buf(),
            source,
        })?;

        let files: Vec<String> = if files.is_empty() {
            set.file
                .iter()
                .map(|f| f.name().to_string())
                .filter(|name| !LIBRARY_PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
                .collect()
        } else {
            files.to_vec()
        };
        Ok(self.compile(&set.file, &files, parameter))
    }

    /// Compiles the files named in `file_to_generate`.
    ///
    /// This runs the full pipeline:
    /// 1. Select the generated files, in request order
    /// 2. Extract channel options from them
    /// 3. Build the IR over the whole descriptor graph
    /// 4. Parse the parameter string
    /// 5. Run every requested backend
    pub fn compile(
        &self,
        proto_files: &[FileDescriptorProto],
        file_to_generate: &[String],
        parameter: &str,
    ) -> GenerationResponse {
        let mut diagnostics = Diagnostics::new();

        // Phase 1: Select files
        let mut generated = Vec::with_capacity(file_to_generate.len());
        for name in file_to_generate {
            match proto_files.iter().find(|f| f.name() == name) {
                Some(file) => generated.push(file),
                None => diagnostics.push(Diagnostic::error(
                    "dmxp::host::missing_file",
                    format!("'{}' is listed for generation but missing from the request", name),
                )),
            }
        }

        // Phase 2: Extract options
        let records = options::extract_options(&generated, &mut diagnostics);

        // Phase 3: Build IR
        let model = ir::build_ir(proto_files, &generated, records, &mut diagnostics);
        tracing::debug!(
            channels = model.channels.len(),
            messages = model.messages.len(),
            enums = model.enums.len(),
            "built IR"
        );

        if model.is_empty() && !generated.is_empty() {
            diagnostics.push(Diagnostic::warning(
                "dmxp::ir::no_channels",
                "no valid channel declarations found; nothing to generate",
            ));
        }

        // Phase 4: Configure
        let config = GeneratorConfig::parse(parameter, &mut diagnostics);

        // Phase 5: Generate
        let files = self.registry.generate(&model, &config, &mut diagnostics);
        tracing::debug!(files = files.len(), errors = diagnostics.error_count(), "generation finished");

        GenerationResponse {
            files,
            diagnostics: diagnostics.into_vec(),
        }
    }
}
