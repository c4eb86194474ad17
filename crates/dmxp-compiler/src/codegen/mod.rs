//! Client stub generation from the IR.
//!
//! Every target language is a [`Backend`]: a type mapper (`map_type`) plus an
//! emitter (`emit`). The [`BackendRegistry`] looks backends up by target tag
//! and runs them in parallel over the shared, read-only [`IrModel`].
//!
//! Backends only ever call the transport through the external runtime
//! library of their language; the generated code never touches shared memory
//! itself.

mod go;
mod python;
mod registry;
mod rust;
mod typescript;

pub use go::GoBackend;
pub use python::PythonBackend;
pub use registry::BackendRegistry;
pub use rust::RustBackend;
pub use typescript::TypeScriptBackend;

use std::collections::HashSet;

use serde::Serialize;

use crate::config::TargetConfig;
use crate::diagnostic::Diagnostic;
use crate::ir::{IrModel, TypeRef};
use crate::naming::to_snake_case;

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Target tag of the backend that produced the file.
    pub target: String,
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub content: String,
}

/// A target type expression and the codec hook that reads and writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Type as written in the target language, e.g. `Vec<Reading>`.
    pub expr: String,
    /// Runtime codec function, e.g. `write_repeated_message` / `read_repeated_message`
    /// share the hook `repeated_message`.
    pub hook: String,
    /// Element type the hook is instantiated with, for enum and message
    /// payloads.
    pub element: Option<String>,
}

/// Output of one backend run.
#[derive(Debug, Default)]
pub struct Emission {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A code generation backend for one target language.
///
/// Implementations must be deterministic: the same model and configuration
/// always produce byte-identical files.
pub trait Backend: Send + Sync {
    /// Target tag, e.g. `rust`.
    fn target(&self) -> &'static str;

    /// Words that cannot be used as identifiers in the target.
    fn reserved_words(&self) -> &'static [&'static str];

    /// Appends the configured suffix to reserved identifiers.
    fn escape(&self, ident: &str, config: &TargetConfig) -> String {
        if self.reserved_words().contains(&ident) {
            format!("{}{}", ident, config.escape_suffix)
        } else {
            ident.to_string()
        }
    }

    /// Maps a type reference. Total over every [`TypeRef`].
    fn map_type(&self, ty: &TypeRef, model: &IrModel, config: &TargetConfig) -> MappedType;

    /// Renders the model into files.
    fn emit(&self, model: &IrModel, config: &TargetConfig) -> Emission;
}

/// Target-neutral codec hook name, in snake_case.
///
/// Scalars use their proto name; `repeated_` and `map_<key>_` prefixes
/// compose with the element hook.
pub fn hook_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Scalar(kind) => kind.proto_name().to_string(),
        TypeRef::Enum(_) => "enum".to_string(),
        TypeRef::Message(_) => "message".to_string(),
        TypeRef::Repeated(inner) => format!("repeated_{}", hook_name(inner)),
        TypeRef::Map { key, value } => format!("map_{}_{}", key.proto_name(), hook_name(value)),
    }
}

/// Comment block naming the generator and the source files.
pub fn header(comment: &str, model: &IrModel) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} Code generated by protoc-gen-dmxp {}. DO NOT EDIT.\n",
        comment,
        env!("CARGO_PKG_VERSION")
    ));
    if !model.files.is_empty() {
        out.push_str(&format!("{} source: {}\n", comment, model.files.join(", ")));
    }
    out
}

/// A proto file that gets its own bindings file in split mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingUnit {
    pub proto_file: String,
    /// snake_case module stem, unique within the model.
    pub stem: String,
}

/// Proto files with at least one operation, each with a unique stem.
///
/// Stems end in `_channels` so they never clash with the shared types
/// module or an index file.
pub fn binding_units(model: &IrModel) -> Vec<BindingUnit> {
    let mut used = HashSet::new();
    let mut units = Vec::new();
    for file in &model.files {
        if model.operations_in(file).next().is_none() {
            continue;
        }
        let name = file.rsplit('/').next().unwrap_or(file);
        let name = name.strip_suffix(".proto").unwrap_or(name);
        let mut base = to_snake_case(name);
        if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            base = format!("proto_{}", base);
        }

        let mut stem = format!("{}_channels", base);
        let mut n = 2;
        while !used.insert(stem.clone()) {
            stem = format!("{}_{}_channels", base, n);
            n += 1;
        }
        units.push(BindingUnit {
            proto_file: file.clone(),
            stem,
        });
    }
    units
}

/// Splits a documentation comment into lines, trimming trailing whitespace.
pub fn doc_lines(doc: Option<&str>) -> Vec<&str> {
    match doc {
        Some(doc) => doc.lines().map(str::trim_end).collect(),
        None => Vec::new(),
    }
}
