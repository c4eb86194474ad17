//! Backend lookup and parallel dispatch.

use rayon::prelude::*;

use crate::config::GeneratorConfig;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::ir::IrModel;
use super::{Backend, Emission, GeneratedFile, GoBackend, PythonBackend, RustBackend, TypeScriptBackend};

/// Backends keyed by target tag.
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl BackendRegistry {
    /// A registry with no backends.
    pub fn empty() -> Self {
        Self { backends: Vec::new() }
    }

    /// A registry with the Rust, Go, Python and TypeScript backends.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(RustBackend));
        registry.register(Box::new(GoBackend));
        registry.register(Box::new(PythonBackend));
        registry.register(Box::new(TypeScriptBackend));
        registry
    }

    /// Adds a backend, replacing any registered under the same tag.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.retain(|b| b.target() != backend.target());
        self.backends.push(backend);
    }

    pub fn get(&self, target: &str) -> Option<&dyn Backend> {
        self.backends.iter().find(|b| b.target() == target).map(|b| b.as_ref())
    }

    /// Registered target tags, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.target()).collect()
    }

    /// Runs every requested backend over `model`.
    ///
    /// Backends run in parallel; files and diagnostics come back in target
    /// request order. An unknown target is an error that does not stop the
    /// others. A model without channels produces no files.
    pub fn generate(&self, model: &IrModel, config: &GeneratorConfig, diagnostics: &mut Diagnostics) -> Vec<GeneratedFile> {
        let results: Vec<Result<Emission, Diagnostic>> = config
            .targets
            .par_iter()
            .map(|target| {
                let backend = self.get(target).ok_or_else(|| {
                    Diagnostic::error(
                        "dmxp::registry::unknown_target",
                        format!(
                            "unknown target '{}' (available: {})",
                            target,
                            self.names().join(", ")
                        ),
                    )
                })?;
                if model.is_empty() {
                    return Ok(Emission::default());
                }
                let target_config = config.target_config(target, &model.package);
                let emission = backend.emit(model, &target_config);
                tracing::debug!(target = %target, files = emission.files.len(), "backend finished");
                Ok(emission)
            })
            .collect();

        let mut files = Vec::new();
        for result in results {
            match result {
                Ok(emission) => {
                    files.extend(emission.files);
                    diagnostics.extend(emission.diagnostics);
                }
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures::sensors_model;
    use crate::config::TargetConfig;
    use crate::ir::TypeRef;
    use crate::codegen::MappedType;

    struct Stub;

    impl Backend for Stub {
        fn target(&self) -> &'static str {
            "rust"
        }

        fn reserved_words(&self) -> &'static [&'static str] {
            &[]
        }

        fn map_type(&self, _ty: &TypeRef, _model: &IrModel, _config: &TargetConfig) -> MappedType {
            MappedType {
                expr: String::new(),
                hook: String::new(),
                element: None,
            }
        }

        fn emit(&self, _model: &IrModel, config: &TargetConfig) -> Emission {
            Emission {
                files: vec![GeneratedFile {
                    target: "rust".to_string(),
                    path: config.path("stub"),
                    content: String::new(),
                }],
                diagnostics: Vec::new(),
            }
        }
    }

    #[test]
    fn test_builtin_targets() {
        let registry = BackendRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["rust", "go", "python", "typescript"]);
        assert!(registry.get("go").is_some());
        assert!(registry.get("cobol").is_none());
    }

    #[test]
    fn test_output_follows_request_order() {
        let registry = BackendRegistry::with_builtin();
        let mut diags = Diagnostics::new();
        let config = GeneratorConfig::for_targets(["typescript", "go", "rust"]);
        let files = registry.generate(&sensors_model(), &config, &mut diags);

        let targets: Vec<_> = files.iter().map(|f| f.target.as_str()).collect();
        assert_eq!(targets, vec!["typescript", "go", "rust"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unknown_target_does_not_stop_others() {
        let registry = BackendRegistry::with_builtin();
        let mut diags = Diagnostics::new();
        let config = GeneratorConfig::for_targets(["cobol", "rust"]);
        let files = registry.generate(&sensors_model(), &config, &mut diags);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].target, "rust");
        assert_eq!(diags.error_count(), 1);
        let error = diags.iter().next().map(|d| d.message.clone()).unwrap_or_default();
        assert!(error.contains("'cobol'"));
    }

    #[test]
    fn test_register_replaces_same_tag() {
        let mut registry = BackendRegistry::with_builtin();
        registry.register(Box::new(Stub));
        assert_eq!(registry.names(), vec!["go", "python", "typescript", "rust"]);

        let mut diags = Diagnostics::new();
        let files = registry.generate(&sensors_model(), &GeneratorConfig::for_targets(["rust"]), &mut diags);
        assert_eq!(files[0].path, "sensors/stub");
    }

    #[test]
    fn test_empty_model_emits_nothing_but_checks_targets() {
        let registry = BackendRegistry::with_builtin();
        let mut diags = Diagnostics::new();
        let config = GeneratorConfig::for_targets(["go", "java"]);
        let files = registry.generate(&IrModel::default(), &config, &mut diags);
        assert!(files.is_empty());
        assert_eq!(diags.error_count(), 1);
    }
}
