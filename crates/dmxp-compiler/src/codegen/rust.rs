//! Rust backend.
//!
//! Messages become `Default` structs implementing `dmxp::Codec`, enums become
//! `#[repr(i32)]` enums implementing `dmxp::Enumeration`, and every operation
//! becomes a free function over `&dmxp::Transport` returning
//! `Result<_, dmxp::Error>`.

use std::collections::HashSet;

use crate::config::TargetConfig;
use crate::diagnostic::Diagnostic;
use crate::ir::{ChannelDecl, EnumShape, FieldShape, IrModel, MessageShape, OperationDecl, OperationKind, ScalarKind, TypeRef};
use crate::naming::{to_pascal_case, to_screaming_snake_case, to_snake_case};
use crate::options::{Delivery, Ordering, QosHints};
use super::{binding_units, doc_lines, header, hook_name, Backend, Emission, GeneratedFile, MappedType};

const RESERVED: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe",
    "unsized", "use", "virtual", "where", "while", "yield",
];

const FILE_ATTRIBUTES: &str = "#![allow(dead_code, non_camel_case_types, clippy::all)]\n";

pub struct RustBackend;

impl Backend for RustBackend {
    fn target(&self) -> &'static str {
        "rust"
    }

    fn reserved_words(&self) -> &'static [&'static str] {
        RESERVED
    }

    fn map_type(&self, ty: &TypeRef, model: &IrModel, config: &TargetConfig) -> MappedType {
        let hook = hook_name(ty);
        match ty {
            TypeRef::Scalar(kind) => MappedType {
                expr: scalar_type(*kind).to_string(),
                hook,
                element: None,
            },
            TypeRef::Enum(name) | TypeRef::Message(name) => {
                let ident = self.type_name(name, model, config);
                MappedType {
                    expr: ident.clone(),
                    hook,
                    element: Some(ident),
                }
            }
            TypeRef::Repeated(inner) => {
                let inner = self.map_type(inner, model, config);
                MappedType {
                    expr: format!("Vec<{}>", inner.expr),
                    hook,
                    element: inner.element,
                }
            }
            TypeRef::Map { key, value } => {
                let value = self.map_type(value, model, config);
                MappedType {
                    expr: format!("::std::collections::BTreeMap<{}, {}>", scalar_type(*key), value.expr),
                    hook,
                    element: value.element,
                }
            }
        }
    }

    fn emit(&self, model: &IrModel, config: &TargetConfig) -> Emission {
        let mut emission = Emission::default();
        let module = self.escape(&to_snake_case(&config.package_name), config);
        let types = self.render_types(model, config, &mut emission.diagnostics);

        if !config.split_files {
            let mut out = header("//", model);
            out.push_str(FILE_ATTRIBUTES);
            out.push_str(&types);
            out.push_str(&self.render_bindings(model, config, model.operations.iter()));
            emission.files.push(self.file(config.path(&format!("{}.rs", module)), out));
            return emission;
        }

        let mut out = header("//", model);
        out.push_str(FILE_ATTRIBUTES);
        out.push_str(&types);
        emission.files.push(self.file(config.path(&format!("{}/types.rs", module)), out));

        let mut index = header("//", model);
        index.push_str("\npub mod types;\n");
        let units = binding_units(model);
        for unit in &units {
            index.push_str(&format!("pub mod {};\n", unit.stem));

            let mut out = header("//", model);
            out.push_str(FILE_ATTRIBUTES);
            out.push_str("\nuse super::types::*;\n");
            out.push_str(&self.render_bindings(model, config, model.operations_in(&unit.proto_file)));
            emission.files.push(self.file(config.path(&format!("{}/{}.rs", module, unit.stem)), out));
        }
        index.push_str("\npub use types::*;\n");
        for unit in &units {
            index.push_str(&format!("pub use {}::*;\n", unit.stem));
        }
        emission.files.push(self.file(config.path(&format!("{}/mod.rs", module)), index));
        emission
    }
}

impl RustBackend {
    fn file(&self, path: String, content: String) -> GeneratedFile {
        GeneratedFile {
            target: self.target().to_string(),
            path,
            content,
        }
    }

    fn type_name(&self, full_name: &str, model: &IrModel, config: &TargetConfig) -> String {
        let ident = model
            .type_ident(full_name)
            .map(str::to_string)
            .unwrap_or_else(|| full_name.replace('.', "_"));
        self.escape(&ident, config)
    }

    fn field_name(&self, field: &FieldShape, config: &TargetConfig) -> String {
        self.escape(&to_snake_case(&field.name), config)
    }

    fn render_types(&self, model: &IrModel, config: &TargetConfig, diagnostics: &mut Vec<Diagnostic>) -> String {
        let mut out = String::new();
        for shape in model.enums.values() {
            out.push_str(&self.render_enum(shape, config, diagnostics));
        }
        for shape in model.messages.values() {
            out.push_str(&self.render_message(shape, model, config));
        }
        out
    }

    fn render_enum(&self, shape: &EnumShape, config: &TargetConfig, diagnostics: &mut Vec<Diagnostic>) -> String {
        let name = self.escape(&shape.ident, config);

        // Rust discriminants must be unique, so aliases keep their first name.
        let mut seen = HashSet::new();
        let variants: Vec<(String, i32)> = shape
            .value_names()
            .into_iter()
            .zip(&shape.values)
            .filter(|(_, value)| seen.insert(value.number))
            .map(|(variant, value)| (self.escape(&to_pascal_case(&variant.to_ascii_lowercase()), config), value.number))
            .collect();
        if variants.len() < shape.values.len() {
            diagnostics.push(Diagnostic::warning(
                "dmxp::codegen::enum_alias",
                format!("rust: aliased values of enum '{}' are folded into their first name", shape.full_name),
            ));
        }
        let default = variants.iter().position(|(_, number)| *number == 0).unwrap_or(0);

        let mut out = String::new();
        out.push('\n');
        for line in doc_lines(shape.doc.as_deref()) {
            out.push_str(&format!("/// {}\n", line).replace("/// \n", "///\n"));
        }
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]\n");
        out.push_str("#[repr(i32)]\n");
        out.push_str(&format!("pub enum {} {{\n", name));
        for (i, (variant, number)) in variants.iter().enumerate() {
            if i == default {
                out.push_str("    #[default]\n");
            }
            out.push_str(&format!("    {} = {},\n", variant, number));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl dmxp::Enumeration for {} {{\n", name));
        out.push_str("    fn to_i32(self) -> i32 {\n        self as i32\n    }\n\n");
        out.push_str("    fn from_i32(value: i32) -> Option<Self> {\n        match value {\n");
        for (variant, number) in &variants {
            out.push_str(&format!("            {} => Some(Self::{}),\n", number, variant));
        }
        out.push_str("            _ => None,\n        }\n    }\n}\n");
        out
    }

    fn render_message(&self, shape: &MessageShape, model: &IrModel, config: &TargetConfig) -> String {
        let name = self.escape(&shape.ident, config);
        let mut out = String::new();
        out.push('\n');
        for line in doc_lines(shape.doc.as_deref()) {
            out.push_str(&format!("/// {}\n", line).replace("/// \n", "///\n"));
        }
        out.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
        out.push_str(&format!("pub struct {} {{\n", name));
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let expr = match (&field.ty, field.optional) {
                (TypeRef::Message(_), _) => format!("Option<Box<{}>>", mapped.expr),
                (TypeRef::Scalar(_) | TypeRef::Enum(_), true) => format!("Option<{}>", mapped.expr),
                _ => mapped.expr,
            };
            out.push_str(&format!("    pub {}: {},\n", self.field_name(field, config), expr));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl dmxp::Codec for {} {{\n", name));
        if shape.fields.is_empty() {
            out.push_str("    fn encode(&self, _w: &mut dmxp::Writer) {}\n\n");
            out.push_str("    fn decode(r: &mut dmxp::Reader<'_>) -> Result<Self, dmxp::Error> {\n");
            out.push_str("        while r.next_field()?.is_some() {\n            r.skip()?;\n        }\n");
            out.push_str("        Ok(Self::default())\n    }\n}\n");
            return out;
        }

        out.push_str("    fn encode(&self, w: &mut dmxp::Writer) {\n");
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            match (&field.ty, field.optional) {
                (TypeRef::Message(_), _) => out.push_str(&format!(
                    "        if let Some(value) = self.{}.as_deref() {{\n            w.write_{}({}, value);\n        }}\n",
                    ident, mapped.hook, field.number
                )),
                (TypeRef::Scalar(_) | TypeRef::Enum(_), true) => out.push_str(&format!(
                    "        if let Some(value) = &self.{} {{\n            w.write_{}({}, value);\n        }}\n",
                    ident, mapped.hook, field.number
                )),
                _ => out.push_str(&format!("        w.write_{}({}, &self.{});\n", mapped.hook, field.number, ident)),
            }
        }
        out.push_str("    }\n\n");

        out.push_str("    fn decode(r: &mut dmxp::Reader<'_>) -> Result<Self, dmxp::Error> {\n");
        out.push_str("        let mut msg = Self::default();\n");
        out.push_str("        while let Some(number) = r.next_field()? {\n");
        out.push_str("            match number {\n");
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            let read = match &mapped.element {
                Some(element) => format!("r.read_{}::<{}>()?", mapped.hook, element),
                None => format!("r.read_{}()?", mapped.hook),
            };
            let assign = match (&field.ty, field.optional) {
                (TypeRef::Message(_), _) => format!("msg.{} = Some(Box::new({}))", ident, read),
                (TypeRef::Repeated(_) | TypeRef::Map { .. }, _) => format!("msg.{}.extend({})", ident, read),
                (_, true) => format!("msg.{} = Some({})", ident, read),
                (_, false) => format!("msg.{} = {}", ident, read),
            };
            out.push_str(&format!("                {} => {},\n", field.number, assign));
        }
        out.push_str("                _ => r.skip()?,\n");
        out.push_str("            }\n        }\n        Ok(msg)\n    }\n}\n");
        out
    }

    fn render_bindings<'m>(
        &self,
        model: &IrModel,
        config: &TargetConfig,
        operations: impl Iterator<Item = &'m OperationDecl>,
    ) -> String {
        let mut out = String::new();
        let mut declared = HashSet::new();
        for op in operations {
            let channel = model.channel_of(op);
            if declared.insert(op.channel) {
                out.push_str(&self.render_channel_constants(channel));
            }
            out.push_str(&self.render_operation(op, channel, model, config));
        }
        out
    }

    fn render_channel_constants(&self, channel: &ChannelDecl) -> String {
        let constant = to_screaming_snake_case(&channel.ident);
        let mut out = String::new();
        out.push_str(&format!("\n/// Transport identifier of the `{}` channel.\n", channel.name));
        out.push_str(&format!("pub const {}: &str = \"{}\";\n", constant, channel.name));
        let fields = qos_fields(&channel.qos);
        if fields.is_empty() {
            out.push_str(&format!("pub const {}_QOS: dmxp::Qos = dmxp::Qos::DEFAULT;\n", constant));
        } else {
            out.push_str(&format!("pub const {}_QOS: dmxp::Qos = dmxp::Qos {{\n", constant));
            for (field, value) in fields {
                out.push_str(&format!("    {}: {},\n", field, value));
            }
            out.push_str("    ..dmxp::Qos::DEFAULT\n};\n");
        }
        out
    }

    fn render_operation(&self, op: &OperationDecl, channel: &ChannelDecl, model: &IrModel, config: &TargetConfig) -> String {
        let function = self.escape(&op.ident, config);
        let constant = to_screaming_snake_case(&channel.ident);
        let request = self.map_type(&op.request, model, config).expr;
        let response = op
            .response
            .as_ref()
            .map(|ty| self.map_type(ty, model, config).expr)
            .unwrap_or_default();

        let mut out = String::new();
        out.push('\n');
        let doc = doc_lines(channel.doc.as_deref());
        for line in &doc {
            out.push_str(&format!("/// {}\n", line).replace("/// \n", "///\n"));
        }
        if !doc.is_empty() {
            out.push_str("///\n");
        }

        match op.kind {
            OperationKind::Publish => {
                out.push_str(&format!("/// Publishes a [`{}`] on `{}`.\n", request, channel.name));
                out.push_str(&format!(
                    "pub fn {}(transport: &dmxp::Transport, message: &{}) -> Result<(), dmxp::Error> {{\n",
                    function, request
                ));
                out.push_str("    let payload = dmxp::encode(message);\n");
                out.push_str(&format!("    transport.publish({0}, &{0}_QOS, &payload)\n}}\n", constant));
            }
            OperationKind::Subscribe => {
                out.push_str(&format!("/// Subscribes to [`{}`] messages on `{}`.\n", request, channel.name));
                out.push_str("///\n/// Payloads that fail to decode reach `handler` as errors.\n");
                out.push_str(&format!(
                    "pub fn {}<F>(transport: &dmxp::Transport, mut handler: F) -> Result<dmxp::Subscription, dmxp::Error>\n",
                    function
                ));
                out.push_str(&format!(
                    "where\n    F: FnMut(Result<{}, dmxp::Error>) + Send + 'static,\n{{\n",
                    request
                ));
                out.push_str(&format!(
                    "    transport.subscribe({0}, &{0}_QOS, move |payload: &[u8]| {{\n        handler(dmxp::decode::<{1}>(payload))\n    }})\n}}\n",
                    constant, request
                ));
            }
            OperationKind::Call => {
                out.push_str(&format!(
                    "/// Sends a [`{}`] request on `{}` and waits for the [`{}`] response.\n",
                    request, channel.name, response
                ));
                out.push_str(&format!(
                    "pub fn {}(transport: &dmxp::Transport, request: &{}) -> Result<{}, dmxp::Error> {{\n",
                    function, request, response
                ));
                out.push_str("    let payload = dmxp::encode(request);\n");
                out.push_str(&format!("    let reply = transport.call({0}, &{0}_QOS, &payload)?;\n", constant));
                out.push_str(&format!("    dmxp::decode::<{}>(&reply)\n}}\n", response));
            }
            OperationKind::Serve => {
                out.push_str(&format!(
                    "/// Serves `{}`: `handler` answers each [`{}`] request with a [`{}`].\n",
                    channel.name, request, response
                ));
                out.push_str(&format!(
                    "pub fn {}<F>(transport: &dmxp::Transport, mut handler: F) -> Result<dmxp::Subscription, dmxp::Error>\n",
                    function
                ));
                out.push_str(&format!(
                    "where\n    F: FnMut({}) -> Result<{}, dmxp::Error> + Send + 'static,\n{{\n",
                    request, response
                ));
                out.push_str(&format!("    transport.serve({0}, &{0}_QOS, move |payload: &[u8]| {{\n", constant));
                out.push_str(&format!("        let request = dmxp::decode::<{}>(payload)?;\n", request));
                out.push_str("        let response = handler(request)?;\n");
                out.push_str("        Ok(dmxp::encode(&response))\n    })\n}\n");
            }
        }
        out
    }
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Double => "f64",
        ScalarKind::Float => "f32",
        ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => "i32",
        ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => "i64",
        ScalarKind::Uint32 | ScalarKind::Fixed32 => "u32",
        ScalarKind::Uint64 | ScalarKind::Fixed64 => "u64",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "String",
        ScalarKind::Bytes => "Vec<u8>",
    }
}

/// Non-default QoS fields as `(field, Rust expression)`.
fn qos_fields(qos: &QosHints) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(ordering) = qos.ordering {
        let variant = match ordering {
            Ordering::Fifo => "Fifo",
            Ordering::Unordered => "Unordered",
            Ordering::LatestOnly => "LatestOnly",
            Ordering::Unspecified => "Unspecified",
        };
        fields.push(("ordering", format!("Some(dmxp::Ordering::{})", variant)));
    }
    if let Some(delivery) = qos.delivery {
        let variant = match delivery {
            Delivery::BestEffort => "BestEffort",
            Delivery::AtLeastOnce => "AtLeastOnce",
            Delivery::ExactlyOnce => "ExactlyOnce",
            Delivery::Unspecified => "Unspecified",
        };
        fields.push(("delivery", format!("Some(dmxp::Delivery::{})", variant)));
    }
    let numbers = [
        ("buffer_size", qos.buffer_size),
        ("priority", qos.priority),
        ("timeout_ms", qos.timeout_ms),
        ("retry_count", qos.retry_count),
    ];
    for (field, value) in numbers {
        if let Some(value) = value {
            fields.push((field, format!("Some({})", value)));
        }
    }
    let flags = [
        ("persistent", qos.persistent),
        ("wal_enabled", qos.wal_enabled),
        ("swap_enabled", qos.swap_enabled),
    ];
    for (field, set) in flags {
        if set {
            fields.push((field, "true".to_string()));
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::fixtures::sensors_model;

    fn config(split: bool) -> TargetConfig {
        TargetConfig {
            split_files: split,
            ..TargetConfig::defaults("rust", "sensors")
        }
    }

    fn single_file() -> String {
        let emission = RustBackend.emit(&sensors_model(), &config(false));
        assert_eq!(emission.files.len(), 1);
        assert_eq!(emission.files[0].path, "sensors/sensors.rs");
        emission.files[0].content.clone()
    }

    #[test]
    fn test_type_mapping() {
        let model = sensors_model();
        let cfg = config(false);
        let map = |ty: TypeRef| RustBackend.map_type(&ty, &model, &cfg);

        assert_eq!(map(TypeRef::Scalar(ScalarKind::Sfixed64)).expr, "i64");
        let repeated = map(TypeRef::Repeated(Box::new(TypeRef::Message("sensors.Reading".to_string()))));
        assert_eq!(repeated.expr, "Vec<Reading>");
        assert_eq!(repeated.hook, "repeated_message");
        assert_eq!(repeated.element.as_deref(), Some("Reading"));
        let map_ty = map(TypeRef::Map {
            key: ScalarKind::Uint32,
            value: Box::new(TypeRef::Scalar(ScalarKind::Bytes)),
        });
        assert_eq!(map_ty.expr, "::std::collections::BTreeMap<u32, Vec<u8>>");
        assert_eq!(map_ty.element, None);
    }

    #[test]
    fn test_struct_fields_and_codec() {
        let content = single_file();
        assert!(content.contains("pub struct Reading {\n    pub sensor_id: String,\n    pub value: Option<f64>,"));
        assert!(content.contains("    pub parent: Option<Box<Reading>>,\n"));
        assert!(content.contains("    pub type_: u32,\n"));
        assert!(content.contains("            6 => msg.parent = Some(Box::new(r.read_message::<Reading>()?)),\n"));
        assert!(content.contains("            5 => msg.labels.extend(r.read_map_string_int64()?),\n"));
        assert!(content.contains("        w.write_uint32(7, &self.type_);\n"));
    }

    #[test]
    fn test_enum_rendering() {
        let content = single_file();
        assert!(content.contains("/// Alarm level.\n"));
        assert!(content.contains("pub enum Level {\n    #[default]\n    Low = 0,\n    High = 1,\n}"));
        assert!(content.contains("            1 => Some(Self::High),\n"));
    }

    #[test]
    fn test_bindings_use_channel_name_verbatim() {
        let content = single_file();
        assert!(content.contains("pub const SENSORS_TELEMETRY: &str = \"sensors/telemetry\";"));
        assert!(content.contains("    ordering: Some(dmxp::Ordering::Fifo),\n    buffer_size: Some(64),\n    persistent: true,\n    ..dmxp::Qos::DEFAULT\n"));
        assert!(content.contains("pub const ALERTS_QOS: dmxp::Qos = dmxp::Qos::DEFAULT;"));
        assert!(content.contains("pub fn call_ping(transport: &dmxp::Transport, request: &Empty) -> Result<Pong, dmxp::Error> {"));
        assert!(content.contains("pub fn serve_ping<F>("));
        assert!(content.contains("/// Raw sensor readings.\n///\n/// Publishes a [`Reading`] on `sensors/telemetry`.\n"));
    }

    #[test]
    fn test_split_files_layout() {
        let emission = RustBackend.emit(&sensors_model(), &config(true));
        let paths: Vec<_> = emission.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["sensors/sensors/types.rs", "sensors/sensors/sensors_channels.rs", "sensors/sensors/mod.rs"]
        );
        let index = &emission.files[2].content;
        assert!(index.contains("pub mod types;\npub mod sensors_channels;\n"));
        assert!(index.contains("pub use sensors_channels::*;\n"));
        assert!(emission.files[1].content.contains("use super::types::*;"));
    }

    #[test]
    fn test_enum_aliases_fold() {
        let mut model = sensors_model();
        let level = model.enums.get_mut("sensors.Level").unwrap();
        level.values.push(crate::ir::EnumValueShape {
            name: "LEVEL_DEFAULT".to_string(),
            number: 0,
        });
        let emission = RustBackend.emit(&model, &config(false));
        assert_eq!(emission.diagnostics.len(), 1);
        assert!(!emission.files[0].content.contains("Default = 0"));
    }

    #[test]
    fn test_escape_uses_configured_suffix() {
        let cfg = TargetConfig {
            escape_suffix: "_kw".to_string(),
            ..config(false)
        };
        assert_eq!(RustBackend.escape("match", &cfg), "match_kw");
        assert_eq!(RustBackend.escape("Self", &cfg), "Self_kw");
        assert_eq!(RustBackend.escape("reading", &cfg), "reading");
    }
}
