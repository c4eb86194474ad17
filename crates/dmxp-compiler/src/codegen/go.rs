//! Go backend.
//!
//! One package per target; messages are structs with `MarshalDMXP` /
//! `UnmarshalDMXP` methods, singular message fields are pointers, and every
//! binding returns an `error`.

use std::collections::HashSet;

use crate::config::TargetConfig;
use crate::ir::{ChannelDecl, EnumShape, FieldShape, IrModel, MessageShape, OperationDecl, OperationKind, ScalarKind, TypeRef};
use crate::naming::{to_pascal_case, to_snake_case};
use crate::options::{Delivery, Ordering, QosHints};
use super::{binding_units, doc_lines, header, hook_name, Backend, Emission, GeneratedFile, MappedType};

/// Import path of the Go transport runtime.
pub const RUNTIME_IMPORT: &str = "dmxp.io/dmxp-go";

const RESERVED: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return", "select",
    "struct", "switch", "type", "var",
];

pub struct GoBackend;

impl Backend for GoBackend {
    fn target(&self) -> &'static str {
        "go"
    }

    fn reserved_words(&self) -> &'static [&'static str] {
        RESERVED
    }

    fn map_type(&self, ty: &TypeRef, model: &IrModel, config: &TargetConfig) -> MappedType {
        let hook = to_pascal_case(&hook_name(ty));
        match ty {
            TypeRef::Scalar(kind) => MappedType {
                expr: scalar_type(*kind).to_string(),
                hook,
                element: None,
            },
            TypeRef::Enum(name) => {
                let ident = self.type_name(name, model, config);
                MappedType {
                    expr: ident.clone(),
                    hook,
                    element: Some(ident),
                }
            }
            TypeRef::Message(name) => {
                let ident = self.type_name(name, model, config);
                MappedType {
                    expr: format!("*{}", ident),
                    hook,
                    element: Some(ident),
                }
            }
            TypeRef::Repeated(inner) => {
                let inner = self.map_type(inner, model, config);
                MappedType {
                    expr: format!("[]{}", inner.expr),
                    hook,
                    element: inner.element,
                }
            }
            TypeRef::Map { key, value } => {
                let value = self.map_type(value, model, config);
                MappedType {
                    expr: format!("map[{}]{}", scalar_type(*key), value.expr),
                    hook,
                    element: value.element,
                }
            }
        }
    }

    fn emit(&self, model: &IrModel, config: &TargetConfig) -> Emission {
        let mut emission = Emission::default();
        let package = self.escape(&to_snake_case(&config.package_name).replace('_', ""), config);
        let types = self.render_types(model, config);
        let has_codecs = !model.messages.is_empty();

        if !config.split_files {
            let bindings = self.render_bindings(model, config, model.operations.iter());
            let uses_runtime = has_codecs || !model.operations.is_empty();
            let mut out = self.preamble(model, &package, uses_runtime);
            out.push_str(&types);
            out.push_str(&bindings);
            emission.files.push(self.file(config.path(&format!("{}.go", package)), out));
            return emission;
        }

        let mut out = self.preamble(model, &package, has_codecs);
        out.push_str(&types);
        emission.files.push(self.file(config.path("types.go"), out));

        for unit in binding_units(model) {
            let mut out = self.preamble(model, &package, true);
            out.push_str(&self.render_bindings(model, config, model.operations_in(&unit.proto_file)));
            emission.files.push(self.file(config.path(&format!("{}.go", unit.stem)), out));
        }
        emission
    }
}

impl GoBackend {
    fn file(&self, path: String, content: String) -> GeneratedFile {
        GeneratedFile {
            target: self.target().to_string(),
            path,
            content,
        }
    }

    fn preamble(&self, model: &IrModel, package: &str, uses_runtime: bool) -> String {
        let mut out = header("//", model);
        out.push_str(&format!("\npackage {}\n", package));
        if uses_runtime {
            out.push_str(&format!("\nimport dmxp \"{}\"\n", RUNTIME_IMPORT));
        }
        out
    }

    fn type_name(&self, full_name: &str, model: &IrModel, config: &TargetConfig) -> String {
        let ident = model
            .type_ident(full_name)
            .map(str::to_string)
            .unwrap_or_else(|| full_name.replace('.', "_"));
        self.escape(&ident, config)
    }

    fn field_name(&self, field: &FieldShape, config: &TargetConfig) -> String {
        self.escape(&to_pascal_case(&to_snake_case(&field.name)), config)
    }

    /// Optional scalars and enums are held by pointer.
    fn field_type(&self, field: &FieldShape, model: &IrModel, config: &TargetConfig) -> String {
        let mapped = self.map_type(&field.ty, model, config);
        match (&field.ty, field.optional) {
            (TypeRef::Scalar(_) | TypeRef::Enum(_), true) => format!("*{}", mapped.expr),
            _ => mapped.expr,
        }
    }

    fn render_types(&self, model: &IrModel, config: &TargetConfig) -> String {
        let mut out = String::new();
        for shape in model.enums.values() {
            out.push_str(&self.render_enum(shape, config));
        }
        for shape in model.messages.values() {
            out.push_str(&self.render_message(shape, model, config));
        }
        out
    }

    fn render_enum(&self, shape: &EnumShape, config: &TargetConfig) -> String {
        let name = self.escape(&shape.ident, config);
        let mut out = String::new();
        out.push('\n');
        for line in doc_lines(shape.doc.as_deref()) {
            out.push_str(&format!("// {}\n", line).replace("// \n", "//\n"));
        }
        out.push_str(&format!("type {} int32\n\nconst (\n", name));
        for (value_name, value) in shape.value_names().into_iter().zip(&shape.values) {
            out.push_str(&format!(
                "\t{}{} {} = {}\n",
                name,
                to_pascal_case(&value_name.to_ascii_lowercase()),
                name,
                value.number
            ));
        }
        out.push_str(")\n");
        out
    }

    fn render_message(&self, shape: &MessageShape, model: &IrModel, config: &TargetConfig) -> String {
        let name = self.escape(&shape.ident, config);
        let mut out = String::new();
        out.push('\n');
        for line in doc_lines(shape.doc.as_deref()) {
            out.push_str(&format!("// {}\n", line).replace("// \n", "//\n"));
        }
        out.push_str(&format!("type {} struct {{\n", name));
        for field in &shape.fields {
            out.push_str(&format!(
                "\t{} {}\n",
                self.field_name(field, config),
                self.field_type(field, model, config)
            ));
        }
        out.push_str("}\n");

        out.push_str(&format!("\n// MarshalDMXP implements dmxp.Message.\nfunc (m *{}) MarshalDMXP(w *dmxp.Writer) {{\n", name));
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            match (&field.ty, field.optional) {
                (TypeRef::Message(_), _) => out.push_str(&format!(
                    "\tif m.{0} != nil {{\n\t\tdmxp.Write{1}(w, {2}, m.{0})\n\t}}\n",
                    ident, mapped.hook, field.number
                )),
                (TypeRef::Scalar(_) | TypeRef::Enum(_), true) => out.push_str(&format!(
                    "\tif m.{0} != nil {{\n\t\tdmxp.Write{1}(w, {2}, *m.{0})\n\t}}\n",
                    ident, mapped.hook, field.number
                )),
                _ => out.push_str(&format!("\tdmxp.Write{}(w, {}, m.{})\n", mapped.hook, field.number, ident)),
            }
        }
        out.push_str("}\n");

        out.push_str(&format!(
            "\n// UnmarshalDMXP implements dmxp.Message.\nfunc (m *{}) UnmarshalDMXP(r *dmxp.Reader) error {{\n",
            name
        ));
        out.push_str("\tfor {\n\t\tnumber, ok, err := r.NextField()\n\t\tif err != nil || !ok {\n\t\t\treturn err\n\t\t}\n");
        out.push_str("\t\tswitch number {\n");
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let optional = field.optional && matches!(field.ty, TypeRef::Scalar(_) | TypeRef::Enum(_));
            out.push_str(&format!(
                "\t\tcase {}:\n\t\t\terr = dmxp.Read{}{}(r, &m.{})\n",
                field.number,
                if optional { "Optional" } else { "" },
                mapped.hook,
                self.field_name(field, config)
            ));
        }
        out.push_str("\t\tdefault:\n\t\t\terr = r.Skip()\n\t\t}\n");
        out.push_str("\t\tif err != nil {\n\t\t\treturn err\n\t\t}\n\t}\n}\n");
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
                out.push_str(&render_channel_constants(channel));
            }
            out.push_str(&self.render_operation(op, channel, model, config));
        }
        out
    }

    fn render_operation(&self, op: &OperationDecl, channel: &ChannelDecl, model: &IrModel, config: &TargetConfig) -> String {
        let function = to_pascal_case(&op.ident);
        let suffix = to_pascal_case(&channel.ident);
        let request = self.map_type(&op.request, model, config);
        let request_type = request.element.unwrap_or(request.expr);
        let response_type = op
            .response
            .as_ref()
            .map(|ty| {
                let mapped = self.map_type(ty, model, config);
                mapped.element.unwrap_or(mapped.expr)
            })
            .unwrap_or_default();

        let mut out = String::new();
        out.push('\n');
        let doc = doc_lines(channel.doc.as_deref());
        let summary = match op.kind {
            OperationKind::Publish => format!("publishes a {} on {:?}.", request_type, channel.name),
            OperationKind::Subscribe => format!(
                "delivers each {} received on {:?} to handler, or the decode error.",
                request_type, channel.name
            ),
            OperationKind::Call => format!(
                "sends a {} request on {:?} and waits for the {} response.",
                request_type, channel.name, response_type
            ),
            OperationKind::Serve => format!(
                "answers {} requests on {:?} with handler's {}.",
                request_type, channel.name, response_type
            ),
        };
        out.push_str(&format!("// {} {}\n", function, summary));
        if !doc.is_empty() {
            out.push_str("//\n");
            for line in doc {
                out.push_str(&format!("// {}\n", line).replace("// \n", "//\n"));
            }
        }

        match op.kind {
            OperationKind::Publish => {
                out.push_str(&format!("func {}(t *dmxp.Transport, msg *{}) error {{\n", function, request_type));
                out.push_str(&format!(
                    "\treturn t.Publish(Channel{0}, Qos{0}, dmxp.Encode(msg))\n}}\n",
                    suffix
                ));
            }
            OperationKind::Subscribe => {
                out.push_str(&format!(
                    "func {}(t *dmxp.Transport, handler func(*{}, error)) (*dmxp.Subscription, error) {{\n",
                    function, request_type
                ));
                out.push_str(&format!("\treturn t.Subscribe(Channel{0}, Qos{0}, func(payload []byte) {{\n", suffix));
                out.push_str(&format!("\t\tmsg := new({})\n", request_type));
                out.push_str("\t\tif err := dmxp.Decode(payload, msg); err != nil {\n\t\t\thandler(nil, err)\n\t\t\treturn\n\t\t}\n");
                out.push_str("\t\thandler(msg, nil)\n\t})\n}\n");
            }
            OperationKind::Call => {
                out.push_str(&format!(
                    "func {}(t *dmxp.Transport, req *{}) (*{}, error) {{\n",
                    function, request_type, response_type
                ));
                out.push_str(&format!("\treply, err := t.Call(Channel{0}, Qos{0}, dmxp.Encode(req))\n", suffix));
                out.push_str("\tif err != nil {\n\t\treturn nil, err\n\t}\n");
                out.push_str(&format!("\tresp := new({})\n", response_type));
                out.push_str("\tif err := dmxp.Decode(reply, resp); err != nil {\n\t\treturn nil, err\n\t}\n");
                out.push_str("\treturn resp, nil\n}\n");
            }
            OperationKind::Serve => {
                out.push_str(&format!(
                    "func {}(t *dmxp.Transport, handler func(*{}) (*{}, error)) (*dmxp.Subscription, error) {{\n",
                    function, request_type, response_type
                ));
                out.push_str(&format!(
                    "\treturn t.Serve(Channel{0}, Qos{0}, func(payload []byte) ([]byte, error) {{\n",
                    suffix
                ));
                out.push_str(&format!("\t\treq := new({})\n", request_type));
                out.push_str("\t\tif err := dmxp.Decode(payload, req); err != nil {\n\t\t\treturn nil, err\n\t\t}\n");
                out.push_str("\t\tresp, err := handler(req)\n\t\tif err != nil {\n\t\t\treturn nil, err\n\t\t}\n");
                out.push_str("\t\treturn dmxp.Encode(resp), nil\n\t})\n}\n");
            }
        }
        out
    }
}

fn render_channel_constants(channel: &ChannelDecl) -> String {
    let suffix = to_pascal_case(&channel.ident);
    let mut out = String::new();
    out.push_str(&format!(
        "\n// Channel{} is the transport identifier of the {:?} channel.\n",
        suffix, channel.name
    ));
    out.push_str(&format!("const Channel{} = \"{}\"\n", suffix, channel.name));
    out.push_str(&format!(
        "\n// Qos{} holds the quality-of-service hints of the {:?} channel.\n",
        suffix, channel.name
    ));
    let fields = qos_fields(&channel.qos);
    out.push_str(&format!("var Qos{} = dmxp.Qos{{{}}}\n", suffix, fields.join(", ")));
    out
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Double => "float64",
        ScalarKind::Float => "float32",
        ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => "int32",
        ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => "int64",
        ScalarKind::Uint32 | ScalarKind::Fixed32 => "uint32",
        ScalarKind::Uint64 | ScalarKind::Fixed64 => "uint64",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "string",
        ScalarKind::Bytes => "[]byte",
    }
}

/// Non-default QoS fields as Go keyed struct elements.
fn qos_fields(qos: &QosHints) -> Vec<String> {
    let mut fields = Vec::new();
    if let Some(ordering) = qos.ordering {
        let name = match ordering {
            Ordering::Fifo => "OrderingFifo",
            Ordering::Unordered => "OrderingUnordered",
            Ordering::LatestOnly => "OrderingLatestOnly",
            Ordering::Unspecified => "OrderingUnspecified",
        };
        fields.push(format!("Ordering: dmxp.{}", name));
    }
    if let Some(delivery) = qos.delivery {
        let name = match delivery {
            Delivery::BestEffort => "DeliveryBestEffort",
            Delivery::AtLeastOnce => "DeliveryAtLeastOnce",
            Delivery::ExactlyOnce => "DeliveryExactlyOnce",
            Delivery::Unspecified => "DeliveryUnspecified",
        };
        fields.push(format!("Delivery: dmxp.{}", name));
    }
    let numbers = [
        ("BufferSize", qos.buffer_size),
        ("Priority", qos.priority),
        ("TimeoutMs", qos.timeout_ms),
        ("RetryCount", qos.retry_count),
    ];
    fields.extend(numbers.iter().filter_map(|(field, value)| value.map(|v| format!("{}: {}", field, v))));
    let flags = [
        ("Persistent", qos.persistent),
        ("WalEnabled", qos.wal_enabled),
        ("SwapEnabled", qos.swap_enabled),
    ];
    fields.extend(flags.iter().filter(|(_, set)| *set).map(|(field, _)| format!("{}: true", field)));
    fields
}
