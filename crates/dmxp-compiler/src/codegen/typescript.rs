//! TypeScript backend.
//!
//! Messages are interfaces paired with a `<Name>Codec` object; every binding
//! is async and failed calls reject their promise. Payloads that fail to
//! decode reach subscribe handlers as the `error` argument.

use std::collections::{BTreeSet, HashSet};

use crate::config::TargetConfig;
use crate::ir::{ChannelDecl, EnumShape, FieldShape, IrModel, MessageShape, OperationDecl, OperationKind, ScalarKind, TypeRef};
use crate::naming::{to_camel_case, to_pascal_case, to_screaming_snake_case, to_snake_case};
use crate::options::{Delivery, Ordering, QosHints};
use super::{binding_units, doc_lines, header, hook_name, Backend, Emission, GeneratedFile, MappedType};

/// Module specifier of the TypeScript transport runtime.
pub const RUNTIME_MODULE: &str = "@dmxp/runtime";

const RESERVED: &[&str] = &[
    "any", "as", "async", "await", "boolean", "break", "case", "catch", "class", "const", "constructor",
    "continue", "debugger", "declare", "default", "delete", "do", "else", "enum", "export", "extends",
    "false", "finally", "for", "from", "function", "get", "if", "implements", "import", "in",
    "instanceof", "interface", "let", "module", "new", "null", "number", "of", "package", "private",
    "protected", "public", "require", "return", "set", "static", "string", "super", "switch", "symbol",
    "this", "throw", "true", "try", "type", "typeof", "undefined", "var", "void", "while", "with", "yield",
];

pub struct TypeScriptBackend;

impl Backend for TypeScriptBackend {
    fn target(&self) -> &'static str {
        "typescript"
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
                    expr: format!("{}[]", inner.expr),
                    hook,
                    element: inner.element,
                }
            }
            TypeRef::Map { key, value } => {
                let value = self.map_type(value, model, config);
                MappedType {
                    expr: format!("Map<{}, {}>", scalar_type(*key), value.expr),
                    hook,
                    element: value.element,
                }
            }
        }
    }

    fn emit(&self, model: &IrModel, config: &TargetConfig) -> Emission {
        let mut emission = Emission::default();
        let module = self.escape(&to_snake_case(&config.package_name), config);
        let import = format!("\nimport * as dmxp from \"{}\";\n", RUNTIME_MODULE);
        let types = self.render_types(model, config);

        if !config.split_files {
            let mut out = header("//", model);
            out.push_str(&import);
            out.push_str(&types);
            out.push_str(&self.render_bindings(model, config, model.operations.iter()));
            emission.files.push(self.file(config.path(&format!("{}.ts", module)), out));
            return emission;
        }

        let mut out = header("//", model);
        out.push_str(&import);
        out.push_str(&types);
        emission.files.push(self.file(config.path(&format!("{}/types.ts", module)), out));

        let mut index = header("//", model);
        index.push_str("\nexport * from \"./types\";\n");
        for unit in binding_units(model) {
            index.push_str(&format!("export * from \"./{}\";\n", unit.stem));

            let operations: Vec<_> = model.operations_in(&unit.proto_file).collect();
            let imported: BTreeSet<String> = operations
                .iter()
                .flat_map(|op| std::iter::once(&op.request).chain(op.response.as_ref()))
                .filter_map(|ty| self.map_type(ty, model, config).element)
                .flat_map(|ident| [format!("{}Codec", ident), ident])
                .collect();

            let mut out = header("//", model);
            out.push_str(&import);
            out.push_str(&format!(
                "import {{ {} }} from \"./types\";\n",
                imported.into_iter().collect::<Vec<_>>().join(", ")
            ));
            out.push_str(&self.render_bindings(model, config, operations.into_iter()));
            emission.files.push(self.file(config.path(&format!("{}/{}.ts", module, unit.stem)), out));
        }
        emission.files.push(self.file(config.path(&format!("{}/index.ts", module)), index));
        emission
    }
}

impl TypeScriptBackend {
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
        self.escape(&to_camel_case(&field.name), config)
    }

    /// Extra codec argument for hooks whose payload is a message.
    fn codec_argument(&self, ty: &TypeRef, model: &IrModel, config: &TargetConfig) -> String {
        let mut inner = ty;
        loop {
            match inner {
                TypeRef::Repeated(next) => inner = next,
                TypeRef::Map { value, .. } => inner = value,
                TypeRef::Message(name) => return format!("{}Codec, ", self.type_name(name, model, config)),
                TypeRef::Scalar(_) | TypeRef::Enum(_) => return String::new(),
            }
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
        let mut out = String::new();
        out.push('\n');
        out.push_str(&jsdoc("", &doc_lines(shape.doc.as_deref())));
        out.push_str(&format!("export enum {} {{\n", self.escape(&shape.ident, config)));
        for (name, value) in shape.value_names().into_iter().zip(&shape.values) {
            out.push_str(&format!("  {} = {},\n", self.escape(name, config), value.number));
        }
        out.push_str("}\n");
        out
    }

    fn default_value(&self, field: &FieldShape, model: &IrModel, config: &TargetConfig) -> String {
        if field.optional {
            return "undefined".to_string();
        }
        match &field.ty {
            TypeRef::Scalar(kind) => match kind {
                ScalarKind::Bool => "false",
                ScalarKind::String => "\"\"",
                ScalarKind::Bytes => "new Uint8Array(0)",
                kind if kind.is_64_bit() && !kind.is_float() => "0n",
                _ => "0",
            }
            .to_string(),
            TypeRef::Enum(name) => {
                let ident = self.type_name(name, model, config);
                match model.enumeration(name).and_then(|e| e.value_names().first().copied()) {
                    Some(first) => format!("{}.{}", ident, self.escape(first, config)),
                    None => format!("0 as {}", ident),
                }
            }
            TypeRef::Message(_) => "undefined".to_string(),
            TypeRef::Repeated(_) => "[]".to_string(),
            TypeRef::Map { .. } => "new Map()".to_string(),
        }
    }

    fn render_message(&self, shape: &MessageShape, model: &IrModel, config: &TargetConfig) -> String {
        let name = self.escape(&shape.ident, config);
        let codec = format!("{}Codec", name);
        let mut out = String::new();

        out.push('\n');
        out.push_str(&jsdoc("", &doc_lines(shape.doc.as_deref())));
        out.push_str(&format!("export interface {} {{\n", name));
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ty = if field.optional || matches!(field.ty, TypeRef::Message(_)) {
                format!("{} | undefined", mapped.expr)
            } else {
                mapped.expr
            };
            out.push_str(&format!("  {}: {};\n", self.field_name(field, config), ty));
        }
        out.push_str("}\n");

        out.push_str(&format!("\nexport const {}: dmxp.Codec<{}> = {{\n", codec, name));
        out.push_str(&format!("  create(): {} {{\n", name));
        if shape.fields.is_empty() {
            out.push_str("    return {};\n");
        } else {
            out.push_str("    return {\n");
            for field in &shape.fields {
                out.push_str(&format!(
                    "      {}: {},\n",
                    self.field_name(field, config),
                    self.default_value(field, model, config)
                ));
            }
            out.push_str("    };\n");
        }
        out.push_str("  },\n");

        let writer = if shape.fields.is_empty() { "_w" } else { "w" };
        let message = if shape.fields.is_empty() { "_m" } else { "m" };
        out.push_str(&format!("  encode({}: dmxp.Writer, {}: {}): void {{\n", writer, message, name));
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            let codec_arg = self.codec_argument(&field.ty, model, config);
            if field.optional || matches!(field.ty, TypeRef::Message(_)) {
                out.push_str(&format!(
                    "    if (m.{0} !== undefined) {{\n      w.write{1}({2}, {3}m.{0});\n    }}\n",
                    ident, mapped.hook, field.number, codec_arg
                ));
            } else {
                out.push_str(&format!(
                    "    w.write{}({}, {}m.{});\n",
                    mapped.hook, field.number, codec_arg, ident
                ));
            }
        }
        out.push_str("  },\n");

        out.push_str(&format!("  decode(r: dmxp.Reader): {} {{\n", name));
        out.push_str(&format!("    const m = {}.create();\n", codec));
        out.push_str("    for (let number = r.nextField(); number !== undefined; number = r.nextField()) {\n");
        out.push_str("      switch (number) {\n");
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            let codec_arg = self.codec_argument(&field.ty, model, config);
            let codec_arg = codec_arg.trim_end_matches(", ");
            let read = match &field.ty {
                TypeRef::Enum(_) => format!("r.read{}<{}>()", mapped.hook, mapped.element.unwrap_or_default()),
                _ => format!("r.read{}({})", mapped.hook, codec_arg),
            };
            let assign = match &field.ty {
                TypeRef::Repeated(_) => format!("m.{}.push(...{});", ident, read),
                TypeRef::Map { .. } => format!("{}.forEach((v, k) => m.{}.set(k, v));", read, ident),
                _ => format!("m.{} = {};", ident, read),
            };
            out.push_str(&format!("        case {}:\n          {}\n          break;\n", field.number, assign));
        }
        out.push_str("        default:\n          r.skip();\n      }\n    }\n    return m;\n  },\n};\n");
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
        let function = self.escape(&to_camel_case(&op.ident), config);
        let constant = to_screaming_snake_case(&channel.ident);
        let request = self.map_type(&op.request, model, config).expr;
        let response = op
            .response
            .as_ref()
            .map(|ty| self.map_type(ty, model, config).expr)
            .unwrap_or_default();

        let summary = match op.kind {
            OperationKind::Publish => format!("Publishes a {} on {:?}.", request, channel.name),
            OperationKind::Subscribe => format!(
                "Delivers each {} received on {:?} to `handler`, or the decode error.",
                request, channel.name
            ),
            OperationKind::Call => format!(
                "Sends a {} request on {:?}; resolves with the {} response and rejects on transport failure.",
                request, channel.name, response
            ),
            OperationKind::Serve => format!(
                "Answers {} requests on {:?} with the {} produced by `handler`.",
                request, channel.name, response
            ),
        };
        let mut doc = vec![summary.as_str()];
        let channel_doc = doc_lines(channel.doc.as_deref());
        if !channel_doc.is_empty() {
            doc.push("");
            doc.extend(channel_doc);
        }

        let mut out = String::new();
        out.push('\n');
        out.push_str(&jsdoc("", &doc));
        match op.kind {
            OperationKind::Publish => {
                out.push_str(&format!(
                    "export async function {}(transport: dmxp.Transport, message: {}): Promise<void> {{\n",
                    function, request
                ));
                out.push_str(&format!(
                    "  await transport.publish({0}, {0}_QOS, dmxp.encode({1}Codec, message));\n}}\n",
                    constant, request
                ));
            }
            OperationKind::Subscribe => {
                out.push_str(&format!(
                    "export async function {}(\n  transport: dmxp.Transport,\n  handler: (message: {} | undefined, error?: Error) => void,\n): Promise<dmxp.Subscription> {{\n",
                    function, request
                ));
                out.push_str(&format!(
                    "  return transport.subscribe({0}, {0}_QOS, (payload: Uint8Array) => {{\n    let message: {1};\n    try {{\n      message = dmxp.decode({1}Codec, payload);\n    }} catch (err) {{\n      handler(undefined, err as Error);\n      return;\n    }}\n    handler(message);\n  }});\n}}\n",
                    constant, request
                ));
            }
            OperationKind::Call => {
                out.push_str(&format!(
                    "export async function {}(transport: dmxp.Transport, request: {}): Promise<{}> {{\n",
                    function, request, response
                ));
                out.push_str(&format!(
                    "  const reply = await transport.call({0}, {0}_QOS, dmxp.encode({1}Codec, request));\n",
                    constant, request
                ));
                out.push_str(&format!("  return dmxp.decode({}Codec, reply);\n}}\n", response));
            }
            OperationKind::Serve => {
                out.push_str(&format!(
                    "export async function {}(\n  transport: dmxp.Transport,\n  handler: (request: {}) => {} | Promise<{}>,\n): Promise<dmxp.Subscription> {{\n",
                    function, request, response, response
                ));
                out.push_str(&format!(
                    "  return transport.serve({0}, {0}_QOS, async (payload: Uint8Array) =>\n    dmxp.encode({1}Codec, await handler(dmxp.decode({2}Codec, payload))),\n  );\n}}\n",
                    constant, response, request
                ));
            }
        }
        out
    }
}

fn render_channel_constants(channel: &ChannelDecl) -> String {
    let constant = to_screaming_snake_case(&channel.ident);
    let fields = qos_properties(&channel.qos);
    let qos = if fields.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", fields.join(", "))
    };
    format!(
        "\nexport const {0} = {1:?};\nexport const {0}_QOS: dmxp.Qos = {2};\n",
        constant, channel.name, qos
    )
}

/// `/** ... */` block, empty when there is nothing to say.
fn jsdoc(indent: &str, lines: &[&str]) -> String {
    let lines: Vec<String> = lines.iter().map(|line| line.replace("*/", "*\\/")).collect();
    match lines.as_slice() {
        [] => String::new(),
        [line] => format!("{}/** {} */\n", indent, line),
        _ => {
            let mut out = format!("{}/**\n", indent);
            for line in &lines {
                if line.is_empty() {
                    out.push_str(&format!("{} *\n", indent));
                } else {
                    out.push_str(&format!("{} * {}\n", indent, line));
                }
            }
            out.push_str(&format!("{} */\n", indent));
            out
        }
    }
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "boolean",
        ScalarKind::String => "string",
        ScalarKind::Bytes => "Uint8Array",
        kind if kind.is_64_bit() && !kind.is_float() => "bigint",
        _ => "number",
    }
}

fn qos_properties(qos: &QosHints) -> Vec<String> {
    let mut props = Vec::new();
    if let Some(ordering) = qos.ordering {
        let name = match ordering {
            Ordering::Fifo => "Fifo",
            Ordering::Unordered => "Unordered",
            Ordering::LatestOnly => "LatestOnly",
            Ordering::Unspecified => "Unspecified",
        };
        props.push(format!("ordering: dmxp.Ordering.{}", name));
    }
    if let Some(delivery) = qos.delivery {
        let name = match delivery {
            Delivery::BestEffort => "BestEffort",
            Delivery::AtLeastOnce => "AtLeastOnce",
            Delivery::ExactlyOnce => "ExactlyOnce",
            Delivery::Unspecified => "Unspecified",
        };
        props.push(format!("delivery: dmxp.Delivery.{}", name));
    }
    let numbers = [
        ("bufferSize", qos.buffer_size),
        ("priority", qos.priority),
        ("timeoutMs", qos.timeout_ms),
        ("retryCount", qos.retry_count),
    ];
    props.extend(numbers.iter().filter_map(|(prop, value)| value.map(|v| format!("{}: {}", prop, v))));
    let flags = [
        ("persistent", qos.persistent),
        ("walEnabled", qos.wal_enabled),
        ("swapEnabled", qos.swap_enabled),
    ];
    props.extend(flags.iter().filter(|(_, set)| *set).map(|(prop, _)| format!("{}: true", prop)));
    props
}
