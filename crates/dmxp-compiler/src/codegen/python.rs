//! Python backend.
//!
//! Messages are dataclasses with an `encode` method and a `decode`
//! classmethod; enums are `enum.IntEnum`. Transport failures surface as
//! `dmxp.TransportError` raised by the runtime. Subscribe handlers take a
//! `(message, error)` pair so undecodable payloads reach them as
//! `dmxp.DecodeError`.

use std::collections::{BTreeSet, HashSet};

use crate::config::TargetConfig;
use crate::ir::{ChannelDecl, EnumShape, FieldShape, IrModel, MessageShape, OperationDecl, OperationKind, ScalarKind, TypeRef};
use crate::naming::{to_screaming_snake_case, to_snake_case};
use crate::options::{Delivery, Ordering, QosHints};
use super::{binding_units, doc_lines, header, hook_name, Backend, Emission, GeneratedFile, MappedType};

const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in",
    "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
    // bound at module level by the generated imports
    "dataclass", "dmxp", "enum", "field",
];

/// Members every generated dataclass defines itself.
const MESSAGE_MEMBERS: &[&str] = &["self", "cls", "encode", "decode"];

const TYPES_IMPORTS: &str = "from __future__ import annotations\n\n\
import enum\n\
from dataclasses import dataclass, field\n\
from typing import Dict, List, Optional\n\n\
import dmxp\n";

pub struct PythonBackend;

impl Backend for PythonBackend {
    fn target(&self) -> &'static str {
        "python"
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
                    expr: format!("List[{}]", inner.expr),
                    hook,
                    element: inner.element,
                }
            }
            TypeRef::Map { key, value } => {
                let value = self.map_type(value, model, config);
                MappedType {
                    expr: format!("Dict[{}, {}]", scalar_type(*key), value.expr),
                    hook,
                    element: value.element,
                }
            }
        }
    }

    fn emit(&self, model: &IrModel, config: &TargetConfig) -> Emission {
        let mut emission = Emission::default();
        let module = self.escape(&to_snake_case(&config.package_name), config);
        let types = self.render_types(model, config);

        if !config.split_files {
            let mut out = header("#", model);
            out.push('\n');
            out.push_str(TYPES_IMPORTS.replace("Dict, List", "Callable, Dict, List").as_str());
            out.push_str(&types);
            out.push_str(&self.render_bindings(model, config, model.operations.iter()));
            emission.files.push(self.file(config.path(&format!("{}.py", module)), out));
            return emission;
        }

        let mut out = header("#", model);
        out.push('\n');
        out.push_str(TYPES_IMPORTS);
        out.push_str(&types);
        emission.files.push(self.file(config.path(&format!("{}/types.py", module)), out));

        let mut index = header("#", model);
        index.push_str("\nfrom .types import *  # noqa: F401,F403\n");
        for unit in binding_units(model) {
            index.push_str(&format!("from .{} import *  # noqa: F401,F403\n", unit.stem));

            let operations: Vec<_> = model.operations_in(&unit.proto_file).collect();
            let imported: BTreeSet<String> = operations
                .iter()
                .flat_map(|op| std::iter::once(&op.request).chain(op.response.as_ref()))
                .filter_map(|ty| self.map_type(ty, model, config).element)
                .collect();

            let mut out = header("#", model);
            out.push_str("\nfrom __future__ import annotations\n\nfrom typing import Callable, Optional\n\nimport dmxp\n\n");
            out.push_str(&format!(
                "from .types import {}\n",
                imported.into_iter().collect::<Vec<_>>().join(", ")
            ));
            out.push_str(&self.render_bindings(model, config, operations.into_iter()));
            emission.files.push(self.file(config.path(&format!("{}/{}.py", module, unit.stem)), out));
        }
        emission.files.push(self.file(config.path(&format!("{}/__init__.py", module)), index));
        emission
    }
}

impl PythonBackend {
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
        let ident = to_snake_case(&field.name);
        if MESSAGE_MEMBERS.contains(&ident.as_str()) {
            format!("{}{}", ident, config.escape_suffix)
        } else {
            self.escape(&ident, config)
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
        out.push_str(&format!("\n\nclass {}(enum.IntEnum):\n", self.escape(&shape.ident, config)));
        let doc = doc_lines(shape.doc.as_deref());
        if !doc.is_empty() {
            out.push_str(&docstring("    ", &doc));
            out.push('\n');
        }
        // IntEnum turns repeated numbers into aliases.
        for (name, value) in shape.value_names().into_iter().zip(&shape.values) {
            out.push_str(&format!("    {} = {}\n", self.escape(name, config), value.number));
        }
        if shape.values.is_empty() {
            out.push_str("    pass\n");
        }
        out
    }

    fn default_value(&self, field: &FieldShape, model: &IrModel, config: &TargetConfig) -> String {
        if field.optional {
            return "None".to_string();
        }
        match &field.ty {
            TypeRef::Scalar(kind) => match kind {
                ScalarKind::Double | ScalarKind::Float => "0.0",
                ScalarKind::Bool => "False",
                ScalarKind::String => "\"\"",
                ScalarKind::Bytes => "b\"\"",
                _ => "0",
            }
            .to_string(),
            TypeRef::Enum(name) => {
                let ident = self.type_name(name, model, config);
                match model.enumeration(name).and_then(|e| e.value_names().first().copied()) {
                    Some(first) => format!("{}.{}", ident, self.escape(first, config)),
                    None => format!("{}(0)", ident),
                }
            }
            TypeRef::Message(_) => "None".to_string(),
            TypeRef::Repeated(_) => "field(default_factory=list)".to_string(),
            TypeRef::Map { .. } => "field(default_factory=dict)".to_string(),
        }
    }

    fn render_message(&self, shape: &MessageShape, model: &IrModel, config: &TargetConfig) -> String {
        let name = self.escape(&shape.ident, config);
        let mut out = String::new();
        out.push_str(&format!("\n\n@dataclass\nclass {}:\n", name));
        let doc = doc_lines(shape.doc.as_deref());
        if !doc.is_empty() {
            out.push_str(&docstring("    ", &doc));
            out.push('\n');
        }

        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let annotation = match (&field.ty, field.optional) {
                (TypeRef::Message(_), _) | (_, true) => format!("Optional[{}]", mapped.expr),
                _ => mapped.expr,
            };
            out.push_str(&format!(
                "    {}: {} = {}\n",
                self.field_name(field, config),
                annotation,
                self.default_value(field, model, config)
            ));
        }
        if !shape.fields.is_empty() {
            out.push('\n');
        }

        out.push_str("    def encode(self, w: dmxp.Writer) -> None:\n");
        if shape.fields.is_empty() {
            out.push_str("        pass\n");
        }
        for field in &shape.fields {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            if field.optional || matches!(field.ty, TypeRef::Message(_)) {
                out.push_str(&format!(
                    "        if self.{0} is not None:\n            w.write_{1}({2}, self.{0})\n",
                    ident, mapped.hook, field.number
                ));
            } else {
                out.push_str(&format!("        w.write_{}({}, self.{})\n", mapped.hook, field.number, ident));
            }
        }

        out.push_str(&format!(
            "\n    @classmethod\n    def decode(cls, r: dmxp.Reader) -> {}:\n        msg = cls()\n        for number in r.fields():\n",
            name
        ));
        for (i, field) in shape.fields.iter().enumerate() {
            let mapped = self.map_type(&field.ty, model, config);
            let ident = self.field_name(field, config);
            let element = mapped.element.as_deref().unwrap_or("");
            let read = format!("r.read_{}({})", mapped.hook, element);
            let keyword = if i == 0 { "if" } else { "elif" };
            let assign = match &field.ty {
                TypeRef::Repeated(_) => format!("msg.{}.extend({})", ident, read),
                TypeRef::Map { .. } => format!("msg.{}.update({})", ident, read),
                _ => format!("msg.{} = {}", ident, read),
            };
            out.push_str(&format!("            {} number == {}:\n                {}\n", keyword, field.number, assign));
        }
        if shape.fields.is_empty() {
            out.push_str("            r.skip()\n");
        } else {
            out.push_str("            else:\n                r.skip()\n");
        }
        out.push_str("        return msg\n");
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
        let function = self.escape(&op.ident, config);
        let constant = to_screaming_snake_case(&channel.ident);
        let request = self.map_type(&op.request, model, config).expr;
        let response = op
            .response
            .as_ref()
            .map(|ty| self.map_type(ty, model, config).expr)
            .unwrap_or_default();

        let summary = match op.kind {
            OperationKind::Publish => format!("Publish a {} on {:?}.", request, channel.name),
            OperationKind::Subscribe => format!(
                "Deliver each {} received on {:?} to handler, or the decode error.",
                request, channel.name
            ),
            OperationKind::Call => format!(
                "Send a {} request on {:?} and return the {} response.",
                request, channel.name, response
            ),
            OperationKind::Serve => format!(
                "Answer {} requests on {:?} with the {} returned by handler.",
                request, channel.name, response
            ),
        };
        let mut doc = vec![summary.as_str()];
        let channel_doc = doc_lines(channel.doc.as_deref());
        if !channel_doc.is_empty() {
            doc.push("");
            doc.extend(channel_doc);
        }
        if op.kind == OperationKind::Call {
            doc.push("");
            doc.push("Raises dmxp.TransportError when the call fails or times out.");
        }

        let mut out = String::new();
        match op.kind {
            OperationKind::Publish => {
                out.push_str(&format!(
                    "\n\ndef {}(transport: dmxp.Transport, message: {}) -> None:\n",
                    function, request
                ));
                out.push_str(&docstring("    ", &doc));
                out.push_str(&format!(
                    "    transport.publish({0}, {0}_QOS, dmxp.encode(message))\n",
                    constant
                ));
            }
            OperationKind::Subscribe => {
                out.push_str(&format!(
                    "\n\ndef {}(\n    transport: dmxp.Transport,\n    handler: Callable[[Optional[{}], Optional[dmxp.DecodeError]], None],\n) -> dmxp.Subscription:\n",
                    function, request
                ));
                out.push_str(&docstring("    ", &doc));
                out.push_str("    def on_payload(payload: bytes) -> None:\n");
                out.push_str(&format!(
                    "        try:\n            message = dmxp.decode({}, payload)\n        except dmxp.DecodeError as err:\n            handler(None, err)\n        else:\n            handler(message, None)\n\n",
                    request
                ));
                out.push_str(&format!("    return transport.subscribe({0}, {0}_QOS, on_payload)\n", constant));
            }
            OperationKind::Call => {
                out.push_str(&format!(
                    "\n\ndef {}(transport: dmxp.Transport, request: {}) -> {}:\n",
                    function, request, response
                ));
                out.push_str(&docstring("    ", &doc));
                out.push_str(&format!(
                    "    reply = transport.call({0}, {0}_QOS, dmxp.encode(request))\n",
                    constant
                ));
                out.push_str(&format!("    return dmxp.decode({}, reply)\n", response));
            }
            OperationKind::Serve => {
                out.push_str(&format!(
                    "\n\ndef {}(transport: dmxp.Transport, handler: Callable[[{}], {}]) -> dmxp.Subscription:\n",
                    function, request, response
                ));
                out.push_str(&docstring("    ", &doc));
                out.push_str("    def on_request(payload: bytes) -> bytes:\n");
                out.push_str(&format!("        return dmxp.encode(handler(dmxp.decode({}, payload)))\n\n", request));
                out.push_str(&format!("    return transport.serve({0}, {0}_QOS, on_request)\n", constant));
            }
        }
        out
    }
}

fn render_channel_constants(channel: &ChannelDecl) -> String {
    let constant = to_screaming_snake_case(&channel.ident);
    format!(
        "\n{0} = {1:?}\n{0}_QOS = dmxp.Qos({2})\n",
        constant,
        channel.name,
        qos_arguments(&channel.qos).join(", ")
    )
}

/// Triple-quoted docstring at `indent`.
fn docstring(indent: &str, lines: &[&str]) -> String {
    let escaped: Vec<String> = lines
        .iter()
        .map(|line| line.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\""))
        .collect();
    if escaped.len() == 1 {
        // a trailing quote would merge into the closing delimiter
        let line = match escaped[0].strip_suffix('"') {
            Some(rest) => format!("{}\\\"", rest),
            None => escaped[0].clone(),
        };
        return format!("{}\"\"\"{}\"\"\"\n", indent, line);
    }
    let mut out = format!("{}\"\"\"{}\n", indent, escaped[0]);
    for line in &escaped[1..] {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{}{}\n", indent, line));
        }
    }
    out.push_str(&format!("{}\"\"\"\n", indent));
    out
}

fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Double | ScalarKind::Float => "float",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "str",
        ScalarKind::Bytes => "bytes",
        _ => "int",
    }
}

fn qos_arguments(qos: &QosHints) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(ordering) = qos.ordering {
        let name = match ordering {
            Ordering::Fifo => "FIFO",
            Ordering::Unordered => "UNORDERED",
            Ordering::LatestOnly => "LATEST_ONLY",
            Ordering::Unspecified => "UNSPECIFIED",
        };
        args.push(format!("ordering=dmxp.Ordering.{}", name));
    }
    if let Some(delivery) = qos.delivery {
        let name = match delivery {
            Delivery::BestEffort => "BEST_EFFORT",
            Delivery::AtLeastOnce => "AT_LEAST_ONCE",
            Delivery::ExactlyOnce => "EXACTLY_ONCE",
            Delivery::Unspecified => "UNSPECIFIED",
        };
        args.push(format!("delivery=dmxp.Delivery.{}", name));
    }
    let numbers = [
        ("buffer_size", qos.buffer_size),
        ("priority", qos.priority),
        ("timeout_ms", qos.timeout_ms),
        ("retry_count", qos.retry_count),
    ];
    args.extend(numbers.iter().filter_map(|(arg, value)| value.map(|v| format!("{}={}", arg, v))));
    let flags = [
        ("persistent", qos.persistent),
        ("wal_enabled", qos.wal_enabled),
        ("swap_enabled", qos.swap_enabled),
    ];
    args.extend(flags.iter().filter(|(_, set)| *set).map(|(arg, _)| format!("{}=True", arg)));
    args
}
