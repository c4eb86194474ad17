//! IR construction.
//!
//! Message and enum shapes live in an arena keyed by fully-qualified name and
//! are built at most once, so recursive message graphs terminate. Reachability
//! is walked with an explicit worklist over that arena.

use std::collections::{HashMap, HashSet, VecDeque};


use crate::descriptor::field_descriptor_proto::{Label, Type};
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto, SourceIndex,
    SymbolTable, TypeDef, TypeEntry, MESSAGE_FIELD,
};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::naming::{channel_ident, to_pascal_case};
use crate::options::{ChannelOption, ChannelSite, OptionRecord, QosHints};
use super::{
    ChannelDecl, ChannelKind, EnumShape, EnumValueShape, FieldShape, IrModel, MessageShape,
    OperationDecl, OperationKind, ScalarKind, TypeRef,
};

/// Builds the IR for one request.
pub fn build_ir(
    files: &[FileDescriptorProto],
    generated: &[&FileDescriptorProto],
    records: Vec<OptionRecord>,
    diagnostics: &mut Diagnostics,
) -> IrModel {
    let symbols = SymbolTable::build(files);
    IrBuilder::new(&symbols).build(records, generated, diagnostics)
}

enum Shape {
    Message(MessageShape),
    Enum(EnumShape),
}

impl Shape {
    fn references(&self) -> Vec<String> {
        match self {
            Shape::Message(message) => message
                .fields
                .iter()
                .filter_map(|f| f.ty.named().map(str::to_string))
                .collect(),
            Shape::Enum(_) => Vec::new(),
        }
    }
}

/// A channel whose own types resolved.
struct ResolvedChannel {
    name: String,
    kind: ChannelKind,
    message: TypeRef,
    response: Option<TypeRef>,
    qos: QosHints,
    site: ChannelSite,
}

pub struct IrBuilder<'s, 'a> {
    symbols: &'s SymbolTable<'a>,
    sources: HashMap<String, SourceIndex>,
    shapes: HashMap<String, Shape>,
    /// Shapes with at least one field that could not be resolved.
    broken: HashSet<String>,
}

impl<'s, 'a> IrBuilder<'s, 'a> {
    pub fn new(symbols: &'s SymbolTable<'a>) -> Self {
        Self {
            symbols,
            sources: HashMap::new(),
            shapes: HashMap::new(),
            broken: HashSet::new(),
        }
    }

    pub fn build(
        mut self,
        records: Vec<OptionRecord>,
        generated: &[&FileDescriptorProto],
        diagnostics: &mut Diagnostics,
    ) -> IrModel {
        let _span = tracing::debug_span!("build_ir", records = records.len()).entered();

        let channels: Vec<ResolvedChannel> = records
            .into_iter()
            .filter_map(|record| self.resolve_channel(record, diagnostics))
            .collect();

        // Only shapes reachable from surviving channels make it into the model.
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for channel in &channels {
            for ty in std::iter::once(&channel.message).chain(channel.response.as_ref()) {
                self.walk(ty, &mut visited, &mut order);
            }
        }

        let type_idents = self.assign_type_idents(&order);
        let mut model = IrModel {
            package: generated.first().map(|f| f.package().to_string()).unwrap_or_default(),
            files: generated.iter().map(|f| f.name().to_string()).collect(),
            ..IrModel::default()
        };

        for name in &order {
            let ident = type_idents.get(name).cloned().unwrap_or_else(|| name.replace('.', "_"));
            match self.shapes.remove(name) {
                Some(Shape::Message(mut shape)) => {
                    shape.ident = ident;
                    model.messages.insert(name.clone(), shape);
                }
                Some(Shape::Enum(mut shape)) => {
                    shape.ident = ident;
                    model.enums.insert(name.clone(), shape);
                }
                None => {}
            }
        }

        let mut used_keys = HashSet::new();
        for channel in channels {
            let ident = unique_channel_ident(&channel.name, &mut used_keys);
            let index = model.channels.len();
            let kinds: &[OperationKind] = match channel.kind {
                ChannelKind::Publish => &[OperationKind::Publish],
                ChannelKind::Subscribe => &[OperationKind::Subscribe],
                ChannelKind::Call => &[OperationKind::Call, OperationKind::Serve],
            };
            for kind in kinds {
                model.operations.push(OperationDecl {
                    channel: index,
                    kind: *kind,
                    ident: format!("{}_{}", kind.verb(), ident),
                    request: channel.message.clone(),
                    response: channel.response.clone(),
                });
            }
            model.channels.push(ChannelDecl {
                name: channel.name,
                ident,
                kind: channel.kind,
                message: channel.message,
                response: channel.response,
                qos: channel.qos,
                file: channel.site.file,
                location: channel.site.location,
                doc: channel.site.doc,
            });
        }

        tracing::debug!(
            channels = model.channels.len(),
            operations = model.operations.len(),
            messages = model.messages.len(),
            enums = model.enums.len(),
            "built IR"
        );
        model
    }

    fn resolve_channel(&mut self, record: OptionRecord, diagnostics: &mut Diagnostics) -> Option<ResolvedChannel> {
        let OptionRecord { option, site } = record;
        let (kind, message, response) = match &option {
            ChannelOption::Publish(o) => (ChannelKind::Publish, o.message.as_str(), None),
            ChannelOption::Subscribe(o) => (ChannelKind::Subscribe, o.message.as_str(), None),
            ChannelOption::Call(o) => (ChannelKind::Call, o.request.as_str(), Some(o.response.as_str())),
        };

        let message = self.resolve_channel_type(option.name(), message, &site, diagnostics);
        let response = match response {
            Some(name) => Some(self.resolve_channel_type(option.name(), name, &site, diagnostics)),
            None => None,
        };
        let message = message?;
        let response = match response {
            Some(resolved) => Some(resolved?),
            None => None,
        };

        let mut complete = self.ensure_closure(&message, diagnostics);
        if let Some(response) = &response {
            complete &= self.ensure_closure(response, diagnostics);
        }
        if !complete {
            diagnostics.push(
                Diagnostic::warning(
                    "dmxp::ir::channel_dropped",
                    format!(
                        "channel '{}' is not generated because a type it uses could not be resolved",
                        option.name()
                    ),
                )
                .at(site.location.clone()),
            );
            return None;
        }

        Some(ResolvedChannel {
            name: option.name().to_string(),
            kind,
            message,
            response,
            qos: option.qos().clone(),
            site,
        })
    }

    fn resolve_channel_type(
        &self,
        channel: &str,
        type_name: &str,
        site: &ChannelSite,
        diagnostics: &mut Diagnostics,
    ) -> Option<TypeRef> {
        let display = type_name.trim_start_matches('.');
        let Some(full_name) = self.symbols.resolve(type_name, &site.scope) else {
            diagnostics.push(
                Diagnostic::error(
                    "dmxp::ir::unresolved_type",
                    format!("channel '{}' references unknown type '{}'", channel, display),
                )
                .at(site.location.clone()),
            );
            return None;
        };

        match self.symbols.get(&full_name).map(|entry| entry.def) {
            Some(TypeDef::Message(message)) if !message.is_map_entry() => Some(TypeRef::Message(full_name)),
            _ => {
                diagnostics.push(
                    Diagnostic::error(
                        "dmxp::ir::not_a_message",
                        format!("channel '{}' must carry a message type, '{}' is not one", channel, display),
                    )
                    .at(site.location.clone()),
                );
                None
            }
        }
    }

    /// Builds every shape reachable from `root`. Returns false when any of
    /// them has an unresolvable field.
    fn ensure_closure(&mut self, root: &TypeRef, diagnostics: &mut Diagnostics) -> bool {
        let mut queue: VecDeque<String> = root.named().map(str::to_string).into_iter().collect();
        let mut visited = HashSet::new();
        let mut complete = true;

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if !self.shapes.contains_key(&name) {
                let Some(shape) = self.build_shape(&name, diagnostics) else {
                    continue;
                };
                self.shapes.insert(name.clone(), shape);
            }
            if self.broken.contains(&name) {
                complete = false;
            }
            if let Some(shape) = self.shapes.get(&name) {
                queue.extend(shape.references());
            }
        }
        complete
    }

    /// Records reachable shapes in first-use order.
    fn walk(&self, root: &TypeRef, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        let mut queue: VecDeque<String> = root.named().map(str::to_string).into_iter().collect();
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(shape) = self.shapes.get(&name) {
                queue.extend(shape.references());
                order.push(name);
            }
        }
    }

    fn build_shape(&mut self, full_name: &str, diagnostics: &mut Diagnostics) -> Option<Shape> {
        let entry = self.symbols.get(full_name)?.clone();
        tracing::trace!(type_name = full_name, "resolving shape");
        let doc = self.source_index(&entry).comments(&entry.path);

        match entry.def {
            TypeDef::Enum(enumeration) => Some(Shape::Enum(enum_shape(full_name, &entry, enumeration, doc))),
            TypeDef::Message(message) => {
                let mut fields = Vec::new();
                for (i, field) in message.field.iter().enumerate() {
                    match self.field_type(field, full_name) {
                        Ok(ty) => fields.push(field_shape(&entry, message, field, ty)),
                        Err(reason) => {
                            let mut path = entry.path.clone();
                            path.extend([MESSAGE_FIELD, i as i32]);
                            let field_name = format!("{}.{}", full_name, field.name());
                            let location = self.source_index(&entry).location(&path, &field_name);
                            diagnostics.push(
                                Diagnostic::error(
                                    "dmxp::ir::unresolved_type",
                                    format!("field '{}': {}", field_name, reason),
                                )
                                .at(location),
                            );
                            self.broken.insert(full_name.to_string());
                        }
                    }
                }
                Some(Shape::Message(MessageShape {
                    full_name: full_name.to_string(),
                    ident: String::new(),
                    file: entry.file.name().to_string(),
                    fields,
                    doc,
                }))
            }
        }
    }

    fn field_type(&self, field: &FieldDescriptorProto, scope: &str) -> Result<TypeRef, String> {
        // Unresolved descriptors may carry a type name without a type.
        let named = match field.r#type {
            None => field.type_name.is_some(),
            Some(_) => matches!(field.r#type(), Type::Message | Type::Group | Type::Enum),
        };

        let base = if named {
            let type_name = field.type_name();
            let full_name = self
                .symbols
                .resolve(type_name, scope)
                .ok_or_else(|| format!("unknown type '{}'", type_name.trim_start_matches('.')))?;
            match self.symbols.get(&full_name).map(|entry| entry.def) {
                Some(TypeDef::Message(entry)) if entry.is_map_entry() && field.label() == Label::Repeated => {
                    return self.map_type(entry, &full_name);
                }
                Some(TypeDef::Message(_)) => TypeRef::Message(full_name),
                Some(TypeDef::Enum(_)) => TypeRef::Enum(full_name),
                None => return Err(format!("unknown type '{}'", full_name)),
            }
        } else {
            match field.r#type.map(|_| field.r#type()) {
                Some(ty) => TypeRef::Scalar(
                    scalar_kind(ty).ok_or_else(|| format!("type {:?} needs a type name", ty))?,
                ),
                None => return Err("field has neither a type nor a type name".to_string()),
            }
        };

        if field.label() == Label::Repeated {
            Ok(TypeRef::Repeated(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    fn map_type(&self, entry: &DescriptorProto, entry_name: &str) -> Result<TypeRef, String> {
        let key = entry.field.iter().find(|f| f.number() == 1);
        let value = entry.field.iter().find(|f| f.number() == 2);
        let (Some(key), Some(value)) = (key, value) else {
            return Err(format!("map entry '{}' is missing its key or value", entry_name));
        };

        let key = match self.field_type(key, entry_name)? {
            TypeRef::Scalar(kind) => kind,
            _ => return Err(format!("map entry '{}' has a non-scalar key", entry_name)),
        };
        let value = self.field_type(value, entry_name)?;
        Ok(TypeRef::Map {
            key,
            value: Box::new(value),
        })
    }

    fn source_index(&mut self, entry: &TypeEntry<'a>) -> &SourceIndex {
        self.sources
            .entry(entry.file.name().to_string())
            .or_insert_with(|| SourceIndex::new(entry.file))
    }

    /// Nested path joined with `_`; clashing names get the package as a
    /// prefix, then a numeric suffix.
    fn assign_type_idents(&self, order: &[String]) -> HashMap<String, String> {
        let bases: Vec<(String, String)> = order
            .iter()
            .map(|name| {
                let package = self.symbols.get(name).map(|e| e.package.as_str()).unwrap_or("");
                let relative = if package.is_empty() {
                    name.as_str()
                } else {
                    name.strip_prefix(package).and_then(|r| r.strip_prefix('.')).unwrap_or(name)
                };
                let base = relative.replace('.', "_");
                let prefixed = if package.is_empty() {
                    base.clone()
                } else {
                    format!("{}_{}", to_pascal_case(package), base)
                };
                (base, prefixed)
            })
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for (base, _) in &bases {
            *counts.entry(base.as_str()).or_default() += 1;
        }

        let mut used = HashSet::new();
        let mut idents = HashMap::new();
        for (name, (base, prefixed)) in order.iter().zip(&bases) {
            let candidate = if counts[base.as_str()] > 1 { prefixed } else { base };
            let mut ident = candidate.clone();
            let mut n = 2;
            while !used.insert(ident.clone()) {
                ident = format!("{}_{}", candidate, n);
                n += 1;
            }
            idents.insert(name.clone(), ident);
        }
        idents
    }
}

/// Identifiers that differ only by case or underscores would collide in
/// camelCase or PascalCase targets.
fn unique_channel_ident(name: &str, used: &mut HashSet<String>) -> String {
    let base = channel_ident(name);
    let key = |ident: &str| ident.replace('_', "").to_ascii_lowercase();

    let mut ident = base.clone();
    let mut n = 2;
    while !used.insert(key(&ident)) {
        ident = format!("{}_{}", base, n);
        n += 1;
    }
    ident
}

fn enum_shape(full_name: &str, entry: &TypeEntry<'_>, enumeration: &EnumDescriptorProto, doc: Option<String>) -> EnumShape {
    EnumShape {
        full_name: full_name.to_string(),
        ident: String::new(),
        file: entry.file.name().to_string(),
        values: enumeration
            .value
            .iter()
            .map(|v| EnumValueShape {
                name: v.name().to_string(),
                number: v.number(),
            })
            .collect(),
        doc,
    }
}

fn field_shape(entry: &TypeEntry<'_>, message: &DescriptorProto, field: &FieldDescriptorProto, ty: TypeRef) -> FieldShape {
    let synthetic = field.proto3_optional();
    let oneof = if synthetic {
        None
    } else {
        field
            .oneof_index
            .and_then(|i| message.oneof_decl.get(i as usize))
            .map(|o| o.name().to_string())
    };
    let proto2 = matches!(entry.file.syntax(), "" | "proto2");
    let singular = field.label() != Label::Repeated;

    FieldShape {
        name: field.name().to_string(),
        number: field.number(),
        optional: synthetic || oneof.is_some() || (proto2 && singular && !matches!(ty, TypeRef::Map { .. })),
        oneof,
        ty,
    }
}

fn scalar_kind(ty: Type) -> Option<ScalarKind> {
    Some(match ty {
        Type::Double => ScalarKind::Double,
        Type::Float => ScalarKind::Float,
        Type::Int64 => ScalarKind::Int64,
        Type::Uint64 => ScalarKind::Uint64,
        Type::Int32 => ScalarKind::Int32,
        Type::Fixed64 => ScalarKind::Fixed64,
        Type::Fixed32 => ScalarKind::Fixed32,
        Type::Bool => ScalarKind::Bool,
        Type::String => ScalarKind::String,
        Type::Bytes => ScalarKind::Bytes,
        Type::Uint32 => ScalarKind::Uint32,
        Type::Sfixed32 => ScalarKind::Sfixed32,
        Type::Sfixed64 => ScalarKind::Sfixed64,
        Type::Sint32 => ScalarKind::Sint32,
        Type::Sint64 => ScalarKind::Sint64,
        Type::Group | Type::Message | Type::Enum => return None,
    })
}
