//! Language-neutral intermediate representation.
//!
//! The IR is produced by the [`builder`] from validated option records plus
//! the descriptor graph, and consumed read-only by every backend. It is
//! self-contained: type references name shapes stored in the same model, so
//! backends never look anything up in the descriptors again.

mod builder;

pub use builder::{build_ir, IrBuilder};

use indexmap::IndexMap;

use crate::diagnostic::SourceLocation;
use crate::options::QosHints;

/// Protobuf scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// Name of the scalar as written in a `.proto` file.
    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    /// True for the 64-bit integer kinds, which some targets cannot hold in a
    /// plain number.
    pub fn is_64_bit(self) -> bool {
        matches!(
            self,
            ScalarKind::Int64
                | ScalarKind::Uint64
                | ScalarKind::Sint64
                | ScalarKind::Fixed64
                | ScalarKind::Sfixed64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Double | ScalarKind::Float)
    }
}

/// A fully resolved type reference.
///
/// Enum and message names are fully qualified without the leading dot and
/// always name an entry of [`IrModel::enums`] or [`IrModel::messages`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarKind),
    Enum(String),
    Message(String),
    Repeated(Box<TypeRef>),
    Map { key: ScalarKind, value: Box<TypeRef> },
}

impl TypeRef {
    /// The enum or message this reference names, if any.
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeRef::Enum(name) | TypeRef::Message(name) => Some(name),
            TypeRef::Repeated(inner) => inner.named(),
            TypeRef::Map { value, .. } => value.named(),
            TypeRef::Scalar(_) => None,
        }
    }
}

/// Direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Publish,
    Subscribe,
    Call,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Publish => "publish",
            ChannelKind::Subscribe => "subscribe",
            ChannelKind::Call => "call",
        }
    }
}

/// A declared communication surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDecl {
    /// Transport channel identifier, passed verbatim to the runtime.
    pub name: String,
    /// Snake-case identifier, unique within the model.
    pub ident: String,
    pub kind: ChannelKind,
    /// Message type for publish/subscribe, request type for calls.
    pub message: TypeRef,
    /// Response type, calls only.
    pub response: Option<TypeRef>,
    pub qos: QosHints,
    /// Proto file declaring the channel.
    pub file: String,
    pub location: SourceLocation,
    pub doc: Option<String>,
}

/// What a generated entry point does with its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Publish,
    Subscribe,
    /// Client side of a call channel.
    Call,
    /// Handler registration for the server side of a call channel.
    Serve,
}

impl OperationKind {
    pub fn verb(self) -> &'static str {
        match self {
            OperationKind::Publish => "publish",
            OperationKind::Subscribe => "subscribe",
            OperationKind::Call => "call",
            OperationKind::Serve => "serve",
        }
    }
}

/// A single generated entry point bound to one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDecl {
    /// Index into [`IrModel::channels`].
    pub channel: usize,
    pub kind: OperationKind,
    /// Snake-case identifier such as `call_ping`.
    pub ident: String,
    /// Message type for publish/subscribe, request type for call/serve.
    pub request: TypeRef,
    /// Response type for call/serve only.
    pub response: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    /// Field name exactly as declared.
    pub name: String,
    pub number: i32,
    pub ty: TypeRef,
    /// Explicit presence (proto3 `optional`, proto2 optional, oneof member).
    pub optional: bool,
    /// Name of the real (non-synthetic) oneof this field belongs to.
    pub oneof: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageShape {
    pub full_name: String,
    /// Target-neutral type identifier, unique within the model.
    pub ident: String,
    pub file: String,
    pub fields: Vec<FieldShape>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueShape {
    pub name: String,
    pub number: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumShape {
    pub full_name: String,
    pub ident: String,
    pub file: String,
    pub values: Vec<EnumValueShape>,
    pub doc: Option<String>,
}

impl EnumShape {
    /// Value names with the conventional `ENUM_NAME_` prefix removed.
    ///
    /// Falls back to the declared names when stripping would collide.
    pub fn value_names(&self) -> Vec<&str> {
        let simple = self.full_name.rsplit('.').next().unwrap_or(&self.full_name);
        let prefix = format!("{}_", crate::naming::to_screaming_snake_case(simple));
        let stripped: Vec<&str> = self
            .values
            .iter()
            .map(|value| match value.name.strip_prefix(&prefix) {
                Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => rest,
                _ => value.name.as_str(),
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        if stripped.iter().all(|name| seen.insert(*name)) {
            stripped
        } else {
            self.values.iter().map(|value| value.name.as_str()).collect()
        }
    }
}

/// The complete, immutable result of IR construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrModel {
    /// Proto package of the first generated file.
    pub package: String,
    /// Generated proto files, in request order.
    pub files: Vec<String>,
    pub channels: Vec<ChannelDecl>,
    pub operations: Vec<OperationDecl>,
    pub messages: IndexMap<String, MessageShape>,
    pub enums: IndexMap<String, EnumShape>,
}

impl IrModel {
    pub fn message(&self, full_name: &str) -> Option<&MessageShape> {
        self.messages.get(full_name)
    }

    pub fn enumeration(&self, full_name: &str) -> Option<&EnumShape> {
        self.enums.get(full_name)
    }

    /// Type identifier of a named message or enum.
    pub fn type_ident(&self, full_name: &str) -> Option<&str> {
        self.messages
            .get(full_name)
            .map(|m| m.ident.as_str())
            .or_else(|| self.enums.get(full_name).map(|e| e.ident.as_str()))
    }

    pub fn channel_of(&self, operation: &OperationDecl) -> &ChannelDecl {
        &self.channels[operation.channel]
    }

    /// Operations whose channel was declared in `file`.
    pub fn operations_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a OperationDecl> + 'a {
        self.operations
            .iter()
            .filter(move |op| self.channels[op.channel].file == file)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_looks_through_containers() {
        let ty = TypeRef::Map {
            key: ScalarKind::String,
            value: Box::new(TypeRef::Repeated(Box::new(TypeRef::Message("a.B".to_string())))),
        };
        assert_eq!(ty.named(), Some("a.B"));
        assert_eq!(TypeRef::Scalar(ScalarKind::Bool).named(), None);
    }

    #[test]
    fn test_enum_value_prefix_is_stripped() {
        let value = |name: &str| EnumValueShape {
            name: name.to_string(),
            number: 0,
        };
        let mut shape = EnumShape {
            full_name: "shop.OrderStatus".to_string(),
            ident: "OrderStatus".to_string(),
            file: "shop.proto".to_string(),
            values: vec![value("ORDER_STATUS_PAID"), value("ORDER_STATUS_2X"), value("SHIPPED")],
            doc: None,
        };
        assert_eq!(shape.value_names(), vec!["PAID", "ORDER_STATUS_2X", "SHIPPED"]);

        shape.values.push(value("PAID"));
        assert_eq!(
            shape.value_names(),
            vec!["ORDER_STATUS_PAID", "ORDER_STATUS_2X", "SHIPPED", "PAID"]
        );
    }
}
