//! Descriptor graph and plugin envelope types.
//!
//! These mirror the upstream protobuf definitions closely enough to decode
//! whatever protoc hands us, while keeping the DMXP extensions intact.

mod index;
mod plugin;
mod proto;

pub use index::{
    qualify, SourceIndex, SymbolTable, TypeDef, TypeEntry, FILE_ENUM_TYPE, FILE_MESSAGE_TYPE,
    FILE_SERVICE, MESSAGE_ENUM_TYPE, MESSAGE_FIELD, MESSAGE_NESTED_TYPE, MESSAGE_OPTIONS,
    METHOD_OPTIONS, SERVICE_METHOD, SERVICE_OPTIONS,
};
pub use plugin::{code_generator_response, CodeGeneratorRequest, CodeGeneratorResponse, Version};
pub use proto::*;
