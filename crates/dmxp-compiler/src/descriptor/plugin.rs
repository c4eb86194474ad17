//! `google/protobuf/compiler/plugin.proto` envelopes.

use super::FileDescriptorProto;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Version {
    #[prost(int32, optional, tag = "1")]
    pub major: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub minor: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub patch: Option<i32>,
    #[prost(string, optional, tag = "4")]
    pub suffix: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CodeGeneratorRequest {
    /// Files named on the protoc command line, in order.
    #[prost(string, repeated, tag = "1")]
    pub file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    pub parameter: Option<String>,
    /// Every file in `file_to_generate` plus its transitive imports,
    /// topologically ordered.
    #[prost(message, repeated, tag = "15")]
    pub proto_file: Vec<FileDescriptorProto>,
    #[prost(message, optional, tag = "3")]
    pub compiler_version: Option<Version>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CodeGeneratorResponse {
    #[prost(string, optional, tag = "1")]
    pub error: Option<String>,
    #[prost(uint64, optional, tag = "2")]
    pub supported_features: Option<u64>,
    #[prost(message, repeated, tag = "15")]
    pub file: Vec<code_generator_response::File>,
}

pub mod code_generator_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct File {
        #[prost(string, optional, tag = "1")]
        pub name: Option<String>,
        #[prost(string, optional, tag = "2")]
        pub insertion_point: Option<String>,
        #[prost(string, optional, tag = "15")]
        pub content: Option<String>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Feature {
        None = 0,
        Proto3Optional = 1,
    }
}
