//! Descriptor builders shared by the integration tests.
#![allow(dead_code)]

use dmxp_compiler::descriptor::field_descriptor_proto::{Label, Type};
use dmxp_compiler::descriptor::{
    CodeGeneratorRequest, DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MessageOptions,
    MethodDescriptorProto, MethodOptions, ServiceDescriptorProto, ServiceOptions,
};
use dmxp_compiler::options::{ChannelOptions, Direction, QosOptions};
use dmxp_compiler::{Compiler, GenerationResponse};
use prost::Message;

pub fn channel(name: &str, direction: Direction) -> Vec<u8> {
    ChannelOptions {
        name: name.to_string(),
        direction: direction as i32,
        qos: None,
    }
    .encode_to_vec()
}

pub fn channel_with_qos(name: &str, direction: Direction, qos: QosOptions) -> Vec<u8> {
    ChannelOptions {
        name: name.to_string(),
        direction: direction as i32,
        qos: Some(qos),
    }
    .encode_to_vec()
}

pub fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// A message carrying a `(dmxp.channel)` option.
pub fn channel_message(name: &str, fields: Vec<FieldDescriptorProto>, option: Vec<u8>) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            dmxp_channel: Some(option),
            ..Default::default()
        }),
        ..message(name, fields)
    }
}

pub fn method(name: &str, input: &str, output: &str, option: Option<Vec<u8>>) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        options: option.map(|payload| MethodOptions {
            dmxp_channel: Some(payload),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>, option: Option<Vec<u8>>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        options: option.map(|payload| ServiceOptions {
            dmxp_channel: Some(payload),
            ..Default::default()
        }),
    }
}

pub fn proto3(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// A request generating every file in `files`.
pub fn request(files: Vec<FileDescriptorProto>, parameter: &str) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: files.iter().map(|f| f.name().to_string()).collect(),
        parameter: Some(parameter.to_string()),
        proto_file: files,
        compiler_version: None,
    }
}

pub fn compile(files: Vec<FileDescriptorProto>, parameter: &str) -> GenerationResponse {
    Compiler::new().compile_request(&request(files, parameter))
}

/// `ping.proto`: one call channel `ping` from `Empty` to `Pong`.
pub fn ping_schema() -> FileDescriptorProto {
    proto3(
        "ping.proto",
        "ping",
        vec![
            message("Empty", vec![]),
            message("Pong", vec![scalar("at", 1, Type::Int64)]),
        ],
        vec![service(
            "Health",
            vec![method(
                "Ping",
                ".ping.Empty",
                ".ping.Pong",
                Some(channel("ping", Direction::Call)),
            )],
            None,
        )],
    )
}

/// `sensors.proto`: a publish channel, a subscribe channel and a call channel.
pub fn sensors_schema() -> FileDescriptorProto {
    proto3(
        "sensors.proto",
        "sensors",
        vec![
            channel_message(
                "Reading",
                vec![
                    scalar("sensor_id", 1, Type::String),
                    scalar("value", 2, Type::Double),
                ],
                channel("sensors/telemetry", Direction::Publish),
            ),
            channel_message(
                "Alert",
                vec![
                    scalar("message", 1, Type::String),
                    message_field("reading", 2, ".sensors.Reading"),
                ],
                channel("alerts", Direction::Subscribe),
            ),
            message("Query", vec![scalar("sensor_id", 1, Type::String)]),
            message("History", vec![repeated(message_field("readings", 1, ".sensors.Reading"))]),
        ],
        vec![service(
            "Archive",
            vec![method(
                "Lookup",
                ".sensors.Query",
                ".sensors.History",
                Some(channel("archive.lookup", Direction::Call)),
            )],
            None,
        )],
    )
}

/// Concatenated content of every file produced for `target`.
pub fn content_for(response: &GenerationResponse, target: &str) -> String {
    response
        .files
        .iter()
        .filter(|f| f.target == target)
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn error_codes(response: &GenerationResponse) -> Vec<&'static str> {
    response.errors().map(|d| d.code).collect()
}
