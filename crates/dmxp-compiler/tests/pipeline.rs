//! End-to-end pipeline tests: descriptors in, generated files and
//! diagnostics out.

mod support;

use dmxp_compiler::descriptor::field_descriptor_proto::Type;
use dmxp_compiler::options::{Direction, QosOptions};
use dmxp_compiler::Severity;
use support::*;

#[test]
fn test_ping_call_for_go_and_python() {
    let response = compile(vec![ping_schema()], "target=go,target=python");

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let targets: Vec<_> = response.files.iter().map(|f| f.target.as_str()).collect();
    assert_eq!(targets, vec!["go", "python"]);

    let go = content_for(&response, "go");
    assert!(go.contains("func CallPing(t *dmxp.Transport, req *Empty) (*Pong, error)"));
    assert!(go.contains("const ChannelPing = \"ping\""));

    let python = content_for(&response, "python");
    assert!(python.contains("def call_ping(transport: dmxp.Transport, request: Empty) -> Pong:"));
    assert!(python.contains("PING = \"ping\""));
}

#[test]
fn test_missing_name_reports_once_and_siblings_emit() {
    let schema = proto3(
        "sensors.proto",
        "sensors",
        vec![
            channel_message(
                "Telemetry",
                vec![scalar("value", 1, Type::Double)],
                channel("", Direction::Publish),
            ),
            channel_message(
                "Status",
                vec![scalar("online", 1, Type::Bool)],
                channel("status", Direction::Publish),
            ),
        ],
        vec![],
    );
    let response = compile(vec![schema], "target=rust");

    assert_eq!(error_codes(&response), vec!["dmxp::options::missing_name"]);
    let error = response.errors().next().unwrap();
    let location = error.location.as_ref().unwrap();
    assert_eq!(location.file, "sensors.proto");
    assert_eq!(location.declaration, "sensors.Telemetry");

    let rust = content_for(&response, "rust");
    assert!(rust.contains("pub const STATUS: &str = \"status\";"));
    assert!(!rust.contains("Telemetry"));
    assert_eq!(response.exit_code(), 1);
}

#[test]
fn test_duplicate_channel_cites_both_declarations() {
    let schema = proto3(
        "fleet.proto",
        "fleet",
        vec![
            channel_message("Position", vec![scalar("lat", 1, Type::Double)], channel("fleet", Direction::Publish)),
            channel_message("Heading", vec![scalar("deg", 1, Type::Float)], channel("fleet", Direction::Subscribe)),
            channel_message("Fuel", vec![scalar("litres", 1, Type::Float)], channel("fuel", Direction::Publish)),
        ],
        vec![],
    );
    let response = compile(vec![schema], "target=go");

    assert_eq!(error_codes(&response), vec!["dmxp::options::duplicate_channel"]);
    let error = response.errors().next().unwrap();
    assert_eq!(error.location.as_ref().map(|l| l.declaration.as_str()), Some("fleet.Heading"));
    assert_eq!(error.related.len(), 1);
    assert_eq!(error.related[0].declaration, "fleet.Position");

    let go = content_for(&response, "go");
    assert!(go.contains("func PublishFleet(t *dmxp.Transport, msg *Position) error"));
    assert!(go.contains("func PublishFuel("));
    assert!(!go.contains("Heading"));
}

#[test]
fn test_unknown_target_is_one_error_and_rust_still_emits() {
    let response = compile(vec![sensors_schema()], "target=rust,target=cobol");

    assert_eq!(error_codes(&response), vec!["dmxp::registry::unknown_target"]);
    assert!(response.errors().next().unwrap().message.contains("cobol"));
    assert!(!response.files.is_empty());
    assert!(response.files.iter().all(|f| f.target == "rust"));
}

#[test]
fn test_channel_names_are_verbatim_in_every_target() {
    let schema = proto3(
        "fleet.proto",
        "fleet",
        vec![channel_message(
            "Status",
            vec![scalar("code", 1, Type::Int32)],
            channel("fleet/v1:status-updates", Direction::Subscribe),
        )],
        vec![],
    );
    let response = compile(vec![schema], "target=rust,target=go,target=python,target=ts");
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);

    for target in ["rust", "go", "python", "typescript"] {
        let content = content_for(&response, target);
        assert!(
            content.contains("\"fleet/v1:status-updates\""),
            "{} output lacks the channel name:\n{}",
            target,
            content
        );
    }
}

#[test]
fn test_service_option_names_channels_per_method() {
    let schema = proto3(
        "shop.proto",
        "shop",
        vec![
            message("Order", vec![scalar("id", 1, Type::String)]),
            message("Receipt", vec![scalar("total", 1, Type::Int64)]),
        ],
        vec![service(
            "Orders",
            vec![
                method("Place", ".shop.Order", ".shop.Receipt", None),
                method("Cancel", ".shop.Order", ".shop.Receipt", None),
            ],
            Some(channel_with_qos(
                "orders",
                Direction::Unspecified,
                QosOptions {
                    timeout_ms: 250,
                    ..Default::default()
                },
            )),
        )],
    );
    let response = compile(vec![schema], "target=ts");
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);

    let ts = content_for(&response, "typescript");
    assert!(ts.contains("\"orders/Place\""));
    assert!(ts.contains("\"orders/Cancel\""));
    assert!(ts.contains("timeoutMs: 250"));
    assert!(ts.contains("export async function callOrdersPlace("));
}

#[test]
fn test_method_option_inside_service_option_is_ambiguous() {
    let schema = proto3(
        "shop.proto",
        "shop",
        vec![
            message("Order", vec![scalar("id", 1, Type::String)]),
            message("Receipt", vec![scalar("total", 1, Type::Int64)]),
        ],
        vec![service(
            "Orders",
            vec![
                method("Place", ".shop.Order", ".shop.Receipt", Some(channel("place", Direction::Call))),
                method("Cancel", ".shop.Order", ".shop.Receipt", None),
            ],
            Some(channel("orders", Direction::Call)),
        )],
    );
    let response = compile(vec![schema], "target=python");

    assert_eq!(error_codes(&response), vec!["dmxp::options::ambiguous_channel"]);
    let python = content_for(&response, "python");
    assert!(python.contains("\"orders/Cancel\""));
    assert!(!python.contains("\"place\""));
}

#[test]
fn test_split_files_layout_per_target() {
    let response = compile(
        vec![sensors_schema()],
        "target=rust,target=go,target=py,target=ts,split_files=true,go.module_path=gen/go",
    );
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);

    let paths: Vec<_> = response.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "sensors/sensors/types.rs",
            "sensors/sensors/sensors_channels.rs",
            "sensors/sensors/mod.rs",
            "gen/go/types.go",
            "gen/go/sensors_channels.go",
            "sensors/sensors/types.py",
            "sensors/sensors/sensors_channels.py",
            "sensors/sensors/__init__.py",
            "sensors/sensors/types.ts",
            "sensors/sensors/sensors_channels.ts",
            "sensors/sensors/index.ts",
        ]
    );
}

#[test]
fn test_imported_files_contribute_types_but_not_channels() {
    let common = proto3(
        "common.proto",
        "common",
        vec![channel_message(
            "Stamp",
            vec![scalar("nanos", 1, Type::Int64)],
            channel("stamps", Direction::Publish),
        )],
        vec![],
    );
    let app = proto3(
        "app.proto",
        "app",
        vec![channel_message(
            "Event",
            vec![message_field("at", 1, ".common.Stamp")],
            channel("events", Direction::Publish),
        )],
        vec![],
    );
    let mut request = request(vec![common, app], "target=rust");
    request.file_to_generate = vec!["app.proto".to_string()];
    let response = dmxp_compiler::Compiler::new().compile_request(&request);

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let rust = content_for(&response, "rust");
    assert!(rust.contains("pub struct Stamp {"));
    assert!(rust.contains("\"events\""));
    assert!(!rust.contains("\"stamps\""));
}

#[test]
fn test_unresolved_type_drops_only_that_channel() {
    let schema = proto3(
        "broken.proto",
        "broken",
        vec![
            channel_message(
                "Frame",
                vec![message_field("header", 1, ".broken.Missing")],
                channel("frames", Direction::Publish),
            ),
            channel_message("Tick", vec![scalar("n", 1, Type::Uint64)], channel("ticks", Direction::Publish)),
        ],
        vec![],
    );
    let response = compile(vec![schema], "target=go");

    assert_eq!(error_codes(&response), vec!["dmxp::ir::unresolved_type"]);
    assert!(response
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.code == "dmxp::ir::channel_dropped"));
    let go = content_for(&response, "go");
    assert!(go.contains("func PublishTicks("));
    assert!(!go.contains("frames"));
}

#[test]
fn test_schema_without_channels_generates_nothing() {
    let schema = proto3("plain.proto", "plain", vec![message("Plain", vec![])], vec![]);
    let response = compile(vec![schema], "target=rust");

    assert!(response.files.is_empty());
    assert!(!response.has_errors());
    assert_eq!(response.warnings().next().map(|d| d.code), Some("dmxp::ir::no_channels"));
}
