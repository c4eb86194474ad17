//! Option extraction and structural validation.
//!
//! Extraction is exhaustive: a broken declaration gets a diagnostic and is
//! skipped, its siblings are still processed.

use std::collections::HashMap;

use crate::descriptor::{
    qualify, DescriptorProto, FileDescriptorProto, MethodDescriptorProto, SourceIndex,
    FILE_MESSAGE_TYPE, FILE_SERVICE, MESSAGE_NESTED_TYPE, MESSAGE_OPTIONS, METHOD_OPTIONS,
    SERVICE_METHOD, SERVICE_OPTIONS,
};
use crate::diagnostic::{Diagnostic, Diagnostics, SourceLocation};
use super::record::{
    CallOption, ChannelOption, ChannelSite, OptionRecord, PublishOption, QosHints, SiteKind,
    SubscribeOption,
};
use super::vocabulary::{
    decode_channel, ChannelOptions, Direction, MESSAGE_CHANNEL_EXTENSION, METHOD_CHANNEL_EXTENSION,
    SERVICE_CHANNEL_EXTENSION,
};

const EMPTY_TYPE: &str = ".google.protobuf.Empty";

/// A declaration carrying a decoded channel option, not yet validated.
struct Candidate {
    site: ChannelSite,
    channel: ChannelOptions,
    target: CandidateTarget,
}

enum CandidateTarget {
    Message { full_name: String },
    Method { input: String, output: String, streaming: bool },
}

/// Extracts channel options from the files to generate, in the given order.
pub fn extract_options(files: &[&FileDescriptorProto], diagnostics: &mut Diagnostics) -> Vec<OptionRecord> {
    let mut records = Vec::new();
    let mut seen: HashMap<String, ChannelSite> = HashMap::new();

    for file in files {
        let index = SourceIndex::new(file);
        let mut candidates = Vec::new();
        collect_message_candidates(file, &index, &mut candidates, diagnostics);
        collect_service_candidates(file, &index, &mut candidates, diagnostics);

        // Source order when every site has a span, descriptor order otherwise.
        if candidates.iter().all(|c| c.site.location.position().is_some()) {
            candidates.sort_by_key(|c| c.site.location.position());
        }

        for candidate in candidates {
            let Some(option) = validate(&candidate, diagnostics) else {
                continue;
            };

            if let Some(first) = seen.get(option.name()) {
                diagnostics.push(
                    Diagnostic::error(
                        "dmxp::options::duplicate_channel",
                        format!(
                            "channel '{}' on {} is already declared by {}",
                            option.name(),
                            describe(&candidate.site),
                            describe(first)
                        ),
                    )
                    .at(candidate.site.location.clone())
                    .related_to(first.location.clone()),
                );
                continue;
            }

            seen.insert(option.name().to_string(), candidate.site.clone());
            records.push(OptionRecord {
                option,
                site: candidate.site,
            });
        }
    }

    tracing::debug!(channels = records.len(), "extracted channel options");
    records
}

fn collect_message_candidates(
    file: &FileDescriptorProto,
    index: &SourceIndex,
    out: &mut Vec<Candidate>,
    diagnostics: &mut Diagnostics,
) {
    let package = file.package();
    for (i, message) in file.message_type.iter().enumerate() {
        visit_message(file, index, package, message, vec![FILE_MESSAGE_TYPE, i as i32], out, diagnostics);
    }
}

fn visit_message(
    file: &FileDescriptorProto,
    index: &SourceIndex,
    scope: &str,
    message: &DescriptorProto,
    path: Vec<i32>,
    out: &mut Vec<Candidate>,
    diagnostics: &mut Diagnostics,
) {
    if message.is_map_entry() {
        return;
    }
    let full_name = qualify(scope, message.name());

    let payload = message.options.as_ref().and_then(|o| o.dmxp_channel.as_deref());
    if let Some(payload) = payload {
        let location = index.location(&path, &full_name);
        let option_path = extend(&path, &[MESSAGE_OPTIONS, MESSAGE_CHANNEL_EXTENSION as i32]);
        let option_location = index.option_location(&option_path, &path, &full_name);
        if let Some(channel) = decode_payload(payload, &option_location, diagnostics) {
            out.push(Candidate {
                site: ChannelSite {
                    kind: SiteKind::Message,
                    file: file.name().to_string(),
                    declaration: full_name.clone(),
                    scope: full_name.clone(),
                    location,
                    doc: index.comments(&path),
                },
                channel,
                target: CandidateTarget::Message {
                    full_name: full_name.clone(),
                },
            });
        }
    }

    for (i, nested) in message.nested_type.iter().enumerate() {
        let nested_path = extend(&path, &[MESSAGE_NESTED_TYPE, i as i32]);
        visit_message(file, index, &full_name, nested, nested_path, out, diagnostics);
    }
}

fn collect_service_candidates(
    file: &FileDescriptorProto,
    index: &SourceIndex,
    out: &mut Vec<Candidate>,
    diagnostics: &mut Diagnostics,
) {
    let package = file.package();
    for (i, service) in file.service.iter().enumerate() {
        let service_path = vec![FILE_SERVICE, i as i32];
        let service_name = qualify(package, service.name());
        let service_location = index.location(&service_path, &service_name);

        // The service-level option, if present and usable.
        let service_payload = service.options.as_ref().and_then(|o| o.dmxp_channel.as_deref());
        let service_present = service_payload.is_some();
        let service_channel = service_payload.and_then(|payload| {
            let option_path = extend(&service_path, &[SERVICE_OPTIONS, SERVICE_CHANNEL_EXTENSION as i32]);
            let option_location = index.option_location(&option_path, &service_path, &service_name);
            decode_payload(payload, &option_location, diagnostics)
        });

        if let Some(channel) = &service_channel {
            if channel.name.is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        "dmxp::options::missing_name",
                        format!("service '{}' declares a channel option without a name", service_name),
                    )
                    .at(service_location.clone()),
                );
            }
            if service.method.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "dmxp::options::empty_service",
                        format!("service '{}' declares a channel option but has no rpcs", service_name),
                    )
                    .at(service_location.clone()),
                );
            }
        }

        for (j, method) in service.method.iter().enumerate() {
            let method_path = extend(&service_path, &[SERVICE_METHOD, j as i32]);
            let method_name = qualify(&service_name, method.name());
            let location = index.location(&method_path, &method_name);
            let method_payload = method.options.as_ref().and_then(|o| o.dmxp_channel.as_deref());

            let (kind, channel) = match method_payload {
                Some(_) if service_present => {
                    diagnostics.push(
                        Diagnostic::error(
                            "dmxp::options::ambiguous_channel",
                            format!(
                                "rpc '{}' has its own channel option and inherits one from service '{}'; remove one of them",
                                method_name, service_name
                            ),
                        )
                        .at(location.clone())
                        .related_to(service_location.clone()),
                    );
                    continue;
                }
                Some(payload) => {
                    let option_path = extend(&method_path, &[METHOD_OPTIONS, METHOD_CHANNEL_EXTENSION as i32]);
                    let option_location = index.option_location(&option_path, &method_path, &method_name);
                    let Some(channel) = decode_payload(payload, &option_location, diagnostics) else {
                        continue;
                    };
                    let kind = SiteKind::Method {
                        service: service_name.clone(),
                        method: method.name().to_string(),
                    };
                    (kind, channel)
                }
                None => {
                    let Some(inherited) = &service_channel else {
                        continue;
                    };
                    if inherited.name.is_empty() {
                        continue;
                    }
                    let mut channel = inherited.clone();
                    channel.name = format!("{}/{}", inherited.name, method.name());
                    let kind = SiteKind::ServiceMethod {
                        service: service_name.clone(),
                        method: method.name().to_string(),
                    };
                    (kind, channel)
                }
            };

            out.push(Candidate {
                site: ChannelSite {
                    kind,
                    file: file.name().to_string(),
                    declaration: method_name,
                    scope: package.to_string(),
                    location,
                    doc: index.comments(&method_path),
                },
                channel,
                target: method_target(method),
            });
        }
    }
}

fn method_target(method: &MethodDescriptorProto) -> CandidateTarget {
    CandidateTarget::Method {
        input: method.input_type().to_string(),
        output: method.output_type().to_string(),
        streaming: method.client_streaming() || method.server_streaming(),
    }
}

/// Decodes an extension payload, reporting anything we cannot interpret.
fn decode_payload(payload: &[u8], location: &SourceLocation, diagnostics: &mut Diagnostics) -> Option<ChannelOptions> {
    match decode_channel(payload) {
        Ok(decoded) => {
            if !decoded.unknown_fields.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "dmxp::options::unknown_field",
                        format!(
                            "ignoring unrecognized channel option field(s) {} on '{}'",
                            decoded.unknown_fields.join(", "),
                            location.declaration
                        ),
                    )
                    .at(location.clone()),
                );
            }
            if !decoded.unknown_values.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "dmxp::options::unknown_value",
                        format!(
                            "ignoring unrecognized channel option value(s) {} on '{}'",
                            decoded.unknown_values.join(", "),
                            location.declaration
                        ),
                    )
                    .at(location.clone()),
                );
            }
            Some(decoded.options)
        }
        Err(err) => {
            diagnostics.push(
                Diagnostic::error(
                    "dmxp::options::malformed",
                    format!("channel option on '{}' cannot be decoded: {}", location.declaration, err),
                )
                .at(location.clone()),
            );
            None
        }
    }
}

/// Checks required fields and turns a candidate into a typed record.
fn validate(candidate: &Candidate, diagnostics: &mut Diagnostics) -> Option<ChannelOption> {
    let site = &candidate.site;
    let channel = &candidate.channel;
    let error = |code: &'static str, message: String| Diagnostic::error(code, message).at(site.location.clone());

    if channel.name.is_empty() {
        diagnostics.push(error(
            "dmxp::options::missing_name",
            format!("{} declares a channel without a name", describe(site)),
        ));
        return None;
    }
    if !is_valid_channel_name(&channel.name) {
        diagnostics.push(error(
            "dmxp::options::invalid_name",
            format!(
                "channel name '{}' on {} may only contain letters, digits and _ . : / -",
                channel.name,
                describe(site)
            ),
        ));
        return None;
    }

    let name = channel.name.clone();
    let direction = Direction::try_from(channel.direction).unwrap_or(Direction::Unspecified);
    let qos = QosHints::from_options(channel.qos.as_ref());

    match &candidate.target {
        CandidateTarget::Message { full_name } => {
            let message = format!(".{}", full_name);
            match direction {
                Direction::Publish => Some(ChannelOption::Publish(PublishOption { name, message, qos })),
                Direction::Subscribe => Some(ChannelOption::Subscribe(SubscribeOption { name, message, qos })),
                Direction::Unspecified => {
                    diagnostics.push(error(
                        "dmxp::options::missing_direction",
                        format!("channel '{}' on {} needs a direction (publish or subscribe)", name, describe(site)),
                    ));
                    None
                }
                Direction::Call => {
                    diagnostics.push(error(
                        "dmxp::options::call_on_message",
                        format!(
                            "channel '{}' on {} uses DIRECTION_CALL; call channels must be declared on an rpc",
                            name,
                            describe(site)
                        ),
                    ));
                    None
                }
            }
        }
        CandidateTarget::Method { input, output, streaming } => {
            if *streaming {
                diagnostics.push(error(
                    "dmxp::options::streaming_method",
                    format!("channel '{}' on {} cannot bind a streaming rpc", name, describe(site)),
                ));
                return None;
            }

            match direction {
                Direction::Unspecified | Direction::Call => {
                    let mut complete = true;
                    if input.is_empty() {
                        diagnostics.push(error(
                            "dmxp::options::missing_request",
                            format!("call channel '{}' on {} has no request type", name, describe(site)),
                        ));
                        complete = false;
                    }
                    if output.is_empty() {
                        diagnostics.push(error(
                            "dmxp::options::missing_response",
                            format!("call channel '{}' on {} has no response type", name, describe(site)),
                        ));
                        complete = false;
                    }
                    complete.then(|| {
                        ChannelOption::Call(CallOption {
                            name,
                            request: input.clone(),
                            response: output.clone(),
                            qos,
                        })
                    })
                }
                Direction::Publish | Direction::Subscribe => {
                    if input.is_empty() {
                        diagnostics.push(error(
                            "dmxp::options::missing_message",
                            format!("channel '{}' on {} has no message type", name, describe(site)),
                        ));
                        return None;
                    }
                    if !output.is_empty() && output != EMPTY_TYPE {
                        diagnostics.push(Diagnostic::warning(
                            "dmxp::options::ignored_response",
                            format!(
                                "response type '{}' of {} is ignored by non-call channel '{}'",
                                output.trim_start_matches('.'),
                                describe(site),
                                name
                            ),
                        )
                        .at(site.location.clone()));
                    }
                    let message = input.clone();
                    if direction == Direction::Publish {
                        Some(ChannelOption::Publish(PublishOption { name, message, qos }))
                    } else {
                        Some(ChannelOption::Subscribe(SubscribeOption { name, message, qos }))
                    }
                }
            }
        }
    }
}

/// Channel names are embedded verbatim in string literals of every target.
pub fn is_valid_channel_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '/' | '-'))
}

fn describe(site: &ChannelSite) -> String {
    match &site.kind {
        SiteKind::Message => format!("message '{}'", site.declaration),
        SiteKind::Method { .. } => format!("rpc '{}'", site.declaration),
        SiteKind::ServiceMethod { service, .. } => {
            format!("rpc '{}' (via service '{}')", site.declaration, service)
        }
    }
}

fn extend(path: &[i32], suffix: &[i32]) -> Vec<i32> {
    let mut out = path.to_vec();
    out.extend_from_slice(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        source_code_info::Location, MessageOptions, MethodOptions, ServiceDescriptorProto,
        ServiceOptions, SourceCodeInfo,
    };
    use crate::options::vocabulary::QosOptions;
    use prost::Message;

    fn channel(name: &str, direction: Direction) -> Vec<u8> {
        ChannelOptions {
            name: name.to_string(),
            direction: direction as i32,
            qos: None,
        }
        .encode_to_vec()
    }

    fn message(name: &str, option: Option<Vec<u8>>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            options: option.map(|bytes| MessageOptions {
                dmxp_channel: Some(bytes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn method(name: &str, input: &str, output: &str, option: Option<Vec<u8>>) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            input_type: Some(input.to_string()),
            output_type: Some(output.to_string()),
            options: option.map(|bytes| MethodOptions {
                dmxp_channel: Some(bytes),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn file(messages: Vec<DescriptorProto>, services: Vec<ServiceDescriptorProto>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("sensors.proto".to_string()),
            package: Some("sensors".to_string()),
            message_type: messages,
            service: services,
            ..Default::default()
        }
    }

    fn run(file: &FileDescriptorProto) -> (Vec<OptionRecord>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let records = extract_options(&[file], &mut diags);
        (records, diags)
    }

    fn codes(diags: &Diagnostics) -> Vec<&'static str> {
        diags.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_message_channel_becomes_publish_record() {
        let f = file(vec![message("Reading", Some(channel("telemetry", Direction::Publish)))], vec![]);
        let (records, diags) = run(&f);

        assert!(diags.is_empty());
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].option,
            ChannelOption::Publish(PublishOption {
                name: "telemetry".to_string(),
                message: ".sensors.Reading".to_string(),
                qos: QosHints::default(),
            })
        );
        assert_eq!(records[0].site.declaration, "sensors.Reading");
    }

    #[test]
    fn test_missing_name_is_error_and_siblings_survive() {
        let f = file(
            vec![
                message("Reading", Some(channel("", Direction::Publish))),
                message("Alert", Some(channel("alerts", Direction::Subscribe))),
            ],
            vec![],
        );
        let (records, diags) = run(&f);

        assert_eq!(codes(&diags), vec!["dmxp::options::missing_name"]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].option.name(), "alerts");
        assert_eq!(
            diags.iter().next().and_then(|d| d.location.clone()).map(|l| l.declaration),
            Some("sensors.Reading".to_string())
        );
    }

    #[test]
    fn test_message_direction_rules() {
        let f = file(
            vec![
                message("A", Some(channel("a", Direction::Unspecified))),
                message("B", Some(channel("b", Direction::Call))),
            ],
            vec![],
        );
        let (records, diags) = run(&f);

        assert!(records.is_empty());
        assert_eq!(
            codes(&diags),
            vec!["dmxp::options::missing_direction", "dmxp::options::call_on_message"]
        );
    }

    #[test]
    fn test_invalid_channel_name() {
        let f = file(vec![message("A", Some(channel("has space", Direction::Publish)))], vec![]);
        let (records, diags) = run(&f);
        assert!(records.is_empty());
        assert_eq!(codes(&diags), vec!["dmxp::options::invalid_name"]);
    }

    #[test]
    fn test_duplicate_names_reference_both_locations() {
        let f = file(
            vec![
                message("A", Some(channel("dup", Direction::Publish))),
                message("B", Some(channel("dup", Direction::Subscribe))),
            ],
            vec![],
        );
        let (records, diags) = run(&f);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].site.declaration, "sensors.A");
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.code, "dmxp::options::duplicate_channel");
        assert_eq!(diag.location.as_ref().unwrap().declaration, "sensors.B");
        assert_eq!(diag.related[0].declaration, "sensors.A");
    }

    #[test]
    fn test_method_defaults_to_call() {
        let svc = ServiceDescriptorProto {
            name: Some("Health".to_string()),
            method: vec![method("Ping", ".sensors.Empty", ".sensors.Pong", Some(channel("ping", Direction::Unspecified)))],
            options: None,
        };
        let (records, diags) = run(&file(vec![], vec![svc]));

        assert!(diags.is_empty());
        match &records[0].option {
            ChannelOption::Call(call) => {
                assert_eq!(call.name, "ping");
                assert_eq!(call.request, ".sensors.Empty");
                assert_eq!(call.response, ".sensors.Pong");
            }
            other => panic!("expected call, got {:?}", other),
        }
        assert_eq!(
            records[0].site.kind,
            SiteKind::Method {
                service: "sensors.Health".to_string(),
                method: "Ping".to_string()
            }
        );
    }

    #[test]
    fn test_call_without_response_is_error() {
        let svc = ServiceDescriptorProto {
            name: Some("Health".to_string()),
            method: vec![method("Ping", ".sensors.Empty", "", Some(channel("ping", Direction::Call)))],
            options: None,
        };
        let (records, diags) = run(&file(vec![], vec![svc]));
        assert!(records.is_empty());
        assert_eq!(codes(&diags), vec!["dmxp::options::missing_response"]);
    }

    #[test]
    fn test_publish_rpc_warns_about_ignored_response() {
        let svc = ServiceDescriptorProto {
            name: Some("Feed".to_string()),
            method: vec![
                method("Push", ".sensors.Reading", ".sensors.Ack", Some(channel("feed", Direction::Publish))),
                method("Quiet", ".sensors.Reading", EMPTY_TYPE, Some(channel("quiet", Direction::Publish))),
            ],
            options: None,
        };
        let (records, diags) = run(&file(vec![], vec![svc]));
        assert_eq!(records.len(), 2);
        assert_eq!(codes(&diags), vec!["dmxp::options::ignored_response"]);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_service_option_applies_to_methods() {
        let svc = ServiceDescriptorProto {
            name: Some("Orders".to_string()),
            method: vec![
                method("Place", ".sensors.A", ".sensors.B", None),
                method("Cancel", ".sensors.A", ".sensors.B", None),
            ],
            options: Some(ServiceOptions {
                dmxp_channel: Some(
                    ChannelOptions {
                        name: "orders".to_string(),
                        direction: 0,
                        qos: Some(QosOptions {
                            timeout_ms: 500,
                            ..Default::default()
                        }),
                    }
                    .encode_to_vec(),
                ),
                ..Default::default()
            }),
        };
        let (records, diags) = run(&file(vec![], vec![svc]));

        assert!(diags.is_empty());
        let names: Vec<_> = records.iter().map(|r| r.option.name().to_string()).collect();
        assert_eq!(names, vec!["orders/Place", "orders/Cancel"]);
        assert_eq!(records[0].option.qos().timeout_ms, Some(500));
        assert!(matches!(records[0].site.kind, SiteKind::ServiceMethod { .. }));
    }

    #[test]
    fn test_method_and_service_option_together_is_ambiguous() {
        let svc = ServiceDescriptorProto {
            name: Some("Orders".to_string()),
            method: vec![
                method("Place", ".sensors.A", ".sensors.B", Some(channel("place", Direction::Call))),
                method("Cancel", ".sensors.A", ".sensors.B", None),
            ],
            options: Some(ServiceOptions {
                dmxp_channel: Some(channel("orders", Direction::Call)),
                ..Default::default()
            }),
        };
        let (records, diags) = run(&file(vec![], vec![svc]));

        assert_eq!(codes(&diags), vec!["dmxp::options::ambiguous_channel"]);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.location.as_ref().unwrap().declaration, "sensors.Orders.Place");
        assert_eq!(diag.related[0].declaration, "sensors.Orders");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].option.name(), "orders/Cancel");
    }

    #[test]
    fn test_streaming_rpc_is_rejected() {
        let mut m = method("Watch", ".sensors.A", ".sensors.B", Some(channel("watch", Direction::Call)));
        m.server_streaming = Some(true);
        let svc = ServiceDescriptorProto {
            name: Some("S".to_string()),
            method: vec![m],
            options: None,
        };
        let (records, diags) = run(&file(vec![], vec![svc]));
        assert!(records.is_empty());
        assert_eq!(codes(&diags), vec!["dmxp::options::streaming_method"]);
    }

    #[test]
    fn test_malformed_payload_is_localized() {
        let f = file(
            vec![
                message("A", Some(vec![(1 << 3) | 2, 50])),
                message("B", Some(channel("b", Direction::Publish))),
            ],
            vec![],
        );
        let (records, diags) = run(&f);
        assert_eq!(codes(&diags), vec!["dmxp::options::malformed"]);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_source_spans_order_messages_and_services_together() {
        let svc = ServiceDescriptorProto {
            name: Some("Health".to_string()),
            method: vec![method("Ping", ".sensors.A", ".sensors.B", Some(channel("ping", Direction::Call)))],
            options: None,
        };
        let mut f = file(vec![message("Late", Some(channel("late", Direction::Publish)))], vec![svc]);
        f.source_code_info = Some(SourceCodeInfo {
            location: vec![
                Location {
                    path: vec![4, 0],
                    span: vec![20, 0, 1],
                    ..Default::default()
                },
                Location {
                    path: vec![6, 0, 2, 0],
                    span: vec![5, 2, 40],
                    ..Default::default()
                },
            ],
        });
        let (records, _) = run(&f);
        let names: Vec<_> = records.iter().map(|r| r.option.name()).collect();
        assert_eq!(names, vec!["ping", "late"]);
    }

    #[test]
    fn test_map_entries_are_not_channel_sites() {
        let mut entry = message("LabelsEntry", Some(channel("nope", Direction::Publish)));
        entry.options.as_mut().unwrap().map_entry = Some(true);
        let mut parent = message("Reading", None);
        parent.nested_type.push(entry);

        let (records, diags) = run(&file(vec![parent], vec![]));
        assert!(records.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_channel_name_charset() {
        assert!(is_valid_channel_name("sensors/temp.v1:raw-2"));
        assert!(!is_valid_channel_name("quote\"d"));
        assert!(!is_valid_channel_name(""));
    }
}
