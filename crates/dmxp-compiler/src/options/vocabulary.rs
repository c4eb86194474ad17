//! Wire types of the `dmxp/options.proto` vocabulary.

use prost::encoding::{self, DecodeContext, WireType};
use prost::{DecodeError, Message};

/// Source of the option vocabulary, for schema authors to import.
pub const OPTIONS_PROTO: &str = include_str!("../../proto/dmxp/options.proto");

/// Extension number of `(dmxp.channel)` on `MessageOptions`.
pub const MESSAGE_CHANNEL_EXTENSION: u32 = 50710;
/// Extension number of `(dmxp.method)` on `MethodOptions`.
pub const METHOD_CHANNEL_EXTENSION: u32 = 50711;
/// Extension number of `(dmxp.service)` on `ServiceOptions`.
pub const SERVICE_CHANNEL_EXTENSION: u32 = 50712;

const CHANNEL_FIELDS: &[u32] = &[1, 2, 3];
const CHANNEL_QOS_FIELD: u32 = 3;
const QOS_FIELDS: &[u32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9];

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelOptions {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "Direction", tag = "2")]
    pub direction: i32,
    #[prost(message, optional, tag = "3")]
    pub qos: Option<QosOptions>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QosOptions {
    #[prost(enumeration = "Ordering", tag = "1")]
    pub ordering: i32,
    #[prost(enumeration = "Delivery", tag = "2")]
    pub delivery: i32,
    #[prost(uint32, tag = "3")]
    pub buffer_size: u32,
    #[prost(uint32, tag = "4")]
    pub priority: u32,
    #[prost(bool, tag = "5")]
    pub persistent: bool,
    #[prost(bool, tag = "6")]
    pub wal_enabled: bool,
    #[prost(bool, tag = "7")]
    pub swap_enabled: bool,
    #[prost(uint32, tag = "8")]
    pub timeout_ms: u32,
    #[prost(uint32, tag = "9")]
    pub retry_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Direction {
    Unspecified = 0,
    Publish = 1,
    Subscribe = 2,
    Call = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Ordering {
    Unspecified = 0,
    Fifo = 1,
    Unordered = 2,
    LatestOnly = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Delivery {
    Unspecified = 0,
    BestEffort = 1,
    AtLeastOnce = 2,
    ExactlyOnce = 3,
}

/// A decoded `dmxp.Channel` payload plus the fields we did not recognise.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChannel {
    pub options: ChannelOptions,
    /// Unrecognised field paths such as `12` or `qos.40`.
    pub unknown_fields: Vec<String>,
    /// Enum values outside the known range, e.g. `direction=9`.
    pub unknown_values: Vec<String>,
}

/// Decodes an extension payload and records unrecognised content.
pub fn decode_channel(payload: &[u8]) -> Result<DecodedChannel, DecodeError> {
    let options = ChannelOptions::decode(payload)?;

    let mut unknown_fields = Vec::new();
    for field in scan_fields(payload)? {
        if !CHANNEL_FIELDS.contains(&field.tag) {
            unknown_fields.push(field.tag.to_string());
        } else if field.tag == CHANNEL_QOS_FIELD {
            if let Some(qos) = field.payload {
                for nested in scan_fields(qos)? {
                    if !QOS_FIELDS.contains(&nested.tag) {
                        unknown_fields.push(format!("qos.{}", nested.tag));
                    }
                }
            }
        }
    }

    let mut unknown_values = Vec::new();
    if Direction::try_from(options.direction).is_err() {
        unknown_values.push(format!("direction={}", options.direction));
    }
    if let Some(qos) = &options.qos {
        if Ordering::try_from(qos.ordering).is_err() {
            unknown_values.push(format!("qos.ordering={}", qos.ordering));
        }
        if Delivery::try_from(qos.delivery).is_err() {
            unknown_values.push(format!("qos.delivery={}", qos.delivery));
        }
    }

    Ok(DecodedChannel {
        options,
        unknown_fields,
        unknown_values,
    })
}

struct RawField<'a> {
    tag: u32,
    payload: Option<&'a [u8]>,
}

/// Walks the top level of an encoded message without interpreting it.
fn scan_fields(mut buf: &[u8]) -> Result<Vec<RawField<'_>>, DecodeError> {
    let mut fields = Vec::new();
    while !buf.is_empty() {
        let (tag, wire_type) = encoding::decode_key(&mut buf)?;
        if wire_type == WireType::LengthDelimited {
            let len = encoding::decode_varint(&mut buf)? as usize;
            let (payload, rest) = buf.split_at(len.min(buf.len()));
            fields.push(RawField {
                tag,
                payload: Some(payload),
            });
            buf = rest;
        } else {
            encoding::skip_field(wire_type, tag, &mut buf, DecodeContext::default())?;
            fields.push(RawField { tag, payload: None });
        }
    }
    Ok(fields)
}
