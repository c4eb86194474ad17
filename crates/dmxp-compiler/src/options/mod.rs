//! Channel option vocabulary and extraction.
//!
//! Schema authors annotate messages, rpcs and services with the extensions
//! declared in `dmxp/options.proto`. This module decodes those payloads and
//! validates them into [`OptionRecord`]s.

mod extract;
mod record;
mod vocabulary;

pub use extract::{extract_options, is_valid_channel_name};
pub use record::{
    CallOption, ChannelOption, ChannelSite, OptionRecord, PublishOption, QosHints, SiteKind,
    SubscribeOption,
};
pub use vocabulary::{
    decode_channel, ChannelOptions, DecodedChannel, Delivery, Direction, Ordering, QosOptions,
    MESSAGE_CHANNEL_EXTENSION, METHOD_CHANNEL_EXTENSION, OPTIONS_PROTO, SERVICE_CHANNEL_EXTENSION,
};
