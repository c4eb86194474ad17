//! Typed option records produced by extraction.
//!
//! Later stages only ever see these, never the raw extension payloads.

use crate::diagnostic::SourceLocation;
use super::vocabulary::{Delivery, Ordering, QosOptions};

/// Quality-of-service hints attached to a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QosHints {
    pub ordering: Option<Ordering>,
    pub delivery: Option<Delivery>,
    pub buffer_size: Option<u32>,
    pub priority: Option<u32>,
    pub persistent: bool,
    pub wal_enabled: bool,
    pub swap_enabled: bool,
    pub timeout_ms: Option<u32>,
    pub retry_count: Option<u32>,
}

impl QosHints {
    pub fn from_options(qos: Option<&QosOptions>) -> Self {
        let Some(qos) = qos else {
            return Self::default();
        };
        let nonzero = |v: u32| (v != 0).then_some(v);
        Self {
            ordering: Ordering::try_from(qos.ordering)
                .ok()
                .filter(|o| *o != Ordering::Unspecified),
            delivery: Delivery::try_from(qos.delivery)
                .ok()
                .filter(|d| *d != Delivery::Unspecified),
            buffer_size: nonzero(qos.buffer_size),
            priority: nonzero(qos.priority),
            persistent: qos.persistent,
            wal_enabled: qos.wal_enabled,
            swap_enabled: qos.swap_enabled,
            timeout_ms: nonzero(qos.timeout_ms),
            retry_count: nonzero(qos.retry_count),
        }
    }
}

/// Which kind of declaration carried the option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteKind {
    /// `(dmxp.channel)` on a message.
    Message,
    /// `(dmxp.method)` on an rpc.
    Method { service: String, method: String },
    /// An rpc inheriting its service's `(dmxp.service)`.
    ServiceMethod { service: String, method: String },
}

/// Where a channel was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSite {
    pub kind: SiteKind,
    /// Proto file name as given by the host.
    pub file: String,
    /// Fully-qualified name of the declaration.
    pub declaration: String,
    /// Scope relative type names are resolved from.
    pub scope: String,
    pub location: SourceLocation,
    /// Leading comment of the declaration.
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOption {
    pub name: String,
    /// Message type as written in the descriptor.
    pub message: String,
    pub qos: QosHints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOption {
    pub name: String,
    pub message: String,
    pub qos: QosHints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOption {
    pub name: String,
    pub request: String,
    pub response: String,
    pub qos: QosHints,
}

/// A validated channel declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOption {
    Publish(PublishOption),
    Subscribe(SubscribeOption),
    Call(CallOption),
}

impl ChannelOption {
    pub fn name(&self) -> &str {
        match self {
            ChannelOption::Publish(o) => &o.name,
            ChannelOption::Subscribe(o) => &o.name,
            ChannelOption::Call(o) => &o.name,
        }
    }

    pub fn qos(&self) -> &QosHints {
        match self {
            ChannelOption::Publish(o) => &o.qos,
            ChannelOption::Subscribe(o) => &o.qos,
            ChannelOption::Call(o) => &o.qos,
        }
    }
}

/// One extracted channel and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRecord {
    pub option: ChannelOption,
    pub site: ChannelSite,
}
