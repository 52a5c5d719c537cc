use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::routing::topic_matches;

/// Declares a Copy id type backed by a random v4 uuid.
macro_rules! uuid_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(Uuid);

            impl $name {
                pub fn random() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )+
    };
}

uuid_id!(ConnectionId, ChannelId, QueueId);

/// Name of the nameless direct exchange every queue is bound to on creation.
pub const DEFAULT_EXCHANGE: &str = "";

/// Names starting with this prefix belong to the server.
pub const RESERVED_PREFIX: &str = "amq.";

pub(crate) fn is_reserved(name: &str) -> bool {
    name.is_empty() || name.starts_with(RESERVED_PREFIX)
}

pub(crate) fn generated_name(kind: &str) -> String {
    format!("{}{}-{}", RESERVED_PREFIX, kind, Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    Direct,
    Fanout,
    Topic,
}

impl ExchangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
        }
    }

    /// Whether a message published with `routing_key` follows a binding made with `binding_key`.
    pub fn routes(&self, binding_key: &str, routing_key: &str) -> bool {
        match self {
            ExchangeKind::Direct => binding_key == routing_key,
            ExchangeKind::Fanout => true,
            ExchangeKind::Topic => topic_matches(binding_key, routing_key),
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            other => Err(format!("unsupported exchange type '{}'", other)),
        }
    }
}

/// Arguments of a queue declaration. An empty `name` asks the server to pick one.
#[derive(Debug, Clone, Default)]
pub struct QueueDeclare {
    pub name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

impl QueueDeclare {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDeclareOk {
    pub name: String,
    pub message_count: u64,
    pub consumer_count: usize,
}
