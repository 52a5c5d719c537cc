use serde::Serialize;
use super::topology::Data;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub uptime_seconds: u64,
    pub server_time: String, // RFC 3339
    pub totals: Totals,
    pub data: Data,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub connections: usize,
    pub channels: usize,
    pub queues: usize,
    pub consumers: usize,
    pub messages: u64,
    pub exchanges: usize,
    pub dangling_consumers: usize,
    pub dangling_bindings: usize,
}

impl Totals {
    pub fn of(data: &Data) -> Self {
        Self {
            connections: data.connections.len(),
            channels: data.total_channels(),
            queues: data.queues.len(),
            consumers: data.total_consumers(),
            messages: data.total_messages(),
            exchanges: data.exchanges.len(),
            dangling_consumers: data.dangling_consumers().count(),
            dangling_bindings: data.dangling_bindings().count(),
        }
    }
}
