//! Broker topology as shown on the dashboard.
//!
//! Every type here is a plain value snapshot. The registry builds a whole
//! [`Data`] on each read and the next read replaces it. Field names on the
//! wire are camelCase (`peerAddr`, `routingKey`) to match the frontend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub number: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub peer_addr: String,
    pub channels: Vec<Channel>,
}

/// `channel` holds a [`Channel::id`]. It is a lookup key, not ownership,
/// and may point at a channel that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub tag: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: String,
    pub name: String,
    pub durable: bool,
    pub messages: u64,
    pub consumers: Vec<Consumer>,
}

/// `queue` holds a [`Queue::id`], same rules as [`Consumer::channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub queue: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub name: String,
    pub durable: bool,
    pub bindings: Vec<Binding>,
}

/// Aggregate root of a dashboard snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub connections: Vec<Connection>,
    pub queues: Vec<Queue>,
    pub exchanges: Vec<Exchange>,
}

impl Data {
    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Finds a channel by id together with the connection that owns it.
    pub fn channel(&self, id: &str) -> Option<(&Connection, &Channel)> {
        self.connections.iter().find_map(|conn| {
            conn.channels
                .iter()
                .find(|ch| ch.id == id)
                .map(|ch| (conn, ch))
        })
    }

    pub fn queue(&self, id: &str) -> Option<&Queue> {
        self.queues.iter().find(|q| q.id == id)
    }

    pub fn queue_by_name(&self, name: &str) -> Option<&Queue> {
        self.queues.iter().find(|q| q.name == name)
    }

    pub fn exchange(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.iter().find(|e| e.name == name)
    }

    /// `None` when the consumer points at a channel missing from this snapshot.
    pub fn consumer_channel(&self, consumer: &Consumer) -> Option<&Channel> {
        self.channel(&consumer.channel).map(|(_, ch)| ch)
    }

    pub fn binding_queue(&self, binding: &Binding) -> Option<&Queue> {
        self.queue(&binding.queue)
    }

    /// Consumers whose channel id resolves to nothing, paired with their queue.
    pub fn dangling_consumers(&self) -> impl Iterator<Item = (&Queue, &Consumer)> + '_ {
        self.queues.iter().flat_map(move |q| {
            q.consumers
                .iter()
                .filter(move |c| self.consumer_channel(c).is_none())
                .map(move |c| (q, c))
        })
    }

    /// Bindings whose queue id resolves to nothing, paired with their exchange.
    pub fn dangling_bindings(&self) -> impl Iterator<Item = (&Exchange, &Binding)> + '_ {
        self.exchanges.iter().flat_map(move |e| {
            e.bindings
                .iter()
                .filter(move |b| self.binding_queue(b).is_none())
                .map(move |b| (e, b))
        })
    }

    pub fn total_channels(&self) -> usize {
        self.connections.iter().map(|c| c.channels.len()).sum()
    }

    pub fn total_consumers(&self) -> usize {
        self.queues.iter().map(|q| q.consumers.len()).sum()
    }

    pub fn total_messages(&self) -> u64 {
        self.queues.iter().map(|q| q.messages).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Data {
        Data {
            connections: vec![Connection {
                id: "c1".to_string(),
                peer_addr: "10.0.0.5:5672".to_string(),
                channels: vec![Channel { id: "ch1".to_string(), number: 1 }],
            }],
            queues: vec![Queue {
                id: "q1".to_string(),
                name: "orders".to_string(),
                durable: true,
                messages: 42,
                consumers: vec![Consumer {
                    tag: "cons1".to_string(),
                    channel: "ch1".to_string(),
                }],
            }],
            exchanges: vec![Exchange {
                name: "ex1".to_string(),
                durable: false,
                bindings: vec![Binding {
                    queue: "q1".to_string(),
                    routing_key: "orders.*".to_string(),
                }],
            }],
        }
    }

    #[test]
    fn serializes_with_frontend_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "connections": [{
                    "id": "c1",
                    "peerAddr": "10.0.0.5:5672",
                    "channels": [{ "id": "ch1", "number": 1 }]
                }],
                "queues": [{
                    "id": "q1",
                    "name": "orders",
                    "durable": true,
                    "messages": 42,
                    "consumers": [{ "tag": "cons1", "channel": "ch1" }]
                }],
                "exchanges": [{
                    "name": "ex1",
                    "durable": false,
                    "bindings": [{ "queue": "q1", "routingKey": "orders.*" }]
                }]
            })
        );
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let data = sample();
        let text = serde_json::to_string(&data).unwrap();
        let back: Data = serde_json::from_str(&text).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn rejects_negative_message_count() {
        let raw = r#"{"id":"q","name":"q","durable":false,"messages":-1,"consumers":[]}"#;
        assert!(serde_json::from_str::<Queue>(raw).is_err());
    }

    #[test]
    fn resolves_cross_references() {
        let data = sample();
        let consumer = &data.queues[0].consumers[0];
        let channel = data.consumer_channel(consumer).unwrap();
        assert_eq!(channel.number, 1);

        let (conn, _) = data.channel("ch1").unwrap();
        assert_eq!(conn.peer_addr, "10.0.0.5:5672");

        let binding = &data.exchanges[0].bindings[0];
        assert_eq!(data.binding_queue(binding).unwrap().name, "orders");
        assert_eq!(data.dangling_consumers().count(), 0);
        assert_eq!(data.dangling_bindings().count(), 0);
    }

    #[test]
    fn dangling_references_are_reported_not_rejected() {
        let mut data = sample();
        data.connections.clear();
        data.queues[0].id = "q2".to_string();

        let consumers: Vec<_> = data.dangling_consumers().map(|(q, c)| (q.name.as_str(), c.tag.as_str())).collect();
        assert_eq!(consumers, vec![("orders", "cons1")]);

        let bindings: Vec<_> = data.dangling_bindings().map(|(e, b)| (e.name.as_str(), b.queue.as_str())).collect();
        assert_eq!(bindings, vec![("ex1", "q1")]);
    }

    #[test]
    fn empty_snapshot_has_empty_sequences() {
        let data: Data = serde_json::from_str(r#"{"connections":[],"queues":[],"exchanges":[]}"#).unwrap();
        assert_eq!(data, Data::default());
        assert_eq!(data.total_messages(), 0);
        assert_eq!(data.total_channels(), 0);
    }
}
