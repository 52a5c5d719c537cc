//! Topology Manager: connections, channels, queues, consumers and exchanges
//! Everything lives behind one RwLock so a snapshot always sees a consistent
//! topology. Maps are insertion ordered, snapshots list entities in creation order.

use std::collections::VecDeque;
use std::net::SocketAddr;

use bytes::Bytes;
use hashlink::LinkedHashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::TopologyConfig;
use crate::dashboard::models::topology as view;
use super::error::{Result, TopologyError};
use super::types::{
    generated_name, is_reserved, ChannelId, ConnectionId, ExchangeKind, QueueDeclare,
    QueueDeclareOk, QueueId, DEFAULT_EXCHANGE,
};

struct ConnectionEntry {
    peer_addr: SocketAddr,
    // channel number -> channel id
    channels: LinkedHashMap<u16, ChannelId>,
}

struct ConsumerEntry {
    connection: ConnectionId,
    channel: ChannelId,
}

struct QueueEntry {
    id: QueueId,
    durable: bool,
    exclusive_owner: Option<ConnectionId>,
    auto_delete: bool,
    messages: VecDeque<Bytes>,
    consumers: LinkedHashMap<String, ConsumerEntry>,
}

struct BindingEntry {
    queue_id: QueueId,
    queue: String,
    routing_key: String,
}

struct ExchangeEntry {
    kind: ExchangeKind,
    durable: bool,
    bindings: Vec<BindingEntry>,
}

impl ExchangeEntry {
    fn new(kind: ExchangeKind, durable: bool) -> Self {
        Self { kind, durable, bindings: Vec::new() }
    }
}

#[derive(Default)]
struct TopologyState {
    connections: LinkedHashMap<ConnectionId, ConnectionEntry>,
    queues: LinkedHashMap<String, QueueEntry>,
    exchanges: LinkedHashMap<String, ExchangeEntry>,
}

impl TopologyState {
    /// Removes a queue along with every binding that targets it.
    fn remove_queue(&mut self, name: &str) -> Option<QueueEntry> {
        let queue = self.queues.remove(name)?;
        for exchange in self.exchanges.values_mut() {
            exchange.bindings.retain(|b| b.queue_id != queue.id);
        }
        debug!(queue = %name, "Queue removed");
        Some(queue)
    }

    /// Cancels every consumer matching `pred`. Auto-delete queues left
    /// without consumers by this are removed.
    fn drop_consumers(&mut self, pred: impl Fn(&ConsumerEntry) -> bool) {
        let mut emptied = Vec::new();

        for (name, queue) in self.queues.iter_mut() {
            let tags: Vec<String> = queue
                .consumers
                .iter()
                .filter(|&(_, c)| pred(c))
                .map(|(tag, _)| tag.clone())
                .collect();

            if tags.is_empty() {
                continue;
            }
            for tag in &tags {
                queue.consumers.remove(tag);
            }
            debug!(queue = %name, cancelled = tags.len(), "Consumers cancelled");

            if queue.auto_delete && queue.consumers.is_empty() {
                emptied.push(name.clone());
            }
        }

        for name in emptied {
            self.remove_queue(&name);
        }
    }

    fn queue_mut(&mut self, name: &str) -> Result<&mut QueueEntry> {
        self.queues
            .get_mut(name)
            .ok_or_else(|| TopologyError::QueueNotFound(name.to_string()))
    }

    fn exchange_mut(&mut self, name: &str) -> Result<&mut ExchangeEntry> {
        self.exchanges
            .get_mut(name)
            .ok_or_else(|| TopologyError::ExchangeNotFound(name.to_string()))
    }
}

// --- OPERATIONS (caller holds the write lock) ---

impl TopologyState {
    fn close_connection(&mut self, id: ConnectionId) -> Result<()> {
        self.connections
            .remove(&id)
            .ok_or(TopologyError::ConnectionNotFound(id))?;

        self.drop_consumers(|c| c.connection == id);

        let exclusive: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, q)| q.exclusive_owner == Some(id))
            .map(|(name, _)| name.clone())
            .collect();
        for name in exclusive {
            self.remove_queue(&name);
        }

        debug!(connection = %id, "Connection closed");
        Ok(())
    }

    fn open_channel(&mut self, connection: ConnectionId, number: u16, max: u16) -> Result<ChannelId> {
        if number == 0 || number > max {
            return Err(TopologyError::InvalidChannel { number, max });
        }

        let conn = self
            .connections
            .get_mut(&connection)
            .ok_or(TopologyError::ConnectionNotFound(connection))?;

        if conn.channels.contains_key(&number) {
            return Err(TopologyError::ChannelAlreadyOpen(number));
        }

        let id = ChannelId::random();
        conn.channels.insert(number, id);
        debug!(%connection, channel = number, "Channel opened");
        Ok(id)
    }

    fn close_channel(&mut self, connection: ConnectionId, number: u16) -> Result<()> {
        let channel = self
            .connections
            .get_mut(&connection)
            .ok_or(TopologyError::ConnectionNotFound(connection))?
            .channels
            .remove(&number)
            .ok_or(TopologyError::ChannelNotFound { connection, number })?;

        self.drop_consumers(|c| c.channel == channel);
        debug!(%connection, channel = number, "Channel closed");
        Ok(())
    }

    fn declare_queue(&mut self, connection: ConnectionId, declare: QueueDeclare) -> Result<QueueDeclareOk> {
        if !self.connections.contains_key(&connection) {
            return Err(TopologyError::ConnectionNotFound(connection));
        }

        let QueueDeclare {
            name,
            durable,
            exclusive,
            auto_delete,
        } = declare;

        if let Some(existing) = self.queues.get(&name) {
            if existing.exclusive_owner.is_some_and(|owner| owner != connection) {
                return Err(TopologyError::ResourceLocked(name));
            }
            if existing.durable != durable {
                return Err(TopologyError::PreconditionFailed(format!(
                    "queue '{}' already declared with durable={}",
                    name, existing.durable
                )));
            }
            return Ok(QueueDeclareOk {
                message_count: existing.messages.len() as u64,
                consumer_count: existing.consumers.len(),
                name,
            });
        }

        let name = if name.is_empty() {
            generated_name("gen")
        } else if is_reserved(&name) {
            return Err(TopologyError::AccessRefused(format!(
                "queue name '{}' is reserved",
                name
            )));
        } else {
            name
        };

        let id = QueueId::random();
        self.queues.insert(
            name.clone(),
            QueueEntry {
                id,
                durable,
                exclusive_owner: exclusive.then_some(connection),
                auto_delete,
                messages: VecDeque::new(),
                consumers: LinkedHashMap::new(),
            },
        );

        if let Some(default) = self.exchanges.get_mut(DEFAULT_EXCHANGE) {
            default.bindings.push(BindingEntry {
                queue_id: id,
                queue: name.clone(),
                routing_key: name.clone(),
            });
        }

        debug!(queue = %name, %id, durable, exclusive, auto_delete, "Queue declared");
        Ok(QueueDeclareOk {
            name,
            message_count: 0,
            consumer_count: 0,
        })
    }

    fn delete_queue(&mut self, name: &str) -> Result<u64> {
        self.remove_queue(name)
            .map(|q| q.messages.len() as u64)
            .ok_or_else(|| TopologyError::QueueNotFound(name.to_string()))
    }

    fn purge_queue(&mut self, name: &str) -> Result<u64> {
        let queue = self.queue_mut(name)?;
        let purged = queue.messages.len() as u64;
        queue.messages.clear();
        debug!(queue = %name, purged, "Queue purged");
        Ok(purged)
    }

    fn declare_exchange(&mut self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        if let Some(existing) = self.exchanges.get(name) {
            if existing.kind != kind || existing.durable != durable {
                return Err(TopologyError::PreconditionFailed(format!(
                    "exchange '{}' already declared as {} durable={}",
                    name, existing.kind, existing.durable
                )));
            }
            return Ok(());
        }

        if is_reserved(name) {
            return Err(TopologyError::AccessRefused(format!(
                "exchange name '{}' is reserved",
                name
            )));
        }

        self.exchanges
            .insert(name.to_string(), ExchangeEntry::new(kind, durable));
        debug!(exchange = %name, %kind, durable, "Exchange declared");
        Ok(())
    }

    fn delete_exchange(&mut self, name: &str) -> Result<()> {
        if is_reserved(name) {
            return Err(TopologyError::AccessRefused(format!(
                "exchange '{}' cannot be deleted",
                name
            )));
        }

        self.exchanges
            .remove(name)
            .ok_or_else(|| TopologyError::ExchangeNotFound(name.to_string()))?;
        debug!(exchange = %name, "Exchange deleted");
        Ok(())
    }

    fn bind_queue(&mut self, exchange: &str, queue: &str, routing_key: &str) -> Result<()> {
        if exchange == DEFAULT_EXCHANGE {
            return Err(TopologyError::AccessRefused(
                "the default exchange cannot be bound explicitly".to_string(),
            ));
        }

        let queue_id = self.queue_mut(queue)?.id;
        let entry = self.exchange_mut(exchange)?;

        let exists = entry
            .bindings
            .iter()
            .any(|b| b.queue_id == queue_id && b.routing_key == routing_key);
        if !exists {
            entry.bindings.push(BindingEntry {
                queue_id,
                queue: queue.to_string(),
                routing_key: routing_key.to_string(),
            });
            debug!(%exchange, %queue, %routing_key, "Queue bound");
        }
        Ok(())
    }

    fn unbind_queue(&mut self, exchange: &str, queue: &str, routing_key: &str) -> Result<()> {
        if exchange == DEFAULT_EXCHANGE {
            return Err(TopologyError::AccessRefused(
                "the default exchange cannot be unbound explicitly".to_string(),
            ));
        }

        let queue_id = self.queue_mut(queue)?.id;
        self.exchange_mut(exchange)?
            .bindings
            .retain(|b| !(b.queue_id == queue_id && b.routing_key == routing_key));
        debug!(%exchange, %queue, %routing_key, "Queue unbound");
        Ok(())
    }

    fn consume(&mut self, connection: ConnectionId, channel: u16, queue: &str, tag: &str) -> Result<String> {
        let channel_id = self
            .connections
            .get(&connection)
            .ok_or(TopologyError::ConnectionNotFound(connection))?
            .channels
            .get(&channel)
            .copied()
            .ok_or(TopologyError::ChannelNotFound { connection, number: channel })?;

        let entry = self.queue_mut(queue)?;
        if entry.exclusive_owner.is_some_and(|owner| owner != connection) {
            return Err(TopologyError::ResourceLocked(queue.to_string()));
        }

        let tag = if tag.is_empty() {
            generated_name("ctag")
        } else {
            tag.to_string()
        };
        if entry.consumers.contains_key(&tag) {
            return Err(TopologyError::ConsumerTagInUse(tag));
        }

        entry.consumers.insert(
            tag.clone(),
            ConsumerEntry {
                connection,
                channel: channel_id,
            },
        );
        debug!(%queue, %tag, channel, "Consumer registered");
        Ok(tag)
    }

    fn cancel(&mut self, queue: &str, tag: &str) -> Result<bool> {
        let entry = self.queue_mut(queue)?;
        if entry.consumers.remove(tag).is_none() {
            return Ok(false);
        }
        debug!(%queue, %tag, "Consumer cancelled");

        if entry.auto_delete && entry.consumers.is_empty() {
            self.remove_queue(queue);
        }
        Ok(true)
    }

    fn publish(&mut self, exchange: &str, routing_key: &str, payload: Bytes) -> Result<usize> {
        let entry = self
            .exchanges
            .get(exchange)
            .ok_or_else(|| TopologyError::ExchangeNotFound(exchange.to_string()))?;

        let mut targets: Vec<&str> = Vec::new();
        for binding in &entry.bindings {
            if entry.kind.routes(&binding.routing_key, routing_key)
                && !targets.contains(&binding.queue.as_str())
            {
                targets.push(&binding.queue);
            }
        }

        let mut routed = 0;
        for name in targets {
            if let Some(queue) = self.queues.get_mut(name) {
                queue.messages.push_back(payload.clone());
                routed += 1;
            }
        }

        debug!(%exchange, %routing_key, routed, "Message published");
        Ok(routed)
    }
}

/// Logs a rejected operation with its reply code and hands the result back.
fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    result.inspect_err(|e| warn!(operation, error = %e, code = e.reply_code(), "Operation rejected"))
}

pub struct TopologyManager {
    state: RwLock<TopologyState>,
    config: TopologyConfig,
}

impl TopologyManager {
    pub fn new(config: TopologyConfig) -> Self {
        let mut state = TopologyState::default();
        state.exchanges.insert(
            DEFAULT_EXCHANGE.to_string(),
            ExchangeEntry::new(ExchangeKind::Direct, true),
        );
        if config.default_exchanges {
            for kind in [ExchangeKind::Direct, ExchangeKind::Fanout, ExchangeKind::Topic] {
                state
                    .exchanges
                    .insert(format!("amq.{}", kind), ExchangeEntry::new(kind, true));
            }
        }

        Self {
            state: RwLock::new(state),
            config,
        }
    }

    // --- CONNECTIONS & CHANNELS ---

    pub fn open_connection(&self, peer_addr: SocketAddr) -> ConnectionId {
        let id = ConnectionId::random();
        self.state.write().connections.insert(
            id,
            ConnectionEntry {
                peer_addr,
                channels: LinkedHashMap::new(),
            },
        );
        debug!(connection = %id, %peer_addr, "Connection opened");
        id
    }

    /// Closes a connection: its channels go, their consumers are cancelled and
    /// the exclusive queues it owns are deleted.
    pub fn close_connection(&self, id: ConnectionId) -> Result<()> {
        logged("close_connection", self.state.write().close_connection(id))
    }

    pub fn open_channel(&self, connection: ConnectionId, number: u16) -> Result<ChannelId> {
        let max = self.config.channel_max;
        logged("open_channel", self.state.write().open_channel(connection, number, max))
    }

    pub fn close_channel(&self, connection: ConnectionId, number: u16) -> Result<()> {
        logged("close_channel", self.state.write().close_channel(connection, number))
    }

    // --- QUEUES ---

    pub fn declare_queue(&self, connection: ConnectionId, declare: QueueDeclare) -> Result<QueueDeclareOk> {
        logged("declare_queue", self.state.write().declare_queue(connection, declare))
    }

    /// Deletes a queue and its bindings, returning how many messages it held.
    pub fn delete_queue(&self, name: &str) -> Result<u64> {
        logged("delete_queue", self.state.write().delete_queue(name))
    }

    pub fn purge_queue(&self, name: &str) -> Result<u64> {
        logged("purge_queue", self.state.write().purge_queue(name))
    }

    // --- EXCHANGES & BINDINGS ---

    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        logged("declare_exchange", self.state.write().declare_exchange(name, kind, durable))
    }

    pub fn delete_exchange(&self, name: &str) -> Result<()> {
        logged("delete_exchange", self.state.write().delete_exchange(name))
    }

    pub fn bind_queue(&self, exchange: &str, queue: &str, routing_key: &str) -> Result<()> {
        logged("bind_queue", self.state.write().bind_queue(exchange, queue, routing_key))
    }

    pub fn unbind_queue(&self, exchange: &str, queue: &str, routing_key: &str) -> Result<()> {
        logged("unbind_queue", self.state.write().unbind_queue(exchange, queue, routing_key))
    }

    // --- CONSUMERS & MESSAGES ---

    /// Registers a consumer on `queue` through an open channel. An empty `tag`
    /// asks the server to generate one; the tag in use is returned.
    pub fn consume(&self, connection: ConnectionId, channel: u16, queue: &str, tag: &str) -> Result<String> {
        logged("consume", self.state.write().consume(connection, channel, queue, tag))
    }

    /// Cancels a consumer. Returns false when no consumer had that tag.
    pub fn cancel(&self, queue: &str, tag: &str) -> Result<bool> {
        logged("cancel", self.state.write().cancel(queue, tag))
    }

    /// Routes a message through `exchange` and enqueues it once on every
    /// matching queue. Returns the number of queues that received it.
    pub fn publish(&self, exchange: &str, routing_key: &str, payload: Bytes) -> Result<usize> {
        logged("publish", self.state.write().publish(exchange, routing_key, payload))
    }

    /// Takes the oldest message off a queue.
    pub fn get(&self, queue: &str) -> Result<Option<Bytes>> {
        logged("get", self.state.write().queue_mut(queue).map(|q| q.messages.pop_front()))
    }

    // --- SNAPSHOT ---

    pub fn snapshot(&self) -> view::Data {
        let state = self.state.read();

        let connections = state
            .connections
            .iter()
            .map(|(id, conn)| view::Connection {
                id: id.to_string(),
                peer_addr: conn.peer_addr.to_string(),
                channels: conn
                    .channels
                    .iter()
                    .map(|(number, channel)| view::Channel {
                        id: channel.to_string(),
                        number: *number,
                    })
                    .collect(),
            })
            .collect();

        let queues = state
            .queues
            .iter()
            .map(|(name, queue)| view::Queue {
                id: queue.id.to_string(),
                name: name.clone(),
                durable: queue.durable,
                messages: queue.messages.len() as u64,
                consumers: queue
                    .consumers
                    .iter()
                    .map(|(tag, consumer)| view::Consumer {
                        tag: tag.clone(),
                        channel: consumer.channel.to_string(),
                    })
                    .collect(),
            })
            .collect();

        let exchanges = state
            .exchanges
            .iter()
            .map(|(name, exchange)| view::Exchange {
                name: name.clone(),
                durable: exchange.durable,
                bindings: exchange
                    .bindings
                    .iter()
                    .map(|b| view::Binding {
                        queue: b.queue_id.to_string(),
                        routing_key: b.routing_key.clone(),
                    })
                    .collect(),
            })
            .collect();

        view::Data {
            connections,
            queues,
            exchanges,
        }
    }
}
