//! Sample topology for running the dashboard without live clients.

use std::net::{Ipv4Addr, SocketAddr};

use bytes::Bytes;

use super::{ExchangeKind, QueueDeclare, Result, TopologyManager};

/// One connection on channel 1 consuming `orders` (42 messages waiting) and
/// a topic exchange `ex1` routing `orders.*` into it.
pub fn seed(topology: &TopologyManager) -> Result<()> {
    let peer = SocketAddr::from((Ipv4Addr::new(10, 0, 0, 5), 5672));
    let conn = topology.open_connection(peer);
    topology.open_channel(conn, 1)?;

    topology.declare_queue(conn, QueueDeclare::named("orders").durable())?;
    topology.declare_exchange("ex1", ExchangeKind::Topic, false)?;
    topology.bind_queue("ex1", "orders", "orders.*")?;
    topology.consume(conn, 1, "orders", "cons1")?;

    for n in 0..42 {
        topology.publish("ex1", "orders.created", Bytes::from(format!("order-{}", n)))?;
    }
    Ok(())
}
