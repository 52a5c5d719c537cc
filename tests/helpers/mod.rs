#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};

use brokerscope::brokers::topology::{ConnectionId, TopologyManager};
use brokerscope::config::{Config, TopologyConfig};
use brokerscope::BrokerScope;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn setup_topology() -> TopologyManager {
    TopologyManager::new(TopologyConfig::default())
}

pub fn peer(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::new(10, 0, 0, 5), port))
}

/// Opens a connection with channel 1 already open.
pub fn connect(topology: &TopologyManager, port: u16) -> ConnectionId {
    let conn = topology.open_connection(peer(port));
    topology.open_channel(conn, 1).unwrap();
    conn
}

/// Starts the dashboard on an ephemeral port and returns its address.
pub async fn spawn_dashboard(engine: BrokerScope) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        brokerscope::dashboard::server::serve(listener, engine).await.unwrap();
    });
    addr
}

pub fn setup_engine() -> BrokerScope {
    BrokerScope::new(&Config::default())
}

/// Minimal HTTP/1.1 GET. Returns the status code and the raw body.
pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").expect("malformed response");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("missing status code");
    (status, body.to_string())
}

/// Pulls the JSON document out of a body that may be chunk-encoded.
pub fn json_body(body: &str) -> serde_json::Value {
    let start = body.find(|c: char| c == '{' || c == '[').expect("no json in body");
    let end = body.rfind(|c: char| c == '}' || c == ']').expect("no json in body");
    serde_json::from_str(&body[start..=end]).unwrap()
}
