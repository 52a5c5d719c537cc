use super::types::ConnectionId;

pub type Result<T> = std::result::Result<T, TopologyError>;

/// Rejections raised by the topology registry, each tied to an AMQP reply code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),
    #[error("channel {number} is not open on connection {connection}")]
    ChannelNotFound { connection: ConnectionId, number: u16 },
    #[error("queue '{0}' not found")]
    QueueNotFound(String),
    #[error("exchange '{0}' not found")]
    ExchangeNotFound(String),
    #[error("channel {0} is already open")]
    ChannelAlreadyOpen(u16),
    #[error("channel number {number} outside 1..={max}")]
    InvalidChannel { number: u16, max: u16 },
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("queue '{0}' is exclusive to another connection")]
    ResourceLocked(String),
    #[error("consumer tag '{0}' already in use")]
    ConsumerTagInUse(String),
    #[error("access refused: {0}")]
    AccessRefused(String),
}

impl TopologyError {
    pub fn reply_code(&self) -> u16 {
        match self {
            TopologyError::ConnectionNotFound(_)
            | TopologyError::ChannelNotFound { .. }
            | TopologyError::QueueNotFound(_)
            | TopologyError::ExchangeNotFound(_) => 404,
            TopologyError::ChannelAlreadyOpen(_) | TopologyError::InvalidChannel { .. } => 504,
            TopologyError::PreconditionFailed(_) => 406,
            TopologyError::ResourceLocked(_) => 405,
            TopologyError::ConsumerTagInUse(_) => 530,
            TopologyError::AccessRefused(_) => 403,
        }
    }
}
