pub mod demo;
pub mod error;
pub mod routing;
pub mod topology_manager;
pub mod types;

pub use error::{Result, TopologyError};
pub use topology_manager::*;
pub use types::*;
