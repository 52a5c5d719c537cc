pub mod system;
pub mod topology;

pub use topology::*;
