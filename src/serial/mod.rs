pub mod simulated;
pub mod transport;

#[cfg(test)]
pub mod mock;

pub use simulated::SimulatedConnector;
pub use transport::{Connector, SerialConnector, Transport};
