//! # Gantry Bridge
//!
//! The correlation-ID RPC bridge: a pusher that makes a broker round-trip
//! look like a blocking call, and a popper that drains a service's
//! request queue into a plain HTTP endpoint and routes the body back to
//! the caller's reply queue.
//!
//! Every call owns an ephemeral reply queue named after its correlation
//! id; the pusher consumes it until the matching reply arrives or the
//! configured timeout elapses. The popper is a single-consumer loop per
//! process; throughput scales by running more popper processes competing
//! on the same request queue.

pub mod config;
pub mod error;
pub mod popper;
pub mod pusher;

pub use config::{BridgeConfig, PopperConfig};
pub use error::{BridgeError, BridgeResult};
pub use popper::Popper;
pub use pusher::RpcClient;

/// The request queue a service's poppers consume.
pub fn request_queue(service: &str) -> String {
    format!("{service}_requests")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_queue_name() {
        assert_eq!(request_queue("addition"), "addition_requests");
        assert_ne!(request_queue("a"), request_queue("b"));
    }
}
