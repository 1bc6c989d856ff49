pub mod dataplane_client;

/// Re-export commonly used types from adapters
pub use dataplane_client::{DataplaneClient, Endpoint};
