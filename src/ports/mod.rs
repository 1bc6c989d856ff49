pub mod dataplane;

pub use dataplane::{
    ApiRequest, ApiResponse, DataplaneTransport, RequestBody, TransportError, TransportResult,
};
