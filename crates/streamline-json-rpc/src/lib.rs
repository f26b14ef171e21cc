//! # Streamline JSON-RPC
//!
//! Transport-agnostic JSON-RPC 2.0 core for the Streamable HTTP dispatcher.
//! Nothing in here knows about HTTP; the transport crate feeds raw bytes to
//! [`classify`] and hands the resulting envelopes to a [`Dispatcher`].
//!
//! ## Features
//! - Envelope classification (request, notification, response, malformed)
//! - Batch orchestration with per-element outcomes
//! - A capability registry with unary and streaming invocation
//! - The fixed JSON-RPC error taxonomy and response builder

pub mod batch;
pub mod capability;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod notification;
pub mod prelude;
pub mod request;
pub mod response;
pub mod stream;
pub mod types;

// Re-export main types
pub use capability::Capability;
pub use dispatch::{CapabilityInfo, DispatchOutcome, Dispatcher, SessionContext};
pub use envelope::{
    BatchEnvelope, ClientOutcome, ClientResponse, Envelope, Inbound, classify, classify_envelope,
    classify_value,
};
pub use error::{
    CapabilityError, JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError, ToJsonRpcError,
};
pub use notification::JsonRpcNotification;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, build_response};
pub use stream::{PartialSink, SinkClosed, StreamCall, StreamStatus};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
