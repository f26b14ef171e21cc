//! # Streamline JSON-RPC Prelude
//!
//! Commonly used types for capability authors and transports.
//!
//! ```rust
//! use streamline_json_rpc::prelude::*;
//! ```

pub use crate::capability::Capability;
pub use crate::dispatch::{DispatchOutcome, Dispatcher, SessionContext};
pub use crate::envelope::{BatchEnvelope, ClientResponse, Envelope, Inbound, classify};
pub use crate::error::{CapabilityError, JsonRpcError, JsonRpcErrorCode, RpcError};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::stream::{PartialSink, StreamCall};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
