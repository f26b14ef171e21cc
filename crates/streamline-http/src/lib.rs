//! # Streamline HTTP
//!
//! Streamable HTTP transport for the Streamline JSON-RPC dispatcher.
//! One endpoint path serves both directions:
//!
//! - `POST` carries a JSON-RPC envelope or batch and is answered with JSON,
//!   a `202 Accepted`, or an SSE stream for streaming calls.
//! - `GET` opens a standing SSE push stream (endpoint frame, then heartbeats).
//!
//! Every exchange first passes the [`TransportGate`], which checks Origin,
//! Accept and `MCP-Protocol-Version` and assigns the session id.

pub mod cancellation;
pub mod cors;
pub mod gate;
pub mod handler;
pub mod protocol;
pub mod responses;
pub mod server;
pub mod sse;
pub mod streaming;

// Re-export main types
pub use cancellation::{CancelOnDrop, CancellationHandle};
pub use cors::CorsLayer;
pub use gate::TransportGate;
pub use handler::StreamableHandler;
pub use protocol::{
    MCP_PROTOCOL_VERSION_HEADER, MCP_SESSION_ID_HEADER, SUPPORTED_PROTOCOL_VERSION,
    extract_protocol_version, extract_session_id,
};
pub use responses::BoxBody;
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};
pub use sse::SseFrame;
pub use streaming::{encode_call, push_stream};

// Re-export foundational types
pub use streamline_json_rpc::{Capability, Dispatcher, SessionContext};

use hyper::StatusCode;

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Server-level failures
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A transport-level refusal. Answered with a bare HTTP status and a short
/// plain-text body; never reaches the JSON-RPC layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Forbidden origin: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Forbidden(_) => StatusCode::FORBIDDEN,
            Rejection::BadRequest(_) => StatusCode::BAD_REQUEST,
            Rejection::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Rejection::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Rejection::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}
