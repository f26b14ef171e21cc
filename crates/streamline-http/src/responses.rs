//! Response builders shared by the handler.
//!
//! Everything is built infallibly: status and headers are set on a
//! `Response::new(body)` rather than through `Response::builder()`.

use std::convert::Infallible;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use hyper::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

use streamline_json_rpc::{JsonRpcErrorCode, JsonRpcMessage, SessionContext};

use crate::Rejection;
use crate::protocol::{JSON_MEDIA_TYPE, MCP_PROTOCOL_VERSION_HEADER, MCP_SESSION_ID_HEADER, SSE_MEDIA_TYPE};
use crate::sse::SseFrame;

/// Body type of every response this transport produces
pub type BoxBody = UnsyncBoxBody<Bytes, Infallible>;

pub fn full_body(bytes: impl Into<Bytes>) -> BoxBody {
    Full::new(bytes.into()).boxed_unsync()
}

pub fn empty_body() -> BoxBody {
    Empty::<Bytes>::new().boxed_unsync()
}

/// HTTP status for a unary JSON-RPC reply.
pub fn status_for(message: &JsonRpcMessage) -> StatusCode {
    let JsonRpcMessage::Error(reply) = message else {
        return StatusCode::OK;
    };
    match reply.error.kind() {
        Some(JsonRpcErrorCode::MethodNotFound) => StatusCode::NOT_FOUND,
        Some(
            JsonRpcErrorCode::ParseError
            | JsonRpcErrorCode::InvalidRequest
            | JsonRpcErrorCode::InvalidParams,
        ) => StatusCode::BAD_REQUEST,
        Some(JsonRpcErrorCode::InternalError) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn empty(status: StatusCode) -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

pub fn plain_text(status: StatusCode, text: impl Into<String>) -> Response<BoxBody> {
    let mut response = Response::new(full_body(text.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn rejection(rejection: &Rejection) -> Response<BoxBody> {
    plain_text(rejection.status(), rejection.to_string())
}

/// Serialize `payload` as a JSON response.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Response<BoxBody> {
    match serde_json::to_vec(payload) {
        Ok(bytes) => {
            let mut response = Response::new(full_body(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
            response
        }
        Err(err) => {
            error!("failed to serialize response: {}", err);
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// One unary reply, with its status derived from the error code.
pub fn reply(message: &JsonRpcMessage) -> Response<BoxBody> {
    json(status_for(message), message)
}

/// Stream `frames` as `text/event-stream`.
pub fn sse<S>(frames: S) -> Response<BoxBody>
where
    S: Stream<Item = SseFrame> + Send + 'static,
{
    let body = StreamBody::new(frames.map(|frame| Ok::<_, Infallible>(Frame::data(frame.into_bytes()))));
    let mut response = Response::new(body.boxed_unsync());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(SSE_MEDIA_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Attach the session id and protocol version to a gated response.
pub fn with_session(
    mut response: Response<BoxBody>,
    session: &SessionContext,
    protocol_version: &str,
) -> Response<BoxBody> {
    let headers = response.headers_mut();
    match HeaderValue::from_str(&session.session_id) {
        Ok(value) => {
            headers.insert(HeaderName::from_static("mcp-session-id"), value);
        }
        Err(_) => warn!("session id is not a valid header value, not echoing {}", MCP_SESSION_ID_HEADER),
    }
    if let Ok(value) = HeaderValue::from_str(protocol_version) {
        headers.insert(HeaderName::from_static("mcp-protocol-version"), value);
    } else {
        warn!("invalid {} value configured", MCP_PROTOCOL_VERSION_HEADER);
    }
    response
}
