//! Envelope classification.
//!
//! Raw bytes become either a single [`Envelope`] or a [`BatchEnvelope`].
//! Classification of an object is derived from which members are present:
//!
//! | `method` | `id`     | `result`/`error` | kind           |
//! |----------|----------|------------------|----------------|
//! | yes      | present  | -                | Request        |
//! | yes      | absent   | -                | Notification   |
//! | no       | -        | exactly one      | Response       |
//! | otherwise                                | Malformed      |
//!
//! A wrong or missing `jsonrpc` member makes any object Malformed.

use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::types::{JsonRpcVersion, RequestId};

/// A client's reply to a server-initiated request, kept as received.
///
/// Neither an id nor a well-formed error object is required: the reply is
/// only acknowledged, so its inner shape is never validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    pub id: Option<RequestId>,
    pub outcome: ClientOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutcome {
    Result(Value),
    Error(Value),
}

impl ClientResponse {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ClientOutcome::Error(_))
    }
}

/// One classified JSON-RPC message unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// A client's reply to a server-initiated request. Acknowledged, never answered.
    Response(ClientResponse),
    /// Failed validation. `id` is echoed in the error reply when it could be recovered.
    Malformed { id: Option<RequestId>, error: RpcError },
}

impl Envelope {
    /// Method name for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Envelope::Request(req) => Some(&req.method),
            Envelope::Notification(notif) => Some(&notif.method),
            _ => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Envelope::Request(_))
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, Envelope::Notification(_))
    }

    /// Whether the transport owes the client a JSON-RPC body for this envelope.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Envelope::Request(_) | Envelope::Malformed { .. })
    }

    /// `true` for a request whose params carry `"stream": true`.
    pub fn stream_requested(&self) -> bool {
        match self {
            Envelope::Request(req) => req.params.stream_requested(),
            _ => false,
        }
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Envelope::Request(req) => Some(&req.id),
            Envelope::Malformed { id, .. } => id.as_ref(),
            _ => None,
        }
    }

    fn malformed(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Envelope::Malformed {
            id,
            error: RpcError::InvalidRequest(message.into()),
        }
    }
}

/// A non-empty, ordered batch of envelopes.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEnvelope {
    items: Vec<Envelope>,
}

impl BatchEnvelope {
    /// An empty batch is an error, not a batch.
    pub fn new(items: Vec<Envelope>) -> Result<Self, RpcError> {
        if items.is_empty() {
            return Err(RpcError::InvalidRequest("Empty batch".to_string()));
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Envelope> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<Envelope> {
        self.items
    }
}

/// Result of classifying a whole request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Single(Envelope),
    Batch(BatchEnvelope),
}

/// Classify a raw body.
///
/// Only undecodable input and top-level scalars are `Err(RpcError::Parse)`;
/// every other problem is reported per envelope as `Envelope::Malformed`.
pub fn classify(raw: &[u8]) -> Result<Inbound, RpcError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|err| RpcError::Parse(err.to_string()))?;
    classify_value(value)
}

/// Classify an already-decoded top-level value.
pub fn classify_value(value: Value) -> Result<Inbound, RpcError> {
    match value {
        Value::Array(items) => {
            let envelopes: Vec<Envelope> = items.into_iter().map(classify_envelope).collect();
            match BatchEnvelope::new(envelopes) {
                Ok(batch) => Ok(Inbound::Batch(batch)),
                Err(error) => Ok(Inbound::Single(Envelope::Malformed { id: None, error })),
            }
        }
        Value::Object(_) => Ok(Inbound::Single(classify_envelope(value))),
        other => Err(RpcError::Parse(format!(
            "expected a JSON object or array, found {}",
            value_kind(&other)
        ))),
    }
}

/// Classify one element. Never fails; problems become `Envelope::Malformed`.
pub fn classify_envelope(value: Value) -> Envelope {
    let Value::Object(mut obj) = value else {
        return Envelope::malformed(None, "envelope must be a JSON object");
    };

    let id = match obj.remove("id") {
        None => None,
        Some(raw) => match RequestId::from_value(&raw) {
            Some(id) => Some(id),
            None => return Envelope::malformed(None, "id must be a string, integer or null"),
        },
    };

    match obj.get("jsonrpc") {
        Some(Value::String(v)) if v == crate::JSONRPC_VERSION => {}
        Some(_) => return Envelope::malformed(id, "jsonrpc must be '2.0'"),
        None => return Envelope::malformed(id, "jsonrpc member is required"),
    }

    match obj.remove("method") {
        Some(Value::String(method)) => classify_call(method, obj, id),
        Some(_) => Envelope::malformed(id, "method must be a string"),
        None => classify_response(obj, id),
    }
}

fn classify_call(method: String, mut obj: Map<String, Value>, id: Option<RequestId>) -> Envelope {
    let params = match obj.remove("params") {
        None => RequestParams::default(),
        Some(raw) => match RequestParams::from_value(raw) {
            Some(params) => params,
            None => return Envelope::malformed(id, "params must be an object or array"),
        },
    };

    match id {
        Some(id) => Envelope::Request(JsonRpcRequest {
            version: JsonRpcVersion::V2_0,
            method,
            params,
            id,
        }),
        None => Envelope::Notification(JsonRpcNotification {
            version: JsonRpcVersion::V2_0,
            method,
            params,
        }),
    }
}

fn classify_response(mut obj: Map<String, Value>, id: Option<RequestId>) -> Envelope {
    let outcome = match (obj.remove("result"), obj.remove("error")) {
        (Some(result), None) => ClientOutcome::Result(result),
        (None, Some(error)) => ClientOutcome::Error(error),
        (Some(_), Some(_)) => {
            return Envelope::malformed(id, "result and error are mutually exclusive");
        }
        (None, None) => return Envelope::malformed(id, "method is required"),
    };
    Envelope::Response(ClientResponse { id, outcome })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
