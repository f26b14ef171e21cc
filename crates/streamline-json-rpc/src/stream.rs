//! Streamed calls: the partial-result channel and the frame payloads of one call.
//!
//! A streaming capability is a producer writing into a [`PartialSink`]. The
//! sink is a bounded channel with a single slot per producer, so the producer
//! runs at most one partial ahead of whoever turns partials into frames.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::capability::Capability;
use crate::dispatch::SessionContext;
use crate::error::{CapabilityError, RpcError};
use crate::request::RequestParams;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;

/// The consumer of a stream went away; the producer should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream consumer closed")]
pub struct SinkClosed;

impl From<SinkClosed> for CapabilityError {
    fn from(_: SinkClosed) -> Self {
        CapabilityError::internal("stream consumer closed")
    }
}

/// Write half handed to [`Capability::stream_invoke`].
#[derive(Debug, Clone)]
pub struct PartialSink {
    tx: mpsc::Sender<Value>,
}

impl PartialSink {
    /// Create a sink and the receiver the encoder drains.
    pub fn channel() -> (Self, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(0);
        (Self { tx }, rx)
    }

    /// Emit one partial result. Waits until the previous one was taken.
    pub async fn send(&mut self, partial: Value) -> Result<(), SinkClosed> {
        self.tx.send(partial).await.map_err(|_| SinkClosed)
    }
}

/// Lifecycle marker carried in `result.status` of every success frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Start,
    Data,
    Complete,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Start => "start",
            StreamStatus::Data => "data",
            StreamStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that will be answered as a sequence of frames.
pub struct StreamCall {
    pub id: RequestId,
    pub method: String,
    pub context: Map<String, Value>,
    capability: Arc<dyn Capability>,
    params: RequestParams,
    session: SessionContext,
}

impl StreamCall {
    pub(crate) fn new(
        id: RequestId,
        capability: Arc<dyn Capability>,
        params: RequestParams,
        session: SessionContext,
    ) -> Self {
        let context = capability.stream_context(&params);
        Self {
            id,
            method: capability.name().to_string(),
            context,
            capability,
            params,
            session,
        }
    }

    /// The producer future. Panics inside the capability resolve to an internal error.
    pub fn producer(&self, sink: PartialSink) -> BoxFuture<'static, Result<Value, CapabilityError>> {
        let capability = Arc::clone(&self.capability);
        let params = self.params.clone();
        let session = self.session.clone();
        let method = self.method.clone();

        async move {
            let run = capability.stream_invoke(params, session, sink);
            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(method = %method, "streaming capability panicked: {}", message);
                    Err(CapabilityError::Internal(message))
                }
            }
        }
        .boxed()
    }

    pub fn start_frame(&self) -> JsonRpcMessage {
        let mut result = Map::new();
        result.insert("tool".to_string(), Value::String(self.method.clone()));
        result.extend(self.context.clone());
        self.status_message(StreamStatus::Start, result)
    }

    pub fn data_frame(&self, partial: Value) -> JsonRpcMessage {
        let result = match partial {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        self.status_message(StreamStatus::Data, result)
    }

    pub fn complete_frame(&self, summary: Value) -> JsonRpcMessage {
        let mut result = Map::new();
        result.insert("tool".to_string(), Value::String(self.method.clone()));
        match summary {
            Value::Object(fields) => result.extend(fields),
            Value::Null => {}
            other => {
                result.insert("result".to_string(), other);
            }
        }
        self.status_message(StreamStatus::Complete, result)
    }

    pub fn error_frame(&self, error: RpcError) -> JsonRpcMessage {
        JsonRpcMessage::Error(error.into_response(Some(self.id.clone())))
    }

    fn status_message(&self, status: StreamStatus, mut result: Map<String, Value>) -> JsonRpcMessage {
        result.insert("status".to_string(), Value::String(status.as_str().to_string()));
        JsonRpcMessage::success(self.id.clone(), Value::Object(result))
    }
}

impl fmt::Debug for StreamCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "capability panicked".to_string()
    }
}
