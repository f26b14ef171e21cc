//! Streaming encoder.
//!
//! [`encode_call`] turns one streaming call into `start`, `data`..., then a
//! single terminal frame (`complete` or an error). [`push_stream`] is the
//! unbounded GET stream: an endpoint frame, then heartbeats.
//!
//! Both check the cancellation handle before every frame and stop without
//! writing anything further once it fires.

use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use streamline_json_rpc::{
    JsonRpcMessage, JsonRpcNotification, PartialSink, RequestParams, RpcError, StreamCall,
};

use crate::cancellation::CancellationHandle;
use crate::sse::{ENDPOINT_EVENT, MESSAGE_EVENT, SseFrame};

/// Method name of server-initiated notifications on the push stream
pub const SERVER_NOTIFICATION_METHOD: &str = "server_notification";

// Last-resort payload if a response cannot be serialized.
const FALLBACK_ERROR: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"}}"#;

/// Aborts the producer task when the frame stream is dropped (client gone).
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Encode a streaming call as SSE frames.
///
/// The capability runs as its own task and can be at most one partial
/// ahead of the frame being written.
pub fn encode_call(
    call: StreamCall,
    cancel: CancellationHandle,
) -> impl Stream<Item = SseFrame> + Send + 'static {
    async_stream::stream! {
        if cancel.is_cancelled() {
            return;
        }

        let (sink, mut partials) = PartialSink::channel();
        let producer = tokio::spawn(call.producer(sink));
        let _abort = AbortOnDrop(producer.abort_handle());

        info!(method = %call.method, id = %call.id, "stream started");
        yield message_frame(&call.start_frame());

        let mut emitted = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                partial = partials.next() => Some(partial),
            };
            match next {
                // cancelled
                None => {
                    debug!(method = %call.method, id = %call.id, "stream cancelled");
                    return;
                }
                Some(Some(partial)) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    emitted += 1;
                    yield message_frame(&call.data_frame(partial));
                }
                // producer dropped its sink
                Some(None) => break,
            }
        }

        let terminal = match producer.await {
            Ok(Ok(summary)) => call.complete_frame(summary),
            Ok(Err(err)) => call.error_frame(RpcError::from(err)),
            Err(join_err) => {
                error!(method = %call.method, id = %call.id, "stream producer failed: {}", join_err);
                call.error_frame(RpcError::Internal(join_err.to_string()))
            }
        };
        if cancel.is_cancelled() {
            return;
        }
        info!(
            method = %call.method,
            id = %call.id,
            partials = emitted,
            failed = terminal.is_error(),
            "stream finished"
        );
        yield message_frame(&terminal);
    }
}

/// The standing server-push stream of a GET exchange.
///
/// Runs until the client disconnects (the stream is dropped) or `cancel` fires.
pub fn push_stream(
    endpoint: String,
    session_id: String,
    heartbeat_interval: Duration,
    cancel: CancellationHandle,
) -> impl Stream<Item = SseFrame> + Send + 'static {
    async_stream::stream! {
        if cancel.is_cancelled() {
            return;
        }

        let opened = server_notification(json!({
            "type": "endpoint",
            "message": "SSE stream started",
            "endpoint": endpoint,
            "sessionId": session_id,
        }));
        yield notification_frame(ENDPOINT_EVENT, &opened);

        let mut ticker = tokio::time::interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence: u64 = 0;

        loop {
            let stop = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = ticker.tick() => false,
            };
            if stop || cancel.is_cancelled() {
                debug!(session_id = %session_id, "push stream closed by server");
                break;
            }

            sequence += 1;
            let heartbeat = server_notification(json!({
                "message": format!("Server heartbeat {}", sequence),
                "sequence": sequence,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }));
            yield notification_frame(MESSAGE_EVENT, &heartbeat);
        }
    }
}

fn server_notification(params: Value) -> JsonRpcNotification {
    let params = RequestParams::from_value(params).unwrap_or_default();
    JsonRpcNotification::new(SERVER_NOTIFICATION_METHOD, params)
}

fn message_frame(message: &JsonRpcMessage) -> SseFrame {
    SseFrame::json(Some(MESSAGE_EVENT), message).unwrap_or_else(|err| {
        error!("failed to serialize stream frame: {}", err);
        SseFrame::new(Some(MESSAGE_EVENT), FALLBACK_ERROR)
    })
}

fn notification_frame(event: &str, notification: &JsonRpcNotification) -> SseFrame {
    SseFrame::json(Some(event), notification).unwrap_or_else(|err| {
        error!("failed to serialize notification frame: {}", err);
        SseFrame::new(Some(event), FALLBACK_ERROR)
    })
}
