use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::capability::Capability;
use crate::envelope::Envelope;
use crate::error::{CapabilityError, RpcError};
use crate::notification::JsonRpcNotification;
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, build_response};
use crate::stream::{StreamCall, panic_message};

/// Per-exchange context produced by the transport gate.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    /// Echoed or freshly minted session identifier
    pub session_id: String,
    /// `MCP-Protocol-Version` sent by the client, if any
    pub protocol_version: Option<String>,
    /// Unix milliseconds at which the exchange was admitted
    pub timestamp: u64,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            session_id: session_id.into(),
            protocol_version: None,
            timestamp,
        }
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }
}

/// What the transport should do with one dispatched envelope.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Exactly one response object.
    Reply(JsonRpcMessage),
    /// A framed sequence produced by a streaming capability.
    Stream(StreamCall),
    /// Nothing to send beyond an acknowledgement of receipt.
    Accepted,
}

/// Public summary of one registered capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub description: String,
    pub streaming: bool,
}

/// Handler registry: method name to capability.
///
/// Populated at startup, read-only afterwards, so a shared `Arc<Dispatcher>`
/// serves concurrent exchanges without locking.
#[derive(Default)]
pub struct Dispatcher {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its own name. A later registration with the
    /// same name replaces the earlier one.
    pub fn register<C>(&mut self, capability: C)
    where
        C: Capability + 'static,
    {
        self.register_arc(Arc::new(capability));
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.name().to_string();
        if self.capabilities.insert(name.clone(), capability).is_some() {
            warn!(method = %name, "capability registered twice, keeping the latest");
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, method: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(method)
    }

    /// Get all registered methods, sorted
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.capabilities.keys().cloned().collect();
        methods.sort();
        methods
    }

    /// Name, description and streaming support of every capability, sorted by name.
    pub fn describe(&self) -> Vec<CapabilityInfo> {
        self.registered_methods()
            .into_iter()
            .filter_map(|name| {
                let capability = self.capabilities.get(&name)?;
                Some(CapabilityInfo {
                    description: capability.description().to_string(),
                    streaming: capability.accepts_streaming(),
                    name,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Route one envelope.
    ///
    /// With `streaming_requested`, a request to a streaming-capable method is
    /// returned as [`DispatchOutcome::Stream`]; every other case is served unary.
    pub async fn dispatch(
        &self,
        envelope: Envelope,
        streaming_requested: bool,
        session: &SessionContext,
    ) -> DispatchOutcome {
        if streaming_requested {
            if let Envelope::Request(request) = &envelope {
                if let Some(capability) = self.get(&request.method) {
                    if capability.accepts_streaming() {
                        debug!(method = %request.method, id = %request.id, "opening stream");
                        return DispatchOutcome::Stream(StreamCall::new(
                            request.id.clone(),
                            Arc::clone(capability),
                            request.params.clone(),
                            session.clone(),
                        ));
                    }
                    debug!(method = %request.method, "streaming not supported, serving unary");
                }
            }
        }

        match self.reply(envelope, session).await {
            Some(message) => DispatchOutcome::Reply(message),
            None => DispatchOutcome::Accepted,
        }
    }

    /// Unary handling of one envelope. `None` when nothing may be sent back.
    pub async fn reply(&self, envelope: Envelope, session: &SessionContext) -> Option<JsonRpcMessage> {
        match envelope {
            Envelope::Request(request) => Some(self.handle_request(request, session).await),
            Envelope::Notification(notification) => {
                self.handle_notification(notification, session).await;
                None
            }
            Envelope::Response(response) => {
                debug!(id = ?response.id, error = response.is_error(), "ignoring client response");
                None
            }
            Envelope::Malformed { id, error } => {
                debug!(id = ?id, "rejecting malformed envelope: {}", error);
                Some(JsonRpcMessage::Error(error.into_response(id)))
            }
        }
    }

    /// Process a request and return exactly one response carrying its id.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        session: &SessionContext,
    ) -> JsonRpcMessage {
        debug!(method = %request.method, id = %request.id, "dispatching request");

        let outcome = match self.get(&request.method) {
            Some(capability) => self.invoke(capability, &request, session).await,
            None => Err(RpcError::MethodNotFound(request.method.clone())),
        };
        build_response(request.id, outcome)
    }

    /// Run a notification for its effect. The outcome is only logged.
    pub async fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        session: &SessionContext,
    ) {
        let Some(capability) = self.get(&notification.method) else {
            debug!(method = %notification.method, "no capability for notification");
            return;
        };

        let run = capability.invoke(&notification.params, session);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(_)) => debug!(method = %notification.method, "notification handled"),
            Ok(Err(err)) => {
                warn!(method = %notification.method, "notification failed: {}", err)
            }
            Err(panic) => error!(
                method = %notification.method,
                "capability panicked on notification: {}",
                panic_message(panic.as_ref())
            ),
        }
    }

    async fn invoke(
        &self,
        capability: &Arc<dyn Capability>,
        request: &JsonRpcRequest,
        session: &SessionContext,
    ) -> Result<Value, RpcError> {
        let run = capability.invoke(&request.params, session);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(CapabilityError::InvalidParams(message))) => {
                warn!(method = %request.method, id = %request.id, "invalid params: {}", message);
                Err(RpcError::InvalidParams(message))
            }
            Ok(Err(CapabilityError::Internal(message))) => {
                error!(method = %request.method, id = %request.id, "capability failed: {}", message);
                Err(RpcError::Internal(message))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(method = %request.method, id = %request.id, "capability panicked: {}", message);
                Err(RpcError::Internal(message))
            }
        }
    }
}
