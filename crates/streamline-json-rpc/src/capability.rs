//! The capability contract every registered method implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::dispatch::SessionContext;
use crate::error::CapabilityError;
use crate::request::RequestParams;
use crate::stream::PartialSink;

/// A named unit of server-side functionality, resolved by exact method name.
///
/// Implementations validate their own parameters and report rejections as
/// [`CapabilityError::InvalidParams`]. Anything else that goes wrong,
/// including a panic, surfaces to the caller as an internal error.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Method name this capability is registered under.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Produce one result for a unary call.
    async fn invoke(
        &self,
        params: &RequestParams,
        session: &SessionContext,
    ) -> Result<Value, CapabilityError>;

    /// Whether `stream_invoke` produces partial results.
    fn accepts_streaming(&self) -> bool {
        false
    }

    /// Fields echoed in the start frame of a streamed call.
    fn stream_context(&self, params: &RequestParams) -> Map<String, Value> {
        let _ = params;
        Map::new()
    }

    /// Push partial results into `sink` in order, then return the summary that
    /// closes the stream. An `Err` ends the stream with a single error frame.
    ///
    /// The default runs [`Capability::invoke`] and uses its result as the summary.
    async fn stream_invoke(
        &self,
        params: RequestParams,
        session: SessionContext,
        sink: PartialSink,
    ) -> Result<Value, CapabilityError> {
        let _ = sink;
        self.invoke(&params, &session).await
    }
}
