//! Batch orchestration.
//!
//! Elements run one after another in array order and are always served
//! unary. Notifications and client responses contribute no entry; every
//! request and every malformed element contributes exactly one.

use tracing::debug;

use crate::dispatch::{Dispatcher, SessionContext};
use crate::envelope::BatchEnvelope;
use crate::response::JsonRpcMessage;

impl Dispatcher {
    /// Run every element of `batch` and collect the responses in order.
    ///
    /// An empty result means the batch held only notifications or responses
    /// and the transport should acknowledge it without a body.
    pub async fn run_batch(
        &self,
        batch: BatchEnvelope,
        session: &SessionContext,
    ) -> Vec<JsonRpcMessage> {
        let total = batch.len();
        let mut responses = Vec::with_capacity(total);
        for envelope in batch.into_inner() {
            if let Some(message) = self.reply(envelope, session).await {
                responses.push(message);
            }
        }
        debug!(elements = total, responses = responses.len(), "batch complete");
        responses
    }
}
