use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use streamline_json_rpc::{Capability, CapabilityError, PartialSink, RequestParams, SessionContext};

const DEFAULT_COUNT: u64 = 5;
const MAX_COUNT: u64 = 1000;

#[derive(Debug, Deserialize)]
struct StreamDataArgs {
    #[serde(default = "default_count")]
    count: u64,
}

fn default_count() -> u64 {
    DEFAULT_COUNT
}

/// Emits `count` numbered items, one partial result each when streamed.
pub struct StreamData {
    interval: Duration,
}

impl StreamData {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(300))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    fn args(params: &RequestParams) -> Result<StreamDataArgs, CapabilityError> {
        let args = params.parse::<StreamDataArgs>()?;
        if args.count > MAX_COUNT {
            return Err(CapabilityError::InvalidParams(format!(
                "count must be at most {}",
                MAX_COUNT
            )));
        }
        Ok(args)
    }
}

impl Default for StreamData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for StreamData {
    fn name(&self) -> &str {
        "stream_data"
    }

    fn description(&self) -> &str {
        "Generate a sequence of numbered items"
    }

    async fn invoke(
        &self,
        params: &RequestParams,
        _session: &SessionContext,
    ) -> Result<Value, CapabilityError> {
        let args = Self::args(params)?;
        Ok(json!({
            "message": format!("Generated {} items", args.count),
            "count": args.count,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    fn accepts_streaming(&self) -> bool {
        true
    }

    fn stream_context(&self, params: &RequestParams) -> Map<String, Value> {
        let count = Self::args(params).map(|args| args.count).unwrap_or(DEFAULT_COUNT);
        let mut context = Map::new();
        context.insert("count".to_string(), Value::from(count));
        context
    }

    async fn stream_invoke(
        &self,
        params: RequestParams,
        _session: SessionContext,
        mut sink: PartialSink,
    ) -> Result<Value, CapabilityError> {
        let args = Self::args(&params)?;
        for index in 1..=args.count {
            sink.send(json!({"index": index, "value": format!("Item {}", index)}))
                .await?;
            if index < args.count {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(json!({"total": args.count}))
    }
}
