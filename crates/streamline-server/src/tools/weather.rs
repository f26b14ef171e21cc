use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use streamline_json_rpc::{Capability, CapabilityError, PartialSink, RequestParams, SessionContext};

const DEFAULT_LOCATION: &str = "Seoul";

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    #[serde(default = "default_location")]
    location: String,
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

/// Canned weather report for a location.
pub struct GetWeather {
    interval: Duration,
}

impl GetWeather {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(500))
    }

    /// Pause between streamed fields
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    fn args(params: &RequestParams) -> Result<WeatherArgs, CapabilityError> {
        Ok(params.parse::<WeatherArgs>()?)
    }

    fn report(location: &str) -> [(&'static str, String); 4] {
        [
            ("location", location.to_string()),
            ("temperature", "22°C".to_string()),
            ("condition", "Clear".to_string()),
            ("humidity", "65%".to_string()),
        ]
    }
}

impl Default for GetWeather {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for GetWeather {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    async fn invoke(
        &self,
        params: &RequestParams,
        _session: &SessionContext,
    ) -> Result<Value, CapabilityError> {
        let args = Self::args(params)?;
        let mut result: Map<String, Value> = Self::report(&args.location)
            .into_iter()
            .map(|(field, value)| (field.to_string(), Value::String(value)))
            .collect();
        result.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        Ok(Value::Object(result))
    }

    fn accepts_streaming(&self) -> bool {
        true
    }

    fn stream_context(&self, params: &RequestParams) -> Map<String, Value> {
        let mut context = Map::new();
        if let Ok(args) = Self::args(params) {
            context.insert("location".to_string(), Value::String(args.location));
        }
        context
    }

    async fn stream_invoke(
        &self,
        params: RequestParams,
        _session: SessionContext,
        mut sink: PartialSink,
    ) -> Result<Value, CapabilityError> {
        let args = Self::args(&params)?;
        let report = Self::report(&args.location);
        let last = report.len() - 1;
        for (index, (field, value)) in report.into_iter().enumerate() {
            sink.send(json!({"field": field, "value": value})).await?;
            if index < last {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(Value::Null)
    }
}
