use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};

use streamline_json_rpc::{Capability, CapabilityError, PartialSink, RequestParams, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn parse(name: &str) -> Result<Self, CapabilityError> {
        match name {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            other => Err(CapabilityError::InvalidParams(format!(
                "Unknown operation: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalculateArgs {
    operation: String,
    a: Number,
    b: Number,
}

impl CalculateArgs {
    /// Apply the operation. Integer operands stay integral except for division.
    fn evaluate(&self) -> Result<Value, CapabilityError> {
        let operation = Operation::parse(&self.operation)?;

        if let (Some(a), Some(b)) = (self.a.as_i64(), self.b.as_i64()) {
            let exact = match operation {
                Operation::Add => a.checked_add(b),
                Operation::Subtract => a.checked_sub(b),
                Operation::Multiply => a.checked_mul(b),
                Operation::Divide => None,
            };
            if let Some(result) = exact {
                return Ok(Value::from(result));
            }
        }

        let (a, b) = (as_f64(&self.a)?, as_f64(&self.b)?);
        let result = match operation {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide if b == 0.0 => {
                return Err(CapabilityError::InvalidParams(
                    "Division by zero".to_string(),
                ));
            }
            Operation::Divide => a / b,
        };
        Number::from_f64(result)
            .map(Value::Number)
            .ok_or_else(|| CapabilityError::InvalidParams("Result is not finite".to_string()))
    }
}

fn as_f64(number: &Number) -> Result<f64, CapabilityError> {
    number
        .as_f64()
        .ok_or_else(|| CapabilityError::InvalidParams(format!("Not a finite number: {}", number)))
}

/// Basic arithmetic over two numbers.
#[derive(Debug, Default)]
pub struct Calculate;

impl Calculate {
    fn args(params: &RequestParams) -> Result<CalculateArgs, CapabilityError> {
        Ok(params.parse::<CalculateArgs>()?)
    }
}

#[async_trait]
impl Capability for Calculate {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Add, subtract, multiply or divide two numbers"
    }

    async fn invoke(
        &self,
        params: &RequestParams,
        _session: &SessionContext,
    ) -> Result<Value, CapabilityError> {
        let args = Self::args(params)?;
        let result = args.evaluate()?;
        Ok(json!({
            "operation": args.operation,
            "a": args.a,
            "b": args.b,
            "result": result,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    fn accepts_streaming(&self) -> bool {
        true
    }

    fn stream_context(&self, params: &RequestParams) -> Map<String, Value> {
        let mut context = Map::new();
        if let Some(operation) = params.get("operation") {
            context.insert("operation".to_string(), operation.clone());
        }
        context
    }

    async fn stream_invoke(
        &self,
        params: RequestParams,
        _session: SessionContext,
        _sink: PartialSink,
    ) -> Result<Value, CapabilityError> {
        Self::args(&params)?.evaluate()
    }
}
