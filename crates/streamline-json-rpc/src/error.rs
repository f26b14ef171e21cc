use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::types::{JsonRpcVersion, RequestId, deserialize_present_id};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => crate::error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => crate::error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => crate::error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => crate::error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => crate::error_codes::INTERNAL_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
        }
    }

    /// Reverse lookup from a wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            crate::error_codes::PARSE_ERROR => Some(JsonRpcErrorCode::ParseError),
            crate::error_codes::INVALID_REQUEST => Some(JsonRpcErrorCode::InvalidRequest),
            crate::error_codes::METHOD_NOT_FOUND => Some(JsonRpcErrorCode::MethodNotFound),
            crate::error_codes::INVALID_PARAMS => Some(JsonRpcErrorCode::InvalidParams),
            crate::error_codes::INTERNAL_ERROR => Some(JsonRpcErrorCode::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, message, None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }

    /// The taxonomy kind of this object, if it uses one of the standard codes.
    pub fn kind(&self) -> Option<JsonRpcErrorCode> {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// JSON-RPC error response.
///
/// `id` is omitted from the wire when the offending envelope had no
/// recoverable id (parse errors, empty batches, id-less malformed input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    #[serde(
        default,
        deserialize_with = "deserialize_present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error(None))
    }

    pub fn invalid_request(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(message))
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, message: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::invalid_params(message))
    }

    pub fn internal_error(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Every caller-facing failure the protocol layer can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> JsonRpcErrorCode {
        match self {
            RpcError::Parse(_) => JsonRpcErrorCode::ParseError,
            RpcError::InvalidRequest(_) => JsonRpcErrorCode::InvalidRequest,
            RpcError::MethodNotFound(_) => JsonRpcErrorCode::MethodNotFound,
            RpcError::InvalidParams(_) => JsonRpcErrorCode::InvalidParams,
            RpcError::Internal(_) => JsonRpcErrorCode::InternalError,
        }
    }

    /// Build the response for this failure, echoing `id` when one is known.
    pub fn into_response(self, id: Option<RequestId>) -> JsonRpcError {
        JsonRpcError::new(id, self.to_error_object())
    }
}

/// Trait for errors that can be converted to JSON-RPC error objects
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    /// Convert this error to a JSON-RPC error object
    fn to_error_object(&self) -> JsonRpcErrorObject;
}

impl ToJsonRpcError for RpcError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            RpcError::Parse(_) => JsonRpcErrorObject::parse_error(None),
            RpcError::InvalidRequest(msg) => JsonRpcErrorObject::invalid_request(Some(msg.clone())),
            RpcError::MethodNotFound(method) => JsonRpcErrorObject::method_not_found(method),
            RpcError::InvalidParams(msg) => JsonRpcErrorObject::invalid_params(msg),
            RpcError::Internal(msg) => JsonRpcErrorObject::internal_error(Some(msg.clone())),
        }
    }
}

/// Failure raised by a capability during invocation.
///
/// Parameter validation belongs to the capability; anything that is not an
/// explicit `InvalidParams` is reported as an internal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    Internal(String),
}

impl CapabilityError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        CapabilityError::InvalidParams(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CapabilityError::Internal(message.into())
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(err: serde_json::Error) -> Self {
        CapabilityError::InvalidParams(err.to_string())
    }
}

impl From<CapabilityError> for RpcError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::InvalidParams(msg) => RpcError::InvalidParams(msg),
            CapabilityError::Internal(msg) => RpcError::Internal(msg),
        }
    }
}

impl ToJsonRpcError for CapabilityError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            CapabilityError::InvalidParams(msg) => JsonRpcErrorObject::invalid_params(msg),
            CapabilityError::Internal(msg) => JsonRpcErrorObject::internal_error(Some(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        assert_eq!(
            JsonRpcErrorCode::from_code(-32602),
            Some(JsonRpcErrorCode::InvalidParams)
        );
        assert_eq!(JsonRpcErrorCode::from_code(-32000), None);
    }

    #[test]
    fn test_error_serialization() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "test");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["message"], "Method 'test' not found");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_missing_id_is_omitted_but_null_id_is_kept() {
        let without = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert!(without.get("id").is_none());

        let with_null =
            serde_json::to_value(JsonRpcError::invalid_request(Some(RequestId::Null), None))
                .unwrap();
        assert!(with_null.get("id").unwrap().is_null());

        let parsed: JsonRpcError = serde_json::from_value(with_null).unwrap();
        assert_eq!(parsed.id, Some(RequestId::Null));
    }

    #[test]
    fn test_capability_error_mapping() {
        let rpc: RpcError = CapabilityError::invalid_params("Division by zero").into();
        assert_eq!(rpc.code(), JsonRpcErrorCode::InvalidParams);
        assert_eq!(rpc.to_error_object().message, "Division by zero");

        let rpc: RpcError = CapabilityError::internal("boom").into();
        assert_eq!(rpc.to_error_object().code, -32603);
    }
}
