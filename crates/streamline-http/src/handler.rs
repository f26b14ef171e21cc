//! HTTP handler for the single Streamable HTTP endpoint.

use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, info, warn};

use streamline_json_rpc::{
    DispatchOutcome, Dispatcher, Envelope, Inbound, JsonRpcMessage, SessionContext, classify,
};

use crate::Rejection;
use crate::cancellation::CancellationHandle;
use crate::cors::CorsLayer;
use crate::gate::TransportGate;
use crate::protocol::{extract_origin, is_json_content_type};
use crate::responses::{self, BoxBody};
use crate::server::ServerConfig;
use crate::streaming::{encode_call, push_stream};

const INFO_PATH: &str = "/";
const SERVER_BANNER: &str = "Streamline JSON-RPC 2.0 Server";

/// Routes `POST`, `GET` and `OPTIONS` on the configured path, plus `GET /`.
#[derive(Clone)]
pub struct StreamableHandler {
    config: Arc<ServerConfig>,
    gate: TransportGate,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationHandle,
}

impl StreamableHandler {
    pub fn new(
        config: Arc<ServerConfig>,
        dispatcher: Arc<Dispatcher>,
        shutdown: CancellationHandle,
    ) -> Self {
        let gate = TransportGate::new(
            config.allowed_origins.clone(),
            config.protocol_version.clone(),
        );
        Self {
            config,
            gate,
            dispatcher,
            shutdown,
        }
    }

    pub fn gate(&self) -> &TransportGate {
        &self.gate
    }

    /// Handle one HTTP exchange. Never fails: every path ends in a response.
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<BoxBody>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        debug!("Handling {} {}", method, req.uri().path());

        if req.uri().path() == INFO_PATH && self.config.mcp_path != INFO_PATH {
            return self.handle_info(&method, req.headers());
        }
        if req.uri().path() != self.config.mcp_path {
            return responses::plain_text(StatusCode::NOT_FOUND, "Not Found");
        }

        let origin = extract_origin(req.headers())
            .ok()
            .flatten()
            .map(str::to_string);
        let result = match method.clone() {
            Method::POST => self.handle_post(req).await,
            Method::GET => self.handle_get(req.headers()),
            Method::OPTIONS => self.handle_preflight(req.headers()),
            other => Err(Rejection::MethodNotAllowed(format!(
                "{} is not supported on {}",
                other, self.config.mcp_path
            ))),
        };

        let mut response = result.unwrap_or_else(|rejection| {
            warn!(method = %method, status = %rejection.status(), "rejected: {}", rejection);
            responses::rejection(&rejection)
        });

        if self.config.enable_cors {
            if let Some(origin) = origin.filter(|o| self.gate.is_origin_allowed(o)) {
                CorsLayer::apply_cors_headers_for_origin(response.headers_mut(), &origin);
            }
        }
        response
    }

    /// `GET /`: server name, protocol version, endpoint and registered capabilities.
    fn handle_info(&self, method: &Method, headers: &HeaderMap) -> Response<BoxBody> {
        if *method != Method::GET {
            return responses::rejection(&Rejection::MethodNotAllowed(format!(
                "{} is not supported on {}",
                method, INFO_PATH
            )));
        }
        if let Err(rejection) = self.gate.check_origin(headers) {
            warn!(status = %rejection.status(), "info request rejected: {}", rejection);
            return responses::rejection(&rejection);
        }

        let capabilities = self.dispatcher.describe();
        let tools: Vec<&str> = capabilities.iter().map(|c| c.name.as_str()).collect();
        responses::json(
            StatusCode::OK,
            &json!({
                "message": SERVER_BANNER,
                "protocol_version": self.gate.protocol_version(),
                "endpoint": self.config.mcp_path,
                "tools": tools,
                "capabilities": capabilities,
            }),
        )
    }

    async fn handle_post<B>(&self, req: Request<B>) -> Result<Response<BoxBody>, Rejection>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let session = self.gate.validate(&Method::POST, req.headers())?;
        if !is_json_content_type(req.headers()) {
            return Err(Rejection::UnsupportedMediaType(
                "Content-Type must be application/json".to_string(),
            ));
        }

        let body = self.read_body(req.into_body()).await?;
        let response = match classify(&body) {
            Err(err) => {
                warn!(session_id = %session.session_id, "unparseable body: {}", err);
                responses::reply(&JsonRpcMessage::Error(err.into_response(None)))
            }
            Ok(Inbound::Single(envelope)) => self.handle_single(envelope, &session).await,
            Ok(Inbound::Batch(batch)) => {
                let replies = self.dispatcher.run_batch(batch, &session).await;
                if replies.is_empty() {
                    responses::empty(StatusCode::ACCEPTED)
                } else {
                    responses::json(StatusCode::OK, &replies)
                }
            }
        };

        Ok(responses::with_session(
            response,
            &session,
            self.gate.protocol_version(),
        ))
    }

    async fn handle_single(&self, envelope: Envelope, session: &SessionContext) -> Response<BoxBody> {
        let streaming = envelope.stream_requested();
        match self.dispatcher.dispatch(envelope, streaming, session).await {
            DispatchOutcome::Reply(message) => responses::reply(&message),
            DispatchOutcome::Stream(call) => {
                responses::sse(encode_call(call, self.shutdown.clone()))
            }
            DispatchOutcome::Accepted => responses::empty(StatusCode::ACCEPTED),
        }
    }

    fn handle_get(&self, headers: &HeaderMap) -> Result<Response<BoxBody>, Rejection> {
        let session = self.gate.validate(&Method::GET, headers)?;
        info!(session_id = %session.session_id, "opening push stream");

        let stream = push_stream(
            self.config.mcp_path.clone(),
            session.session_id.clone(),
            self.config.heartbeat_interval,
            self.shutdown.clone(),
        );
        Ok(responses::with_session(
            responses::sse(stream),
            &session,
            self.gate.protocol_version(),
        ))
    }

    fn handle_preflight(&self, headers: &HeaderMap) -> Result<Response<BoxBody>, Rejection> {
        self.gate.check_origin(headers)?;
        Ok(responses::empty(StatusCode::NO_CONTENT))
    }

    async fn read_body<B>(&self, body: B) -> Result<Bytes, Rejection>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limit = self.config.max_body_size;
        match Limited::new(body, limit).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                Err(Rejection::PayloadTooLarge { limit })
            }
            Err(err) => Err(Rejection::BadRequest(format!(
                "failed to read request body: {}",
                err
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use http_body_util::Full;
    use serde_json::{Value, json};
    use streamline_json_rpc::{Capability, CapabilityError, PartialSink, RequestParams};

    use crate::sse::SseFrame;

    struct Calculator;

    #[async_trait]
    impl Capability for Calculator {
        fn name(&self) -> &str {
            "calculate"
        }

        async fn invoke(
            &self,
            params: &RequestParams,
            _session: &SessionContext,
        ) -> Result<Value, CapabilityError> {
            let a = params.get("a").and_then(Value::as_f64).unwrap_or_default();
            let b = params.get("b").and_then(Value::as_f64).unwrap_or_default();
            if b == 0.0 {
                return Err(CapabilityError::invalid_params("Division by zero"));
            }
            Ok(json!({"result": a / b}))
        }

        fn accepts_streaming(&self) -> bool {
            true
        }

        async fn stream_invoke(
            &self,
            params: RequestParams,
            session: SessionContext,
            mut sink: PartialSink,
        ) -> Result<Value, CapabilityError> {
            sink.send(json!({"step": "dividing"})).await?;
            self.invoke(&params, &session).await
        }
    }

    fn handler() -> StreamableHandler {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Calculator);
        StreamableHandler::new(
            Arc::new(ServerConfig::default()),
            Arc::new(dispatcher),
            CancellationHandle::new(),
        )
    }

    fn post(body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/mcp")
            .header("content-type", "application/json")
            .header("accept", "application/json, text/event-stream")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_json(response: Response<BoxBody>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unary_success() {
        let response = handler()
            .handle_request(post(
                r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":10,"b":4},"id":1}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("mcp-session-id"));
        assert_eq!(response.headers()["mcp-protocol-version"], "2025-06-18");

        let body = body_json(response).await;
        assert_eq!(body["result"]["result"], 2.5);
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let handler = handler();
        let cases = [
            (r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":1,"b":0},"id":1}"#, StatusCode::BAD_REQUEST, -32602),
            (r#"{"jsonrpc":"2.0","method":"nonexistent_tool","id":2}"#, StatusCode::NOT_FOUND, -32601),
            (r#"{"jsonrpc":"2.0","method":"calculate""#, StatusCode::BAD_REQUEST, -32700),
            (r#"{"jsonrpc":"1.0","method":"calculate","id":3}"#, StatusCode::BAD_REQUEST, -32600),
            (r#"[]"#, StatusCode::BAD_REQUEST, -32600),
        ];
        for (body, status, code) in cases {
            let response = handler.handle_request(post(body)).await;
            assert_eq!(response.status(), status, "body: {}", body);
            let json = body_json(response).await;
            assert_eq!(json["error"]["code"], code, "body: {}", body);
        }
    }

    #[tokio::test]
    async fn test_empty_batch_has_no_id() {
        let response = handler().handle_request(post("[]")).await;
        let json = body_json(response).await;
        assert!(json.is_object());
        assert!(json.get("id").is_none());
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let response = handler()
            .handle_request(post(r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":1,"b":0}}"#))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());

        let client_response = handler()
            .handle_request(post(r#"{"jsonrpc":"2.0","result":{},"id":7}"#))
            .await;
        assert_eq!(client_response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_batch_returns_array_without_notifications() {
        let response = handler()
            .handle_request(post(
                r#"[
                    {"jsonrpc":"2.0","method":"calculate","params":{"a":4,"b":2},"id":1},
                    {"jsonrpc":"2.0","method":"calculate","params":{"a":4,"b":2}},
                    {"jsonrpc":"2.0","method":"nope","id":2}
                ]"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 1);
        assert_eq!(items[1]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_streaming_post_returns_sse() {
        let response = handler()
            .handle_request(post(
                r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":9,"b":3,"stream":true},"id":"s1"}"#,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["cache-control"], "no-cache");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let frames = SseFrame::parse_all(std::str::from_utf8(&bytes).unwrap());
        let statuses: Vec<Value> = frames
            .iter()
            .map(|f| serde_json::from_str::<Value>(&f.data).unwrap()["result"]["status"].clone())
            .collect();
        assert_eq!(statuses, vec![json!("start"), json!("data"), json!("complete")]);
    }

    #[tokio::test]
    async fn test_transport_rejections() {
        let handler = handler();

        let mut evil = post(r#"{"jsonrpc":"2.0","method":"calculate","id":1}"#);
        evil.headers_mut()
            .insert("origin", "https://evil.example".parse().unwrap());
        let response = handler.handle_request(evil).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.headers().contains_key("access-control-allow-origin"));

        let mut wrong_type = post("{}");
        wrong_type
            .headers_mut()
            .insert("content-type", "text/plain".parse().unwrap());
        assert_eq!(
            handler.handle_request(wrong_type).await.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );

        let mut wrong_version = post("{}");
        wrong_version
            .headers_mut()
            .insert("mcp-protocol-version", "1999-01-01".parse().unwrap());
        assert_eq!(
            handler.handle_request(wrong_version).await.status(),
            StatusCode::BAD_REQUEST
        );

        let oversized = post(&" ".repeat(ServerConfig::default().max_body_size + 1));
        assert_eq!(
            handler.handle_request(oversized).await.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/mcp")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            handler.handle_request(delete).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let other_path = Request::builder()
            .uri("/elsewhere")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            handler.handle_request(other_path).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_root_describes_server() {
        let handler = handler();
        let root = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler.handle_request(root).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");

        let json = body_json(response).await;
        assert_eq!(json["message"], "Streamline JSON-RPC 2.0 Server");
        assert_eq!(json["protocol_version"], "2025-06-18");
        assert_eq!(json["endpoint"], "/mcp");
        assert_eq!(json["tools"], json!(["calculate"]));
        assert_eq!(json["capabilities"][0]["streaming"], true);

        let post_root = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            handler.handle_request(post_root).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let evil_root = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header("origin", "https://evil.example")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            handler.handle_request(evil_root).await.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_cors_reflects_allowed_origin() {
        let mut request = post(r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":1,"b":1},"id":1}"#);
        request
            .headers_mut()
            .insert("origin", "http://localhost:5173".parse().unwrap());
        let response = handler().handle_request(request).await;
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_session_id_echoed() {
        let mut request = post(r#"{"jsonrpc":"2.0","method":"calculate","params":{"a":1,"b":1},"id":1}"#);
        request
            .headers_mut()
            .insert("mcp-session-id", "existing-session".parse().unwrap());
        let response = handler().handle_request(request).await;
        assert_eq!(response.headers()["mcp-session-id"], "existing-session");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_push_stream() {
        let handler = handler();

        let no_sse = Request::builder()
            .method(Method::GET)
            .uri("/mcp")
            .header("accept", "application/json")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            handler.handle_request(no_sse).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let get = Request::builder()
            .method(Method::GET)
            .uri("/mcp")
            .header("accept", "text/event-stream")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handler.handle_request(get).await;
        assert_eq!(response.status(), StatusCode::OK);
        let session_id = response.headers()["mcp-session-id"].to_str().unwrap().to_string();

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let frames = SseFrame::parse_all(std::str::from_utf8(&first).unwrap());
        assert_eq!(frames[0].event.as_deref(), Some("endpoint"));
        let endpoint: Value = serde_json::from_str(&frames[0].data).unwrap();
        assert_eq!(endpoint["params"]["sessionId"], session_id.as_str());

        let second = body.next().await.unwrap().unwrap();
        let heartbeat = SseFrame::parse_all(std::str::from_utf8(&second).unwrap());
        assert_eq!(heartbeat[0].event.as_deref(), Some("message"));
    }
}
