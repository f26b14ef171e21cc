//! Shared harness: boots the demo server on an ephemeral port and talks to it
//! with a plain hyper client.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Method, Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use streamline_http::sse::SseFrame;
use streamline_http::{CancellationHandle, ServerConfig};
use streamline_server::{DemoPacing, demo_server};

pub const PROTOCOL_VERSION: &str = "2025-06-18";
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub type TestClient = Client<HttpConnector, Full<Bytes>>;

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: CancellationHandle,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|config| config).await
    }

    pub async fn start_with(configure: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        Self::start_paced(configure, DemoPacing::immediate()).await
    }

    /// Like [`TestServer::start_with`], with real delays between streamed partials.
    pub async fn start_paced(
        configure: impl FnOnce(ServerConfig) -> ServerConfig,
        pacing: DemoPacing,
    ) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let config = configure(ServerConfig {
            heartbeat_interval: Duration::from_millis(50),
            ..ServerConfig::default()
        });
        let server = demo_server(config, pacing).expect("valid config");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let shutdown = server.shutdown_handle();

        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let _ = server
                .run_until(listener, async move { signal.cancelled().await })
                .await;
        });

        Self {
            addr,
            shutdown,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }

    pub fn shutdown_handle(&self) -> CancellationHandle {
        self.shutdown.clone()
    }

    /// `POST /mcp` with a well-formed set of headers
    pub fn post(&self) -> hyper::http::request::Builder {
        Request::builder()
            .method(Method::POST)
            .uri(self.url())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .header("MCP-Protocol-Version", PROTOCOL_VERSION)
            .header("Origin", "http://localhost:3000")
    }

    pub fn get_stream(&self) -> hyper::http::request::Builder {
        Request::builder()
            .method(Method::GET)
            .uri(self.url())
            .header(ACCEPT, "text/event-stream")
            .header("MCP-Protocol-Version", PROTOCOL_VERSION)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.task.abort();
    }
}

/// Replace (rather than append) a header on `builder`.
pub fn set_header(
    mut builder: hyper::http::request::Builder,
    name: &str,
    value: &str,
) -> hyper::http::request::Builder {
    if let Some(headers) = builder.headers_mut() {
        headers.insert(
            HeaderName::from_bytes(name.as_bytes()).expect("header name"),
            HeaderValue::from_str(value).expect("header value"),
        );
    }
    builder
}

/// Drop a header from `builder`.
pub fn remove_header(
    mut builder: hyper::http::request::Builder,
    name: &str,
) -> hyper::http::request::Builder {
    if let Some(headers) = builder.headers_mut() {
        headers.remove(name);
    }
    builder
}

pub fn client() -> TestClient {
    Client::builder(TokioExecutor::new()).build_http()
}

/// Send `builder` with an empty body.
pub async fn send(client: &TestClient, builder: hyper::http::request::Builder) -> Response<Incoming> {
    send_body(client, builder, Bytes::new()).await
}

pub async fn send_body(
    client: &TestClient,
    builder: hyper::http::request::Builder,
    body: impl Into<Bytes>,
) -> Response<Incoming> {
    let request = builder.body(Full::new(body.into())).expect("request");
    timeout(TIMEOUT, client.request(request))
        .await
        .expect("request timeout")
        .expect("request failed")
}

pub async fn send_json(
    client: &TestClient,
    builder: hyper::http::request::Builder,
    body: &Value,
) -> Response<Incoming> {
    send_body(client, builder, body.to_string()).await
}

pub async fn body_bytes(response: Response<Incoming>) -> Bytes {
    timeout(TIMEOUT, response.into_body().collect())
        .await
        .expect("body timeout")
        .expect("body read")
        .to_bytes()
}

pub async fn body_json(response: Response<Incoming>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

pub async fn body_text(response: Response<Incoming>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("UTF-8 body")
}

/// Read from a (possibly endless) SSE body until `count` frames arrived.
pub async fn read_frames(response: Response<Incoming>, count: usize) -> Vec<SseFrame> {
    let mut body = response.into_body();
    let mut text = String::new();
    loop {
        let frames = SseFrame::parse_all(&text);
        if frames.len() >= count {
            return frames;
        }
        let frame = timeout(TIMEOUT, body.frame())
            .await
            .expect("SSE frame timeout")
            .expect("SSE body ended early")
            .expect("SSE body error");
        if let Ok(data) = frame.into_data() {
            text.push_str(std::str::from_utf8(&data).expect("UTF-8 frame"));
        }
    }
}

/// Read an SSE body to the end and decode every frame.
pub async fn all_frames(response: Response<Incoming>) -> Vec<SseFrame> {
    SseFrame::parse_all(&body_text(response).await)
}

pub fn frame_json(frame: &SseFrame) -> Value {
    serde_json::from_str(&frame.data).expect("frame data is JSON")
}
