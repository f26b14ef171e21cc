//! Streamable HTTP server: configuration, builder and accept loop.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use streamline_json_rpc::{Capability, Dispatcher};

use crate::cancellation::CancellationHandle;
use crate::handler::StreamableHandler;
use crate::protocol::SUPPORTED_PROTOCOL_VERSION;
use crate::{HttpError, Result};

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the single endpoint
    pub mcp_path: String,
    /// The only accepted `MCP-Protocol-Version`
    pub protocol_version: String,
    /// Origin prefixes allowed to talk to the server
    pub allowed_origins: Vec<String>,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Interval between heartbeats on the GET push stream
    pub heartbeat_interval: Duration,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            mcp_path: "/mcp".to_string(),
            protocol_version: SUPPORTED_PROTOCOL_VERSION.to_string(),
            allowed_origins: default_allowed_origins(),
            max_body_size: 1024 * 1024, // 1MB
            heartbeat_interval: Duration::from_secs(2),
            enable_cors: true,
        }
    }
}

/// Loopback origins on any port
pub fn default_allowed_origins() -> Vec<String> {
    ["http://localhost:", "http://127.0.0.1:", "http://[::1]:"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.mcp_path.starts_with('/') {
            return Err(HttpError::InvalidConfig(format!(
                "endpoint path must start with '/': {}",
                self.mcp_path
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(HttpError::InvalidConfig(
                "heartbeat interval must be positive".to_string(),
            ));
        }
        if self.max_body_size == 0 {
            return Err(HttpError::InvalidConfig(
                "max body size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`HttpServer`]
pub struct HttpServerBuilder {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the endpoint path
    pub fn mcp_path(mut self, path: impl Into<String>) -> Self {
        self.config.mcp_path = path.into();
        self
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.protocol_version = version.into();
        self
    }

    /// Replace the Origin allow-list
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.allowed_origins = origins;
        self
    }

    /// Add one Origin prefix to the allow-list
    pub fn allow_origin(mut self, prefix: impl Into<String>) -> Self {
        self.config.allowed_origins.push(prefix.into());
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Register a capability
    pub fn capability<C>(mut self, capability: C) -> Self
    where
        C: Capability + 'static,
    {
        self.dispatcher.register(capability);
        self
    }

    /// Register an already shared capability
    pub fn capability_arc(mut self, capability: Arc<dyn Capability>) -> Self {
        self.dispatcher.register_arc(capability);
        self
    }

    /// Use a pre-populated dispatcher, replacing any capabilities registered so far
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn build(self) -> Result<HttpServer> {
        self.config.validate()?;
        Ok(HttpServer {
            config: Arc::new(self.config),
            dispatcher: Arc::new(self.dispatcher),
            shutdown: CancellationHandle::new(),
        })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streamable HTTP server
#[derive(Clone)]
pub struct HttpServer {
    config: Arc<ServerConfig>,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationHandle,
}

impl HttpServer {
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Handle that stops the server and ends every open stream when cancelled
    pub fn shutdown_handle(&self) -> CancellationHandle {
        self.shutdown.clone()
    }

    /// The request handler used for every connection
    pub fn handler(&self) -> StreamableHandler {
        StreamableHandler::new(
            Arc::clone(&self.config),
            Arc::clone(&self.dispatcher),
            self.shutdown.clone(),
        )
    }

    /// Bind the configured address and serve until the shutdown handle fires.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let shutdown = self.shutdown.clone();
        self.run_until(listener, async move { shutdown.cancelled().await })
            .await
    }

    /// Serve connections from `listener` until `signal` resolves.
    ///
    /// On shutdown the accept loop stops, open push and call streams end,
    /// and in-flight connections are closed gracefully.
    pub async fn run_until<F>(&self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!("Streamable HTTP server listening on {}", local_addr);
        info!("Endpoint available at: {}", self.config.mcp_path);
        info!(
            "Registered methods: {}",
            self.dispatcher.registered_methods().join(", ")
        );

        let handler = self.handler();
        let _cancel_streams = self.shutdown.clone().drop_guard();
        tokio::pin!(signal);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        error!("Failed to accept connection: {}", err);
                        continue;
                    }
                },
                _ = &mut signal => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            };
            debug!("New connection from {}", peer_addr);

            let handler = handler.clone();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle_request(req).await) }
                });

                let conn = http1::Builder::new().serve_connection(io, service);
                tokio::pin!(conn);
                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = shutdown.cancelled() => {
                        conn.as_mut().graceful_shutdown();
                        conn.await
                    }
                };
                if let Err(err) = result {
                    if err.is_incomplete_message() || err.is_canceled() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }

        self.shutdown.cancel();
        info!("Server stopped");
        Ok(())
    }
}
