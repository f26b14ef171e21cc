//! # Streamline Server
//!
//! Wires the demo capabilities into a [`streamline_http::HttpServer`].
//!
//! ```rust,no_run
//! use streamline_server::{DemoPacing, demo_server};
//! use streamline_http::ServerConfig;
//!
//! # async fn run() -> streamline_http::Result<()> {
//! let server = demo_server(ServerConfig::default(), DemoPacing::default())?;
//! server.run().await
//! # }
//! ```

pub mod tools;

use std::time::Duration;

use streamline_http::{HttpServer, ServerConfig};
use streamline_json_rpc::Dispatcher;

use crate::tools::{Calculate, GetWeather, StreamData};

/// Delays between partial results of the streaming demo tools
#[derive(Debug, Clone, Copy)]
pub struct DemoPacing {
    pub weather_field: Duration,
    pub data_item: Duration,
}

impl Default for DemoPacing {
    fn default() -> Self {
        Self {
            weather_field: Duration::from_millis(500),
            data_item: Duration::from_millis(300),
        }
    }
}

impl DemoPacing {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            weather_field: Duration::ZERO,
            data_item: Duration::ZERO,
        }
    }
}

/// A dispatcher holding `get_weather`, `calculate` and `stream_data`.
pub fn demo_dispatcher(pacing: DemoPacing) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(GetWeather::with_interval(pacing.weather_field));
    dispatcher.register(Calculate);
    dispatcher.register(StreamData::with_interval(pacing.data_item));
    dispatcher
}

pub fn demo_server(config: ServerConfig, pacing: DemoPacing) -> streamline_http::Result<HttpServer> {
    HttpServer::builder()
        .config(config)
        .dispatcher(demo_dispatcher(pacing))
        .build()
}
