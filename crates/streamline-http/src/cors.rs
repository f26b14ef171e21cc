//! CORS (Cross-Origin Resource Sharing) support
//!
//! Only origins the gate already accepted are reflected; there is no wildcard.

use hyper::HeaderMap;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, HeaderValue, VARY,
};

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Accept, Mcp-Session-Id, MCP-Protocol-Version";
const EXPOSE_HEADERS: &str = "Mcp-Session-Id, MCP-Protocol-Version";

/// CORS layer for adding appropriate headers
pub struct CorsLayer;

impl CorsLayer {
    /// Reflect `origin` and advertise the endpoint's methods and headers.
    /// Returns `false` (and leaves `headers` alone) if `origin` is not a valid header value.
    pub fn apply_cors_headers_for_origin(headers: &mut HeaderMap, origin: &str) -> bool {
        let Ok(origin) = HeaderValue::from_str(origin) else {
            return false;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
        headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSE_HEADERS));
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        headers.append(VARY, HeaderValue::from_static("Origin"));
        true
    }
}
