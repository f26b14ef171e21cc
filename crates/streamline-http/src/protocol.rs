//! Header names, media types and extraction helpers for Streamable HTTP.

use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE};

/// Protocol version header, compared verbatim against the supported version
pub const MCP_PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
/// Session identifier header, echoed on every gated response
pub const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";
/// The only protocol version this transport speaks
pub const SUPPORTED_PROTOCOL_VERSION: &str = "2025-06-18";

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const SSE_MEDIA_TYPE: &str = "text/event-stream";

/// A header that is present but whose value is not visible ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndecodableHeader(pub &'static str);

/// Extract MCP protocol version from HTTP request headers.
///
/// `Ok(None)` only when the header is absent; a value that cannot be read
/// is an error rather than an absence.
pub fn extract_protocol_version(headers: &HeaderMap) -> Result<Option<String>, UndecodableHeader> {
    strict_header_str(headers, MCP_PROTOCOL_VERSION_HEADER)
        .map(|value| value.map(|s| s.trim().to_string()))
}

/// Extract MCP session ID from HTTP request headers. Blank values count as absent.
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    header_str(headers, MCP_SESSION_ID_HEADER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Same contract as [`extract_protocol_version`].
pub fn extract_origin(headers: &HeaderMap) -> Result<Option<&str>, UndecodableHeader> {
    strict_header_str(headers, "origin")
}

/// Whether `Accept` names `text/event-stream`.
pub fn accepts_sse(headers: &HeaderMap) -> bool {
    accept_contains(headers, SSE_MEDIA_TYPE)
}

/// Whether `Accept` names `application/json`.
pub fn accepts_json(headers: &HeaderMap) -> bool {
    accept_contains(headers, JSON_MEDIA_TYPE)
}

/// `Content-Type: application/json`, parameters such as `charset` allowed.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
        .unwrap_or(false)
}

fn accept_contains(headers: &HeaderMap, media_type: &str) -> bool {
    headers.get_all(ACCEPT).iter().any(|value| {
        value
            .to_str()
            .map(|accept| {
                accept
                    .split(',')
                    .filter_map(|part| part.split(';').next())
                    .any(|media| media.trim().eq_ignore_ascii_case(media_type))
            })
            .unwrap_or(false)
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn strict_header_str<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<Option<&'a str>, UndecodableHeader> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| UndecodableHeader(name)),
    }
}
