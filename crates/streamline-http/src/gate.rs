//! Session/transport gate: the first check every exchange passes.

use hyper::{HeaderMap, Method};
use tracing::{debug, warn};
use uuid::Uuid;

use streamline_json_rpc::SessionContext;

use crate::Rejection;
use crate::protocol::{
    accepts_json, accepts_sse, extract_origin, extract_protocol_version, extract_session_id,
};

/// Validates Origin, Accept and protocol version, then admits the exchange
/// with an echoed or freshly minted session id.
#[derive(Debug, Clone)]
pub struct TransportGate {
    allowed_origins: Vec<String>,
    protocol_version: String,
}

impl TransportGate {
    /// `allowed_origins` are prefixes, e.g. `http://localhost:`.
    pub fn new(allowed_origins: Vec<String>, protocol_version: impl Into<String>) -> Self {
        Self {
            allowed_origins,
            protocol_version: protocol_version.into(),
        }
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|prefix| origin.starts_with(prefix.as_str()))
    }

    /// An absent Origin passes; a present one must be readable and match an
    /// allowed prefix.
    pub fn check_origin(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        match extract_origin(headers) {
            Err(_) => {
                warn!("rejecting request with unreadable Origin header");
                Err(Rejection::Forbidden("<unreadable origin>".to_string()))
            }
            Ok(Some(origin)) if !self.is_origin_allowed(origin) => {
                warn!(origin = %origin, "rejecting request from disallowed origin");
                Err(Rejection::Forbidden(origin.to_string()))
            }
            Ok(_) => Ok(()),
        }
    }

    /// Check the headers of one exchange, in order: Origin, Accept, protocol version.
    ///
    /// `GET` opens a push stream and so must accept `text/event-stream`;
    /// failing that is a 405 rather than a 400.
    pub fn validate(&self, method: &Method, headers: &HeaderMap) -> Result<SessionContext, Rejection> {
        self.check_origin(headers)?;

        if *method == Method::GET {
            if !accepts_sse(headers) {
                return Err(Rejection::MethodNotAllowed(
                    "GET requires Accept: text/event-stream".to_string(),
                ));
            }
        } else if !accepts_json(headers) && !accepts_sse(headers) {
            return Err(Rejection::BadRequest(
                "Accept must include application/json or text/event-stream".to_string(),
            ));
        }

        let client_version = extract_protocol_version(headers).map_err(|_| {
            warn!("unreadable protocol version header");
            Rejection::BadRequest("Unsupported protocol version: <unreadable>".to_string())
        })?;
        if let Some(version) = &client_version {
            if *version != self.protocol_version {
                warn!(version = %version, "unsupported protocol version");
                return Err(Rejection::BadRequest(format!(
                    "Unsupported protocol version: {}",
                    version
                )));
            }
        }

        let session_id = match extract_session_id(headers) {
            Some(existing) => existing,
            None => {
                let minted = Self::mint_session_id();
                debug!(session_id = %minted, "minted new session id");
                minted
            }
        };

        let session = SessionContext::new(session_id);
        Ok(match client_version {
            Some(version) => session.with_protocol_version(version),
            None => session,
        })
    }

    /// New session ids are time-ordered UUIDv7 values.
    pub fn mint_session_id() -> String {
        Uuid::now_v7().to_string()
    }
}
