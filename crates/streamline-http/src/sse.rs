//! Server-Sent Events framing.
//!
//! A frame is an optional `event:` line followed by `data:` and a blank line.
//! JSON payloads are serialized compactly, so `data` never contains a newline.

use bytes::Bytes;
use serde::Serialize;

/// Event name used for per-call frames and heartbeats
pub const MESSAGE_EVENT: &str = "message";
/// Event name of the first frame on a push stream
pub const ENDPOINT_EVENT: &str = "endpoint";

/// One SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn new(event: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event: event.map(str::to_string),
            data: data.into(),
        }
    }

    /// Serialize `payload` as the frame's data.
    pub fn json<T: Serialize + ?Sized>(
        event: Option<&str>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event, serde_json::to_string(payload)?))
    }

    /// Format as SSE message
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.data.len() + 32);
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        // multi-line payloads need one data line each
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.format())
    }

    /// Decode every complete frame in `text`. Comment lines and unknown
    /// fields are skipped; a trailing partial frame is ignored.
    pub fn parse_all(text: &str) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut event: Option<String> = None;
        let mut data: Vec<&str> = Vec::new();

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                if !data.is_empty() {
                    frames.push(SseFrame {
                        event: event.take(),
                        data: data.join("\n"),
                    });
                }
                event = None;
                data.clear();
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value),
                _ => {}
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_with_event() {
        let frame = SseFrame::json(Some(MESSAGE_EVENT), &json!({"a": 1})).unwrap();
        assert_eq!(frame.format(), "event: message\ndata: {\"a\":1}\n\n");
    }

    #[test]
    fn test_format_without_event() {
        let frame = SseFrame::new(None, "hello");
        assert_eq!(frame.format(), "data: hello\n\n");
    }

    #[test]
    fn test_json_data_has_no_newline() {
        let frame = SseFrame::json(None, &json!({"text": "line one\nline two"})).unwrap();
        assert!(!frame.data.contains('\n'));
    }

    #[test]
    fn test_parse_all() {
        let text = "event: endpoint\ndata: {\"x\":1}\n\n: keepalive\n\ndata: a\ndata: b\n\nevent: message\ndata: partial";
        let frames = SseFrame::parse_all(text);
        assert_eq!(
            frames,
            vec![
                SseFrame::new(Some("endpoint"), "{\"x\":1}"),
                SseFrame::new(None, "a\nb"),
            ]
        );
    }

    #[test]
    fn test_format_parse_agree() {
        let frames = vec![
            SseFrame::new(Some(MESSAGE_EVENT), "{}"),
            SseFrame::new(None, "two\nlines"),
        ];
        let wire: String = frames.iter().map(SseFrame::format).collect();
        assert_eq!(SseFrame::parse_all(&wire), frames);
    }
}
