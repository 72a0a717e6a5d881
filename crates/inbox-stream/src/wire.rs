//! Line-oriented wire format decoding
//!
//! The response body is a sequence of lines. Blank lines and lines starting
//! with `:` are ignored, an optional `data:` prefix is stripped, and every
//! remaining line holds one JSON object or the `[DONE]` sentinel. Chunks may
//! split lines (and UTF-8 sequences) at any byte; incomplete lines are held
//! back until the rest arrives.

use serde::Deserialize;

use crate::error::Result;
use crate::stream::StreamEvent;

/// Payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// SSE fields that carry no payload for us
const IGNORED_FIELDS: &[&str] = &["event:", "id:", "retry:"];

/// Splits a byte stream into complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Take the trailing unterminated line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode_line(&rest))
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn error_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => Some(
            map.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

/// Parse one line of the wire format.
///
/// Returns the events carried by the line, in order: a fatal error
/// suppresses everything else, otherwise a text fragment precedes a
/// completion marker. Lines that carry nothing yield an empty list.
pub fn parse_line(line: &str) -> Result<Vec<StreamEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(Vec::new());
    }

    let data = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None if IGNORED_FIELDS.iter().any(|f| line.starts_with(f)) => return Ok(Vec::new()),
        None => line,
    };

    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data == DONE_SENTINEL {
        return Ok(vec![StreamEvent::Done]);
    }

    let payload: Payload = serde_json::from_str(data)?;

    if let Some(message) = payload.error.as_ref().and_then(error_message) {
        return Ok(vec![StreamEvent::Error { message }]);
    }

    let mut events = Vec::new();
    if let Some(text) = payload.text.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Fragment { text });
    }
    if payload.done == Some(true) {
        events.push(StreamEvent::Done);
    }
    Ok(events)
}

/// Incremental decoder from raw chunks to stream events.
///
/// Malformed lines are logged and skipped.
#[derive(Debug, Default)]
pub struct WireDecoder {
    lines: LineBuffer,
    skipped: usize,
}

impl WireDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every complete line in `chunk`
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let lines = self.lines.push(chunk);
        self.decode(lines)
    }

    /// Decode the trailing line once the transport reports end of data
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = self.lines.finish();
        self.decode(rest)
    }

    /// Number of lines dropped because they failed to parse
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode(&mut self, lines: impl IntoIterator<Item = String>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in lines {
            match parse_line(&line) {
                Ok(parsed) => events.extend(parsed),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!("Skipping malformed stream line {:?}: {}", line, e);
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(text: &str) -> StreamEvent {
        StreamEvent::Fragment { text: text.into() }
    }

    const BODY: &str = concat!(
        ": keep-alive\n",
        "\n",
        "data: {\"text\":\"Hel\"}\n",
        "\n",
        "data: {\"text\":\"lo, wor\"}\r\n",
        "{\"text\":\"ld \u{1F30D}\"}\n",
        "event: message\n",
        "data: [DONE]\n",
    );

    fn decode_in_chunks(body: &[u8], size: usize) -> Vec<StreamEvent> {
        let mut decoder = WireDecoder::new();
        let mut events = Vec::new();
        for chunk in body.chunks(size) {
            events.extend(decoder.feed(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn test_line_buffer_holds_partial_line() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"abc\nde"), vec!["abc"]);
        assert_eq!(buffer.pending(), 2);
        assert_eq!(buffer.push(b"f\r\n"), vec!["def"]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_line_buffer_finish_returns_tail() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"done\":true}").is_empty());
        assert_eq!(buffer.finish().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn test_single_chunk_decode() {
        let events = decode_in_chunks(BODY.as_bytes(), BODY.len());
        assert_eq!(
            events,
            vec![
                fragment("Hel"),
                fragment("lo, wor"),
                fragment("ld \u{1F30D}"),
                StreamEvent::Done
            ]
        );
    }

    #[test]
    fn test_any_split_matches_single_chunk() {
        let whole = decode_in_chunks(BODY.as_bytes(), BODY.len());
        for size in 1..BODY.len() {
            assert_eq!(
                decode_in_chunks(BODY.as_bytes(), size),
                whole,
                "chunk size {}",
                size
            );
        }
    }

    #[test]
    fn test_split_at_every_offset() {
        let bytes = BODY.as_bytes();
        let whole = decode_in_chunks(bytes, bytes.len());
        for split in 1..bytes.len() {
            let mut decoder = WireDecoder::new();
            let mut events = decoder.feed(&bytes[..split]);
            events.extend(decoder.feed(&bytes[split..]));
            events.extend(decoder.finish());
            assert_eq!(events, whole, "split at {}", split);
        }
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut decoder = WireDecoder::new();
        let events = decoder.feed(b"data: {\"text\":\"a\"}\ndata: {oops\ndata: {\"text\":\"b\"}\n");
        assert_eq!(events, vec![fragment("a"), fragment("b")]);
        assert_eq!(decoder.skipped(), 1);
    }

    #[test]
    fn test_error_payload() {
        assert_eq!(
            parse_line("data: {\"error\":\"model unavailable\",\"text\":\"x\"}").unwrap(),
            vec![StreamEvent::Error {
                message: "model unavailable".into()
            }]
        );
        assert_eq!(
            parse_line("{\"error\":{\"message\":\"quota\"}}").unwrap(),
            vec![StreamEvent::Error {
                message: "quota".into()
            }]
        );
        assert_eq!(parse_line("{\"error\":null,\"text\":\"ok\"}").unwrap(), vec![fragment("ok")]);
    }

    #[test]
    fn test_text_and_done_in_one_payload() {
        assert_eq!(
            parse_line("{\"text\":\"end\",\"done\":true}").unwrap(),
            vec![fragment("end"), StreamEvent::Done]
        );
    }

    #[test]
    fn test_ignored_lines() {
        for line in ["", "   ", ": ping", "event: token", "id: 7", "retry: 100", "data:", "{}"] {
            assert!(parse_line(line).unwrap().is_empty(), "line {:?}", line);
        }
    }
}
