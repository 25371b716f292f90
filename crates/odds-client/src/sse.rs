//! Server-sent event decoding for the answer stream.
//!
//! Each SSE `data:` payload is a JSON object `{"type": ..., "value": ...}`.
//! Unknown types are skipped. A payload that fails to decode, or a transport
//! error, ends the stream after a warning. The stream stops on its own after
//! the terminal `answer` event.

use std::fmt::Display;

use bytes::Bytes;
use futures_core::Stream;
use odds_schema::AnswerEvent;
use tokio_stream::StreamExt;

/// Accumulates raw bytes and hands back the joined `data` of each completed
/// event. Handles CRLF, `data:` with or without a space, multi-line data and
/// comment lines.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.feed_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes an event left open when the transport closed without a
    /// trailing blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            if let Some(event) = self.feed_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

#[derive(Debug)]
enum Decoded {
    Event(AnswerEvent),
    Skip,
    Invalid(String),
}

fn decode_event(data: &str) -> Decoded {
    if data.trim() == "[DONE]" {
        return Decoded::Skip;
    }
    let value = match serde_json::from_str::<serde_json::Value>(data) {
        Ok(value) => value,
        Err(e) => return Decoded::Invalid(e.to_string()),
    };
    let Some(kind) = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_string)
    else {
        tracing::debug!("skipping answer event without a type");
        return Decoded::Skip;
    };
    if !AnswerEvent::KINDS.contains(&kind.as_str()) {
        tracing::debug!(kind = %kind, "skipping unknown answer event");
        return Decoded::Skip;
    }
    match serde_json::from_value::<AnswerEvent>(value) {
        Ok(event) => Decoded::Event(event),
        Err(e) => Decoded::Invalid(format!("{kind} event: {e}")),
    }
}

pub fn parse_answer_stream<E: Display + Send + 'static>(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
) -> impl Stream<Item = AnswerEvent> + Send {
    async_stream::stream! {
        tokio::pin!(byte_stream);
        let mut decoder = SseDecoder::default();

        while let Some(chunk) = byte_stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("answer stream interrupted: {e}");
                    return;
                }
            };
            for data in decoder.push(&bytes) {
                match decode_event(&data) {
                    Decoded::Event(event) => {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            return;
                        }
                    }
                    Decoded::Skip => {}
                    Decoded::Invalid(e) => {
                        tracing::warn!("invalid answer event payload: {e}");
                        return;
                    }
                }
            }
        }

        if let Some(data) = decoder.finish() {
            match decode_event(&data) {
                Decoded::Event(event) => yield event,
                Decoded::Skip => {}
                Decoded::Invalid(e) => tracing::warn!("invalid answer event payload: {e}"),
            }
        }
    }
}
