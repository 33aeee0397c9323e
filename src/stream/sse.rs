//! SSE (Server-Sent Events) framing over a blocking byte source.
//!
//! Frames are assembled line by line as bytes arrive, with partial lines and
//! UTF-8 sequences split across reads carried over to the next read. Field
//! handling follows the
//! [SSE specification](https://html.spec.whatwg.org/multipage/server-sent-events.html).
use std::io::{ErrorKind, Read};

use bytes::Bytes;
use memchr::memchr_iter;
use serde::Deserialize;

use super::{EventSource, RawEvent};
use crate::error::StreamError;
use crate::queue::PendingQueue;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// A parsed SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Fields collected for the frame currently being read.
#[derive(Debug, Default)]
struct FrameBuilder {
    event: Option<String>,
    data: String,
    has_data: bool,
    last_id: Option<String>,
}

impl FrameBuilder {
    fn apply(&mut self, field: &str, value: &str) {
        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.has_data = true;
                self.data.push_str(value);
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            // Comments (empty field name), `retry` and unknown fields.
            _ => {}
        }
    }

    /// Close the frame at a blank line. A frame without data yields nothing
    /// but still drops its event name.
    fn dispatch(&mut self) -> Option<SseEvent> {
        if !self.has_data {
            self.event = None;
            return None;
        }
        self.has_data = false;
        Some(SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
        })
    }
}

/// Split `field: value`, dropping one space after the colon. A line without a
/// colon is a field name with an empty value.
fn split_field(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    }
}

/// Incremental SSE line parser.
///
/// Feed it text in arbitrary pieces; complete frames come out as soon as
/// their terminating blank line has been seen.
#[derive(Debug, Default)]
pub struct SseParser {
    partial: String,
    frame: FrameBuilder,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return the frames it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed text and append the frames it completes to `out`.
    ///
    /// Lines end at `\n` with an optional `\r`; whatever follows the last
    /// newline is kept until the next call.
    pub fn feed_into<E: Extend<SseEvent>>(&mut self, chunk: &str, out: &mut E) {
        self.partial.push_str(chunk);
        let mut line_start = 0;
        for newline in memchr_iter(b'\n', self.partial.as_bytes()) {
            let raw = &self.partial[line_start..newline];
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                out.extend(self.frame.dispatch());
            } else {
                let (field, value) = split_field(line);
                self.frame.apply(field, value);
            }
            line_start = newline + 1;
        }
        self.partial.drain(..line_start);
    }
}

/// Format one named SSE frame: `event: {name}\ndata: {json}\n\n`.
#[must_use]
pub fn format_sse_frame(event_type: &str, json: &str) -> String {
    format!("event: {event_type}\ndata: {json}\n\n")
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

/// [`EventSource`] that frames SSE text read from `R`.
///
/// Frames without an `event:` line take their event type from the payload's
/// `"type"` field. An unterminated trailing frame is discarded at end of input.
pub struct SseEventSource<R> {
    reader: R,
    parser: SseParser,
    read_buf: Box<[u8]>,
    /// Bytes read but not yet fed: at most an incomplete UTF-8 sequence.
    carry: Vec<u8>,
    ready: PendingQueue<SseEvent>,
    finished: bool,
}

impl<R: Read> SseEventSource<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: SseParser::new(),
            read_buf: vec![0u8; READ_CHUNK_BYTES].into_boxed_slice(),
            carry: Vec::new(),
            ready: PendingQueue::new(),
            finished: false,
        }
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn feed_bytes(&mut self, len: usize) -> Result<(), StreamError> {
        self.carry.extend_from_slice(&self.read_buf[..len]);
        let text = match std::str::from_utf8(&self.carry) {
            Ok(text) => text,
            // Incomplete trailing sequence: feed the valid prefix, keep the rest.
            Err(e) if e.error_len().is_none() => {
                std::str::from_utf8(&self.carry[..e.valid_up_to()]).map_err(|_| invalid_utf8())?
            }
            Err(_) => return Err(invalid_utf8()),
        };
        let fed = text.len();
        self.parser.feed_into(text, &mut self.ready);
        self.carry.drain(..fed);
        Ok(())
    }
}

fn invalid_utf8() -> StreamError {
    StreamError::Transport("event stream is not valid UTF-8".to_string())
}

fn into_raw_event(event: SseEvent) -> RawEvent {
    let event_type = match event.event {
        Some(name) if !name.is_empty() => name,
        _ => serde_json::from_str::<TypeProbe>(&event.data)
            .map(|probe| probe.kind)
            .unwrap_or_default(),
    };
    RawEvent {
        event_type,
        payload: Bytes::from(event.data),
    }
}

impl<R: Read> EventSource for SseEventSource<R> {
    fn next_event(&mut self) -> Result<Option<RawEvent>, StreamError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(into_raw_event(event)));
            }
            if self.finished {
                return Ok(None);
            }
            let read = match self.reader.read(&mut self.read_buf) {
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::transport(&e)),
            };
            if read == 0 {
                self.finished = true;
                if !self.carry.is_empty() {
                    return Err(StreamError::Transport(
                        "event stream ended inside a UTF-8 sequence".to_string(),
                    ));
                }
                continue;
            }
            self.feed_bytes(read)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that hands out its data a few bytes at a time.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let end = (self.pos + self.step).min(self.data.len());
            let n = (end - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_parse_named_event() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: message_start\ndata: {\"type\":\"message_start\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_start"));
        assert_eq!(events[0].data, "{\"type\":\"message_start\"}");
    }

    #[test]
    fn test_parse_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: line1\ndata: line2\ndata: line3\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line1\nline2\nline3");
    }

    #[test]
    fn test_parse_ignores_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(": keep-alive\ndata: hello\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_parse_incremental_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: ping\ndata: {\"ty").is_empty());
        assert!(parser.feed("pe\":\"ping\"}\n").is_empty());
        let events = parser.feed("\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("ping"));
        assert_eq!(events[0].data, "{\"type\":\"ping\"}");
    }

    #[test]
    fn test_parse_crlf_frames() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: message_stop\r\ndata: {}\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_stop"));
        assert_eq!(events[0].data, "{}");
    }

    #[test]
    fn test_blank_line_without_data_drops_event_name() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: ping\n\ndata: {}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, None);
    }

    #[test]
    fn test_id_persists_and_unknown_fields_are_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed("id: 7\nretry: 100\nbogus\ndata: a\n\ndata: b\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[1].id.as_deref(), Some("7"));
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn test_format_frame_round_trips_through_parser() {
        let frame = format_sse_frame("content_block_stop", "{\"index\":0}");
        let mut parser = SseParser::new();
        let events = parser.feed(&frame);
        assert_eq!(events[0].event.as_deref(), Some("content_block_stop"));
        assert_eq!(events[0].data, "{\"index\":0}");
    }

    #[test]
    fn test_source_handles_split_utf8() {
        let text = format_sse_frame(
            "content_block_delta",
            r#"{"index":0,"delta":{"type":"text_delta","text":"héllo 🌍"}}"#,
        );
        let reader = Trickle {
            data: text.into_bytes(),
            pos: 0,
            step: 3,
        };
        let mut source = SseEventSource::new(reader);
        let event = source.next_event().unwrap().unwrap();
        assert_eq!(event.event_type, "content_block_delta");
        let value: serde_json::Value = serde_json::from_slice(&event.payload).unwrap();
        assert_eq!(value["delta"]["text"], "héllo 🌍");
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_source_uses_payload_type_without_event_name() {
        let reader = std::io::Cursor::new(b"data: {\"type\":\"message_stop\"}\n\n".to_vec());
        let mut source = SseEventSource::new(reader);
        let event = source.next_event().unwrap().unwrap();
        assert_eq!(event.event_type, "message_stop");
    }

    #[test]
    fn test_source_rejects_invalid_utf8() {
        let reader = std::io::Cursor::new(b"data: \xff\xfe\n\n".to_vec());
        let mut source = SseEventSource::new(reader);
        assert!(matches!(
            source.next_event(),
            Err(StreamError::Transport(_))
        ));
    }

    #[test]
    fn test_source_discards_unterminated_frame() {
        let reader = std::io::Cursor::new(b"event: ping\ndata: {}".to_vec());
        let mut source = SseEventSource::new(reader);
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_source_surfaces_read_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::ConnectionAborted, "aborted"))
            }
        }
        let mut source = SseEventSource::new(Broken);
        let err = source.next_event().unwrap_err();
        assert_eq!(err, StreamError::Transport("aborted".to_string()));
    }
}
