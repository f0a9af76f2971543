//! Decoding of the chat-completion event stream into [`ChatFragment`]s.
//!
//! The remote service answers a streaming chat request with `data:` lines,
//! one JSON frame per line. Each line is decoded on its own: a malformed
//! frame becomes an inline diagnostic, a frame carrying a nonzero `code`
//! ends the stream, and `finish_reason == "stop"` ends it after its content.

use std::fmt;
use std::pin::Pin;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::types::{ChatFragment, DiagnosticKind};

/// Lazily decoded fragments of one chat response.
pub type FragmentStream = BoxStream<'static, ChatFragment>;

const DATA_PREFIX: &[u8] = b"data:";
const STOP_REASON: &str = "stop";

/// First choice of a frame, reduced to what the bridge forwards.
#[derive(Debug, PartialEq)]
struct FrameDeltaView {
    content: Option<JsonValue>,
    stop: bool,
}

/// What to do with one physical line of the event stream.
#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
    /// Not a `data:` line.
    Skip,
    /// Forward the fragment and keep reading.
    Emit(ChatFragment),
    /// Forward the fragment, then end the stream.
    Finish(ChatFragment),
    /// End the stream without forwarding anything.
    Stop,
}

/// Splits a byte stream into physical lines, tolerating chunk boundaries
/// anywhere (including inside a multi-byte character).
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    closed: bool,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Marks end of input; a trailing unterminated line becomes available.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.buf[self.scanned..].iter().position(|b| *b == b'\n');
        let mut line = match newline {
            Some(offset) => {
                let mut line: Vec<u8> = self.buf.drain(..=self.scanned + offset).collect();
                line.pop();
                line
            }
            None if self.closed && !self.buf.is_empty() => std::mem::take(&mut self.buf),
            None => {
                self.scanned = self.buf.len();
                return None;
            }
        };
        self.scanned = 0;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }
}

/// Classify one line of the event stream.
pub fn decode_line(line: &[u8]) -> FrameOutcome {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return FrameOutcome::Skip;
    };

    let raw = match std::str::from_utf8(payload) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Invalid UTF-8 in stream frame: {}", e);
            return FrameOutcome::Emit(decode_error(line));
        }
    };

    let value: JsonValue = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse stream frame: {}", e);
            return FrameOutcome::Emit(decode_error(line));
        }
    };

    if has_error_code(&value) {
        debug!("Stream frame carries error code, ending stream");
        return FrameOutcome::Finish(ChatFragment::diagnostic(DiagnosticKind::Remote, raw));
    }

    let view = first_delta(&value);
    match (view.content, view.stop) {
        (Some(JsonValue::String(content)), false) => {
            FrameOutcome::Emit(ChatFragment::content(content))
        }
        (Some(JsonValue::String(content)), true) => {
            FrameOutcome::Finish(ChatFragment::content(content))
        }
        (None, true) => FrameOutcome::Stop,
        (_, stop) => {
            warn!("Stream frame has no string choices[0].delta.content");
            let fragment = ChatFragment::diagnostic(
                DiagnosticKind::Decode,
                format!("Error decoding JSON: unexpected frame shape: {}", raw),
            );
            if stop {
                FrameOutcome::Finish(fragment)
            } else {
                FrameOutcome::Emit(fragment)
            }
        }
    }
}

/// Decode a complete non-streaming response body into exactly one fragment.
pub fn decode_single_response(body: &[u8]) -> ChatFragment {
    let value: JsonValue = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse chat response: {}", e);
            return decode_error(body);
        }
    };

    if has_error_code(&value) {
        return ChatFragment::diagnostic(DiagnosticKind::Remote, String::from_utf8_lossy(body));
    }

    match first_delta(&value).content {
        Some(JsonValue::String(content)) => ChatFragment::content(content),
        _ => ChatFragment::diagnostic(
            DiagnosticKind::Decode,
            format!("Error decoding JSON: unexpected response shape: {}", value),
        ),
    }
}

/// Turn an HTTP body into a lazily decoded fragment stream.
///
/// At most one fragment is produced per line, and the body is only polled
/// when the consumer asks for the next fragment. The body is dropped as
/// soon as the stream reaches a terminal frame.
pub fn decode_event_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = EventStreamState {
        body: Some(Box::pin(body)),
        lines: LineBuffer::default(),
    };
    stream::unfold(state, |mut state| async move {
        let fragment = state.next_fragment().await?;
        Some((fragment, state))
    })
    .boxed()
}

struct EventStreamState<S> {
    body: Option<Pin<Box<S>>>,
    lines: LineBuffer,
}

impl<S, B, E> EventStreamState<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    async fn next_fragment(&mut self) -> Option<ChatFragment> {
        loop {
            if self.body.is_none() {
                return None;
            }

            while let Some(line) = self.lines.next_line() {
                match decode_line(&line) {
                    FrameOutcome::Skip => continue,
                    FrameOutcome::Emit(fragment) => return Some(fragment),
                    FrameOutcome::Finish(fragment) => {
                        self.body = None;
                        return Some(fragment);
                    }
                    FrameOutcome::Stop => {
                        self.body = None;
                        return None;
                    }
                }
            }

            if self.lines.is_closed() {
                debug!("Event stream closed without stop signal");
                self.body = None;
                return None;
            }

            let body = self.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => self.lines.push(chunk.as_ref()),
                Some(Err(e)) => {
                    self.body = None;
                    return Some(ChatFragment::diagnostic(
                        DiagnosticKind::Transport,
                        format!("stream interrupted: {}", e),
                    ));
                }
                None => self.lines.close(),
            }
        }
    }
}

fn decode_error(line: &[u8]) -> ChatFragment {
    ChatFragment::diagnostic(
        DiagnosticKind::Decode,
        format!("Error decoding JSON: {}", String::from_utf8_lossy(line)),
    )
}

/// A payload signals failure when `code` is present and not zero.
fn has_error_code(value: &JsonValue) -> bool {
    match value.get("code") {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Number(n)) => n.as_f64() != Some(0.0),
        Some(JsonValue::String(s)) => s.trim() != "0",
        Some(JsonValue::Bool(flag)) => *flag,
        Some(_) => true,
    }
}

fn first_delta(value: &JsonValue) -> FrameDeltaView {
    FrameDeltaView {
        content: value.pointer("/choices/0/delta/content").filter(|c| !c.is_null()).cloned(),
        stop: value.pointer("/choices/0/finish_reason").and_then(JsonValue::as_str)
            == Some(STOP_REASON),
    }
}
