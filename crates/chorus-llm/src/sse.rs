//! Incremental decoder for line-delimited server-sent event streams
//!
//! The parser knows nothing about vendors: it turns bytes into event payload
//! strings. Input may arrive split at any byte, including inside a UTF-8
//! sequence or between `\r` and `\n`; only complete lines are interpreted.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};

use crate::error::LlmError;

/// When buffered `data:` content is emitted as a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Only a blank line (or end of stream) ends an event
    Strict,
    /// Additionally emit as soon as the buffered data is a complete JSON value
    ///
    /// Handles vendors that emit one JSON object per `data:` line without
    /// blank-line framing, or end the stream without a final blank line.
    Compatibility,
}

/// Stateful event-stream decoder
#[derive(Debug)]
pub struct FrameParser {
    mode: FrameMode,
    /// Bytes of the current, not yet terminated line
    line: Vec<u8>,
    /// Data accumulated for the current event; `None` until a `data:` line
    data: Option<String>,
}

impl FrameParser {
    /// Create a parser in the given mode
    pub const fn new(mode: FrameMode) -> Self {
        Self {
            mode,
            line: Vec::new(),
            data: None,
        }
    }

    /// Feed a chunk, invoking `emit` once per completed payload
    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(String)) {
        let mut start = 0;
        for (i, byte) in chunk.iter().enumerate() {
            if *byte == b'\n' {
                self.line.extend_from_slice(&chunk[start..i]);
                start = i + 1;
                let line = std::mem::take(&mut self.line);
                self.process_line(&line, &mut emit);
            }
        }
        self.line.extend_from_slice(&chunk[start..]);
    }

    /// Signal end of stream, flushing any unterminated line and buffered data
    pub fn finish(&mut self, mut emit: impl FnMut(String)) {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.process_line(&line, &mut emit);
        }
        self.flush(&mut emit);
    }

    /// Feed a chunk and collect the completed payloads
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.push(chunk, |payload| out.push(payload));
        out
    }

    /// Finish the stream and collect the remaining payloads
    pub fn close(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        self.finish(|payload| out.push(payload));
        out
    }

    fn process_line(&mut self, raw: &[u8], emit: &mut impl FnMut(String)) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        if line.is_empty() {
            self.flush(emit);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        if field != "data" {
            return;
        }

        match &mut self.data {
            Some(buffer) => {
                buffer.push('\n');
                buffer.push_str(value);
            }
            None => self.data = Some(value.to_owned()),
        }

        if self.mode == FrameMode::Compatibility && self.data.as_deref().is_some_and(is_complete_json) {
            self.flush(emit);
        }
    }

    fn flush(&mut self, emit: &mut impl FnMut(String)) {
        if let Some(payload) = self.data.take()
            && !payload.is_empty()
        {
            emit(payload);
        }
    }
}

/// Whether `text` is one syntactically balanced JSON object or array
///
/// Only bracket balance and string state are checked; the value is not
/// otherwise validated.
pub fn is_complete_json(text: &str) -> bool {
    let text = text.trim();
    if !(text.starts_with('{') || text.starts_with('[')) {
        return false;
    }

    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                let Some(next) = depth.checked_sub(1) else {
                    return false;
                };
                depth = next;
                if depth == 0 {
                    return text[i + c.len_utf8()..].trim().is_empty();
                }
            }
            _ => {}
        }
    }

    false
}

/// Boxed stream of raw response body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Decode a body stream into event payloads
///
/// Transport errors are passed through in order; after an error no further
/// payloads are produced.
pub fn payloads(body: ByteStream, mode: FrameMode) -> impl Stream<Item = Result<String, LlmError>> + Send {
    struct State {
        body: ByteStream,
        parser: FrameParser,
        ready: VecDeque<String>,
        done: bool,
    }

    stream::unfold(
        State {
            body,
            parser: FrameParser::new(mode),
            ready: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(payload) = state.ready.pop_front() {
                    return Some((Ok(payload), state));
                }
                if state.done {
                    return None;
                }

                match state.body.next().await {
                    Some(Ok(chunk)) => {
                        let ready = &mut state.ready;
                        state.parser.push(&chunk, |payload| ready.push_back(payload));
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        state.ready.clear();
                        return Some((Err(e), state));
                    }
                    None => {
                        state.done = true;
                        let ready = &mut state.ready;
                        state.parser.finish(|payload| ready.push_back(payload));
                    }
                }
            }
        },
    )
}
