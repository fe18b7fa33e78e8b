//! Chunk-boundary-safe decoding of `data:`-framed event streams.
//!
//! Upstream chat-completion APIs deliver their response as a byte stream of
//! `data: <JSON>` lines, and a logical line may be split at any byte
//! boundary between network chunks. The functions here thread the carryover
//! buffer explicitly (buffer in, buffer out) so each decoding step stays a
//! pure function: [`split_lines`] assembles complete lines, [`parse_line`]
//! classifies one line, and [`process_chunk`] / [`flush`] compose the two
//! for the upstream frame format.

use serde::Deserialize;

use crate::models::StreamEvent;

/// Marker prefix of significant lines.
pub const DATA_PREFIX: &str = "data: ";

/// Sentinel payload terminating an upstream stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Result of classifying a single line.
///
/// Lines that carry nothing usable are [`LineOutcome::Skipped`], never an
/// error; the hot parsing path stays exception-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line produced a normalized stream event.
    Event(StreamEvent),
    /// The line was blank, unmarked, malformed, or carried no delta.
    Skipped,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChunkDelta {
    content: Option<String>,
}

/// Appends `chunk` to the carried buffer and splits out every complete
/// line, returning the lines and the unterminated tail as the new buffer.
///
/// The split happens on the raw byte `\n`, which no multibyte UTF-8
/// character contains, so a character split across network chunks stays
/// intact in the carry until its line completes. Only complete lines are
/// decoded to text; a trailing `\r` is stripped.
#[must_use]
pub fn split_lines(buffer: Vec<u8>, chunk: &[u8]) -> (Vec<String>, Vec<u8>) {
    let mut data = buffer;
    data.extend_from_slice(chunk);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = data[start..].iter().position(|&byte| byte == b'\n') {
        let end = start + offset;
        lines.push(decode_line(&data[start..end]));
        start = end + 1;
    }

    let carry = data.split_off(start);
    (lines, carry)
}

/// Decodes whatever is left in the buffer at stream end into lines.
///
/// The terminating sentinel can arrive in the final unterminated fragment,
/// so the tail must go through the same per-line parsing as everything
/// else.
#[must_use]
pub fn drain_lines(buffer: &[u8]) -> Vec<String> {
    if buffer.is_empty() {
        return Vec::new();
    }

    buffer.split(|&byte| byte == b'\n').map(decode_line).collect()
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Classifies one line of an upstream chat-completion stream.
///
/// Significant lines start with [`DATA_PREFIX`]. The payload is either the
/// [`DONE_SENTINEL`] or a JSON chunk whose `choices[0].delta.content`
/// carries the next text fragment; a missing or empty delta and malformed
/// JSON are both skipped.
#[must_use]
pub fn parse_line(line: &str) -> LineOutcome {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skipped;
    };

    if payload.trim() == DONE_SENTINEL {
        return LineOutcome::Event(StreamEvent::Done);
    }

    let Ok(chunk) = serde_json::from_str::<CompletionChunk>(payload) else {
        return LineOutcome::Skipped;
    };

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(content) if !content.is_empty() => LineOutcome::Event(StreamEvent::Content(content)),
        _ => LineOutcome::Skipped,
    }
}

/// Decodes one network chunk of an upstream stream: buffer in, events plus
/// new buffer out.
#[must_use]
pub fn process_chunk(buffer: Vec<u8>, chunk: &[u8]) -> (Vec<StreamEvent>, Vec<u8>) {
    let (lines, carry) = split_lines(buffer, chunk);
    let events = lines
        .iter()
        .filter_map(|line| match parse_line(line) {
            LineOutcome::Event(event) => Some(event),
            LineOutcome::Skipped => None,
        })
        .collect();
    (events, carry)
}

/// Decodes the final carryover at upstream stream end.
#[must_use]
pub fn flush(buffer: &[u8]) -> Vec<StreamEvent> {
    drain_lines(buffer)
        .iter()
        .filter_map(|line| match parse_line(line) {
            LineOutcome::Event(event) => Some(event),
            LineOutcome::Skipped => None,
        })
        .collect()
}
