//! Event-stream frame decoder
//!
//! Turns the text received so far into complete named frames plus the
//! unconsumed tail. Frames are terminated by a blank line; within a frame an
//! `event:` line names the frame and `data:` lines carry the JSON payload.
//! Decoding is a pure function of the buffer, so feeding the same bytes in
//! any chunking yields the same frames.

use tracing::{debug, warn};

/// Frame name used when a frame has no `event:` line
pub const DEFAULT_EVENT: &str = "message";

/// One complete, parsed frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: serde_json::Value,
}

/// Result of decoding a buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// Frames in arrival order
    pub frames: Vec<Frame>,
    /// Text after the last terminator, to be prepended to the next read
    pub remainder: String,
}

/// Decode every complete frame in `buffer`
pub fn decode(buffer: &str) -> Decoded {
    let mut frames = Vec::new();
    let mut rest = buffer;

    while let Some((end, terminator_len)) = next_terminator(rest) {
        let raw = &rest[..end];
        rest = &rest[end + terminator_len..];
        if let Some(frame) = parse_frame(raw) {
            frames.push(frame);
        }
    }

    Decoded {
        frames,
        remainder: rest.to_string(),
    }
}

/// Position and length of the first blank-line terminator
fn next_terminator(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|pos| (pos, 2));
    let crlf = buffer.find("\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Parse one raw frame; malformed payloads are logged and skipped
fn parse_frame(raw: &str) -> Option<Frame> {
    let mut event = None;
    let mut data = String::new();
    let mut has_data = false;

    for line in raw.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim().to_string());
        } else if let Some(chunk) = line.strip_prefix("data:") {
            data.push_str(chunk.trim());
            has_data = true;
        }
    }

    let event = event
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_EVENT.to_string());

    if !has_data {
        debug!(%event, "parse_frame: frame without data, skipping");
        return None;
    }

    match serde_json::from_str(&data) {
        Ok(data) => Some(Frame { event, data }),
        Err(e) => {
            warn!(%event, error = %e, data_len = data.len(), "parse_frame: malformed payload, skipping frame");
            None
        }
    }
}
