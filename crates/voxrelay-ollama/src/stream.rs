//! NDJSON → `InferenceEvent` translation.
//!
//! Ollama streams one JSON object per line. Chunks from the HTTP body do
//! not respect line boundaries, so bytes are buffered until a newline
//! arrives. The stream ends after the first `done: true` line, after the
//! first error, or when the body ends.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use voxrelay_core::{InferenceError, InferenceEvent};

use crate::models::ChatStreamLine;

/// State threaded through the `unfold` stream.
struct NdjsonState<S> {
    body: S,
    buf: BytesMut,
    idle_timeout: Duration,
    finished: bool,
}

/// Turn a streaming `/api/chat` body into inference events.
pub(crate) fn ndjson_events<S, E>(
    body: S,
    idle_timeout: Duration,
) -> impl Stream<Item = InferenceEvent> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = NdjsonState {
        body,
        buf: BytesMut::new(),
        idle_timeout,
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                if let Some(event) = parse_line(&line) {
                    st.finished = is_terminal(&event);
                    return Some((event, st));
                }
                continue;
            }

            match tokio::time::timeout(st.idle_timeout, st.body.next()).await {
                Ok(Some(Ok(chunk))) => st.buf.extend_from_slice(&chunk),
                Ok(Some(Err(e))) => {
                    warn!("Inference stream error: {e}");
                    st.finished = true;
                    let event = InferenceEvent::Error(InferenceError::Protocol(e.to_string()));
                    return Some((event, st));
                }
                Ok(None) => {
                    st.finished = true;
                    // A final line may arrive without a trailing newline.
                    let rest = st.buf.split();
                    return parse_line(&rest).map(|event| (event, st));
                }
                Err(_) => {
                    warn!(timeout = ?st.idle_timeout, "Inference stream went idle");
                    st.finished = true;
                    return Some((InferenceEvent::Error(InferenceError::Timeout), st));
                }
            }
        }
    })
}

/// Parse one NDJSON line. Blank and undecodable lines yield `None`.
fn parse_line(raw: &[u8]) -> Option<InferenceEvent> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let line: ChatStreamLine = match serde_json::from_str(trimmed) {
        Ok(line) => line,
        Err(e) => {
            debug!(error = %e, "Skipping undecodable stream line");
            return None;
        }
    };

    if let Some(message) = line.error {
        return Some(InferenceEvent::Error(InferenceError::Backend(message)));
    }

    let text = line.message.map(|m| m.content).unwrap_or_default();
    Some(InferenceEvent::Delta {
        text,
        done: line.done,
    })
}

const fn is_terminal(event: &InferenceEvent) -> bool {
    matches!(
        event,
        InferenceEvent::Error(_) | InferenceEvent::Delta { done: true, .. }
    )
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}
