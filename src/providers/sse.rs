//! Server-Sent Events reassembly for streamed provider replies.
//!
//! Network chunks do not respect line boundaries: an event may be split over
//! several chunks, and a multi-byte character may straddle two of them. Bytes
//! are buffered until a full line is available and only then decoded.

use crate::core::error::StudioError;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::str::Utf8Error;
use tracing::warn;

/// Turn a raw byte stream into the sequence of `data:` payloads it carries.
///
/// Comments, blank lines, non-data fields and `[DONE]` markers are skipped.
/// A transport error or a line that is not valid UTF-8 is yielded once and
/// terminates the sequence. A final line without a trailing newline is still
/// delivered.
pub fn data_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, StudioError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Into<StudioError> + Send,
{
    futures::stream::unfold(
        (Box::pin(byte_stream), BytesMut::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line = buffer.split_to(newline + 1);
                    line.truncate(newline);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }

                    match std::str::from_utf8(&line) {
                        Ok(text) => {
                            if let Some(data) = extract_data(text) {
                                return Some((Ok(data), (stream, buffer, false)));
                            }
                        }
                        Err(e) => return Some((Err(undecodable(e)), (stream, buffer, true))),
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(e.into()), (stream, buffer, true))),
                    None => {
                        let rest = buffer.split();
                        return match std::str::from_utf8(&rest) {
                            Ok(text) => extract_data(text).map(|data| (Ok(data), (stream, buffer, true))),
                            Err(e) => Some((Err(undecodable(e)), (stream, buffer, true))),
                        };
                    }
                }
            }
        },
    )
}

fn undecodable(e: Utf8Error) -> StudioError {
    warn!(error = %e, "SSE line is not valid UTF-8");
    StudioError::Serialization(format!("Undecodable stream event: {}", e))
}

fn extract_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}
