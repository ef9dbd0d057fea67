//! Shared HTTP transport: one pooled client and a line-buffering SSE decoder
//! that every adapter builds its event stream on top of.

use crate::error::LLMError;
use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use std::time::Duration;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build reqwest client")
});

/// The pooled client all adapters share, grounded in the teacher's one
/// process-wide `reqwest::Client` rather than building one per request.
pub fn client() -> &'static reqwest::Client {
    &CLIENT
}

/// One `data: ...` payload extracted from an `event-stream` body, already
/// stripped of the `data: ` prefix. The `[DONE]` sentinel (used by the
/// chat-completions wire format) is passed through unfiltered; callers check
/// for it themselves, since the Responses API and Gemini streams don't use
/// it.
pub fn sse_lines(
    resp: reqwest::Response,
) -> impl Stream<Item = Result<String, LLMError>> + Send + 'static {
    let bytes_stream = resp.bytes_stream();
    futures::stream::unfold(
        (bytes_stream, Vec::<u8>::new()),
        |(mut bytes_stream, mut buf)| async move {
            loop {
                if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let mut line = buf.drain(..=pos).collect::<Vec<u8>>();
                    line.pop(); // drop trailing '\n'
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    let line = match String::from_utf8(line) {
                        Ok(s) => s,
                        Err(e) => return Some((Err(LLMError::HttpError(e.to_string())), (bytes_stream, buf))),
                    };
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim_start().to_string();
                    if data.is_empty() {
                        continue;
                    }
                    return Some((Ok(data), (bytes_stream, buf)));
                }
                match bytes_stream.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(LLMError::from(e)), (bytes_stream, buf))),
                    None => {
                        if buf.iter().all(|&b| b == b'\r' || b == b'\n') {
                            return None;
                        }
                        let mut line = std::mem::take(&mut buf);
                        if line.last() == Some(&b'\n') {
                            line.pop();
                        }
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        let line = match String::from_utf8(line) {
                            Ok(s) => s,
                            Err(e) => {
                                return Some((Err(LLMError::HttpError(e.to_string())), (bytes_stream, buf)))
                            }
                        };
                        let data = line.strip_prefix("data:").map(|d| d.trim_start().to_string());
                        return data.filter(|d| !d.is_empty()).map(|d| (Ok(d), (bytes_stream, buf.clone())));
                    }
                }
            }
        },
    )
}
