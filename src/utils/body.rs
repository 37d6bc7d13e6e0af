//! Bounded reads of upstream response bodies.

use futures::StreamExt;

use crate::error::{Error, Result, Upstream};

/// Read a response body, failing once more than `max_len` bytes arrive.
///
/// On overflow the byte stream is dropped mid-transfer, which closes the
/// upstream connection; the partial buffer is discarded with it.
pub async fn read_limited_body(
    response: reqwest::Response,
    max_len: usize,
    upstream: &Upstream,
) -> Result<Vec<u8>> {
    if let Some(len) = response.content_length() {
        if len > max_len as u64 {
            return Err(Error::ResponseTooLarge { limit: max_len });
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(upstream, e))?;
        if body.len() + chunk.len() > max_len {
            return Err(Error::ResponseTooLarge { limit: max_len });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Map a reqwest failure onto the upstream error taxonomy
pub fn transport_error(upstream: &Upstream, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::UpstreamTimeout {
            upstream: upstream.clone(),
        }
    } else {
        Error::UpstreamRequest {
            upstream: upstream.clone(),
            reason: err.to_string(),
        }
    }
}
