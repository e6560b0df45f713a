mod client;
mod basic;
#[cfg(test)]
pub(crate) mod stub;

pub use client::HttpClient;
pub use basic::BasicClient;

use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// GETs `url` and returns the body as text.
///
/// # Errors
///
/// [`PipelineError::Fetch`] on an invalid URL, a transport failure, or a
/// non-success status.
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String> {
    let fetch_err = |message: String| PipelineError::Fetch {
        url: url.to_string(),
        message,
    };

    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse::<reqwest::Url>()
            .map_err(|e| fetch_err(e.to_string()))?,
    );

    let resp = client
        .execute(req)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| fetch_err(e.to_string()))?;

    resp.text().await.map_err(|e| fetch_err(e.to_string()))
}

/// Loads CSV text from an `http(s)` URL or a local path. Paths ending in `.gz`
/// are decompressed.
#[tracing::instrument(skip(client))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<String> {
    let text = if source.starts_with("http") {
        fetch_text(client, source).await?
    } else {
        let io_err = |source_err| PipelineError::Io {
            path: source.to_string(),
            source: source_err,
        };
        let bytes = tokio::fs::read(source).await.map_err(io_err)?;
        if source.ends_with(".gz") {
            debug!(compressed = bytes.len(), "Decompressing snapshot");
            let mut text = String::new();
            GzDecoder::new(bytes.as_slice())
                .read_to_string(&mut text)
                .map_err(io_err)?;
            text
        } else {
            String::from_utf8(bytes).map_err(|e| {
                io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?
        }
    };

    info!(bytes = text.len(), "CSV source loaded");
    Ok(text)
}
