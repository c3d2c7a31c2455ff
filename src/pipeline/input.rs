//! Input resolution: turn a local file or a URL into an [`ImageArtifact`].
//!
//! Nothing is decoded. The media type is whatever the input declares (file
//! extension, `Content-Type`), with a magic-byte sniff as a fallback; the
//! remote model rejects payloads without a plausible image type.

use crate::artifact::{
    is_image_media_type, media_type_from_path, sniff_media_type, ImageArtifact,
    FALLBACK_MEDIA_TYPE,
};
use crate::error::BgSwapError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or http(s) URL to an artifact; URLs go through `fetcher`.
pub async fn resolve_input(input: &str, fetcher: &dyn ImageFetcher) -> Result<ImageArtifact, BgSwapError> {
    if input.trim().is_empty() {
        return Err(BgSwapError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        fetcher.fetch(input).await
    } else {
        encode_local_file(input).await
    }
}

/// Read a local image file.
///
/// The declared type comes from the extension; files with an unknown
/// extension are sniffed. Anything that still isn't an image is rejected.
pub async fn encode_local_file(path: impl AsRef<Path>) -> Result<ImageArtifact, BgSwapError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| BgSwapError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

    let media_type = media_type_from_path(path)
        .or_else(|| sniff_media_type(&bytes))
        .ok_or_else(|| BgSwapError::NotAnImage {
            path: path.to_path_buf(),
        })?;

    debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), media_type);
    Ok(ImageArtifact::new(bytes, media_type))
}

/// Download an image over HTTP(S).
pub async fn encode_remote_url(url: &str, timeout_secs: u64) -> Result<ImageArtifact, BgSwapError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BgSwapError::FetchError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    fetch_with(&client, url, timeout_secs).await
}

async fn fetch_with(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<ImageArtifact, BgSwapError> {
    info!("Fetching image: {}", url);

    let fetch_err = |reason: String| BgSwapError::FetchError {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            fetch_err(format!("timed out after {timeout_secs}s"))
        } else {
            fetch_err(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .filter(|v| is_image_media_type(v));

    let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;

    let media_type = declared.unwrap_or_else(|| {
        sniff_media_type(&bytes)
            .unwrap_or(FALLBACK_MEDIA_TYPE)
            .to_string()
    });

    debug!("Fetched {} bytes ({}) from {}", bytes.len(), media_type, url);
    Ok(ImageArtifact::new(bytes.to_vec(), media_type))
}

/// Source of remote images (preset backgrounds, URL inputs).
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ImageArtifact, BgSwapError>;
}

/// [`ImageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, BgSwapError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BgSwapError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ImageArtifact, BgSwapError> {
        fetch_with(&self.client, url, self.timeout_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://picsum.photos/id/3/1024/768"));
        assert!(is_url("http://example.com/a.png"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("a.png"));
        assert!(!is_url(""));
    }

    #[tokio::test]
    async fn local_file_round_trips_bytes() {
        let mut f = tempfile::Builder::new().suffix(".webp").tempfile().unwrap();
        let payload = b"RIFF\x10\x00\x00\x00WEBPVP8 arbitrary-bytes";
        f.write_all(payload).unwrap();

        let art = encode_local_file(f.path()).await.unwrap();
        assert_eq!(art.bytes(), payload);
        assert_eq!(art.media_type(), "image/webp");
    }

    #[tokio::test]
    async fn unknown_extension_is_sniffed() {
        let mut f = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        f.write_all(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();

        let art = encode_local_file(f.path()).await.unwrap();
        assert_eq!(art.media_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn text_file_is_rejected() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"just some notes").unwrap();

        let err = encode_local_file(f.path()).await.unwrap_err();
        assert!(matches!(err, BgSwapError::NotAnImage { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let err = encode_local_file("/definitely/not/here.png").await.unwrap_err();
        assert!(matches!(err, BgSwapError::ReadError { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        let fetcher = HttpFetcher::new(5).unwrap();
        let err = resolve_input("  ", &fetcher).await.unwrap_err();
        assert!(matches!(err, BgSwapError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn unreachable_url_is_fetch_error() {
        let err = encode_remote_url("http://127.0.0.1:9/bg.jpg", 5).await.unwrap_err();
        assert!(matches!(err, BgSwapError::FetchError { .. }), "got: {err:?}");
    }
}
