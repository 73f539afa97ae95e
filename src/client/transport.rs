use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};

use super::deriver::FileHandle;
use super::error::{ClientError, Result};
use crate::shared::checksum::{hex_to_header_value, CHECKSUM_HEADER};

/// Size of the body chunks progress is reported on
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Called with the cumulative number of bytes handed to the connection
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// One PUT of a file's bytes to a presigned URL
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn put(
        &self,
        url: &str,
        file: &FileHandle,
        checksum: &str,
        on_progress: ProgressFn,
    ) -> Result<()>;
}

/// Direct-to-storage transport over `reqwest`.
///
/// Sends no credentials; the presigned URL is the only authorization.
#[derive(Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn chunked(content: &Bytes) -> Vec<Bytes> {
    (0..content.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| content.slice(start..(start + UPLOAD_CHUNK_SIZE).min(content.len())))
        .collect()
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn put(
        &self,
        url: &str,
        file: &FileHandle,
        checksum: &str,
        on_progress: ProgressFn,
    ) -> Result<()> {
        let checksum_header = hex_to_header_value(checksum)
            .map_err(|e| ClientError::Checksum(e.to_string()))?;

        let mut sent = 0u64;
        let body = stream::iter(chunked(&file.content)).map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(sent);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, &file.mime_type)
            .header(CONTENT_LENGTH, file.size())
            .header(CHECKSUM_HEADER, checksum_header)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!("Storage rejected upload: {} {}", status, detail);
            return Err(ClientError::Transfer(format!(
                "storage responded with {}",
                status
            )));
        }
        Ok(())
    }
}
