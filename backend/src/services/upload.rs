//! Reading the `file` part of a multipart/form-data upload.

use actix_multipart::Multipart;
use futures_util::StreamExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("multipart error: {0}")]
    Multipart(String),
    #[error("Missing file")]
    MissingFile,
    #[error("The file exceeds {0} bytes")]
    TooLarge(usize),
}

pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Collects the first part named `file`. Other parts are drained and ignored.
pub async fn read_file_part(mut payload: Multipart, limit: usize) -> Result<Upload, UploadError> {
    let mut upload: Option<Upload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| UploadError::Multipart(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if name.as_deref() != Some("file") || upload.is_some() {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(Upload { filename, bytes });
    }

    upload.ok_or(UploadError::MissingFile)
}
