use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use uuid::Uuid;

use crate::error::ApiError;

/// Multipart field carrying the upload
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// First `file` field of the form, if any
pub async fn read_file_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

/// Presence, image content type and size, checked in that order
pub fn validate_image(file: Option<UploadedFile>, max_size: usize) -> Result<UploadedFile, ApiError> {
    let file = file.ok_or_else(|| ApiError::bad_request("Please upload a file"))?;

    let is_image = file
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image"))
        .unwrap_or(false);
    if !is_image {
        return Err(ApiError::bad_request("Please upload an image file"));
    }

    if file.bytes.len() > max_size {
        return Err(ApiError::bad_request(format!(
            "Please upload an image less than {} bytes",
            max_size
        )));
    }
    Ok(file)
}

/// `photo_<id><ext>`, keeping the extension of the uploaded name
pub fn photo_file_name(id: Uuid, original: &str) -> String {
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("photo_{}.{}", id, ext),
        _ => format!("photo_{}", id),
    }
}

pub async fn save(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let path = dir.join(file_name);
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, bytes).await
    }
    .await;

    match result {
        Ok(()) => Ok(path),
        Err(e) => {
            tracing::error!("Failed to store upload {}: {}", path.display(), e);
            Err(ApiError::internal_server_error("Problem with file upload"))
        }
    }
}
