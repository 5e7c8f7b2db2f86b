use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tokio::fs;
use tracing::debug;

use crate::{
    errors::{AppError, Result},
    models::EncodedImage,
};

/// Reads a local image and encodes it for transport.
///
/// A failure here means the slot stays as it was; callers must not build a
/// request that references the file.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();
    let media_type = media_type_for_path(path)?;

    let bytes = fs::read(path).await.map_err(|source| AppError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(AppError::Encode {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "file is empty"),
        });
    }

    debug!(target: "encoder", path = %path.display(), bytes = bytes.len(), media_type, "image encoded");

    Ok(EncodedImage::new(BASE64_STANDARD.encode(&bytes), media_type))
}

pub fn media_type_for_path(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "heic" => Ok("image/heic"),
        "heif" => Ok("image/heif"),
        _ => Err(AppError::unsupported(format!(
            "image type of {} (use png, jpg, webp, gif, heic or heif)",
            path.display()
        ))),
    }
}
