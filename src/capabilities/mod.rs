mod encoder;
mod poses;
mod prompt;

pub use encoder::encode_file;
pub use poses::POSE_CATALOG;
pub use prompt::{PromptBuilder, PromptInputs};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde_json::{Map, Value};

use crate::errors::{AppError, Result};

/// Decoded image bytes ready to be written to disk.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub data: Vec<u8>,
    pub media_type: String,
    pub file_extension: String,
    pub title: String,
    pub metadata: Map<String, Value>,
}

impl ImageArtifact {
    pub fn new(
        data: Vec<u8>,
        media_type: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let media_type = media_type.into();
        Self {
            data,
            file_extension: extension_for_media_type(&media_type).to_string(),
            media_type,
            title: title.into(),
            metadata: Map::new(),
        }
    }

    /// Decodes a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(title: impl Into<String>, url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| AppError::unsupported("image URL is not a data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::other("data URL has no payload"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::unsupported("data URL is not base64 encoded"))?;

        let data = BASE64_STANDARD
            .decode(payload)
            .map_err(|err| AppError::other(format!("image base64 decode failed: {err}")))?;

        Ok(Self::new(data, media_type, title))
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        "image/heif" => "heif",
        _ => "bin",
    }
}
