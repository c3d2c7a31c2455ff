//! The in-memory image representation shared by every pipeline stage.
//!
//! An [`ImageArtifact`] is just bytes plus the media type they claim to be.
//! Nothing here decodes pixels: the remote model does all image work, so the
//! crate only needs to move payloads around and label them correctly.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Media type used when nothing better can be determined for a download.
pub const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// Immutable image payload with its declared media type.
///
/// Cloning is cheap: the bytes are shared behind an `Arc`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    #[serde(with = "base64_bytes")]
    data: Arc<[u8]>,
    media_type: String,
}

impl ImageArtifact {
    pub fn new(data: impl Into<Arc<[u8]>>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Decode a standard-alphabet base64 payload.
    pub fn from_base64(b64: &str, media_type: impl Into<String>) -> Result<Self, base64::DecodeError> {
        let bytes = STANDARD.decode(b64.trim())?;
        Ok(Self::new(bytes, media_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:<media>;base64,<payload>` for embedding in HTML or JSON.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

// Payloads can be megabytes; never dump them into logs.
impl fmt::Debug for ImageArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageArtifact")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Media type declared by a file name's extension, if it names an image.
pub fn media_type_from_path(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path).ok().map(|f| f.to_mime_type())
}

/// Media type sniffed from magic bytes, if they look like an image.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Whether a `Content-Type` style string names an image.
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S: Serializer>(data: &Arc<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<[u8]>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(&s)
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}
