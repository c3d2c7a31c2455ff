//! Wire encoding: [`ImageArtifact`] ⇄ base64 `inlineData` parts.
//!
//! Gemini accepts images inline in the JSON body as standard base64 with a
//! declared MIME type, and returns generated images the same way.

use crate::artifact::ImageArtifact;
use crate::pipeline::gemini::{InlineData, Part};
use tracing::debug;

/// Wrap an artifact as an `inlineData` request part.
pub fn to_inline_part(image: &ImageArtifact) -> Part {
    let data = image.to_base64();
    debug!("Encoded {} → {} bytes base64", image.media_type(), data.len());
    Part::inline(InlineData {
        mime_type: image.media_type().to_string(),
        data,
    })
}

/// Decode an `inlineData` response part back into an artifact.
pub fn from_inline_data(inline: &InlineData) -> Result<ImageArtifact, base64::DecodeError> {
    ImageArtifact::from_base64(&inline.data, inline.mime_type.clone())
}
