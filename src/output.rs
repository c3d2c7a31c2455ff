//! Result types returned by the one-shot [`crate::edit`] driver.

use crate::artifact::ImageArtifact;
use crate::background::BackgroundSelection;
use serde::Serialize;
use std::path::PathBuf;

/// A finished edit: the composited image plus how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutput {
    /// The final composited image.
    #[serde(skip_serializing)]
    pub image: ImageArtifact,
    pub media_type: String,
    pub size_bytes: usize,
    /// Where the image was written, when the caller asked for a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub background: BackgroundSelection,
    pub cartoon: bool,
    pub stats: EditStats,
}

/// Call counts and timings for one edit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditStats {
    /// Remote model calls issued (remove-bg, cartoonify, composite).
    pub remote_calls: u32,
    pub cartoon_cache_hits: u32,
    /// Time spent reading the input and removing its background.
    pub upload_ms: u64,
    /// Time spent in cartoonify + compositing (including the preset fetch).
    pub generate_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_summary_omits_image_bytes() {
        let out = EditOutput {
            image: ImageArtifact::new(vec![1u8, 2, 3], "image/png"),
            media_type: "image/png".into(),
            size_bytes: 3,
            output_path: None,
            background: BackgroundSelection::Upload,
            cartoon: true,
            stats: EditStats {
                remote_calls: 3,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("image").is_none());
        assert!(json.get("output_path").is_none());
        assert_eq!(json["size_bytes"], 3);
        assert_eq!(json["background"]["type"], "upload");
        assert_eq!(json["stats"]["remote_calls"], 3);
    }
}
