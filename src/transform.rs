//! The seam between the session and the remote image model.
//!
//! [`crate::session::Studio`] only ever talks to an `Arc<dyn ImageTransformer>`.
//! Production code plugs in [`crate::pipeline::gemini::GeminiClient`]; tests
//! plug in a recording fake.

use crate::artifact::ImageArtifact;
use crate::background::HexColor;
use crate::error::BgSwapError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of one remote transformation.
///
/// `Ok(None)` means the model answered without a usable image (a soft
/// failure); `Err` means the call itself failed.
pub type TransformResult = Result<Option<ImageArtifact>, BgSwapError>;

/// The four remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    RemoveBackground,
    Cartoonify,
    CompositeOntoImage,
    CompositeOntoColor,
}

impl Operation {
    /// Message shown to the user when this operation returns no image.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::RemoveBackground => {
                "Failed to remove background. The AI couldn't process the image."
            }
            Operation::Cartoonify => "Failed to create cartoon version.",
            Operation::CompositeOntoImage | Operation::CompositeOntoColor => {
                "Failed to generate the final image."
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::RemoveBackground => "remove-background",
            Operation::Cartoonify => "cartoonify",
            Operation::CompositeOntoImage => "composite-onto-image",
            Operation::CompositeOntoColor => "composite-onto-color",
        })
    }
}

/// A remote model able to perform the four edits.
///
/// Every call is a single best-effort request: no retries, and identical
/// inputs are not guaranteed to give identical outputs.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Isolate the subject onto a transparent background.
    async fn remove_background(&self, subject: &ImageArtifact) -> TransformResult;

    /// Restyle the subject as a cartoon, keeping transparency.
    async fn cartoonify(&self, subject: &ImageArtifact) -> TransformResult;

    /// Layer `subject` over `background`.
    async fn composite_onto_image(
        &self,
        subject: &ImageArtifact,
        background: &ImageArtifact,
    ) -> TransformResult;

    /// Place `subject` over a solid colour.
    async fn composite_onto_color(&self, subject: &ImageArtifact, color: &HexColor) -> TransformResult;
}
