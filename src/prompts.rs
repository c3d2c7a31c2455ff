//! Instruction strings sent to the image model.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: rewording an instruction means editing
//!    exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without a
//!    live model, so prompt regressions are easy to catch.
//!
//! Callers can override any of them through
//! [`crate::config::StudioConfigBuilder::prompts`].

use crate::background::HexColor;
use serde::{Deserialize, Serialize};

pub const REMOVE_BACKGROUND_PROMPT: &str = "Remove the background from this image. Make the background transparent so it can be used as a layer. The output must be a PNG image with a transparent background.";

pub const CARTOONIFY_PROMPT: &str = "Convert the subject in this image to a vibrant cartoon style. Maintain the transparent background. The output must be a PNG image with a transparent background.";

pub const COMPOSITE_IMAGE_PROMPT: &str = "Layer the first image (the subject) onto the second image (the background). Blend them naturally to create a cohesive final image.";

/// `{color}` is replaced with the hex value, e.g. `#00ff00`.
pub const COMPOSITE_COLOR_TEMPLATE: &str =
    "Place the subject from this image onto a solid background with the hex color {color}.";

/// The four instructions used by [`crate::pipeline::gemini::GeminiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    pub remove_background: String,
    pub cartoonify: String,
    pub composite_onto_image: String,
    /// Must contain the `{color}` placeholder.
    pub composite_onto_color: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            remove_background: REMOVE_BACKGROUND_PROMPT.to_string(),
            cartoonify: CARTOONIFY_PROMPT.to_string(),
            composite_onto_image: COMPOSITE_IMAGE_PROMPT.to_string(),
            composite_onto_color: COMPOSITE_COLOR_TEMPLATE.to_string(),
        }
    }
}

impl PromptSet {
    pub fn color_instruction(&self, color: &HexColor) -> String {
        self.composite_onto_color.replace("{color}", color.as_str())
    }
}
