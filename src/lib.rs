//! # edgequake-bgswap
//!
//! Swap the background of a photo using a generative image model.
//!
//! ## Why this crate?
//!
//! Classical matting needs a segmentation model, a compositor and a lot of
//! tuning to blend edges, shadows and lighting. Instead this crate asks an
//! image-generation model (Gemini) to do each step from a plain-language
//! instruction: cut the subject out, optionally redraw it as a cartoon, and
//! blend it onto a new background that looks like it belongs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input      read a local file or download a URL
//!  ├─ 2. Remove-bg  model call #1 → subject on transparency (the foreground)
//!  ├─ 3. Cartoon    optional model call, cached per foreground
//!  ├─ 4. Composite  model call onto a preset image, a custom upload or a colour
//!  └─ 5. Export     final image as `edited-image.png`
//! ```
//!
//! Each remote call either yields an image or a soft "no result", which the
//! session turns into a user-facing message. Steps 3–4 can be re-run with a
//! different background or cartoon setting without repeating step 2.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_bgswap::{edit_to_file, BackgroundSpec, EditRequest, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let config = StudioConfig::default();
//!     let request = EditRequest::new("portrait.jpg")
//!         .background("color:#00ff00".parse::<BackgroundSpec>()?)
//!         .cartoon(true);
//!     let output = edit_to_file(&request, "edited-image.png", &config).await?;
//!     eprintln!("{} remote calls", output.stats.remote_calls);
//!     Ok(())
//! }
//! ```
//!
//! For an interactive front-end, keep a [`Studio`] per user session and call
//! [`Studio::upload_image`], [`Studio::select_background`],
//! [`Studio::toggle_cartoon`] and [`Studio::generate`] as the user clicks.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bgswap` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-bgswap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod background;
pub mod config;
pub mod edit;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::ImageArtifact;
pub use background::{BackgroundSelection, BackgroundSpec, HexColor, PRESET_BACKGROUNDS};
pub use config::{StudioConfig, StudioConfigBuilder, DEFAULT_MODEL};
pub use edit::{edit, edit_sync, edit_to_file, EditRequest};
pub use error::BgSwapError;
pub use output::{EditOutput, EditStats};
pub use pipeline::export::{write_export, ExportArtifact, EXPORT_FILENAME};
pub use pipeline::gemini::GeminiClient;
pub use pipeline::input::{HttpFetcher, ImageFetcher};
pub use progress::{NoopProgressCallback, ProgressCallback, StudioProgressCallback};
pub use prompts::PromptSet;
pub use session::{Action, Outcome, Phase, SessionSnapshot, Studio};
pub use transform::{ImageTransformer, Operation, TransformResult};
