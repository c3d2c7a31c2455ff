//! One-shot editing: one photo, one background, one final image.
//!
//! Drives a fresh [`Studio`] through the same transitions an interactive
//! front-end would (upload → select → generate → export) and reports what
//! it cost. Use [`Studio`] directly when the user should be able to switch
//! backgrounds and regenerate without re-running background removal.

use crate::background::{BackgroundSelection, BackgroundSpec};
use crate::config::StudioConfig;
use crate::error::BgSwapError;
use crate::output::{EditOutput, EditStats};
use crate::pipeline::export::{write_export, ExportArtifact};
use crate::pipeline::gemini::GeminiClient;
use crate::pipeline::input::{self, HttpFetcher, ImageFetcher};
use crate::session::{Outcome, Studio};
use crate::transform::ImageTransformer;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What to edit and how.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Local file path or HTTP/HTTPS URL of the photo.
    pub input: String,
    pub background: BackgroundSpec,
    pub cartoon: bool,
}

impl EditRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            background: BackgroundSpec::Selection(BackgroundSelection::default()),
            cartoon: false,
        }
    }

    pub fn background(mut self, background: BackgroundSpec) -> Self {
        self.background = background;
        self
    }

    pub fn cartoon(mut self, cartoon: bool) -> Self {
        self.cartoon = cartoon;
        self
    }
}

/// Run the whole pipeline and return the final image in memory.
///
/// The background is resolved before any model call so that a bad
/// background path fails fast without spending a remove-bg request.
pub async fn edit(request: &EditRequest, config: &StudioConfig) -> Result<EditOutput, BgSwapError> {
    let total_start = Instant::now();
    info!("Starting edit: {}", request.input);

    // ── Step 1: Build the session ────────────────────────────────────────
    let studio = Studio::from_config(config)?;
    // URL inputs and URL backgrounds are downloaded here, outside the session.
    let fetcher = resolve_fetcher(config)?;

    // ── Step 2: Background ───────────────────────────────────────────────
    match request.background {
        BackgroundSpec::Selection(ref selection) => studio.select_background(selection.clone()),
        BackgroundSpec::Image(ref source) if input::is_url(source) => {
            let image = fetcher.fetch(source).await?;
            studio.set_custom_background(image);
        }
        BackgroundSpec::Image(ref source) => {
            studio.upload_custom_background(source).await?;
        }
    }
    debug!("Background: {}", studio.snapshot().selection.kind());

    // ── Step 3: Upload + remove background ───────────────────────────────
    let upload_start = Instant::now();
    let original = input::resolve_input(&request.input, fetcher.as_ref()).await?;
    expect_applied(studio.upload_artifact(original).await?)?;
    let upload_ms = upload_start.elapsed().as_millis() as u64;

    // ── Step 4: Cartoonify + composite ───────────────────────────────────
    studio.set_cartoon(request.cartoon);
    let generate_start = Instant::now();
    expect_applied(studio.generate().await?)?;
    let generate_ms = generate_start.elapsed().as_millis() as u64;

    // ── Step 5: Collect ──────────────────────────────────────────────────
    let export = studio.export()?;
    let snapshot = studio.snapshot();
    let stats = EditStats {
        remote_calls: snapshot.remote_calls,
        cartoon_cache_hits: snapshot.cartoon_cache_hits,
        upload_ms,
        generate_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Edit complete: {} remote calls, {}ms total",
        stats.remote_calls, stats.total_duration_ms
    );

    Ok(EditOutput {
        media_type: export.media_type().to_string(),
        size_bytes: export.bytes().len(),
        image: export.image,
        output_path: None,
        background: snapshot.selection,
        cartoon: request.cartoon,
        stats,
    })
}

/// Run [`edit`] and write the final image atomically.
///
/// A directory `output_path` receives `edited-image.png`.
pub async fn edit_to_file(
    request: &EditRequest,
    output_path: impl AsRef<Path>,
    config: &StudioConfig,
) -> Result<EditOutput, BgSwapError> {
    let mut output = edit(request, config).await?;
    let export = ExportArtifact::new(output.image.clone());
    let written = write_export(&export, output_path)?;
    output.output_path = Some(written);
    Ok(output)
}

/// Synchronous wrapper around [`edit`].
///
/// Creates a temporary tokio runtime internally.
pub fn edit_sync(request: &EditRequest, config: &StudioConfig) -> Result<EditOutput, BgSwapError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BgSwapError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(edit(request, config))
}

/// The transformer to use: the injected one, else a [`GeminiClient`] built
/// from the config and environment.
pub fn resolve_transformer(config: &StudioConfig) -> Result<Arc<dyn ImageTransformer>, BgSwapError> {
    if let Some(ref transformer) = config.transformer {
        return Ok(Arc::clone(transformer));
    }
    let client = GeminiClient::from_config(config)?;
    debug!("Using Gemini endpoint {}", client.endpoint());
    Ok(Arc::new(client))
}

pub fn resolve_fetcher(config: &StudioConfig) -> Result<Arc<dyn ImageFetcher>, BgSwapError> {
    if let Some(ref fetcher) = config.fetcher {
        return Ok(Arc::clone(fetcher));
    }
    Ok(Arc::new(HttpFetcher::new(config.download_timeout_secs)?))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Nothing resets a one-shot session, so anything but `Applied` is a bug.
fn expect_applied(outcome: Outcome) -> Result<(), BgSwapError> {
    match outcome {
        Outcome::Applied => Ok(()),
        other => Err(BgSwapError::Internal(format!("unexpected outcome {:?}", other))),
    }
}
