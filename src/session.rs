//! The editing session: a small state machine over remote image calls.
//!
//! ```text
//!            upload ok                 generate ok
//! Empty ──▶ Uploading ──▶ BackgroundRemoved ──▶ Generating ──▶ Composited
//!   ▲           │                                   │   ▲            │
//!   └─ failure ─┘                         failure ──▼   └── generate ┘
//!   (full reset)                                 Errored
//! ```
//!
//! ## Rules
//!
//! * **Single-flight.** `upload` and `generate` set a loading flag and refuse
//!   to start while it is set ([`BgSwapError::Busy`]). There is no
//!   cancellation; an in-flight call always runs to completion.
//! * **Upload failures are destructive**: any failure while encoding or
//!   removing the background resets the whole session, keeping only the
//!   error message. Generate failures keep every existing image.
//! * **Stale results are dropped.** [`Studio::reset`] bumps an epoch counter;
//!   an action that started under an older epoch returns
//!   [`Outcome::Discarded`] and never touches the cleared session.
//! * **The cartoon version is cached** for the lifetime of the foreground.
//!
//! The mutex only guards short synchronous reads and writes; it is never
//! held across a remote call.

use crate::artifact::ImageArtifact;
use crate::background::BackgroundSelection;
use crate::config::StudioConfig;
use crate::edit::{resolve_fetcher, resolve_transformer};
use crate::error::BgSwapError;
use crate::pipeline::export::ExportArtifact;
use crate::pipeline::input::{encode_local_file, ImageFetcher};
use crate::progress::ProgressCallback;
use crate::transform::{ImageTransformer, Operation, TransformResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const UPLOAD_STATUS: &str = "Removing background...";
pub const CARTOON_STATUS: &str = "Applying cartoon magic...";
pub const COMPOSITE_STATUS: &str = "Compositing your masterpiece...";
pub const CUSTOM_BACKGROUND_ERROR: &str = "Failed to load custom background.";

/// The two long-running, single-flight actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Upload,
    Generate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Upload => "upload",
            Action::Generate => "generate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Empty,
    Uploading,
    BackgroundRemoved,
    Generating,
    Composited,
    /// The last generate failed; the session's images are intact.
    Errored,
}

/// What an action did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was stored.
    Applied,
    /// Nothing to do (generate without a foreground).
    Skipped,
    /// The session was reset while the action ran; its result was dropped.
    Discarded,
}

/// A point-in-time copy of the session for presentation layers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub original: Option<ImageArtifact>,
    /// Subject with the background removed.
    pub foreground: Option<ImageArtifact>,
    /// Cached cartoon version of `foreground`.
    pub cartoon: Option<ImageArtifact>,
    pub final_image: Option<ImageArtifact>,
    pub selection: BackgroundSelection,
    /// Kept across selection changes so `Upload` can be re-selected.
    pub custom_background: Option<ImageArtifact>,
    pub cartoon_enabled: bool,
    /// Action in flight, if any.
    pub loading: Option<Action>,
    /// Human-readable loading message.
    pub status: Option<String>,
    /// Most recent error message.
    pub error: Option<String>,
    /// Remote model calls issued in this session.
    pub remote_calls: u32,
    pub cartoon_cache_hits: u32,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// The image a viewer should show right now.
    pub fn display_image(&self) -> Option<&ImageArtifact> {
        if let Some(ref img) = self.final_image {
            return Some(img);
        }
        if self.cartoon_enabled {
            if let Some(ref img) = self.cartoon {
                return Some(img);
            }
        }
        self.foreground.as_ref()
    }
}

#[derive(Default)]
struct SessionState {
    view: SessionSnapshot,
    epoch: u64,
}

impl SessionState {
    fn clear(&mut self) {
        self.view = SessionSnapshot::default();
        self.epoch += 1;
    }
}

/// Everything a generate needs, captured when it starts.
struct GeneratePlan {
    epoch: u64,
    foreground: ImageArtifact,
    cartoon_enabled: bool,
    cached_cartoon: Option<ImageArtifact>,
    selection: BackgroundSelection,
    custom_background: Option<ImageArtifact>,
}

/// Handle to one editing session.
///
/// Cheap to clone; clones share the same session, so a front-end can call
/// [`Studio::reset`] from one task while another awaits [`Studio::generate`].
#[derive(Clone)]
pub struct Studio {
    transformer: Arc<dyn ImageTransformer>,
    fetcher: Arc<dyn ImageFetcher>,
    progress: Option<ProgressCallback>,
    state: Arc<Mutex<SessionState>>,
}

impl fmt::Debug for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.lock();
        f.debug_struct("Studio")
            .field("phase", &s.view.phase)
            .field("loading", &s.view.loading)
            .field("epoch", &s.epoch)
            .finish_non_exhaustive()
    }
}

impl Studio {
    pub fn new(transformer: Arc<dyn ImageTransformer>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            transformer,
            fetcher,
            progress: None,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Build from config: injected transformer/fetcher first, otherwise a
    /// [`crate::pipeline::gemini::GeminiClient`] and an
    /// [`crate::pipeline::input::HttpFetcher`].
    pub fn from_config(config: &StudioConfig) -> Result<Self, BgSwapError> {
        let transformer = resolve_transformer(config)?;
        let fetcher = resolve_fetcher(config)?;
        let mut studio = Self::new(transformer, fetcher);
        studio.progress = config.progress_callback.clone();
        Ok(studio)
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().view.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().view.phase
    }

    pub fn is_loading(&self) -> bool {
        self.lock().view.loading.is_some()
    }

    /// See [`SessionSnapshot::display_image`].
    pub fn display_image(&self) -> Option<ImageArtifact> {
        self.lock().view.display_image().cloned()
    }

    // ── Pure state transitions ───────────────────────────────────────────

    /// Switch background. Never calls the model.
    pub fn select_background(&self, selection: BackgroundSelection) {
        debug!("Background selected: {}", selection.kind());
        self.lock().view.selection = selection;
    }

    /// Flip the cartoon effect and return the new value. The cache survives.
    pub fn toggle_cartoon(&self) -> bool {
        let mut s = self.lock();
        s.view.cartoon_enabled = !s.view.cartoon_enabled;
        s.view.cartoon_enabled
    }

    pub fn set_cartoon(&self, enabled: bool) {
        self.lock().view.cartoon_enabled = enabled;
    }

    /// Store an already-encoded custom background and select it.
    pub fn set_custom_background(&self, image: ImageArtifact) {
        let mut s = self.lock();
        s.view.custom_background = Some(image);
        s.view.selection = BackgroundSelection::Upload;
    }

    /// Clear everything back to `Empty`, whatever is in flight.
    pub fn reset(&self) {
        let epoch = {
            let mut s = self.lock();
            s.clear();
            s.epoch
        };
        info!("Session reset (epoch {})", epoch);
    }

    /// The final image as a downloadable file.
    pub fn export(&self) -> Result<ExportArtifact, BgSwapError> {
        self.lock()
            .view
            .final_image
            .clone()
            .map(ExportArtifact::new)
            .ok_or(BgSwapError::NoFinalImage)
    }

    // ── Custom background ────────────────────────────────────────────────

    /// Read a local image and make it the selected background.
    ///
    /// On failure the session keeps everything else and shows
    /// [`CUSTOM_BACKGROUND_ERROR`].
    pub async fn upload_custom_background(&self, path: impl AsRef<Path>) -> Result<Outcome, BgSwapError> {
        let epoch = self.lock().epoch;
        let result = encode_local_file(path).await;

        let mut s = self.lock();
        if s.epoch != epoch {
            warn!("Custom background finished after a reset; discarding");
            return Ok(Outcome::Discarded);
        }
        match result {
            Ok(image) => {
                s.view.custom_background = Some(image);
                s.view.selection = BackgroundSelection::Upload;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                warn!("Custom background failed: {}", e);
                s.view.error = Some(CUSTOM_BACKGROUND_ERROR.to_string());
                Err(e)
            }
        }
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Read a local photo and remove its background.
    pub async fn upload_image(&self, path: impl AsRef<Path>) -> Result<Outcome, BgSwapError> {
        let epoch = self.begin(Action::Upload, UPLOAD_STATUS)?;
        let result = match encode_local_file(path).await {
            Ok(original) => self.remove_background(epoch, original).await,
            Err(e) => Err(e),
        };
        self.finish_upload(epoch, result)
    }

    /// Like [`Studio::upload_image`] for an artifact that is already in memory.
    pub async fn upload_artifact(&self, original: ImageArtifact) -> Result<Outcome, BgSwapError> {
        let epoch = self.begin(Action::Upload, UPLOAD_STATUS)?;
        let result = self.remove_background(epoch, original).await;
        self.finish_upload(epoch, result)
    }

    /// `Ok(None)` means the session was reset underneath us.
    async fn remove_background(
        &self,
        epoch: u64,
        original: ImageArtifact,
    ) -> Result<Option<ImageArtifact>, BgSwapError> {
        if !self.store_original(epoch, &original) {
            return Ok(None);
        }
        self.call(
            epoch,
            Operation::RemoveBackground,
            self.transformer.remove_background(&original),
        )
        .await
    }

    fn store_original(&self, epoch: u64, original: &ImageArtifact) -> bool {
        let mut s = self.lock();
        if s.epoch != epoch {
            return false;
        }
        s.view.original = Some(original.clone());
        s.view.foreground = None;
        s.view.cartoon = None;
        s.view.final_image = None;
        true
    }

    fn finish_upload(
        &self,
        epoch: u64,
        result: Result<Option<ImageArtifact>, BgSwapError>,
    ) -> Result<Outcome, BgSwapError> {
        let outcome = {
            let mut s = self.lock();
            if s.epoch != epoch {
                None
            } else {
                s.view.loading = None;
                s.view.status = None;
                Some(match result {
                    Ok(Some(foreground)) => {
                        s.view.foreground = Some(foreground);
                        s.view.phase = Phase::BackgroundRemoved;
                        Ok(Outcome::Applied)
                    }
                    Ok(None) => Ok(Outcome::Discarded),
                    Err(e) => {
                        // Nothing from a failed upload survives except the message.
                        let message = e.to_string();
                        s.clear();
                        s.view.error = Some(message);
                        Err(e)
                    }
                })
            }
        };

        match outcome {
            None => {
                warn!("Upload finished after a reset; discarding result");
                Ok(Outcome::Discarded)
            }
            Some(result) => {
                match &result {
                    Ok(_) => info!("Background removed"),
                    Err(e) => warn!("Upload failed, session reset: {}", e),
                }
                self.notify_complete(Action::Upload, &result);
                result
            }
        }
    }

    // ── Generate ─────────────────────────────────────────────────────────

    /// Composite the (optionally cartoonified) foreground onto the selected
    /// background. Does nothing until an upload has succeeded.
    pub async fn generate(&self) -> Result<Outcome, BgSwapError> {
        let plan = match self.begin_generate()? {
            Some(plan) => plan,
            None => {
                debug!("Generate requested without a foreground; ignoring");
                return Ok(Outcome::Skipped);
            }
        };
        let result = self.run_generate(&plan).await;
        self.finish_generate(plan.epoch, result)
    }

    fn begin_generate(&self) -> Result<Option<GeneratePlan>, BgSwapError> {
        let (plan, status) = {
            let mut s = self.lock();
            let foreground = match s.view.foreground.clone() {
                Some(fg) => fg,
                None => return Ok(None),
            };
            if let Some(running) = s.view.loading {
                return Err(BgSwapError::Busy {
                    requested: Action::Generate,
                    running,
                });
            }

            let cached_cartoon = s.view.cartoon.clone();
            let cartoon_enabled = s.view.cartoon_enabled;
            if cartoon_enabled && cached_cartoon.is_some() {
                s.view.cartoon_cache_hits += 1;
            }
            let status = if cartoon_enabled && cached_cartoon.is_none() {
                CARTOON_STATUS
            } else {
                COMPOSITE_STATUS
            };

            s.view.loading = Some(Action::Generate);
            s.view.status = Some(status.to_string());
            s.view.error = None;
            s.view.final_image = None;
            s.view.phase = Phase::Generating;

            let plan = GeneratePlan {
                epoch: s.epoch,
                foreground,
                cartoon_enabled,
                cached_cartoon,
                selection: s.view.selection.clone(),
                custom_background: s.view.custom_background.clone(),
            };
            (plan, status)
        };

        if let Some(ref cb) = self.progress {
            cb.on_action_start(Action::Generate);
            cb.on_status(status);
        }
        Ok(Some(plan))
    }

    /// `Ok(None)` means the session was reset underneath us.
    async fn run_generate(&self, plan: &GeneratePlan) -> Result<Option<ImageArtifact>, BgSwapError> {
        let mut active = plan.foreground.clone();

        if plan.cartoon_enabled {
            active = match plan.cached_cartoon {
                Some(ref cartoon) => {
                    debug!("Reusing cached cartoon version");
                    cartoon.clone()
                }
                None => {
                    let cartoon = match self
                        .call(
                            plan.epoch,
                            Operation::Cartoonify,
                            self.transformer.cartoonify(&plan.foreground),
                        )
                        .await?
                    {
                        Some(cartoon) => cartoon,
                        None => return Ok(None),
                    };
                    if !self.cache_cartoon(plan.epoch, &cartoon) {
                        return Ok(None);
                    }
                    cartoon
                }
            };
        }

        if !self.set_status(plan.epoch, COMPOSITE_STATUS) {
            return Ok(None);
        }

        match plan.selection {
            BackgroundSelection::Color(ref color) => {
                self.call(
                    plan.epoch,
                    Operation::CompositeOntoColor,
                    self.transformer.composite_onto_color(&active, color),
                )
                .await
            }
            BackgroundSelection::Preset(ref url) => {
                let background = self.fetcher.fetch(url).await?;
                if self.lock().epoch != plan.epoch {
                    debug!("Reset during preset download; skipping composite");
                    return Ok(None);
                }
                self.call(
                    plan.epoch,
                    Operation::CompositeOntoImage,
                    self.transformer.composite_onto_image(&active, &background),
                )
                .await
            }
            BackgroundSelection::Upload => {
                let background = plan
                    .custom_background
                    .as_ref()
                    .ok_or(BgSwapError::BackgroundUnavailable)?;
                self.call(
                    plan.epoch,
                    Operation::CompositeOntoImage,
                    self.transformer.composite_onto_image(&active, background),
                )
                .await
            }
        }
    }

    fn cache_cartoon(&self, epoch: u64, cartoon: &ImageArtifact) -> bool {
        let mut s = self.lock();
        if s.epoch != epoch {
            return false;
        }
        s.view.cartoon = Some(cartoon.clone());
        true
    }

    fn finish_generate(
        &self,
        epoch: u64,
        result: Result<Option<ImageArtifact>, BgSwapError>,
    ) -> Result<Outcome, BgSwapError> {
        let outcome = {
            let mut s = self.lock();
            if s.epoch != epoch {
                None
            } else {
                s.view.loading = None;
                s.view.status = None;
                Some(match result {
                    Ok(Some(image)) => {
                        s.view.final_image = Some(image);
                        s.view.phase = Phase::Composited;
                        Ok(Outcome::Applied)
                    }
                    Ok(None) => Ok(Outcome::Discarded),
                    Err(e) => {
                        s.view.error = Some(e.to_string());
                        s.view.phase = Phase::Errored;
                        Err(e)
                    }
                })
            }
        };

        match outcome {
            None => {
                warn!("Generate finished after a reset; discarding result");
                Ok(Outcome::Discarded)
            }
            Some(result) => {
                match &result {
                    Ok(_) => info!("Final image composited"),
                    Err(e) => warn!("Generate failed: {}", e),
                }
                self.notify_complete(Action::Generate, &result);
                result
            }
        }
    }

    // ── Shared plumbing ──────────────────────────────────────────────────

    /// Claim the loading flag for `action`, returning the current epoch.
    fn begin(&self, action: Action, status: &str) -> Result<u64, BgSwapError> {
        let epoch = {
            let mut s = self.lock();
            if let Some(running) = s.view.loading {
                return Err(BgSwapError::Busy {
                    requested: action,
                    running,
                });
            }
            s.view.loading = Some(action);
            s.view.status = Some(status.to_string());
            s.view.error = None;
            s.view.phase = match action {
                Action::Upload => Phase::Uploading,
                Action::Generate => Phase::Generating,
            };
            s.epoch
        };
        if let Some(ref cb) = self.progress {
            cb.on_action_start(action);
            cb.on_status(status);
        }
        Ok(epoch)
    }

    /// Update the loading message; false if the session was reset.
    fn set_status(&self, epoch: u64, status: &str) -> bool {
        {
            let mut s = self.lock();
            if s.epoch != epoch {
                return false;
            }
            if s.view.status.as_deref() == Some(status) {
                return true;
            }
            s.view.status = Some(status.to_string());
        }
        if let Some(ref cb) = self.progress {
            cb.on_status(status);
        }
        true
    }

    /// Run one remote call, turning "no image" into a soft-failure error.
    ///
    /// `Ok(None)` means the session was reset before the call went out; the
    /// request is dropped unpolled and nothing is counted.
    async fn call<F>(
        &self,
        epoch: u64,
        operation: Operation,
        request: F,
    ) -> Result<Option<ImageArtifact>, BgSwapError>
    where
        F: Future<Output = TransformResult>,
    {
        {
            let mut s = self.lock();
            if s.epoch != epoch {
                debug!("{}: session reset, not sending", operation);
                return Ok(None);
            }
            s.view.remote_calls += 1;
        }
        if let Some(ref cb) = self.progress {
            cb.on_call_start(operation);
        }

        let start = Instant::now();
        let result = request.await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if let Some(ref cb) = self.progress {
            cb.on_call_complete(operation, duration_ms, matches!(result, Ok(Some(_))));
        }

        match result {
            Ok(Some(image)) => {
                debug!("{}: {} bytes ({}) in {}ms", operation, image.len(), image.media_type(), duration_ms);
                Ok(Some(image))
            }
            Ok(None) => {
                warn!("{}: model returned no image", operation);
                Err(BgSwapError::RemoteSoftFailure { operation })
            }
            Err(e) => Err(e),
        }
    }

    fn notify_complete(&self, action: Action, result: &Result<Outcome, BgSwapError>) {
        if let Some(ref cb) = self.progress {
            let message = result.as_ref().err().map(|e| e.to_string());
            cb.on_action_complete(action, message.as_deref());
        }
    }
}
