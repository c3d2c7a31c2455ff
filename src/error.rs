//! Error types for the edgequake-bgswap library.
//!
//! A single enum covers every failure, grouped by where it happens:
//!
//! * **Input**: the local file could not be read or does not claim to be an
//!   image, or a URL fetch failed.
//! * **Remote**: the generative model either answered without an image
//!   ([`BgSwapError::RemoteSoftFailure`]) or the call itself failed
//!   ([`BgSwapError::RemoteTransportFailure`]). The two are kept apart because
//!   callers word them differently to the user.
//! * **Session**: the state machine refused an action (already busy, no
//!   custom background, nothing to export).
//!
//! Whether a failure unwinds the session is decided by the transition, not
//! the error: see [`crate::session::Studio`].

use crate::session::Action;
use crate::transform::Operation;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-bgswap library.
#[derive(Debug, Error)]
pub enum BgSwapError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Local image file could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file neither has an image extension nor image magic bytes.
    #[error("File '{path}' is not a recognised image (PNG, JPEG, WEBP, ...)")]
    NotAnImage { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// Downloading an image (preset background or remote input) failed.
    #[error("Failed to fetch '{url}': {reason}")]
    FetchError { url: String, reason: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The model answered but the response carried no usable image.
    #[error("{}", operation.failure_message())]
    RemoteSoftFailure { operation: Operation },

    /// Network, HTTP status, or response-decoding failure talking to the model.
    #[error("{operation} request failed: {detail}")]
    RemoteTransportFailure { operation: Operation, detail: String },

    /// No API key was configured or found in the environment.
    #[error("Image model is not configured.\n{hint}")]
    MissingApiKey { hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// A background colour was not `#rgb` or `#rrggbb`.
    #[error("Invalid colour '{value}': expected #rgb or #rrggbb")]
    InvalidColor { value: String },

    /// The `Upload` background is selected but nothing was uploaded.
    #[error("Selected background is not available.")]
    BackgroundUnavailable,

    /// Another upload or generate is still in flight.
    #[error("Cannot start {requested}: {running} is still in progress")]
    Busy { requested: Action, running: Action },

    /// Export was requested before any image was composited.
    #[error("There is no final image to export yet")]
    NoFinalImage,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgSwapError {
    /// The model returned no image; worth retrying with other settings.
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, BgSwapError::RemoteSoftFailure { .. })
    }

    /// The call to the model itself failed.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, BgSwapError::RemoteTransportFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_failure_uses_user_facing_message() {
        let e = BgSwapError::RemoteSoftFailure {
            operation: Operation::RemoveBackground,
        };
        assert!(e.is_soft_failure());
        assert!(!e.is_transport_failure());
        assert!(e.to_string().contains("Failed to remove background"), "got: {e}");
    }

    #[test]
    fn transport_failure_display() {
        let e = BgSwapError::RemoteTransportFailure {
            operation: Operation::Cartoonify,
            detail: "HTTP 503".into(),
        };
        assert!(e.is_transport_failure());
        let msg = e.to_string();
        assert!(msg.contains("cartoonify"), "got: {msg}");
        assert!(msg.contains("HTTP 503"), "got: {msg}");
    }

    #[test]
    fn busy_display_names_both_actions() {
        let e = BgSwapError::Busy {
            requested: Action::Generate,
            running: Action::Upload,
        };
        let msg = e.to_string();
        assert!(msg.contains("generate"));
        assert!(msg.contains("upload"));
    }

    #[test]
    fn background_unavailable_display() {
        assert_eq!(
            BgSwapError::BackgroundUnavailable.to_string(),
            "Selected background is not available."
        );
    }
}
