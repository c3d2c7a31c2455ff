//! Progress-callback trait for session events.
//!
//! Inject an [`Arc<dyn StudioProgressCallback>`] via
//! [`crate::config::StudioConfigBuilder::progress_callback`] to receive
//! status messages and per-call timings while an action runs.
//!
//! # Example
//!
//! ```rust
//! use edgequake_bgswap::{StudioConfig, StudioProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl StudioProgressCallback for Printer {
//!     fn on_status(&self, message: &str) {
//!         eprintln!("{message}");
//!     }
//! }
//!
//! let config = StudioConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn StudioProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::session::Action;
use crate::transform::Operation;
use std::sync::Arc;

/// Called by [`crate::session::Studio`] as actions progress.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: a studio
/// handle may be driven from any tokio task.
pub trait StudioProgressCallback: Send + Sync {
    /// An upload or generate has started.
    fn on_action_start(&self, action: Action) {
        let _ = action;
    }

    /// The human-readable loading message changed.
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// A remote model call is about to be sent.
    fn on_call_start(&self, operation: Operation) {
        let _ = operation;
    }

    /// A remote model call returned (with or without an image).
    fn on_call_complete(&self, operation: Operation, duration_ms: u64, produced_image: bool) {
        let _ = (operation, duration_ms, produced_image);
    }

    /// The action finished. `error` is the message shown to the user, if any.
    fn on_action_complete(&self, action: Action, error: Option<&str>) {
        let _ = (action, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StudioProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudioConfig`].
pub type ProgressCallback = Arc<dyn StudioProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl StudioProgressCallback for Recorder {
        fn on_status(&self, message: &str) {
            self.events.lock().unwrap().push(format!("status:{message}"));
        }

        fn on_call_complete(&self, operation: Operation, _duration_ms: u64, produced_image: bool) {
            self.events
                .lock()
                .unwrap()
                .push(format!("call:{operation}:{produced_image}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_action_start(Action::Upload);
        cb.on_status("Removing background...");
        cb.on_call_start(Operation::RemoveBackground);
        cb.on_call_complete(Operation::RemoveBackground, 12, true);
        cb.on_action_complete(Action::Upload, None);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_action_start(Action::Generate);
        rec.on_status("Compositing your masterpiece...");
        rec.on_call_complete(Operation::CompositeOntoColor, 5, false);

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "status:Compositing your masterpiece...".to_string(),
                "call:composite-onto-color:false".to_string(),
            ]
        );
    }
}
