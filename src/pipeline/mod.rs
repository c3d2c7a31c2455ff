//! Pipeline stages between the user's files and the remote model.
//!
//! Each submodule implements exactly one concern, so each is independently
//! testable and the model client can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ gemini ──▶ encode ──▶ export
//! (file/URL) (base64)  (model)   (decode)   (file)
//! ```
//!
//! 1. [`input`] : read a local file or download a URL into an
//!    [`crate::artifact::ImageArtifact`]; also the [`input::ImageFetcher`]
//!    used for preset backgrounds
//! 2. [`encode`]: wrap artifacts as base64 `inlineData` parts and back
//! 3. [`gemini`]: the `generateContent` client; the only stage that talks
//!    to the model
//! 4. [`export`]: write the final image to disk atomically

pub mod encode;
pub mod export;
pub mod gemini;
pub mod input;
