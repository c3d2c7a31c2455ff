//! Export: hand the final image to the user as a file.

use crate::artifact::ImageArtifact;
use crate::error::BgSwapError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// File name offered for every download, regardless of media type.
pub const EXPORT_FILENAME: &str = "edited-image.png";

/// A downloadable final image.
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub filename: &'static str,
    pub image: ImageArtifact,
}

impl ExportArtifact {
    pub fn new(image: ImageArtifact) -> Self {
        Self {
            filename: EXPORT_FILENAME,
            image,
        }
    }

    pub fn media_type(&self) -> &str {
        self.image.media_type()
    }

    pub fn bytes(&self) -> &[u8] {
        self.image.bytes()
    }
}

/// Write the export to `path`; a directory gets [`EXPORT_FILENAME`] inside it.
///
/// Writes to a temp file in the same directory and renames it into place, so
/// a crash never leaves a truncated image behind.
pub fn write_export(export: &ExportArtifact, path: impl AsRef<Path>) -> Result<std::path::PathBuf, BgSwapError> {
    let requested = path.as_ref();
    let target = if requested.is_dir() {
        requested.join(export.filename)
    } else {
        requested.to_path_buf()
    };

    let write_err = |source: std::io::Error| BgSwapError::OutputWriteFailed {
        path: target.clone(),
        source,
    };

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(export.bytes()).map_err(write_err)?;
    tmp.persist(&target).map_err(|e| write_err(e.error))?;

    info!(
        "Wrote {} ({} bytes, {})",
        target.display(),
        export.bytes().len(),
        export.media_type()
    );
    Ok(target)
}
