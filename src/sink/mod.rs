//! Output sink: persists composed canvases.
//!
//! The sink is called from the composition pipeline, which already runs on a
//! blocking thread, so it uses synchronous filesystem calls.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::codec::{encode_png, CodecError};
use crate::constants::OUTPUT_EXTENSION;

/// Errors that can occur while storing a composed image.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("Failed to write output file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove output file {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a composed image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: PathBuf,
}

/// Accepts a finished canvas and returns where it was stored.
pub trait OutputSink: Send + Sync {
    fn store(&self, canvas: &RgbaImage) -> Result<StoredImage, SinkError>;

    /// Remove an image that was stored but whose request is no longer
    /// waiting for it.
    fn discard(&self, stored: &StoredImage) -> Result<(), SinkError>;
}

/// Writes canvases as PNG files named `<uuid-v4>.png` into a directory.
///
/// The random name is what keeps concurrent requests from colliding; files
/// are created with `create_new` so an unlikely collision fails instead of
/// overwriting.
#[derive(Debug, Clone)]
pub struct PngFileSink {
    directory: PathBuf,
}

impl PngFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn next_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", Uuid::new_v4(), OUTPUT_EXTENSION))
    }
}

impl OutputSink for PngFileSink {
    fn store(&self, canvas: &RgbaImage) -> Result<StoredImage, SinkError> {
        // Encode before touching the filesystem so a failed encode leaves no file
        let data = encode_png(canvas)?;
        let path = self.next_path();

        write_new_file(&path, &data).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            bytes = data.len(),
            "Stored composed image"
        );

        Ok(StoredImage { path })
    }

    fn discard(&self, stored: &StoredImage) -> Result<(), SinkError> {
        std::fs::remove_file(&stored.path).map_err(|source| SinkError::Remove {
            path: stored.path.clone(),
            source,
        })?;
        tracing::debug!(path = %stored.path.display(), "Discarded unclaimed image");
        Ok(())
    }
}

fn write_new_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    write_new_file_with(path, |file| {
        file.write_all(data)?;
        file.sync_all()
    })
}

/// Create `path` (it must not exist) and fill it with `write`.
///
/// A file this call created is removed again when `write` fails, so no
/// truncated output is left behind. An existing file is never touched.
fn write_new_file_with<F>(path: &Path, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;

    if let Err(err) = write(&mut file) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(path) {
            tracing::warn!(
                path = %path.display(),
                error = %cleanup,
                "Failed to remove partially written output file"
            );
        }
        return Err(err);
    }
    Ok(())
}
