//! Joins the part clips of a split item into one clip.
//!
//! A concat manifest interleaves every part with the shared silence clip
//! (silence follows each part, the last included). After concatenation,
//! successful or not, the parts and the manifest are removed. A failed
//! concatenation also removes whatever partial clip the tool left behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::item::NarrationRun;
use super::media::MediaTool;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("no parts to assemble for clip '{0}'")]
    EmptyManifest(String),

    #[error("failed to write manifest: {0}")]
    Manifest(#[from] std::io::Error),

    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("assembled clip {} was not produced", .0.display())]
    MissingOutput(PathBuf),
}

pub struct AudioAssembler {
    media: Arc<dyn MediaTool>,
}

impl AudioAssembler {
    pub fn new(media: Arc<dyn MediaTool>) -> Self {
        Self { media }
    }

    /// Silence clip for this run, rendered on first use.
    pub async fn ensure_silence(
        &self,
        run: &mut NarrationRun,
        seconds: f64,
    ) -> Result<PathBuf, AssemblyError> {
        if let Some(existing) = run.silence() {
            if tokio::fs::try_exists(existing).await.unwrap_or(false) {
                return Ok(existing.to_path_buf());
            }
        }

        let path = run.silence_path();
        self.media.render_silence(&path, seconds).await?;
        debug!("Rendered {seconds:.2}s silence at {}", path.display());
        run.set_silence(path.clone());
        Ok(path)
    }

    /// Concatenate `parts` into the clip named `stem`, then delete the parts.
    pub async fn assemble(
        &self,
        run: &NarrationRun,
        stem: &str,
        parts: &[PathBuf],
        silence: &Path,
    ) -> Result<PathBuf, AssemblyError> {
        if parts.is_empty() {
            return Err(AssemblyError::EmptyManifest(stem.to_string()));
        }

        let manifest = run.manifest_path();
        let output = run.clip_path(stem);

        let result = match write_manifest(&manifest, parts, silence).await {
            Ok(()) => self.concat(&manifest, &output).await,
            Err(e) => Err(e),
        };

        for part in parts {
            discard(part).await;
        }
        discard(&manifest).await;

        if let Err(e) = result {
            if tokio::fs::try_exists(&output).await.unwrap_or(false) {
                discard(&output).await;
            }
            return Err(e);
        }
        info!("Assembled {} parts into {}", parts.len(), output.display());
        Ok(output)
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), AssemblyError> {
        self.media.concat(manifest, output).await?;
        if tokio::fs::try_exists(output).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(AssemblyError::MissingOutput(output.to_path_buf()))
        }
    }
}

/// Manifest text in ffmpeg concat-demuxer syntax.
///
/// Entries in the manifest's own directory are written as bare file
/// names; ffmpeg resolves them relative to the manifest.
pub fn manifest_contents(manifest: &Path, parts: &[PathBuf], silence: &Path) -> String {
    let dir = manifest.parent();
    let entry = |path: &Path| -> String {
        let name = match (path.parent(), path.file_name()) {
            (parent, Some(name)) if parent == dir => name.to_string_lossy().into_owned(),
            _ => path.to_string_lossy().into_owned(),
        };
        format!("file '{}'\n", name.replace('\'', r"'\''"))
    };

    let silence_line = entry(silence);
    let mut contents = String::new();
    for part in parts {
        contents.push_str(&entry(part));
        contents.push_str(&silence_line);
    }
    contents
}

async fn write_manifest(
    manifest: &Path,
    parts: &[PathBuf],
    silence: &Path,
) -> Result<(), AssemblyError> {
    tokio::fs::write(manifest, manifest_contents(manifest, parts, silence)).await?;
    Ok(())
}

/// Remove a transient file. Failures are logged, never returned.
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("File not found: {}", path.display());
        }
        Err(e) => warn!("Failed to remove {}: {e}", path.display()),
    }
}
