//! External media tooling: stream concatenation and silence rendering.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::assembler::AssemblyError;

#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Join the files listed in a concat manifest into `output` without re-encoding.
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), AssemblyError>;

    /// Write a silent mp3 of the given length to `output`.
    async fn render_silence(&self, output: &Path, seconds: f64) -> Result<(), AssemblyError>;
}

pub struct Ffmpeg {
    binary: String,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, command: &mut Command) -> Result<(), AssemblyError> {
        let output = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| AssemblyError::Spawn {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AssemblyError::ToolFailed {
                tool: self.binary.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MediaTool for Ffmpeg {
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), AssemblyError> {
        debug!("ffmpeg concat {} -> {}", manifest.display(), output.display());
        let mut command = Command::new(&self.binary);
        command
            .args(["-f", "concat", "-y", "-hide_banner", "-loglevel", "error", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-c", "copy"])
            .arg(output);
        self.run(&mut command).await
    }

    async fn render_silence(&self, output: &Path, seconds: f64) -> Result<(), AssemblyError> {
        debug!("ffmpeg silence {seconds:.2}s -> {}", output.display());
        let mut command = Command::new(&self.binary);
        command
            .args(["-f", "lavfi", "-i", "anullsrc=r=44100:cl=mono", "-t"])
            .arg(format!("{seconds:.3}"))
            .args(["-q:a", "9", "-acodec", "libmp3lame", "-y", "-hide_banner", "-loglevel", "error"])
            .arg(output);
        self.run(&mut command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let ffmpeg = Ffmpeg::new("definitely-not-an-ffmpeg-binary");
        let dir = tempfile::tempdir().unwrap();
        let err = ffmpeg
            .concat(&dir.path().join("list.txt"), &dir.path().join("0.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_tool_failure() {
        let tool = Ffmpeg::new("false");
        let dir = tempfile::tempdir().unwrap();
        let err = tool
            .render_silence(&dir.path().join("silence.mp3"), 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, AssemblyError::ToolFailed { .. }));
    }
}
