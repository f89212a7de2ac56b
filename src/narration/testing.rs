//! In-memory stand-ins for the clock, voice backend, media tool and probe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::assembler::AssemblyError;
use super::backend::{SynthesisError, VoiceBackend, VoiceSelector};
use super::duration::{DurationProbe, MeasureError};
use super::media::MediaTool;
use super::rate_limit::Clock;

/// Clock whose `sleep` returns at once and moves `now` forward.
pub struct FakeClock {
    state: Mutex<(f64, Duration)>,
}

impl FakeClock {
    pub fn at(now: f64) -> Self {
        Self {
            state: Mutex::new((now, Duration::ZERO)),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.state.lock().unwrap().1
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().0
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 += duration.as_secs_f64();
        state.1 += duration;
    }
}

type FailWhen = Box<dyn Fn(&str, &Path) -> bool + Send + Sync>;

/// Backend that writes the text itself as the "audio".
pub struct FakeBackend {
    max_chars: usize,
    fail_when: Option<FailWhen>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeBackend {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            fail_when: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call for which `predicate(text, destination)` holds.
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&str, &Path) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceBackend for FakeBackend {
    fn max_chars(&self) -> usize {
        self.max_chars
    }

    async fn synthesize(
        &self,
        text: &str,
        destination: &Path,
        _voice: &VoiceSelector,
    ) -> Result<(), SynthesisError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), destination.to_path_buf()));

        if self.fail_when.as_ref().is_some_and(|f| f(text, destination)) {
            return Err(SynthesisError::MalformedResponse("fake failure".into()));
        }
        tokio::fs::write(destination, text).await?;
        Ok(())
    }
}

/// Media tool that concatenates bytes and renders silence as `~`.
#[derive(Default)]
pub struct FakeMedia {
    fail_concat: bool,
    partial_output: bool,
    silence_renders: AtomicUsize,
}

impl FakeMedia {
    pub fn failing_concat() -> Self {
        Self {
            fail_concat: true,
            ..Self::default()
        }
    }

    /// Writes a truncated output, then fails like an interrupted ffmpeg.
    pub fn partial_concat() -> Self {
        Self {
            fail_concat: true,
            partial_output: true,
            ..Self::default()
        }
    }

    pub fn silence_renders(&self) -> usize {
        self.silence_renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTool for FakeMedia {
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<(), AssemblyError> {
        if self.fail_concat {
            if self.partial_output {
                tokio::fs::write(output, "half").await?;
            }
            return Err(AssemblyError::ToolFailed {
                tool: "fake".into(),
                status: "exit status: 1".into(),
                stderr: "concat failed".into(),
            });
        }

        let dir = manifest.parent().unwrap_or(Path::new("."));
        let listing = tokio::fs::read_to_string(manifest).await?;
        let mut joined = Vec::new();
        for line in listing.lines() {
            let Some(quoted) = line.strip_prefix("file '").and_then(|l| l.strip_suffix('\'')) else {
                continue;
            };
            let entry = quoted.replace(r"'\''", "'");
            joined.extend(tokio::fs::read(dir.join(entry)).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }

    async fn render_silence(&self, output: &Path, _seconds: f64) -> Result<(), AssemblyError> {
        self.silence_renders.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, "~").await?;
        Ok(())
    }
}

/// Probe that reports a fixed duration per clip stem.
pub struct FakeProbe {
    durations: HashMap<String, f64>,
    default: f64,
}

impl FakeProbe {
    pub fn new(default: f64) -> Self {
        Self {
            durations: HashMap::new(),
            default,
        }
    }

    pub fn with(mut self, stem: &str, seconds: f64) -> Self {
        self.durations.insert(stem.to_string(), seconds);
        self
    }
}

impl DurationProbe for FakeProbe {
    fn duration(&self, path: &Path) -> Result<f64, MeasureError> {
        if !path.exists() {
            return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.durations.get(&stem).copied().unwrap_or(self.default))
    }
}
