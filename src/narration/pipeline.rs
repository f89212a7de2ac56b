//! Narration pipeline: voices a thread item by item into the target directory.
//!
//! Per item: PENDING → VOICING → MEASURING → ACCEPTED | BUDGET_EXCEEDED
//!
//! The title is voiced first and must succeed. Comments follow in order
//! until the accumulated duration crosses the ceiling, at which point the
//! crossing item's duration is rolled back and the run stops. In story
//! mode the post is voiced instead of the comments, with no ceiling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{BudgetMode, Config, StoryModeMethod};
use crate::thread::Thread;

use super::assembler::{discard, AssemblyError, AudioAssembler};
use super::backend::{SynthesisError, VoiceBackend, VoiceSelector};
use super::duration::{DurationProbe, MeasureError};
use super::item::{ItemKind, NarrationItem, NarrationRun};
use super::prepare::TextPreparer;
use super::segmenter::segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Voicing,
    Measuring,
    Accepted,
    BudgetExceeded,
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Voicing => write!(f, "VOICING"),
            Self::Measuring => write!(f, "MEASURING"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::BudgetExceeded => write!(f, "BUDGET_EXCEEDED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub voice: VoiceSelector,
    pub duration_ceiling: f64,
    pub silence_duration: f64,
    /// `None` narrates comments; `Some` narrates the story post instead.
    pub story_mode: Option<StoryModeMethod>,
    pub budget: BudgetMode,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            voice: VoiceSelector::from_config(
                config.tts.random_voice,
                &config.tts.streamlabs_polly_voice,
            ),
            duration_ceiling: config.narration.max_duration,
            silence_duration: config.tts.silence_duration,
            story_mode: config
                .narration
                .storymode
                .then_some(config.narration.storymodemethod),
            budget: config.narration.budget_mode,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationOutcome {
    /// Seconds of audio counted toward the narration, title included.
    pub accumulated_duration: f64,
    /// Ordinal of the last item counted. Saturates at 0, so a run whose
    /// first comment was rejected also reports 0; check `accepted` to tell
    /// the two apart.
    pub highest_ordinal: usize,
    /// The duration ceiling cut the run short.
    pub stopped_early: bool,
    /// Items after the title that were voiced and kept.
    pub accepted: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("cannot create target directory {}: {source}", dir.display())]
    TargetDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to voice the {kind}: {source}")]
    Mandatory {
        kind: ItemKind,
        #[source]
        source: SynthesisError,
    },

    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

pub struct NarrationPipeline {
    backend: Arc<dyn VoiceBackend>,
    assembler: AudioAssembler,
    probe: Arc<dyn DurationProbe>,
    preparer: TextPreparer,
    settings: PipelineSettings,
}

impl NarrationPipeline {
    pub fn new(
        backend: Arc<dyn VoiceBackend>,
        assembler: AudioAssembler,
        probe: Arc<dyn DurationProbe>,
        preparer: TextPreparer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            backend,
            assembler,
            probe,
            preparer,
            settings,
        }
    }

    pub async fn run(
        &self,
        thread: &Thread,
        target_directory: &Path,
    ) -> Result<NarrationOutcome, NarrationError> {
        tokio::fs::create_dir_all(target_directory)
            .await
            .map_err(|source| NarrationError::TargetDirectory {
                dir: target_directory.to_path_buf(),
                source,
            })?;

        let mut run = NarrationRun::new(target_directory, self.settings.duration_ceiling);
        info!(
            "Narrating thread {} into {}",
            thread.thread_id,
            target_directory.display()
        );

        self.narrate_title(&mut run, &thread.title_item()).await?;

        let outcome = match self.settings.story_mode {
            Some(method) => self.narrate_story(&mut run, thread.post_items(method)).await?,
            None => self.narrate_comments(&mut run, thread.comment_items()).await?,
        };

        info!(
            "Narration finished: {:.2}s across {} items (last ordinal {}){}",
            outcome.accumulated_duration,
            outcome.accepted,
            outcome.highest_ordinal,
            if outcome.stopped_early { ", stopped at duration ceiling" } else { "" }
        );
        Ok(outcome)
    }

    async fn narrate_title(
        &self,
        run: &mut NarrationRun,
        title: &NarrationItem,
    ) -> Result<(), NarrationError> {
        let text = self.preparer.prepare(&title.text).await;
        self.backend
            .synthesize(&text, &run.clip_path(title.stem()), &self.settings.voice)
            .await
            .map_err(|source| NarrationError::Mandatory {
                kind: title.kind,
                source,
            })?;

        let duration = self.measure(&run.clip_path(title.stem())).await;
        run.record(duration);
        debug!("Title voiced ({duration:.2}s)");
        Ok(())
    }

    async fn narrate_comments(
        &self,
        run: &mut NarrationRun,
        items: Vec<NarrationItem>,
    ) -> Result<NarrationOutcome, NarrationError> {
        let mut accepted = 0;

        for item in &items {
            self.voice_and_measure(run, item).await?;
            run.last_completed_ordinal = item.ordinal;

            if self.budget_applies(item.ordinal) && run.over_ceiling() {
                transition(item, ItemState::Measuring, ItemState::BudgetExceeded);
                run.roll_back();
                run.last_completed_ordinal = item.ordinal.saturating_sub(1);
                info!(
                    "Duration ceiling of {:.1}s crossed at {} {}, stopping",
                    run.duration_ceiling, item.kind, item.ordinal
                );
                if self.settings.budget == BudgetMode::Strict {
                    discard(&run.clip_path(item.stem())).await;
                }
                return Ok(outcome(run, true, accepted));
            }

            transition(item, ItemState::Measuring, ItemState::Accepted);
            accepted += 1;
        }

        Ok(outcome(run, false, accepted))
    }

    /// Every story item is voiced; the ceiling does not apply.
    async fn narrate_story(
        &self,
        run: &mut NarrationRun,
        items: Vec<NarrationItem>,
    ) -> Result<NarrationOutcome, NarrationError> {
        for item in &items {
            self.voice_and_measure(run, item).await?;
            run.last_completed_ordinal = item.ordinal;
            transition(item, ItemState::Measuring, ItemState::Accepted);
        }
        Ok(outcome(run, false, items.len()))
    }

    fn budget_applies(&self, ordinal: usize) -> bool {
        match self.settings.budget {
            BudgetMode::Compatible => ordinal > 1,
            BudgetMode::Strict => true,
        }
    }

    async fn voice_and_measure(
        &self,
        run: &mut NarrationRun,
        item: &NarrationItem,
    ) -> Result<(), AssemblyError> {
        transition(item, ItemState::Pending, ItemState::Voicing);
        self.voice_item(run, item).await?;

        transition(item, ItemState::Voicing, ItemState::Measuring);
        let duration = self.measure(&run.clip_path(item.stem())).await;
        run.record(duration);
        debug!(
            "{} {} measured {duration:.2}s, total {:.2}s",
            item.kind, item.ordinal, run.accumulated_duration
        );
        Ok(())
    }

    /// Produce the clip for one item. A synthesis failure leaves it absent.
    async fn voice_item(
        &self,
        run: &mut NarrationRun,
        item: &NarrationItem,
    ) -> Result<(), AssemblyError> {
        if item.text.chars().count() > self.backend.max_chars() {
            return self.voice_split(run, item).await;
        }

        let text = self.preparer.prepare(&item.text).await;
        let clip = run.clip_path(item.stem());
        if let Err(e) = self.backend.synthesize(&text, &clip, &self.settings.voice).await {
            warn!("Failed to voice {} {}: {e}", item.kind, item.ordinal);
        }
        Ok(())
    }

    async fn voice_split(
        &self,
        run: &mut NarrationRun,
        item: &NarrationItem,
    ) -> Result<(), AssemblyError> {
        let silence = self
            .assembler
            .ensure_silence(run, self.settings.silence_duration)
            .await?;

        let segments = segment(&item.text, self.backend.max_chars());
        debug!("Split {} {} into {} segments", item.kind, item.ordinal, segments.len());

        let mut parts = Vec::with_capacity(segments.len());
        for (idx, raw) in segments.iter().enumerate() {
            let text = self.preparer.prepare(raw).await;
            if text.is_empty() {
                warn!(
                    "Segment {idx} of {} {} is blank after cleanup, skipping",
                    item.kind, item.ordinal
                );
                continue;
            }

            let part = run.part_path(item.stem(), idx);
            match self.backend.synthesize(&text, &part, &self.settings.voice).await {
                Ok(()) => parts.push(part),
                Err(e) => {
                    warn!("Skipping segment {idx} of {} {}: {e}", item.kind, item.ordinal);
                    if tokio::fs::try_exists(&part).await.unwrap_or(false) {
                        discard(&part).await;
                    }
                }
            }
        }

        self.assembler
            .assemble(run, item.stem(), &parts, &silence)
            .await
            .map(|_| ())
    }

    /// Clip length in seconds; unreadable clips count as zero.
    async fn measure(&self, clip: &Path) -> f64 {
        let probe = Arc::clone(&self.probe);
        let path = clip.to_path_buf();
        let result = tokio::task::spawn_blocking(move || probe.duration(&path))
            .await
            .map_err(MeasureError::from)
            .and_then(|measured| measured);

        match result {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not measure {}: {e}", clip.display());
                0.0
            }
        }
    }
}

fn transition(item: &NarrationItem, from: ItemState, to: ItemState) {
    debug!("State: {from} → {to} ({} {})", item.kind, item.ordinal);
}

fn outcome(run: &NarrationRun, stopped_early: bool, accepted: usize) -> NarrationOutcome {
    NarrationOutcome {
        accumulated_duration: run.accumulated_duration,
        highest_ordinal: run.last_completed_ordinal,
        stopped_early,
        accepted,
    }
}
