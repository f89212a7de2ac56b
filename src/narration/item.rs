//! Narration items and the mutable state of one pipeline run.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Title,
    Post,
    Comment,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Post => write!(f, "post"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// One piece of text to voice. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationItem {
    pub ordinal: usize,
    pub text: String,
    pub kind: ItemKind,
    stem: String,
}

impl NarrationItem {
    pub fn title(text: impl Into<String>) -> Self {
        Self {
            ordinal: 0,
            text: text.into(),
            kind: ItemKind::Title,
            stem: "title".into(),
        }
    }

    pub fn comment(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
            kind: ItemKind::Comment,
            stem: ordinal.to_string(),
        }
    }

    /// A whole story post voiced as a single clip.
    pub fn post(text: impl Into<String>) -> Self {
        Self {
            ordinal: 0,
            text: text.into(),
            kind: ItemKind::Post,
            stem: "postaudio".into(),
        }
    }

    /// One element of a story post voiced into its own clip.
    pub fn post_element(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
            kind: ItemKind::Post,
            stem: format!("postaudio-{ordinal}"),
        }
    }

    /// File stem of the clip this item produces.
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

/// Running state of one narration.
///
/// `accumulated_duration` only grows, except for the single rollback
/// applied when the ceiling is crossed.
#[derive(Debug)]
pub struct NarrationRun {
    target_directory: PathBuf,
    pub accumulated_duration: f64,
    pub duration_ceiling: f64,
    pub last_item_duration: f64,
    pub last_completed_ordinal: usize,
    silence: Option<PathBuf>,
}

impl NarrationRun {
    pub fn new(target_directory: impl Into<PathBuf>, duration_ceiling: f64) -> Self {
        Self {
            target_directory: target_directory.into(),
            accumulated_duration: 0.0,
            duration_ceiling,
            last_item_duration: 0.0,
            last_completed_ordinal: 0,
            silence: None,
        }
    }

    pub fn clip_path(&self, stem: &str) -> PathBuf {
        self.target_directory.join(format!("{stem}.mp3"))
    }

    pub fn part_path(&self, stem: &str, part: usize) -> PathBuf {
        self.target_directory.join(format!("{stem}-{part}.part.mp3"))
    }

    pub fn silence_path(&self) -> PathBuf {
        self.target_directory.join("silence.mp3")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.target_directory.join("list.txt")
    }

    /// Silence clip rendered during this run, if any.
    pub fn silence(&self) -> Option<&Path> {
        self.silence.as_deref()
    }

    pub fn set_silence(&mut self, path: PathBuf) {
        self.silence = Some(path);
    }

    /// Fold a measured clip into the running total.
    pub fn record(&mut self, duration: f64) {
        self.last_item_duration = duration;
        self.accumulated_duration += duration;
    }

    pub fn over_ceiling(&self) -> bool {
        self.accumulated_duration > self.duration_ceiling
    }

    /// Undo the most recent `record`.
    pub fn roll_back(&mut self) {
        self.accumulated_duration -= self.last_item_duration;
    }
}
