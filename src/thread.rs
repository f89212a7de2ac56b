//! Thread documents handed over by the content-extraction step.
//!
//! The document is the JSON the scraper writes: a title, an optional
//! story post (one string or a list of paragraphs) and the comments.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::StoryModeMethod;
use crate::narration::item::NarrationItem;
use crate::text::{add_periods, sanitize_thread_id};

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub comment_body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThreadPost {
    Single(String),
    Elements(Vec<String>),
}

impl Default for ThreadPost {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub thread_title: String,
    #[serde(default)]
    pub thread_post: ThreadPost,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Thread {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Where this thread's clips are written.
    pub fn target_directory(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(sanitize_thread_id(&self.thread_id))
            .join("mp3")
    }

    pub fn title_item(&self) -> NarrationItem {
        NarrationItem::title(&self.thread_title)
    }

    /// Comment items, punctuated for speech.
    pub fn comment_items(&self) -> Vec<NarrationItem> {
        self.comments
            .iter()
            .enumerate()
            .map(|(idx, c)| NarrationItem::comment(idx, add_periods(&c.comment_body)))
            .collect()
    }

    /// Story post items for the given story-mode method.
    pub fn post_items(&self, method: StoryModeMethod) -> Vec<NarrationItem> {
        match (method, &self.thread_post) {
            (StoryModeMethod::SingleClip, ThreadPost::Single(text)) => {
                vec![NarrationItem::post(text.clone())]
            }
            (StoryModeMethod::SingleClip, ThreadPost::Elements(parts)) => {
                vec![NarrationItem::post(parts.join(" "))]
            }
            (StoryModeMethod::PerElement, ThreadPost::Single(text)) => {
                vec![NarrationItem::post_element(0, text.clone())]
            }
            (StoryModeMethod::PerElement, ThreadPost::Elements(parts)) => parts
                .iter()
                .enumerate()
                .map(|(idx, text)| NarrationItem::post_element(idx, text.clone()))
                .collect(),
        }
    }
}
