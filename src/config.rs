//! Configuration management for thread-narrator.
//!
//! Loads config from YAML files in standard locations. Every section
//! falls back to its defaults, so a partial file is always valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub voice_choice: String,
    pub streamlabs_polly_voice: String,
    pub random_voice: bool,
    pub silence_duration: f64,
    pub no_emojis: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_choice: "streamlabspolly".into(),
            streamlabs_polly_voice: "Matthew".into(),
            random_voice: false,
            silence_duration: 0.3,
            no_emojis: false,
            endpoint: "https://streamlabs.com/polly/speak".into(),
            timeout_secs: 30,
        }
    }
}

/// How a story post is voiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryModeMethod {
    /// The whole post is one clip.
    SingleClip,
    /// One clip per post element, voiced regardless of the duration ceiling.
    PerElement,
}

/// What happens when the accumulated duration crosses the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// The first two post-title items are never checked and the rejected
    /// clip stays on disk.
    Compatible,
    /// Every post-title item is checked and the rejected clip is deleted.
    Strict,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub max_duration: f64,
    pub storymode: bool,
    pub storymodemethod: StoryModeMethod,
    pub budget_mode: BudgetMode,
    pub output_dir: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            max_duration: 50.0,
            storymode: false,
            storymodemethod: StoryModeMethod::PerElement,
            budget_mode: BudgetMode::Compatible,
            output_dir: "assets/temp".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub grammar_fix: bool,
    pub model: String,
    pub host: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            grammar_fix: false,
            model: "llama3.2:3b".into(),
            host: "http://localhost:11434".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Whole-word, case-insensitive `[from, to]` substitutions.
    pub replacements: Vec<(String, String)>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tts: TtsConfig,
    pub narration: NarrationConfig,
    pub ai: AiConfig,
    pub text: TextConfig,
    pub media: MediaConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/thread-narrator/config.yaml
    /// 3. /etc/thread-narrator/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/thread-narrator/config.yaml")),
                Some(PathBuf::from("/etc/thread-narrator/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse("narration:\n  max_duration: 90\n").unwrap();
        assert_eq!(config.narration.max_duration, 90.0);
        assert!(!config.narration.storymode);
        assert_eq!(config.narration.budget_mode, BudgetMode::Compatible);
        assert_eq!(config.tts.voice_choice, "streamlabspolly");
        assert_eq!(config.media.ffmpeg, "ffmpeg");
    }

    #[test]
    fn parses_story_mode_and_replacements() {
        let yaml = r#"
tts:
  random_voice: true
  silence_duration: 0.5
narration:
  storymode: true
  storymodemethod: single_clip
  budget_mode: strict
text:
  replacements:
    - ["AITA", "am I the jerk"]
"#;
        let config = Config::parse(yaml).unwrap();
        assert!(config.tts.random_voice);
        assert_eq!(config.tts.silence_duration, 0.5);
        assert_eq!(config.narration.storymodemethod, StoryModeMethod::SingleClip);
        assert_eq!(config.narration.budget_mode, BudgetMode::Strict);
        assert_eq!(
            config.text.replacements,
            vec![("AITA".to_string(), "am I the jerk".to_string())]
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.yaml")));
        assert_eq!(config.narration.max_duration, 50.0);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "narration: [not, a, map").unwrap();
        let config = Config::load(Some(&path));
        assert_eq!(config.tts.streamlabs_polly_voice, "Matthew");
    }
}
