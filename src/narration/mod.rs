//! Narration: turns a thread into a directory of spoken clips.
//!
//! Components:
//! - `pipeline`: item-by-item state machine with the duration ceiling
//! - `segmenter`: splits text that exceeds the backend's character limit
//! - `assembler`: joins part clips with silence into one clip
//! - `backend` / `streamlabs`: voice synthesis over HTTP, with `rate_limit`
//! - `media` / `duration`: ffmpeg invocation and clip length probing
//! - `prepare` / `grammar`: text cleanup and optional AI smoothing

pub mod assembler;
pub mod backend;
pub mod duration;
pub mod grammar;
pub mod item;
pub mod media;
pub mod pipeline;
pub mod prepare;
pub mod rate_limit;
pub mod segmenter;
pub mod streamlabs;

#[cfg(test)]
mod testing;
