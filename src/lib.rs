//! tubeforge - serialized video download engine
//!
//! Accepts video URLs from any number of producers, runs them one at a time through
//! yt-dlp with a browser-cookie attempt and an anonymous fallback, and optionally
//! burns subtitles into the result with ffmpeg.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process helpers, HTTP trigger, shutdown
//! - `download`: queue, job runner, fetcher, subtitle compositor, events

pub mod cli;
pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use download::{JobRunner, TaskInput, TaskQueue, TaskSubmitter};
