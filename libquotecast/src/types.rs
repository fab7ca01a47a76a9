//! Core types for Quotecast

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Maximum quote length in characters
pub const MAX_QUOTE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub content: String,
    pub author: String,
}

impl Quote {
    pub fn new(content: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
        }
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.content, self.author)
    }
}

/// An hour-of-day interval `[start, end)` in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingWindow {
    pub start: u32,
    pub end: u32,
}

impl PostingWindow {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Check whether an hour (0-23) falls inside the window
    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

impl std::fmt::Display for PostingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start, self.end)
    }
}

/// Confirmation record returned by the platform after a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Platform-specific media identifier
    pub media_id: String,
    /// Short code or permalink slug, when the platform provides one
    pub code: Option<String>,
    /// Local wall-clock time the publish was confirmed
    pub published_at: NaiveDateTime,
}

/// Bookkeeping for a single run's publish attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct PublishAttempt {
    pub artifact_path: PathBuf,
    pub caption: String,
    pub attempts_made: u32,
    pub last_error: Option<PlatformError>,
}

impl PublishAttempt {
    pub fn new(artifact_path: PathBuf, caption: String) -> Self {
        Self {
            artifact_path,
            caption,
            attempts_made: 0,
            last_error: None,
        }
    }

    pub fn record_failure(&mut self, error: PlatformError) {
        self.last_error = Some(error);
    }
}
