//! Failure classification for platform errors
//!
//! Structured error kinds are trusted as-is. Free-text errors
//! (`PlatformError::Other`) are matched against the marker rules below,
//! which are the only place message text is interpreted. A marker only
//! matches on word boundaries, so `429` does not match inside `14290` and
//! `block` does not match `blocking`.

use crate::error::PlatformError;

/// What a failed platform call means for the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying after a backoff
    Transient,
    /// Abort remaining retries; credentials or session are bad
    FatalCritical,
    /// The platform suspects automation; abort and cool down
    AbuseSuspected,
}

/// Message fragments that signal rate limiting, spam flagging, account
/// blocks, or forced-login checkpoints. Checked before [`LOGIN_MARKERS`].
pub const ABUSE_MARKERS: &[&str] = &[
    "spam",
    "block",
    "blocked",
    "rate limit",
    "rate limited",
    "rate_limit",
    "ratelimit",
    "ratelimited",
    "too many requests",
    "feedback_required",
    "checkpoint",
    "please wait a few minutes",
    "429",
];

/// Message fragments that signal an invalid login or session
pub const LOGIN_MARKERS: &[&str] = &[
    "login",
    "challenge_required",
    "session",
    "unauthorized",
    "401",
];

pub fn classify(error: &PlatformError) -> FailureClass {
    match error {
        PlatformError::Authentication(_) => FailureClass::FatalCritical,
        PlatformError::RateLimit(_) | PlatformError::Blocked(_) | PlatformError::Spam(_) => {
            FailureClass::AbuseSuspected
        }
        PlatformError::Network(_) | PlatformError::Server(_) => FailureClass::Transient,
        PlatformError::Other(message) => classify_message(message),
    }
}

/// Whether `marker` occurs in `text` with no letter or digit directly
/// before or after it
///
/// Both arguments are expected in lowercase. `_` and punctuation count as
/// boundaries, so `login` matches `login_required`.
pub fn contains_marker(text: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    text.match_indices(marker).any(|(start, _)| {
        let end = start + marker.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Classify a free-text error message (case-insensitive)
pub fn classify_message(message: &str) -> FailureClass {
    let lower = message.to_lowercase();

    if ABUSE_MARKERS.iter().any(|m| contains_marker(&lower, m)) {
        return FailureClass::AbuseSuspected;
    }
    if LOGIN_MARKERS.iter().any(|m| contains_marker(&lower, m)) {
        return FailureClass::FatalCritical;
    }

    FailureClass::Transient
}
