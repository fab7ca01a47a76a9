//! Error types for Quotecast

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuotecastError>;

#[derive(Error, Debug)]
pub enum QuotecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl QuotecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            QuotecastError::Config(_) => 2,
            QuotecastError::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid posting policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },
}

/// Errors reported by the target-platform client.
///
/// Clients map whatever the remote side returns onto these kinds. When a
/// client only has a free-text message it uses `Other`, and the failure
/// classifier decides what the message means.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Account blocked: {0}")]
    Blocked(String),

    #[error("Content flagged as spam: {0}")]
    Spam(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{0}")]
    Other(String),
}

/// Terminal outcomes of a publish attempt.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Authentication failed: {0}")]
    Authentication(PlatformError),

    #[error("Abuse suspected, cooling down until {until}: {source}")]
    AbuseSuspected {
        until: chrono::NaiveDateTime,
        source: PlatformError,
    },

    #[error("Artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Artifact is too large ({size} bytes, max {limit})")]
    ArtifactTooLarge { size: u64, limit: u64 },

    #[error("Failed to upload after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: PlatformError },

    #[error("Failed to read artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Whether the failure changed scheduler state (cooldown applied)
    pub fn triggered_cooldown(&self) -> bool {
        matches!(self, PublishError::AbuseSuspected { .. })
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Font unavailable: {0}")]
    Font(String),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons quote generation can fail. Never surfaced past the coordinator:
/// every variant is answered with a fallback quote.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation service returned status {0}")]
    Status(u16),

    #[error("Malformed quote: {0}")]
    Malformed(String),

    #[error("Generation API key is not configured")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_config_error() {
        let error = QuotecastError::Config(ConfigError::MissingField("platform.username".into()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_runtime_errors() {
        let platform = QuotecastError::Platform(PlatformError::Network("timeout".into()));
        assert_eq!(platform.exit_code(), 1);

        let publish = QuotecastError::Publish(PublishError::ArtifactMissing("x.jpg".into()));
        assert_eq!(publish.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_platform() {
        let error = QuotecastError::Platform(PlatformError::Authentication("bad password".into()));
        assert_eq!(
            error.to_string(),
            "Platform error: Authentication failed: bad password"
        );
    }

    #[test]
    fn test_retries_exhausted_wraps_last_error() {
        let error = PublishError::RetriesExhausted {
            attempts: 3,
            last: PlatformError::Server("502 Bad Gateway".into()),
        };
        let message = error.to_string();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("502 Bad Gateway"));
    }

    #[test]
    fn test_artifact_too_large_formatting() {
        let error = PublishError::ArtifactTooLarge {
            size: 9_000_000,
            limit: 8_388_608,
        };
        assert_eq!(
            error.to_string(),
            "Artifact is too large (9000000 bytes, max 8388608)"
        );
    }

    #[test]
    fn test_other_platform_error_is_verbatim() {
        let error = PlatformError::Other("feedback_required".into());
        assert_eq!(error.to_string(), "feedback_required");
    }

    #[test]
    fn test_triggered_cooldown() {
        let abuse = PublishError::AbuseSuspected {
            until: chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            source: PlatformError::Spam("flagged".into()),
        };
        assert!(abuse.triggered_cooldown());

        let auth = PublishError::Authentication(PlatformError::Authentication("nope".into()));
        assert!(!auth.triggered_cooldown());
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::InvalidPolicy("max_daily_posts must be > 0".into());
        let error: QuotecastError = config_error.into();
        match error {
            QuotecastError::Config(_) => {}
            _ => panic!("Expected QuotecastError::Config"),
        }
    }
}
