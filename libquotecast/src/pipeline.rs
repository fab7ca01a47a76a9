//! Publish pipeline: one end-to-end publish attempt
//!
//! The caller has already passed the safety gate. The pipeline does not
//! re-check timing; its own randomized pauses are anti-detection behavior,
//! not state changes.
//!
//! Steps:
//! 1. pre-login pause
//! 2. login (failure is fatal)
//! 3. post-login pause
//! 4. artifact validation (missing or oversized is fatal)
//! 5. pre-upload pause
//! 6. up to `max_retries` uploads with classification and backoff
//! 7. on success, record the post in the scheduler state

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::classifier::{classify, FailureClass};
use crate::clock::{Clock, Delay};
use crate::error::{PlatformError, PublishError};
use crate::platforms::Platform;
use crate::policy::{DelayRange, PostingPolicy, MAX_ARTIFACT_BYTES};
use crate::state::SharedState;
use crate::types::{Confirmation, PublishAttempt};

/// Check the artifact and load its bytes
///
/// # Errors
///
/// - `PublishError::ArtifactMissing` if the path does not exist or is not a file
/// - `PublishError::ArtifactTooLarge` above [`MAX_ARTIFACT_BYTES`]
/// - `PublishError::Io` for any other read failure
pub async fn validate_artifact(path: &Path) -> Result<Vec<u8>, PublishError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PublishError::ArtifactMissing(path.to_path_buf()));
        }
        Err(e) => return Err(PublishError::Io(e)),
    };

    if !metadata.is_file() {
        return Err(PublishError::ArtifactMissing(path.to_path_buf()));
    }
    if metadata.len() > MAX_ARTIFACT_BYTES {
        return Err(PublishError::ArtifactTooLarge {
            size: metadata.len(),
            limit: MAX_ARTIFACT_BYTES,
        });
    }

    Ok(tokio::fs::read(path).await?)
}

pub struct PublishPipeline {
    platform: Mutex<Box<dyn Platform>>,
    policy: Arc<PostingPolicy>,
    state: SharedState,
    delay: Arc<dyn Delay>,
    clock: Arc<dyn Clock>,
}

impl PublishPipeline {
    pub fn new(
        platform: Box<dyn Platform>,
        policy: Arc<PostingPolicy>,
        state: SharedState,
        delay: Arc<dyn Delay>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            platform: Mutex::new(platform),
            policy,
            state,
            delay,
            clock,
        }
    }

    pub fn policy(&self) -> &PostingPolicy {
        &self.policy
    }

    /// Publish `artifact_path` with `caption`
    ///
    /// # Errors
    ///
    /// Returns the terminal [`PublishError`]. `AbuseSuspected` means the
    /// cooldown has already been applied to the shared state.
    pub async fn publish(
        &self,
        artifact_path: &Path,
        caption: &str,
    ) -> Result<Confirmation, PublishError> {
        let mut attempt = PublishAttempt::new(artifact_path.to_path_buf(), caption.to_string());
        let mut platform = self.platform.lock().await;

        self.pause("pre-login", self.policy.human_delays.pre_login)
            .await;

        info!("Attempting to login to {}...", platform.name());
        if let Err(e) = platform.login().await {
            if classify(&e) == FailureClass::AbuseSuspected {
                return Err(self.escalate(e));
            }
            error!("Login error detected - possible account issue: {}", e);
            return Err(PublishError::Authentication(e));
        }
        info!("Successfully logged in to {}", platform.name());

        self.pause("post-login", self.policy.human_delays.post_login)
            .await;

        let image = validate_artifact(&attempt.artifact_path).await?;
        info!(
            "Uploading {} ({} bytes)...",
            attempt.artifact_path.display(),
            image.len()
        );

        self.pause("pre-upload", self.policy.human_delays.pre_upload)
            .await;

        let max_retries = self.policy.max_retries;
        for index in 0..max_retries {
            attempt.attempts_made += 1;

            match platform.publish(image.clone(), &attempt.caption).await {
                Ok(confirmation) => {
                    let now = self.clock.now();
                    self.state.lock().record_success(now);
                    info!(
                        "Successfully published {} on attempt {}/{}",
                        confirmation.media_id, attempt.attempts_made, max_retries
                    );
                    return Ok(confirmation);
                }
                Err(e) => match classify(&e) {
                    FailureClass::FatalCritical => {
                        error!("Critical error detected, stopping retries: {}", e);
                        return Err(PublishError::Authentication(e));
                    }
                    FailureClass::AbuseSuspected => {
                        return Err(self.escalate(e));
                    }
                    FailureClass::Transient => {
                        let remaining = max_retries - attempt.attempts_made;
                        warn!(
                            "Upload attempt {}/{} failed, {} retries remaining: {}",
                            attempt.attempts_made, max_retries, remaining, e
                        );
                        attempt.record_failure(e);
                        if remaining > 0 {
                            let wait = self.policy.retry_backoff.delay_for(index);
                            debug!("Waiting {:?} before retrying upload", wait);
                            self.delay.sleep(wait).await;
                        }
                    }
                },
            }
        }

        let last = attempt
            .last_error
            .unwrap_or_else(|| PlatformError::Other("no upload attempt was made".to_string()));
        error!(
            "Failed to upload after {} attempts: {}",
            attempt.attempts_made, last
        );
        Err(PublishError::RetriesExhausted {
            attempts: attempt.attempts_made,
            last,
        })
    }

    async fn pause(&self, step: &str, range: DelayRange) {
        let wait = range.sample();
        debug!("Pausing {:?} ({})", wait, step);
        self.delay.sleep(wait).await;
    }

    /// Apply the abuse cooldown and build the matching error
    fn escalate(&self, source: PlatformError) -> PublishError {
        let now = self.clock.now();
        let until = self.state.lock().apply_cooldown(&self.policy, now);
        error!(
            "Account may be restricted - cooling down until {}: {}",
            until, source
        );
        PublishError::AbuseSuspected { until, source }
    }
}
