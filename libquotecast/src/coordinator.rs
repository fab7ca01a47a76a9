//! Run coordinator: one generate → render → gate → publish cycle
//!
//! Artifact cleanup follows the outcome: a published artifact is deleted,
//! anything else is kept on disk and its path logged so the image can be
//! posted by hand.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::caption::{build_caption, random_hashtags};
use crate::clock::Clock;
use crate::error::QuotecastError;
use crate::gate::{check_shared, GateDecision};
use crate::generation::{select_quote, QuoteSource};
use crate::pipeline::PublishPipeline;
use crate::render::Renderer;
use crate::scheduling::next_delay;
use crate::state::SharedState;
use crate::types::Confirmation;

#[derive(Debug)]
pub enum RunOutcome {
    Published {
        confirmation: Confirmation,
    },
    /// The gate refused; the rendered artifact is kept
    Skipped {
        reason: GateDecision,
        artifact: PathBuf,
    },
    Failed {
        /// `None` when rendering itself failed
        artifact: Option<PathBuf>,
        error: QuotecastError,
    },
    AlreadyRunning,
}

impl RunOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }

    /// Whether this run put the scheduler into an abuse cooldown
    pub fn cooldown_triggered(&self) -> bool {
        match self {
            RunOutcome::Failed {
                error: QuotecastError::Publish(e),
                ..
            } => e.triggered_cooldown(),
            _ => false,
        }
    }
}

/// Single-flight flag shared by every clone of the coordinator's guard
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag, or `None` if a run already holds it
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(self.0.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the run flag when dropped
#[derive(Debug)]
pub struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RunCoordinator {
    source: Arc<dyn QuoteSource>,
    renderer: Arc<dyn Renderer>,
    pipeline: Arc<PublishPipeline>,
    state: SharedState,
    clock: Arc<dyn Clock>,
    handle: String,
    flag: RunFlag,
}

impl RunCoordinator {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        renderer: Arc<dyn Renderer>,
        pipeline: Arc<PublishPipeline>,
        state: SharedState,
        clock: Arc<dyn Clock>,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            source,
            renderer,
            pipeline,
            state,
            clock,
            handle: handle.into(),
            flag: RunFlag::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.flag.is_running()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Ask the gate whether a run started now could publish
    pub fn gate_decision(&self) -> GateDecision {
        check_shared(&self.state, self.pipeline.policy(), self.clock.now())
    }

    /// Execute one cycle. Never panics on collaborator failures.
    pub async fn run_once(&self) -> RunOutcome {
        let Some(_guard) = self.flag.try_acquire() else {
            warn!("A run is already in progress, refusing to start another");
            return RunOutcome::AlreadyRunning;
        };

        let span = info_span!("run", run_id = %Uuid::new_v4());
        self.execute().instrument(span).await
    }

    async fn execute(&self) -> RunOutcome {
        info!("Starting run");

        let quote = select_quote(self.source.generate().await);
        info!("Quote: {}", quote);

        let caption = build_caption(&quote, &random_hashtags());

        let artifact = match self.renderer.render(&quote, &self.handle).await {
            Ok(path) => path,
            Err(e) => {
                error!("Rendering failed, aborting run: {}", e);
                return RunOutcome::Failed {
                    artifact: None,
                    error: e.into(),
                };
            }
        };
        info!("Rendered {}", artifact.display());

        let decision = self.gate_decision();
        if !decision.is_permit() {
            warn!(
                "Not publishing ({}); artifact kept at {}",
                decision,
                artifact.display()
            );
            return RunOutcome::Skipped {
                reason: decision,
                artifact,
            };
        }

        match self.pipeline.publish(&artifact, &caption).await {
            Ok(confirmation) => {
                remove_artifact(&artifact).await;
                let advisory = next_delay(self.pipeline.policy());
                info!(
                    "Published {}; next post suggested in {}",
                    confirmation.media_id,
                    humantime::format_duration(advisory)
                );
                RunOutcome::Published { confirmation }
            }
            Err(e) => {
                error!(
                    "Publish failed: {}; artifact kept at {} for manual posting",
                    e,
                    artifact.display()
                );
                if e.triggered_cooldown() {
                    warn!("Publishing paused until the cooldown expires");
                }
                RunOutcome::Failed {
                    artifact: Some(artifact),
                    error: e.into(),
                }
            }
        }
    }
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flag_is_single_flight() {
        let flag = RunFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_running());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_running());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let flag = RunFlag::new();
        let other = flag.clone();
        let _guard = flag.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }
}
