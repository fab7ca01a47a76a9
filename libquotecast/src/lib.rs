//! Quotecast - safety-gated publishing of quote images
//!
//! A run generates a short quote, renders it onto an image and publishes
//! it to a rate-limited platform. Every publish passes a gate (posting
//! windows, daily cap, minimum interval, abuse cooldown) and runs through a
//! pipeline with human-like pauses, bounded retries and failure
//! classification.

pub mod caption;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod generation;
pub mod logging;
pub mod pipeline;
pub mod platforms;
pub mod policy;
pub mod render;
pub mod scheduling;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{RunCoordinator, RunOutcome};
pub use dispatch::Dispatcher;
pub use error::{
    ConfigError, GenerationError, PlatformError, PublishError, QuotecastError, RenderError, Result,
};
pub use gate::GateDecision;
pub use pipeline::PublishPipeline;
pub use policy::PostingPolicy;
pub use state::{SchedulerState, SharedState};
pub use types::{Confirmation, PostingWindow, Quote};
