//! Target-platform abstraction and implementations
//!
//! The scheduler treats the platform as an opaque capability: log in, then
//! publish an image with a caption. Implementations map remote failures onto
//! [`PlatformError`] kinds as precisely as they can; anything they cannot
//! interpret goes into `PlatformError::Other` for the failure classifier.
//!
//! # Examples
//!
//! ```no_run
//! use libquotecast::platforms::{Platform, dry_run::DryRunPlatform};
//!
//! # async fn example() -> Result<(), libquotecast::error::PlatformError> {
//! let mut platform = DryRunPlatform::new("quotes.daily");
//! platform.login().await?;
//! let confirmation = platform.publish(b"jpeg bytes".to_vec(), "Hello").await?;
//! println!("Published: {}", confirmation.media_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::Confirmation;

pub mod dry_run;
pub mod http;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Authenticate with the platform
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` for credential or account
    /// problems; other kinds for network or abuse signals seen during login.
    async fn login(&mut self) -> Result<(), PlatformError>;

    /// Publish an image with its caption
    ///
    /// # Errors
    ///
    /// Returns the platform failure; the caller decides whether to retry.
    async fn publish(&self, image: Vec<u8>, caption: &str) -> Result<Confirmation, PlatformError>;

    /// Lowercase identifier used in logs (e.g., "http", "dry-run")
    fn name(&self) -> &str;
}
