//! Dry-run platform: logs what would be published and confirms locally

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::PlatformError;
use crate::platforms::Platform;
use crate::types::Confirmation;

pub struct DryRunPlatform {
    handle: String,
}

impl DryRunPlatform {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }
}

#[async_trait]
impl Platform for DryRunPlatform {
    async fn login(&mut self) -> Result<(), PlatformError> {
        info!("[dry-run] would log in as @{}", self.handle);
        Ok(())
    }

    async fn publish(&self, image: Vec<u8>, caption: &str) -> Result<Confirmation, PlatformError> {
        let digest = Sha256::digest(&image);
        let media_id = format!("dry-run-{:x}", digest);
        info!(
            bytes = image.len(),
            media_id = %media_id,
            "[dry-run] would publish image with caption: {}",
            caption.lines().next().unwrap_or_default()
        );

        Ok(Confirmation {
            media_id,
            code: None,
            published_at: SystemClock.now(),
        })
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_media_id_is_content_hash() {
        let mut platform = DryRunPlatform::new("quotes");
        platform.login().await.unwrap();

        let a = platform.publish(b"same".to_vec(), "one").await.unwrap();
        let b = platform.publish(b"same".to_vec(), "two").await.unwrap();
        let c = platform.publish(b"other".to_vec(), "one").await.unwrap();

        assert_eq!(a.media_id, b.media_id);
        assert_ne!(a.media_id, c.media_id);
        assert!(a.media_id.starts_with("dry-run-"));
    }
}
