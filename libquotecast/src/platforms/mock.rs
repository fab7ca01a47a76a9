//! Mock platform implementation for testing
//!
//! A scriptable platform that can simulate login failures and a queue of
//! publish outcomes. Call counters and published captions are shared through
//! `Arc`s, so a test can keep a clone of the mock after handing one
//! to the pipeline.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::clock::{Clock, SystemClock};
use crate::error::PlatformError;
use crate::platforms::Platform;
use crate::types::Confirmation;

/// Mock platform for testing
#[derive(Clone)]
pub struct MockPlatform {
    name: String,
    login_error: Option<PlatformError>,
    /// Outcomes consumed one per publish call; `None` means success
    script: Arc<Mutex<VecDeque<Option<PlatformError>>>>,
    /// Used once the script is exhausted
    fallback: Option<PlatformError>,
    authenticated: Arc<Mutex<bool>>,
    login_calls: Arc<Mutex<usize>>,
    publish_calls: Arc<Mutex<usize>>,
    captions: Arc<Mutex<Vec<String>>>,
    image_sizes: Arc<Mutex<Vec<usize>>>,
}

impl MockPlatform {
    fn with(
        name: &str,
        login_error: Option<PlatformError>,
        fallback: Option<PlatformError>,
    ) -> Self {
        Self {
            name: name.to_string(),
            login_error,
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            authenticated: Arc::new(Mutex::new(false)),
            login_calls: Arc::new(Mutex::new(0)),
            publish_calls: Arc::new(Mutex::new(0)),
            captions: Arc::new(Mutex::new(Vec::new())),
            image_sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::with(name, None, None)
    }

    /// Create a mock platform whose login fails
    pub fn login_failure(name: &str, error: PlatformError) -> Self {
        Self::with(name, Some(error), None)
    }

    /// Create a mock platform whose every publish fails with `error`
    pub fn publish_failure(name: &str, error: PlatformError) -> Self {
        Self::with(name, None, Some(error))
    }

    /// Create a mock platform that replays `outcomes`, then succeeds
    pub fn scripted(name: &str, outcomes: Vec<Option<PlatformError>>) -> Self {
        let platform = Self::success(name);
        platform
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(outcomes);
        platform
    }

    pub fn login_call_count(&self) -> usize {
        *self.login_calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn publish_call_count(&self) -> usize {
        *self.publish_calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Captions of every successful publish
    pub fn published_captions(&self) -> Vec<String> {
        self.captions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Payload sizes of every publish call, successful or not
    pub fn image_sizes(&self) -> Vec<usize> {
        self.image_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn login(&mut self) -> Result<(), PlatformError> {
        *self.login_calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;

        match &self.login_error {
            Some(error) => Err(error.clone()),
            None => {
                *self.authenticated.lock().unwrap_or_else(|e| e.into_inner()) = true;
                Ok(())
            }
        }
    }

    async fn publish(&self, image: Vec<u8>, caption: &str) -> Result<Confirmation, PlatformError> {
        let call = {
            let mut calls = self.publish_calls.lock().unwrap_or_else(|e| e.into_inner());
            *calls += 1;
            *calls
        };
        self.image_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(image.len());

        if !*self.authenticated.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(PlatformError::Authentication("Not authenticated".to_string()));
        }

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None => self.fallback.clone(),
        };

        match outcome {
            Some(error) => Err(error),
            None => {
                self.captions
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(caption.to_string());
                Ok(Confirmation {
                    media_id: format!("{}:mock-{}", self.name, call),
                    code: None,
                    published_at: SystemClock.now(),
                })
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
