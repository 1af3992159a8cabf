//! Image-with-retry loading.
//!
//! Image variants are generated server-side; until one is ready the server
//! answers `202 Accepted`. [`ImageLoader`] polls with exponential backoff
//! until the image arrives, the server fails, or retries run out. Starting
//! a new load cancels the previous one, and dropping the loader cancels
//! whatever is in flight.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use spacenote_core::{defaults, Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(defaults::IMAGE_POLL_INITIAL_MS),
            max_delay: Duration::from_millis(defaults::IMAGE_POLL_MAX_MS),
            factor: defaults::IMAGE_POLL_FACTOR,
            max_retries: defaults::IMAGE_POLL_MAX_RETRIES,
        }
    }
}

impl PollPolicy {
    /// `min(initial * factor^retry, max)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.factor.powi(retry as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Result of one check of an image URL.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageProbe {
    /// 202: the server is still producing the image.
    Processing,
    Ready {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Something that can check an image URL once.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ImageProbe>;
}

/// Terminal state of a load.
#[derive(Debug)]
pub enum ImageState {
    Ready {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Failed(Error),
    /// Superseded by a newer load, or the loader was dropped.
    Cancelled,
}

pub struct ImageLoader<S: ImageSource> {
    source: Arc<S>,
    policy: PollPolicy,
    current: Mutex<Option<CancellationToken>>,
}

impl<S: ImageSource> ImageLoader<S> {
    pub fn new(source: Arc<S>, policy: PollPolicy) -> Self {
        Self {
            source,
            policy,
            current: Mutex::new(None),
        }
    }

    /// Cancel the load in flight, if any.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.take() {
            token.cancel();
        }
    }

    fn start(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Poll `url` until it is ready, fails, or this load is cancelled.
    pub async fn load(&self, url: &str) -> ImageState {
        let token = self.start();
        let mut retry = 0;
        loop {
            let probe = tokio::select! {
                _ = token.cancelled() => return ImageState::Cancelled,
                probe = self.source.probe(url) => probe,
            };

            match probe {
                Ok(ImageProbe::Ready {
                    content_type,
                    bytes,
                }) => {
                    tracing::debug!(
                        subsystem = "client",
                        component = "image",
                        url,
                        attempt = retry + 1,
                        size = bytes.len(),
                        "Image ready"
                    );
                    return ImageState::Ready {
                        content_type,
                        bytes,
                    };
                }
                Ok(ImageProbe::Processing) if retry >= self.policy.max_retries => {
                    tracing::warn!(
                        subsystem = "client",
                        component = "image",
                        url,
                        attempts = retry + 1,
                        "Image still processing, giving up"
                    );
                    return ImageState::Failed(Error::Server(format!(
                        "image not ready after {} attempts",
                        retry + 1
                    )));
                }
                Ok(ImageProbe::Processing) => {
                    let delay = self.policy.delay_for(retry);
                    tracing::trace!(
                        subsystem = "client",
                        component = "image",
                        url,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        "Image processing, polling again"
                    );
                    tokio::select! {
                        _ = token.cancelled() => return ImageState::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    retry += 1;
                }
                Err(error) => return ImageState::Failed(error),
            }
        }
    }
}

impl<S: ImageSource> Drop for ImageLoader<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}
