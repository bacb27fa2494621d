//! Background removal tab state
//!
//! Image operations complete in a single request, so this tab has no poller.
//! It still publishes the "has active result" flag for [`FeatureTabs`].
//!
//! [`FeatureTabs`]: super::FeatureTabs

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::client::{ImageMode, ImageUpload, ProcessedImage, VtoolClient};
use crate::error::Result;

#[derive(Debug, Default)]
struct ImageState {
    source_filename: Option<String>,
    result: Option<ProcessedImage>,
    error: Option<String>,
}

/// State of the background removal tab
pub struct ImageSession {
    client: VtoolClient,
    state: Mutex<ImageState>,
    /// Serializes uploads
    busy: tokio::sync::Mutex<()>,
    active_tx: watch::Sender<bool>,
}

impl ImageSession {
    /// Create an empty session backed by `client`
    pub fn new(client: &VtoolClient) -> Self {
        let (active_tx, _) = watch::channel(false);
        Self {
            client: client.clone(),
            state: Mutex::new(ImageState::default()),
            busy: tokio::sync::Mutex::new(()),
            active_tx,
        }
    }

    /// Upload `image` and keep the processed result
    ///
    /// The previous result and error are dropped before the upload starts.
    /// On failure the message is kept as the inline error and the active
    /// result flag is cleared.
    pub async fn process(
        &self,
        mode: ImageMode,
        image: ImageUpload,
        mask: Option<Vec<u8>>,
    ) -> Result<ProcessedImage> {
        let _busy = self.busy.lock().await;
        let filename = image.filename.clone();
        *self.state() = ImageState {
            source_filename: Some(filename.clone()),
            ..ImageState::default()
        };
        self.active_tx.send_replace(false);

        match self.client.process_image(mode, image, mask).await {
            Ok(processed) => {
                self.state().result = Some(processed.clone());
                self.active_tx.send_replace(true);
                Ok(processed)
            }
            Err(e) => {
                tracing::debug!(mode = ?mode, filename = %filename, error = %e, "image session failed");
                self.state().error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// The processed image, if any
    pub fn result(&self) -> Option<ProcessedImage> {
        self.state().result.clone()
    }

    /// Inline error from the last upload
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// File name to save the result under
    pub fn download_filename(&self) -> Option<String> {
        let state = self.state();
        let result = state.result.as_ref()?;
        Some(result.filename_or(state.source_filename.as_deref().unwrap_or("image.png")))
    }

    /// Discard the result and error
    pub fn reset(&self) {
        *self.state() = ImageState::default();
        self.active_tx.send_replace(false);
    }

    /// Receiver of the "has active result" flag
    pub fn active_result(&self) -> watch::Receiver<bool> {
        self.active_tx.subscribe()
    }

    /// Whether a processed image is currently shown
    pub fn has_active_result(&self) -> bool {
        *self.active_tx.borrow()
    }

    fn state(&self) -> MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
