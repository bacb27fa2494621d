//! Synchronous image processing uploads
//!
//! Unlike URL tasks these requests block until the backend has produced the
//! processed image, so there is no task id and nothing to poll.

use reqwest::multipart::{Form, Part};

use super::{VtoolClient, error_message};
use crate::catalog::{REMOVE_BG_ENDPOINT, REMOVE_OBJECT_ENDPOINT};
use crate::error::{PROCESS_IMAGE_FALLBACK, Result, SubmissionError, ValidationError};
use crate::utils::content_disposition_filename;

/// File name sent for the object removal mask
const MASK_FILENAME: &str = "mask.png";

/// Image operation offered by the background removal tab
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageMode {
    /// Cut out the subject and make the background transparent
    RemoveBackground,
    /// Erase the region painted in the mask (or an auto-detected object)
    RemoveObject,
}

impl ImageMode {
    /// Backend endpoint for this operation
    pub fn endpoint(self) -> &'static str {
        match self {
            ImageMode::RemoveBackground => REMOVE_BG_ENDPOINT,
            ImageMode::RemoveObject => REMOVE_OBJECT_ENDPOINT,
        }
    }

    fn field_name(self) -> &'static str {
        match self {
            ImageMode::RemoveBackground => "file",
            ImageMode::RemoveObject => "image",
        }
    }
}

/// An image selected for upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name
    pub filename: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// MIME type (e.g. "image/jpeg")
    pub content_type: String,
}

impl ImageUpload {
    /// Create an upload from raw bytes
    pub fn new(
        filename: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

/// Image returned by the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedImage {
    /// Encoded image (PNG)
    pub bytes: Vec<u8>,
    /// File name from `Content-Disposition`, when present
    pub filename: Option<String>,
    /// MIME type from `Content-Type`
    pub content_type: Option<String>,
}

impl ProcessedImage {
    /// File name to save under: the server's suggestion or `processed_{original}`
    pub fn filename_or(&self, original: &str) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("processed_{original}"))
    }
}

impl VtoolClient {
    /// Upload an image and return the processed result
    ///
    /// `mask` is only used by [`ImageMode::RemoveObject`]; white pixels mark
    /// the area to erase. Without a mask the backend picks the object itself.
    pub async fn process_image(
        &self,
        mode: ImageMode,
        image: ImageUpload,
        mask: Option<Vec<u8>>,
    ) -> Result<ProcessedImage> {
        if image.bytes.is_empty() {
            return Err(ValidationError::EmptyImage {
                filename: image.filename,
            }
            .into());
        }

        let endpoint = self.endpoint(mode.endpoint())?;
        let filename = image.filename.clone();
        let size = image.bytes.len();

        let part = Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&image.content_type)
            .map_err(|_| ValidationError::InvalidContentType {
                filename: filename.clone(),
                content_type: image.content_type.clone(),
            })?;
        let mut form = Form::new().part(mode.field_name(), part);
        if let (ImageMode::RemoveObject, Some(mask)) = (mode, mask) {
            form = form.part(
                "mask",
                Part::bytes(mask)
                    .file_name(MASK_FILENAME)
                    .mime_str("image/png")?,
            );
        }

        tracing::debug!(mode = ?mode, filename = %filename, size, "uploading image");

        let response = self
            .with_timeout(self.inner.http.post(endpoint).multipart(form))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(mode = ?mode, error = %e, "image upload failed");
                SubmissionError {
                    message: e.to_string(),
                    status: None,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, PROCESS_IMAGE_FALLBACK).await;
            tracing::warn!(mode = ?mode, status = status.as_u16(), error = %message, "image processing rejected");
            return Err(SubmissionError {
                message,
                status: Some(status.as_u16()),
            }
            .into());
        }

        let headers = response.headers();
        let server_filename = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = response.bytes().await?.to_vec();
        tracing::info!(mode = ?mode, filename = %filename, output_size = bytes.len(), "image processed");

        Ok(ProcessedImage {
            bytes,
            filename: server_filename,
            content_type,
        })
    }
}
