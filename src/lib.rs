//! # vtool-client
//!
//! Asynchronous task lifecycle client for the V-Tool media processing API
//! (video download, AI summary, metadata analysis, slideshow extraction,
//! audio separation and background removal).
//!
//! The backend processes every job asynchronously: a submission returns a
//! task id, and the task's status has to be polled until it completes or
//! fails. This crate provides the pieces a front end needs for that:
//!
//! - [`VtoolClient`] - creates tasks, fetches task records, uploads images
//! - [`TaskPoller`] - polls one task id at a time until a terminal status
//! - [`FeatureOrchestrator`] - the per-tab state machine
//!   (`form -> polling -> result | error`) including format changes
//! - [`render()`] - maps a typed result to a display model
//!
//! ## Quick Start
//!
//! ```no_run
//! use vtool_client::{Config, FeatureOrchestrator, Phase, TaskType, VtoolClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = VtoolClient::from_config(&config)?;
//!
//!     let tab = FeatureOrchestrator::with_client(TaskType::Download, &client, config.polling);
//!
//!     // Subscribe to events
//!     let mut events = tab.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     tab.submit("https://tiktok.com/@a/video/123", None).await?;
//!     let task = tab.poller().wait_for_terminal().await?;
//!     assert_eq!(tab.phase(), Phase::Result);
//!     println!("{:?}", task.result.as_ref().map(vtool_client::render));
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Feature and format catalog
pub mod catalog;
/// HTTP client for the processing backend
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Per-tab feature state machine
pub mod orchestrator;
/// Task status polling
pub mod poller;
/// Result presentation
pub mod render;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use catalog::{FeatureInfo, FormatPreset, presets_for_url};
pub use client::{
    ClientBuilder, ImageMode, ImageUpload, ProcessedImage, TaskSource, TaskSubmitter, VtoolClient,
};
pub use config::{ApiConfig, Config, PollingConfig};
pub use error::{Error, PollFetchError, Result, SubmissionError, ValidationError};
pub use orchestrator::{
    FeatureOrchestrator, FeatureTabs, ImageSession, OrchestratorView, SwitchOutcome,
};
pub use poller::{PollPhase, PollState, TaskPoller};
pub use render::{Presentation, ProgressView, render};
pub use types::{
    CreateTaskResponse, Event, HealthStatus, OutputFormat, Phase, ProcessOptions, SeparationMode,
    SourceUrl, Task, TaskId, TaskResult, TaskStatus, TaskType,
};
