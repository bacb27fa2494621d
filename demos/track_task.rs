//! Track a task from submission to result
//!
//! This example demonstrates the full lifecycle of one feature tab:
//! - Loading configuration from `VTOOL_API_URL`
//! - Submitting a source URL through a feature orchestrator
//! - Following progress snapshots from the poller
//! - Rendering the completed result
//!
//! Usage: `cargo run --example track_task -- <url> [download|summary|spy|slideshow|audio]`

use tokio_stream::StreamExt;
use vtool_client::{
    Config, Event, FeatureOrchestrator, ProgressView, TaskStatus, TaskType, VtoolClient, render,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "https://tiktok.com/@scout2015/video/6718335390845095173".to_string());
    let feature = match args.next().as_deref() {
        None | Some("download") => TaskType::Download,
        Some("summary") => TaskType::Summary,
        Some("spy") => TaskType::Spy,
        Some("slideshow") => TaskType::Slideshow,
        Some("audio") => TaskType::Audio,
        Some(other) => return Err(format!("unsupported feature '{}'", other).into()),
    };

    let config = Config::from_env()?;
    let client = VtoolClient::from_config(&config)?;

    match client.health().await {
        Ok(health) => println!("✓ Backend at {} is {}", client.base_url(), health.status),
        Err(e) => println!("⚠ Health check failed: {}", e),
    }

    let tab = FeatureOrchestrator::with_client(feature, &client, config.polling);

    // Subscribe to events
    let mut events = tab.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Submitted { task_id, url, .. } => {
                    println!("✓ Submitted {} as task {}", url, task_id);
                }
                Event::PhaseChanged { from, to, .. } => {
                    println!("→ {} -> {}", from, to);
                }
                Event::SubmissionFailed { error, .. } => {
                    println!("✗ Submission failed: {}", error);
                }
                _ => {}
            }
        }
    });

    let task_id = tab.submit(&url, None).await?;

    let mut updates = tab.poller().updates();
    while let Some(state) = updates.next().await {
        if state.task_id.as_ref() != Some(&task_id) {
            continue;
        }
        let view = ProgressView::from_state(&state);
        println!(
            "⬇ {} {:>3}% ({})",
            view.label,
            view.percent,
            view.connection.label()
        );
        if state.is_stopped() {
            break;
        }
    }

    let state = tab.poller().snapshot();
    match state.status() {
        Some(TaskStatus::Completed) => match state.result() {
            Some(result) => {
                let presentation = render(result);
                println!("✓ Completed ({})", presentation.kind());
                println!("{}", serde_json::to_string_pretty(&presentation)?);
            }
            None => println!("✓ Completed without a result payload"),
        },
        _ => {
            if let Some(error) = state.error() {
                println!("✗ {}", error);
            }
        }
    }

    Ok(())
}
