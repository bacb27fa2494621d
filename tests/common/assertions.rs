//! Waiting helpers and request-count assertions

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use vtool_client::{Event, FeatureOrchestrator, Phase, PollState, TaskPoller};
use wiremock::MockServer;

/// Default upper bound for any wait in these tests
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait until the orchestrator reaches `phase`
///
/// Returns false on timeout.
pub async fn wait_for_phase(orchestrator: &FeatureOrchestrator, phase: Phase) -> bool {
    let mut events = orchestrator.subscribe();
    if orchestrator.phase() == phase {
        return true;
    }

    let reached = tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(Event::PhaseChanged { to, .. }) if to == phase => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => {
                    if orchestrator.phase() == phase {
                        return true;
                    }
                }
                Err(RecvError::Closed) => return false,
            }
        }
    })
    .await;

    reached.unwrap_or(false)
}

/// Wait for a poller snapshot matching `condition`
pub async fn wait_for_state(
    poller: &TaskPoller,
    condition: impl FnMut(&PollState) -> bool,
) -> Option<PollState> {
    let mut rx = poller.subscribe();
    let state = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(condition))
        .await
        .ok()?
        .ok()?
        .clone();
    Some(state)
}

/// Number of requests the server received for `method` and `path`
pub async fn count_requests(server: &MockServer, method: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .count()
}

/// Assert that no further requests for `path` arrive within `window`
pub async fn assert_no_more_requests(server: &MockServer, method: &str, path: &str, window: Duration) {
    let before = count_requests(server, method, path).await;
    tokio::time::sleep(window).await;
    let after = count_requests(server, method, path).await;
    assert_eq!(
        before, after,
        "{method} {path} received {} more request(s)",
        after - before
    );
}

/// JSON bodies of every request to `path`, in arrival order
pub async fn request_bodies(server: &MockServer, path: &str) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}
