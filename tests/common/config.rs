//! Test configuration helpers for clients pointed at a mock backend

use std::time::Duration;

use vtool_client::{ApiConfig, Config, FeatureOrchestrator, PollingConfig, TaskType, VtoolClient};
use wiremock::MockServer;

/// Poll interval used against mock servers
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration pointed at `server` with a fast poll cadence
pub fn test_config(server: &MockServer) -> Config {
    Config {
        api: ApiConfig {
            base_url: server.uri(),
            request_timeout: Some(Duration::from_secs(5)),
        },
        polling: PollingConfig {
            interval: TEST_POLL_INTERVAL,
            fetch_timeout: Some(Duration::from_secs(2)),
            max_consecutive_failures: None,
        },
    }
}

/// Client for `server`
pub fn test_client(server: &MockServer) -> VtoolClient {
    let config = test_config(server);
    config.validate().expect("test config must be valid");
    VtoolClient::from_config(&config).expect("failed to build client")
}

/// Orchestrator for `feature` backed by `server`
pub fn test_orchestrator(feature: TaskType, server: &MockServer) -> FeatureOrchestrator {
    let config = test_config(server);
    FeatureOrchestrator::with_client(feature, &test_client(server), config.polling)
}
