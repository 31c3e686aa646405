//! Sessions wired to mock vendors over real HTTP

use std::sync::Arc;
use std::time::Duration;

use chorus_config::{ProviderConfig, ProviderKind};
use chorus_llm::{CompletionClient, HttpTransport, Session, StreamDelta, Turn, TurnOutcome};

use super::mock_vendor::MockVendor;

pub const MODEL: &str = "mock-model";

/// Transport with test-sized timeouts
pub fn transport(timeout: Duration) -> Arc<HttpTransport> {
    Arc::new(HttpTransport::with_timeouts(timeout, Duration::from_secs(2)).unwrap())
}

/// Session talking to `vendor` through the given vendor protocol
pub fn session(label: &str, kind: ProviderKind, vendor: &MockVendor, transport: Arc<HttpTransport>) -> Session {
    let config = ProviderConfig::new(kind, MODEL)
        .with_api_key("test-key")
        .with_base_url(vendor.base_url());
    let client = CompletionClient::from_config(label, &config, transport).unwrap();
    Session::new(label, client)
}

/// Read every delta of a turn and return them with its outcome
pub async fn drain(mut turn: Turn) -> (Vec<StreamDelta>, TurnOutcome) {
    let mut deltas = Vec::new();
    while let Some(delta) = turn.next_delta().await {
        deltas.push(delta);
    }
    (deltas, turn.finish().await)
}
