use std::collections::HashMap;
use std::sync::Arc;

use axum::{body::to_bytes, response::Response, Router};
use chrono::Duration;
use serde_json::Value;

use crate::auth::{Claims, Role, SessionSigner};
use crate::config::AppConfig;
use crate::registrations::{MemoryRegistrationStore, RegistrationStore};
use crate::routes;
use crate::state::AppState;

pub const TEST_SECRET: &str = "unit-test-secret";

/// Test utilities for driving the router without a network.
pub struct TestContext {
    pub state: AppState,
    signer: SessionSigner,
}

impl TestContext {
    /// Gateway whose backend lives at `base_url`; nothing needs to listen
    /// there unless the test reaches an upstream.
    pub fn new(base_url: &str) -> Self {
        Self::with_store(base_url, Arc::new(MemoryRegistrationStore::new()))
    }

    pub fn with_store(base_url: &str, store: Arc<dyn RegistrationStore>) -> Self {
        let vars: HashMap<&str, String> = [
            ("API_BASE_URL", base_url.to_string()),
            ("JWT_SECRET", TEST_SECRET.to_string()),
            ("PUBLIC_DIR", "tests/fixtures/public".to_string()),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).cloned())
            .expect("test configuration is valid");
        let state = AppState::new(config, store).expect("client builds");

        Self {
            state,
            signer: SessionSigner::new(TEST_SECRET),
        }
    }

    pub fn app(&self) -> Router {
        routes::app(self.state.clone())
    }

    /// Signed session token for a user with the given roles.
    pub fn token(&self, sub: &str, roles: &[Role]) -> String {
        self.signer
            .issue(&Claims::new(sub, roles, Duration::hours(1)))
            .expect("token signs")
    }
}

/// Decode a JSON response body.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
