//! Common test utilities for E2E testing with mocks.
//!
//! Builds an in-process server with mock collaborators injected, so the
//! whole HTTP surface can be exercised without a live marketplace.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crowdlift_core::binding::{BindingStore, SqliteBindingStore};
use crowdlift_core::config::{DatabaseConfig, ServerConfig};
use crowdlift_core::content::ContentStore;
use crowdlift_core::lifecycle::CampaignController;
use crowdlift_core::marketplace::MarketplaceGateway;
use crowdlift_core::reconciler::{AlwaysActive, ReconcilerConfig, StatusReconciler};
use crowdlift_core::review::{ReviewStateStore, SqliteReviewStore, TaskReviewWorkflow};
use crowdlift_core::testing::{MockContentStore, MockMarketplace};
use crowdlift_core::{CampaignDefaults, Config, MarketplaceConfig};

use crowdlift_server::api::create_router;
use crowdlift_server::state::AppState;

/// Test fixture for E2E testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock marketplace gateway - script failures and inspect calls
    pub marketplace: Arc<MockMarketplace>,
    /// Mock content store - inspect work-state writes
    pub content: Arc<MockContentStore>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        let marketplace = Arc::new(MockMarketplace::new());
        let content = Arc::new(MockContentStore::new());

        let config = Config {
            marketplace: MarketplaceConfig {
                url: "https://api.taskmarket.example".to_string(),
                api_key: "test-key".to_string(),
                timeout_secs: 30,
                campaign_defaults: CampaignDefaults::default(),
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            reconciler: ReconcilerConfig {
                enabled: false,
                poll_interval_secs: 60,
            },
        };

        let bindings: Arc<dyn BindingStore> = Arc::new(
            SqliteBindingStore::in_memory().expect("Failed to create binding store"),
        );
        let review_store: Arc<dyn ReviewStateStore> = Arc::new(
            SqliteReviewStore::in_memory().expect("Failed to create review store"),
        );

        let gateway: Arc<dyn MarketplaceGateway> = Arc::clone(&marketplace) as _;
        let content_store: Arc<dyn ContentStore> = Arc::clone(&content) as _;

        let controller = Arc::new(CampaignController::new(
            Arc::clone(&gateway),
            Arc::clone(&bindings),
            Arc::clone(&content_store),
            config.marketplace.campaign_defaults.clone(),
        ));

        // Constructed but never started; /reconciler/status still answers.
        let reconciler = Arc::new(StatusReconciler::new(
            config.reconciler.clone(),
            Arc::clone(&bindings),
            Arc::clone(&gateway),
            Arc::clone(&content_store),
            Arc::new(AlwaysActive),
        ));

        let review = Arc::new(TaskReviewWorkflow::new(
            Arc::clone(&gateway),
            Arc::clone(&review_store),
        ));

        let state = Arc::new(AppState::new(
            config,
            bindings,
            controller,
            Some(reconciler),
            review,
            review_store,
            gateway,
            prometheus::Registry::new(),
        ));

        Self {
            router: create_router(state),
            marketplace,
            content,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
