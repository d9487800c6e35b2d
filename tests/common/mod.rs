#![allow(dead_code)] // each test binary uses a different slice of the harness

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use dispatch_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::inventory_item::ItemKind,
    events::{self, EventSender},
    handlers::AppServices,
    services::inventory::CreateInventoryItemInput,
    AppState,
};

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database. A single pooled connection keeps every caller on the
/// same in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("db connect");
        db::run_migrations(&pool).await.expect("migrations");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), event_sender.clone());
        let auth_service = Arc::new(AuthService::from_config(&cfg));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = dispatch_api::app_router(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
        }
    }

    /// Issues a token for the default test operator.
    pub fn token(&self) -> String {
        self.auth_service
            .issue_token("admin", "admin")
            .expect("token issuance")
    }

    /// Seeds an inventory item and returns its id.
    pub async fn seed_item(&self, code: &str, name: &str, kind: ItemKind, quantity: i32) -> Uuid {
        let model = self
            .state
            .services
            .inventory
            .create_item(CreateInventoryItemInput {
                code: code.to_string(),
                name: name.to_string(),
                kind,
                quantity,
            })
            .await
            .expect("seed item");
        model.id
    }

    /// Current available quantity of an item.
    pub async fn available(&self, item_id: Uuid) -> i32 {
        self.state
            .services
            .inventory
            .lookup(item_id)
            .await
            .expect("lookup")
            .expect("item exists")
            .available_quantity
    }

    /// Sends a request through the router, optionally authenticated, with an
    /// optional JSON body. Returns the status and parsed JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }
}
