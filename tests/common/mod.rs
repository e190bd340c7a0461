#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use ruo_storefront_api::{
    config::AppConfig, routes::create_app, services::promo_service::PromoBook, state::AppState,
};
use serde_json::Value;
use tokio::net::TcpListener;

pub const SALES_EMAIL: &str = "sales@example.com";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

pub const PROMOS: &str = r#"[
    {"code":"SAVE10","type":"percent","amount":10},
    {"code":"OLD","type":"fixed","amount":5,"expiresAt":"2020-01-01T00:00:00Z"}
]"#;

pub fn config(pairs: &[(&str, &str)]) -> AppConfig {
    let mut map: HashMap<String, String> = HashMap::from([
        ("FRONTEND_URL".to_string(), "https://shop.example.com".to_string()),
        ("SALES_EMAIL".to_string(), SALES_EMAIL.to_string()),
        ("PROMOS_JSON".to_string(), PROMOS.to_string()),
    ]);
    for (key, value) in pairs {
        map.insert(key.to_string(), value.to_string());
    }
    AppConfig::from_lookup(|key| map.get(key).cloned()).expect("test config")
}

pub fn state(config: AppConfig) -> AppState {
    let promos = PromoBook::load(&config.promos).expect("promos");
    AppState::with_promos(config, promos).expect("state")
}

/// Serve the real application on an ephemeral port.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = create_app(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve app");
    });
    addr
}

pub async fn spawn_router(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    addr
}

/// Captures SendGrid v3 send requests. Fails every send while `failing` is set.
#[derive(Clone, Default)]
pub struct MockSendGrid {
    pub sent: Arc<Mutex<Vec<Value>>>,
    pub failing: Arc<Mutex<bool>>,
}

impl MockSendGrid {
    pub async fn spawn() -> (Self, SocketAddr) {
        let mock = Self::default();
        let app = Router::new()
            .route("/v3/mail/send", post(capture_mail))
            .with_state(mock.clone());
        (mock.clone(), spawn_router(app).await)
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().expect("lock").clone()
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    /// Poll until `count` emails arrived or a second elapsed.
    pub async fn wait_for(&self, count: usize) -> Vec<Value> {
        for _ in 0..50 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sent()
    }
}

async fn capture_mail(State(mock): State<MockSendGrid>, Json(body): Json<Value>) -> StatusCode {
    if *mock.failing.lock().expect("lock") {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    mock.sent.lock().expect("lock").push(body);
    StatusCode::ACCEPTED
}
