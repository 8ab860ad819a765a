#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use finaicer_backend::chat::ChatClient;
use finaicer_backend::notifier::Notifier;
use finaicer_backend::store::MemoryStore;
use finaicer_backend::{app, AppState};
use serde_json::Value;

/// Nothing listens here; chat calls against it fail at connect time.
pub const DEAD_PROVIDER: &str = "http://127.0.0.1:9";

pub struct TestApp {
    pub base: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let res = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("send request");
        read(res).await
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let res = self.client.get(self.url(path)).send().await.expect("send request");
        read(res).await
    }

    pub async fn delete_json(&self, path: &str) -> (u16, Value) {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("send request");
        read(res).await
    }
}

async fn read(res: reqwest::Response) -> (u16, Value) {
    let status = res.status().as_u16();
    let body = res.text().await.expect("read body");
    let json = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, json)
}

pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, router).await.expect("serve app") });
    addr
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_provider(DEAD_PROVIDER).await
}

pub async fn spawn_app_with_provider(provider_base: &str) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        Notifier::new(16),
        ChatClient::new(provider_base, "gemini-2.5-flash", "test-key"),
    );
    let addr = serve(app().with_state(state)).await;
    TestApp {
        base: format!("http://{addr}"),
        store,
        client: reqwest::Client::new(),
    }
}
