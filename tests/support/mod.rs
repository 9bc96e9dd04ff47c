// Shared primitives for one-time server bootstrapping across integration tests.
use axum::{Json, Router, http::StatusCode, routing::post};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL. The env
// pairs are applied before startup; only the first caller's values take
// effect because the whole bootstrap runs once per test binary.
pub fn ensure_server(env: &[(&str, &str)]) -> &'static str {
    let env: Vec<(String, String)> = env
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Stand in for the collaborative-room service so matches can
                // complete room creation.
                let collab_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind collab stub port");
                let collab_addr = collab_listener.local_addr().expect("collab local addr");
                tokio::spawn(async move {
                    let app = Router::new().route("/room", post(stub_create_room));
                    axum::serve(collab_listener, app)
                        .await
                        .expect("collab stub failed");
                });

                // Env must be set before the server reads its config.
                // SAFETY: no other thread touches the environment at this point.
                unsafe {
                    std::env::set_var("COLLAB_SERVICE_URL", format!("http://{}", collab_addr));
                    for (key, value) in &env {
                        std::env::set_var(key, value);
                    }
                }

                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                matching_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

async fn stub_create_room(
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "roomId": body["roomId"] })),
    )
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
