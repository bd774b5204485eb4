#[path = "common/mod.rs"]
mod common;

use common::{spawn_app, EnvGuard};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use slacker::build_state_from_env;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

async fn start() -> (String, JoinHandle<()>) {
    let state = build_state_from_env().unwrap();
    let (base, handle) = spawn_app(state).await;
    (format!("{}/cmd", base), handle)
}

async fn spoiler(url: &str, token: &str) -> reqwest::Response {
    Client::new()
        .post(url)
        .form(&[
            ("token", token),
            ("command", "/spoiler"),
            ("text", "hidden"),
            ("user_name", "alice"),
        ])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn strict_auth_scenarios() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("SLACKER_CONFIG");
    env.remove("SLACKER_ASYNC_RESPONSE");
    env.set("SLACKER_TOKENS", "good");

    let (url1, handle1) = start().await;
    let resp1 = spoiler(&url1, "bad").await;
    assert_eq!(resp1.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp1.text().await.unwrap(), "Token 'bad' is invalid");
    handle1.abort();

    env.set("SLACKER_TOKENS", "tok1, tok2 ,good");
    let (url2, handle2) = start().await;
    let resp2 = spoiler(&url2, "good").await;
    assert_eq!(resp2.status(), StatusCode::OK);
    let resp2b = spoiler(&url2, "tok2").await;
    assert_eq!(resp2b.status(), StatusCode::OK);
    handle2.abort();

    // An empty list disables token checks.
    env.set("SLACKER_TOKENS", "");
    let (url3, handle3) = start().await;
    let resp3 = spoiler(&url3, "anything").await;
    assert_eq!(resp3.status(), StatusCode::OK);
    handle3.abort();
}

#[tokio::test]
async fn tokens_from_config_file() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slacker.json");
    std::fs::write(&path, r#"{"tokens": ["from-file"]}"#).unwrap();
    env.remove("SLACKER_TOKENS");
    env.remove("SLACKER_ASYNC_RESPONSE");
    env.set("SLACKER_CONFIG", path.to_str().unwrap());

    let (url, handle) = start().await;
    assert_eq!(spoiler(&url, "from-file").await.status(), StatusCode::OK);
    assert_eq!(
        spoiler(&url, "other").await.status(),
        StatusCode::BAD_REQUEST
    );
    handle.abort();
}
