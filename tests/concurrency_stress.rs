#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{config, spawn_app, WhoAmI};
use slacker::build_state_with_registry;
use slacker::commands::CommandRegistry;

async fn fire(url: String) -> u64 {
    let client = reqwest::Client::new();
    let r = client
        .post(&url)
        .form(&[("token", "test"), ("command", "/whoami")])
        .send()
        .await
        .unwrap();
    assert!(r.status().is_success());
    r.text().await.unwrap().parse().unwrap()
}

#[tokio::test]
async fn concurrency_stress_request_ids_are_unique() {
    let mut registry = CommandRegistry::new();
    registry.register("/whoami", Arc::new(WhoAmI));
    let state = build_state_with_registry(&config(&["test"], false), registry).unwrap();
    let request_ids = state.request_ids.clone();
    let (base, handle) = spawn_app(state).await;
    let url = format!("{}/cmd", base);

    let total = 200u64;
    let concurrency = 32usize;

    let mut seen = HashSet::new();
    let mut tasks = Vec::new();
    for _ in 0..total {
        tasks.push(tokio::spawn(fire(url.clone())));
        if tasks.len() >= concurrency {
            for task in tasks.drain(..) {
                assert!(seen.insert(task.await.unwrap()));
            }
        }
    }
    for task in tasks {
        assert!(seen.insert(task.await.unwrap()));
    }

    handle.abort();
    assert_eq!(seen.len() as u64, total);
    assert_eq!(request_ids.current(), total);
    assert_eq!(seen, (1..=total).collect::<HashSet<_>>());
}
