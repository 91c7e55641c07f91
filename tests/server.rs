//! HTTP server tests. Each test binds an ephemeral port in-process and
//! talks to it over real HTTP.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use sdg_context::config::Config;
use sdg_context::server::{build_state, serve};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

fn hash_config() -> Config {
    let mut config = Config::default();
    config.embedding.provider = "hash".to_string();
    config.embedding.dims = Some(128);
    config.matching.threshold = 0.0;
    config
}

async fn start(config: Config) -> SocketAddr {
    let state = build_state(&config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state).await.unwrap();
    });
    addr
}

fn write_goal(path: &Path, sdg_no: u32, title: &str, content: &str) {
    let body = json!([{ "sdg_no": sdg_no, "title": title, "content": content }]);
    fs::write(path, body.to_string()).unwrap();
}

async fn post(addr: SocketAddr, route: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("http://{}{}", addr, route))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn test_health() {
    let addr = start(hash_config()).await;

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["statements"], 8);
    assert_eq!(body["model"], "hash");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_match_returns_ranked_records() {
    let addr = start(hash_config()).await;

    let (status, body) = post(
        addr,
        "/match",
        json!({ "query": "maternal mortality ratio", "top_n": 2 }),
    )
    .await;
    assert_eq!(status, 200);

    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 2);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[0]["goal_id"], 3);
    let sims: Vec<f64> = results
        .iter()
        .map(|r| r["similarity"].as_f64().unwrap())
        .collect();
    for w in sims.windows(2) {
        assert!(w[0] >= w[1]);
    }
}

#[tokio::test]
async fn test_match_unreachable_threshold_is_empty_list() {
    let addr = start(hash_config()).await;

    let (status, body) = post(
        addr,
        "/match",
        json!({ "query": "hunger", "threshold": 1.5 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_empty_query_is_400() {
    let addr = start(hash_config()).await;

    let (status, body) = post(addr, "/match", json!({ "query": "  " })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "empty_query");
    assert_eq!(body["error"]["message"], "query must not be empty");
}

#[tokio::test]
async fn test_bad_request_body() {
    let addr = start(hash_config()).await;

    let (status, body) = post(addr, "/match", json!({ "text": "hunger" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = post(addr, "/match", json!({ "query": "hunger", "top_n": 0 })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_statements_listing() {
    let addr = start(hash_config()).await;

    let body: Value = reqwest::get(format!("http://{}/statements", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let statements = body["statements"].as_array().unwrap();
    assert_eq!(statements.len(), 8);
    assert_eq!(statements[1]["level"], "target");
    assert_eq!(statements[1]["target_no"], "2.1");
}

#[tokio::test]
async fn test_reload_rebuilds_only_on_change() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("taxonomy.json");
    write_goal(&path, 6, "Clean Water and Sanitation", "Water and sanitation for all.");

    let mut config = hash_config();
    config.taxonomy.path = Some(path.clone());
    let addr = start(config).await;

    let (status, body) = post(addr, "/reload", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["rebuilt"], false);
    assert_eq!(body["statements"], 1);

    let tax = json!([
        { "sdg_no": 6, "title": "Clean Water and Sanitation", "content": "Water and sanitation for all.",
          "targets": [{ "target_no": "6.1", "description": "Safe and affordable drinking water." }] }
    ]);
    fs::write(&path, tax.to_string()).unwrap();

    let (status, body) = post(addr, "/reload", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["rebuilt"], true);
    assert_eq!(body["statements"], 2);

    let (_, body) = post(
        addr,
        "/match",
        json!({ "query": "drinking water", "threshold": -1.5 }),
    )
    .await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_reload_invalid_taxonomy_is_422_and_keeps_index() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("taxonomy.json");
    write_goal(&path, 13, "Climate Action", "Combat climate change.");

    let mut config = hash_config();
    config.taxonomy.path = Some(path.clone());
    let addr = start(config).await;

    fs::write(&path, r#"[{"sdg_no": 13, "content": "Combat climate change."}]"#).unwrap();

    let (status, body) = post(addr, "/reload", json!({})).await;
    assert_eq!(status, 422);
    assert_eq!(body["error"]["code"], "invalid_taxonomy");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("goals[0].title"));

    let health: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["statements"], 1);
}
