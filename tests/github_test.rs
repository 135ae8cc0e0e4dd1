#![cfg(all(feature = "http", feature = "server"))]

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header::LINK;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use webhook_recipes::github::RestClient;
use webhook_recipes::recipes::GithubApi;

async fn pull_commits(
    State(base): State<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page = |n: u32| format!("{}/repos/owner/repo/pulls/7/commits?per_page=100&page={}", base, n);

    match query.get("page").map(String::as_str) {
        None | Some("1") => {
            let link = format!(r#"<{}>; rel="next", <{}>; rel="last""#, page(2), page(3));
            ([(LINK, link)], Json(json!([{ "commit": { "message": "first #fast" } }]))).into_response()
        }
        Some("2") => {
            let link = format!(r#"<{}>; rel="next", <{}>; rel="prev""#, page(3), page(1));
            ([(LINK, link)], Json(json!([{ "commit": { "message": "second" } }]))).into_response()
        }
        _ => Json(json!([{ "commit": { "message": "third #release" } }])).into_response(),
    }
}

async fn branch_commit(Path(branch): Path<String>) -> Json<serde_json::Value> {
    Json(json!({ "commit": { "message": format!("head of {}", branch) } }))
}

async fn spawn_api() -> RestClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/repos/owner/repo/pulls/7/commits", get(pull_commits))
        .route("/repos/owner/repo/commits/{branch}", get(branch_commit))
        .with_state(base.clone());
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    RestClient::new("token").with_api_url(base)
}

#[tokio::test]
async fn test_commit_messages_follow_every_page() {
    let client = spawn_api().await;

    let messages = client.pull_request_commit_messages("owner/repo", 7).await.unwrap();

    assert_eq!(messages, vec!["first #fast", "second", "third #release"]);
}

#[tokio::test]
async fn test_branch_names_reach_the_server_intact() {
    let client = spawn_api().await;

    let message = client.latest_commit_message("owner/repo", "feature#12").await.unwrap();
    assert_eq!(message, "head of feature#12");

    let message = client.latest_commit_message("owner/repo", "50%-off").await.unwrap();
    assert_eq!(message, "head of 50%-off");
}
