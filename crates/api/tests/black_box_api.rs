use groundwork_infra::{Repo, RepoConfig, Scope};
use groundwork_observability::Logger;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    repo: Repo,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // One connection keeps every request on the same in-memory database.
        let config = RepoConfig {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let repo = Repo::connect(&config).await.expect("failed to open sqlite");
        groundwork_api::app::migrate(&repo, &Scope::new(Logger::disabled()))
            .await
            .expect("failed to create schema");

        let app = groundwork_api::app::build_app(repo.clone(), Logger::disabled());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            repo,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_round_trips_to_the_database() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn notes_can_be_created_listed_and_deleted() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/notes"))
        .json(&json!({ "body": "  buy milk " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["body"], "buy milk");
    let id = created["id"].as_i64().expect("numeric id");

    let listed: serde_json::Value = client
        .get(server.url("/notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, json!([{ "id": id, "body": "buy milk" }]));

    let res = client
        .delete(server.url(&format!("/notes/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .delete(server.url(&format!("/notes/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), format!("note {id} does not exist"));
}

#[tokio::test]
async fn validation_failures_are_bad_requests() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/notes"))
        .json(&json!({ "body": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "note body must not be empty");

    let res = client
        .post(server.url("/notes"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "Failed to unmarshal request body");
}

#[tokio::test]
async fn database_failures_are_internal_and_expose_only_the_message() {
    let server = TestServer::spawn().await;
    server
        .repo
        .non_tx(&Scope::new(Logger::disabled()))
        .exec("DROP TABLE notes", &[])
        .await
        .unwrap();

    let res = reqwest::get(server.url("/notes")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "Error running Select");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let server = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .get(server.url("/health"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "trace-me");
}
