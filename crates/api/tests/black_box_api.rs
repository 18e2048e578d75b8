use reqwest::StatusCode;
use serde_json::json;

use chronicle_api::app::services::AppServices;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory storage, ephemeral port.
        let app = chronicle_api::app::build_app(AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
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

async fn create(client: &reqwest::Client, srv: &TestServer, name: &str, password: &str) -> serde_json::Value {
    let res = client
        .post(srv.url("/users"))
        .json(&json!({ "name": name, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_lifecycle_records_events() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create(&client, &srv, "alice", "s3cr3t").await;
    assert_eq!(created["id"], 1);
    assert_eq!(created["name"], "alice");
    assert!(created.get("password").is_none());
    assert!(created["createdAt"].is_string());

    let res = client
        .put(srv.url("/users/1"))
        .json(&json!({ "name": "alice", "password": "s3cr3t" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .put(srv.url("/users/1"))
        .json(&json!({ "name": "alicia", "password": "changed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "alicia");

    let events: Vec<serde_json::Value> = client
        .get(srv.url("/users/1/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["kind"], "UserCreated");
    assert_eq!(events[0]["aggregateKind"], "user");
    assert_eq!(events[0]["version"], "v1");
    assert_eq!(events[0]["data"], json!({ "id": 1, "name": "alice" }));
    assert_eq!(events[1]["data"]["passwordChanged"], false);
    assert_eq!(events[2]["data"]["passwordChanged"], true);
    assert_eq!(events[2]["aggregateId"], 1);
}

#[tokio::test]
async fn lists_users_in_id_order() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create(&client, &srv, "a", "pw").await;
    create(&client, &srv, "b", "pw").await;

    let users: Vec<serde_json::Value> = client
        .get(srv.url("/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = users.iter().map(|u| u["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);

    let res = client.get(srv.url("/users/2")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_user_is_404_and_writes_nothing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/users/999"))
        .json(&json!({ "name": "x", "password": "y" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client.get(srv.url("/users/999")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let events: Vec<serde_json::Value> = client
        .get(srv.url("/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn malformed_input_is_400() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/users"))
        .json(&json!({ "name": "no password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/users"))
        .json(&json!({ "name": "", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    for path in ["/users/abc", "/users/0", "/users/-3/events"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "path {path}");
    }

    let res = client.get(srv.url("/events?limit=lots")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url("/events?after=2")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn event_feed_honours_window_parameters() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for name in ["a", "b", "c", "d", "e"] {
        create(&client, &srv, name, "pw").await;
    }

    let page: Vec<serde_json::Value> = client
        .get(srv.url("/events?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = page.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);

    let since = page[1]["createdAt"].as_str().unwrap().to_string();
    let next: Vec<serde_json::Value> = client
        .get(srv.url("/events"))
        .query(&[("since", since.as_str()), ("after", "2"), ("limit", "10")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = next.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![3, 4, 5]);

    let future: Vec<serde_json::Value> = client
        .get(srv.url("/events"))
        .query(&[("since", "2999-01-01T00:00:00Z")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(future.is_empty());
}
