//! Router-level tests: every request goes through the full Axum stack via
//! `tower::ServiceExt::oneshot`, backed by a scripted provider and a
//! temporary record store.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use sheet_spawner::api::build_app;
use sheet_spawner::app_state::AppState;
use sheet_spawner::domain::EventBus;
use sheet_spawner::provider::{ProviderCredential, ScriptedProvider};
use sheet_spawner::service::{EngineSettings, GenerationService};
use sheet_spawner::storage::RecordStore;

struct TestApp {
    _dir: tempfile::TempDir,
    app: Router,
}

async fn setup_with(provider: ScriptedProvider) -> TestApp {
    let Ok(dir) = tempfile::tempdir() else {
        panic!("tempdir failed");
    };
    let Ok(store) = RecordStore::open(dir.path()).await else {
        panic!("store open failed");
    };
    let settings = EngineSettings {
        concurrency: 2,
        style_prompt: String::new(),
        default_credential: Some(ProviderCredential::new("test-key")),
    };
    let service = GenerationService::new(store, Arc::new(provider), EventBus::new(256), settings);
    TestApp {
        _dir: dir,
        app: build_app(AppState::new(service).with_max_upload_bytes(1024)),
    }
}

async fn setup() -> TestApp {
    setup_with(ScriptedProvider::new()).await
}

impl TestApp {
    async fn raw(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let Ok(response) = self.app.clone().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let headers = response.headers().clone();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        (status, headers, bytes.to_vec())
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = request else {
            panic!("bad request");
        };
        let (status, _, bytes) = self.raw(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, Some(body)).await
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.call("POST", uri, None).await
    }

    async fn submit(&self, body: Value) -> String {
        let (status, resp) = self.post("/api/v1/generations", body).await;
        assert_eq!(status, StatusCode::ACCEPTED, "{resp}");
        let Some(id) = resp["request_id"].as_str() else {
            panic!("no request id in {resp}");
        };
        id.to_string()
    }

    async fn upload(
        &self,
        content_type: &str,
        body: Vec<u8>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/references")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body));
        let Ok(request) = request else {
            panic!("bad request");
        };
        self.raw(request).await
    }

    /// Polls a generation until no card is in flight.
    async fn settled(&self, id: &str) -> Value {
        for _ in 0..400 {
            let (status, generation) = self.get(&format!("/api/v1/generations/{id}")).await;
            assert_eq!(status, StatusCode::OK);
            if generation["counts"]["active"] == 0 {
                return generation;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation {id} did not settle");
    }
}

fn versions(generation: &Value) -> Vec<u64> {
    let Some(cards) = generation["cards"].as_array() else {
        panic!("no cards in {generation}");
    };
    cards.iter().filter_map(|c| c["version"].as_u64()).collect()
}

#[tokio::test]
async fn health_and_options() {
    let app = setup().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/config/options").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aspect_ratios"][0], "1:1");
    assert_eq!(body["resolutions"], json!(["1K", "2K", "4K"]));
    assert_eq!(body["block_kinds"][1]["kind"], "background");
    assert_eq!(body["block_kinds"][1]["capabilities"]["requires_file"], true);
}

#[tokio::test]
async fn regenerate_approve_export_scenario() {
    let app = setup().await;
    let (status, resp) = app
        .post(
            "/api/v1/generations",
            json!({"prompts": ["Hero", "Villain", "Sidekick"], "aspect_ratio": "1:1", "resolution": "1K"}),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(resp["cards"].as_array().map(Vec::len), Some(3));
    let Some(id) = resp["request_id"].as_str().map(str::to_string) else {
        panic!("no request id");
    };

    let generation = app.settled(&id).await;
    assert_eq!(generation["status"], "ready");
    assert_eq!(versions(&generation), vec![1, 1, 1]);

    let (status, card) = app
        .post_empty(&format!("/api/v1/generations/{id}/cards/1/regenerate"))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(card["state"], "regenerating");
    assert_eq!(card["approved"], false);

    let generation = app.settled(&id).await;
    assert_eq!(versions(&generation), vec![1, 2, 1]);
    assert_eq!(generation["cards"][1]["approved"], false);

    for index in [0, 2] {
        let (status, card) = app
            .post_empty(&format!("/api/v1/generations/{id}/cards/{index}/approve"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(card["approved"], true);
    }

    let Ok(request) = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/generations/{id}/export"))
        .body(Body::empty())
    else {
        panic!("bad request");
    };
    let (status, headers, bytes) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/zip")
    );
    assert_eq!(
        headers.get("x-exported-cards").and_then(|v| v.to_str().ok()),
        Some("0,2")
    );
    assert!(bytes.starts_with(b"PK"));

    let (status, report) = app.get("/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["progress"]["total"], 3);
    assert_eq!(report["progress"]["approved"], 2);
}

#[tokio::test]
async fn card_image_is_served() {
    let app = setup().await;
    let id = app.submit(json!({"prompts": ["Hero"]})).await;
    let generation = app.settled(&id).await;

    let Ok(request) = Request::builder()
        .uri(format!("/api/v1/generations/{id}/cards/0/image"))
        .body(Body::empty())
    else {
        panic!("bad request");
    };
    let (status, headers, bytes) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    assert_eq!(bytes, ScriptedProvider::image_bytes("Sheet 1 prompt: Hero"));

    let Some(url) = generation["cards"][0]["image_url"].as_str() else {
        panic!("no image url");
    };
    let Ok(request) = Request::builder().uri(url).body(Body::empty()) else {
        panic!("bad request");
    };
    let (status, _, same) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same, bytes);
}

#[tokio::test]
async fn error_responses_carry_kind() {
    let app = setup_with(ScriptedProvider::new().failing_on("Broken")).await;

    let (status, body) = app.post("/api/v1/generations", json!({"prompts": ["  "]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, body) = app
        .post("/api/v1/generations", json!({"prompts": ["a"], "aspect_ratio": "7:3"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, body) = app
        .get(&format!("/api/v1/generations/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFoundError");

    let id = app.submit(json!({"prompts": ["Fine", "Broken"]})).await;
    let generation = app.settled(&id).await;
    assert_eq!(generation["cards"][0]["state"], "ready");
    assert_eq!(generation["cards"][1]["state"], "error");
    assert_eq!(generation["status"], "error");

    let (status, body) = app
        .post_empty(&format!("/api/v1/generations/{id}/cards/1/approve"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "InvalidStateError");

    let (status, body) = app
        .post_empty(&format!("/api/v1/generations/{id}/cards/9/approve"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFoundError");

    let (status, body) = app.post_empty(&format!("/api/v1/generations/{id}/export")).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"]["kind"], "PreconditionError");

    // A failed card can be retried with a new prompt.
    let (status, card) = app
        .post(
            &format!("/api/v1/generations/{id}/cards/1/regenerate"),
            json!({"prompt": "Repaired"}),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(card["prompt"], "Repaired");
    let generation = app.settled(&id).await;
    assert_eq!(generation["cards"][1]["state"], "ready");
    assert_eq!(generation["cards"][1]["version"], 2);
}

#[tokio::test]
async fn yaml_prompt_file_adds_cards() {
    let app = setup().await;
    let id = app
        .submit(json!({
            "prompts": ["Cover"],
            "prompt_yaml": "slides:\n  - title: Hero\n    body: A knight\n  - '  '\n  - Closing slide\n"
        }))
        .await;
    let generation = app.settled(&id).await;
    let Some(cards) = generation["cards"].as_array() else {
        panic!("no cards in {generation}");
    };
    let prompts: Vec<&str> = cards.iter().filter_map(|c| c["prompt"].as_str()).collect();
    assert_eq!(prompts, vec!["Cover", "Hero\n\nA knight", "Closing slide"]);

    let (status, body) = app
        .post("/api/v1/generations", json!({"prompt_yaml": "slides: [unclosed"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, body) = app
        .post("/api/v1/generations", json!({"prompts": ["a"], "prompt_yaml": ""}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (_, status_body) = app.get("/api/v1/status").await;
    assert_eq!(status_body["generations"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn project_sheet_regeneration_and_archive() {
    let app = setup().await;

    let (status, body) = app.post("/api/v1/projects", json!({"name": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, project) = app.post("/api/v1/projects", json!({"name": "Deck"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let Some(project_id) = project["project_id"].as_str().map(str::to_string) else {
        panic!("no project id");
    };

    let (status, body) = app
        .post_empty(&format!("/api/v1/projects/{project_id}/regenerate"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFoundError");

    let id = app
        .submit(json!({"prompts": ["One", "Two"], "project_id": project_id}))
        .await;
    let before = app.settled(&id).await;

    let (_, project) = app.get(&format!("/api/v1/projects/{project_id}")).await;
    assert_eq!(project["current"], id.as_str());
    assert_eq!(project["archive_len"], 0);

    let (status, regen) = app
        .post_empty(&format!("/api/v1/projects/{project_id}/regenerate"))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(regen["request_id"], id.as_str());
    assert_eq!(regen["archive_len"], 1);

    let after = app.settled(&id).await;
    assert_eq!(versions(&after), vec![2, 2]);

    let (status, page) = app
        .get(&format!("/api/v1/projects/{project_id}/archive?page=1&per_page=10"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["data"][0]["position"], 0);
    assert_eq!(page["data"][0]["generation"]["cards"], before["cards"]);

    let (status, entry) = app
        .get(&format!("/api/v1/projects/{project_id}/archive/0"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let Some(old_url) = entry["generation"]["cards"][0]["image_url"].as_str() else {
        panic!("archived card has no image");
    };
    let (status, _) = app.get(old_url).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get(&format!("/api/v1/projects/{project_id}/archive/1"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "NotFoundError");
}

#[tokio::test]
async fn reference_upload_and_use() {
    let app = setup().await;
    let png = b"\x89PNG\r\n\x1a\nreference".to_vec();

    let (status, _, bytes) = app.upload("image/png", png).await;
    assert_eq!(status, StatusCode::CREATED);
    let Ok(stored) = serde_json::from_slice::<Value>(&bytes) else {
        panic!("upload response is not JSON");
    };
    let Some(name) = stored["name"].as_str().map(str::to_string) else {
        panic!("no reference name");
    };
    assert!(name.ends_with(".png"));

    let (status, _, bytes) = app.upload("text/plain", b"hello".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let Ok(body) = serde_json::from_slice::<Value>(&bytes) else {
        panic!("error body is not JSON");
    };
    assert_eq!(body["error"]["kind"], "ValidationError");

    let (status, _, _) = app.upload("image/png", vec![0_u8; 4096]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let id = app
        .submit(json!({
            "prompts": ["Hero", {"kind": "background", "reference": name}],
            "references": [name],
        }))
        .await;
    let generation = app.settled(&id).await;
    assert_eq!(generation["cards"][0]["model_text"][0], "rendered 1 reference(s)");
    assert_eq!(generation["cards"][1]["model_text"][0], "rendered 2 reference(s)");

    let (status, body) = app
        .post(
            "/api/v1/generations",
            json!({"prompts": ["Hero"], "references": ["missing.png"]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "ValidationError");
}
