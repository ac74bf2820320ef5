mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use friendcircle::api::router;
use friendcircle::users::store;
use friendcircle::users::types::Tag;
use helpers::{default_app, test_app, wallet, FakeArchive, FakeClassifier, FakeTransport, TestApp};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(app.state.clone())
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn register(app: &TestApp, uid: &str, n: u8) {
    let (status, _) = send(
        app,
        post(
            "/api/auth/register",
            json!({ "walletAddress": wallet(n).to_string(), "uid": uid }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn tag(app: &TestApp, uid: &str, tags: &[&str]) {
    let (status, _) = send(app, post("/api/update-tags", json!({ "uid": uid, "tags": tags }))).await;
    assert_eq!(status, StatusCode::OK);
}

fn transcript(session: &str, texts: &[&str]) -> Value {
    let segments: Vec<Value> = texts
        .iter()
        .map(|t| {
            json!({
                "text": t,
                "speaker": "SPEAKER_00",
                "speaker_id": 0,
                "is_user": true,
                "person_id": null,
                "start": 0.0,
                "end": 1.0
            })
        })
        .collect();
    json!({ "session_id": session, "segments": segments })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = default_app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_requires_both_fields() {
    let app = default_app();
    let (status, body) = send(&app, post("/api/auth/register", json!({ "uid": "u1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Wallet address and UID are required");
}

#[tokio::test]
async fn register_rejects_malformed_wallet() {
    let app = default_app();
    let (status, _) = send(
        &app,
        post("/api/auth/register", json!({ "uid": "u1", "walletAddress": "0x1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_succeeds_and_completes_setup() {
    let app = default_app();
    let (status, body) = send(
        &app,
        post(
            "/api/auth/register",
            json!({ "walletAddress": wallet(1).to_string(), "uid": "u1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");

    let (status, body) = send(&app, get("/api/setup-completed?uid=u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_setup_completed"], true);
}

#[tokio::test]
async fn register_conflict_is_409() {
    let app = default_app();
    register(&app, "u1", 1).await;
    let (status, _) = send(
        &app,
        post(
            "/api/auth/register",
            json!({ "walletAddress": wallet(1).to_string(), "uid": "u2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn setup_completed_for_unknown_and_missing_uid() {
    let app = default_app();
    let (status, body) = send(&app, get("/api/setup-completed?uid=ghost")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_setup_completed"], false);

    let (status, body) = send(&app, get("/api/setup-completed")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UID is required");
}

#[tokio::test]
async fn wrong_method_is_405() {
    let app = default_app();
    let (status, _) = send(&app, get("/api/auth/register")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn update_tags_merges_and_get_tags_reads_back() {
    let app = default_app();
    register(&app, "u1", 1).await;

    let (status, body) = send(
        &app,
        post("/api/update-tags", json!({ "uid": "u1", "tags": ["music", "art"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["tags"], json!(["music", "art"]));

    tag(&app, "u1", &["art", "travel"]).await;

    let uri = format!("/api/get-tags?walletAddress={}", wallet(1));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["music", "art", "travel"]));
}

#[tokio::test]
async fn update_tags_rejects_unknown_tag() {
    let app = default_app();
    let (status, body) = send(
        &app,
        post("/api/update-tags", json!({ "uid": "u1", "tags": ["yoga"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("yoga"));
}

#[tokio::test]
async fn get_tags_is_lenient() {
    let app = default_app();
    for uri in [
        "/api/get-tags".to_string(),
        "/api/get-tags?walletAddress=garbage".to_string(),
        format!("/api/get-tags?walletAddress={}", wallet(7)),
    ] {
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["tags"], json!([]), "{uri}");
    }
}

#[tokio::test]
async fn update_ipns_uploads_and_records_cid() {
    let app = default_app();
    register(&app, "u1", 1).await;

    let (status, body) = send(
        &app,
        post(
            "/api/update-ipns",
            json!({ "uid": "u1", "conversations": [{ "text": "hello" }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cid"], "bafyfake1");
    assert_eq!(body["url"], "https://bafyfake1.ipfs.test");

    let uri = format!("/api/get-cids?walletAddress={}", wallet(1));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cids"], json!(["bafyfake1"]));
}

#[tokio::test]
async fn update_ipns_validates_and_reports_upload_failure() {
    let app = default_app();
    let (status, body) = send(&app, post("/api/update-ipns", json!({ "uid": "u1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = send(
        &app,
        post("/api/update-ipns", json!({ "uid": "u1", "conversations": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.archive.uploads(), 0);

    let failing = test_app(
        FakeClassifier::default(),
        FakeArchive::failing(),
        FakeTransport::default(),
        2,
    );
    let (status, body) = send(
        &failing,
        post("/api/update-ipns", json!({ "uid": "u1", "conversations": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to upload");
    assert!(body["details"].as_str().unwrap().contains("storage offline"));
}

#[tokio::test]
async fn get_cids_errors() {
    let app = default_app();
    let (status, _) = send(&app, get("/api/get-cids")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/get-cids?walletAddress={}", wallet(3));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn export_fetches_each_archived_conversation() {
    let app = default_app();
    register(&app, "u1", 1).await;
    send(
        &app,
        post("/api/update-ipns", json!({ "uid": "u1", "conversations": ["first"] })),
    )
    .await;
    // a CID the archive cannot serve
    {
        let mut conn = app.state.db.lock().unwrap();
        store::push_conversation_cid(&mut conn, "u1", "bafymissing").unwrap();
    }

    let uri = format!("/api/export?walletAddress={}", wallet(1));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    let conversations = body["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0]["cid"], "bafyfake1");
    assert_eq!(conversations[0]["content"], json!(["first"]));
    assert_eq!(conversations[1]["cid"], "bafymissing");
    assert!(conversations[1]["error"].is_string());
}

#[tokio::test]
async fn webhook_requires_uid() {
    let app = default_app();
    let (status, _) = send(&app, post("/api/webhook", transcript("s1", &["hi"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_buffers_until_batch_is_full() {
    let app = default_app(); // batch size 2
    register(&app, "u1", 1).await;

    let (status, body) = send(&app, post("/api/webhook?uid=u1", transcript("s1", &["we watched"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["flushed"], 0);
    assert_eq!(app.archive.uploads(), 0);

    let (_, body) = send(&app, post("/api/webhook?uid=u1", transcript("s1", &["the derby"]))).await;
    assert_eq!(body["flushed"], 1);
    assert_eq!(body["batches"][0]["tags"], json!(["football"]));
    assert_eq!(
        app.classifier.seen.lock().unwrap().as_slice(),
        ["we watched the derby"]
    );
    assert_eq!(app.archive.uploads(), 1);

    let uri = format!("/api/get-tags?walletAddress={}", wallet(1));
    let (_, body) = send(&app, get(&uri)).await;
    assert_eq!(body["tags"], json!(["football"]));

    let uri = format!("/api/get-cids?walletAddress={}", wallet(1));
    let (_, body) = send(&app, get(&uri)).await;
    assert_eq!(body["cids"], json!(["bafyfake1"]));
}

#[tokio::test]
async fn webhook_sessions_are_scoped_per_user() {
    let app = default_app(); // batch size 2
    register(&app, "alice", 1).await;
    register(&app, "bob", 2).await;

    send(&app, post("/api/webhook?uid=alice", transcript("s-1", &["alice secret"]))).await;
    let (_, body) = send(&app, post("/api/webhook?uid=bob", transcript("s-1", &["bob says hi"]))).await;
    assert_eq!(body["flushed"], 0);

    let (_, body) = send(&app, post("/api/webhook?uid=bob", transcript("s-1", &["bob again"]))).await;
    assert_eq!(body["flushed"], 1);

    let docs = app.archive.docs.lock().unwrap().clone();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].1, "bob-conversations.json");
    assert!(!docs[0].2.to_string().contains("alice secret"));

    let uri = format!("/api/get-cids?walletAddress={}", wallet(1));
    let (_, body) = send(&app, get(&uri)).await;
    assert_eq!(body["cids"], json!([]));
}

#[tokio::test]
async fn webhook_survives_classifier_outage() {
    let app = test_app(
        FakeClassifier::failing(),
        FakeArchive::default(),
        FakeTransport::default(),
        1,
    );
    let (status, body) = send(&app, post("/api/webhook?uid=u1", transcript("s1", &["hello"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flushed"], 1);
    assert_eq!(body["batches"][0]["tags"], json!([]));
    assert_eq!(body["batches"][0]["cid"], "bafyfake1");
}

#[tokio::test]
async fn webhook_get_returns_recent_payloads_with_no_cache_headers() {
    let app = default_app();
    send(&app, post("/api/webhook?uid=u1", transcript("s1", &["one"]))).await;
    send(&app, post("/api/webhook?uid=u1", transcript("s2", &["two"]))).await;

    let response = router(app.state.clone())
        .oneshot(get("/api/webhook"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    assert_eq!(headers.get("pragma").unwrap(), "no-cache");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let sessions: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["session_id"].as_str().unwrap())
        .collect();
    assert_eq!(sessions, vec!["s1", "s2"]);
    assert_eq!(body[0]["uid"], "u1");
}

#[tokio::test]
async fn webhook_allows_cross_origin_calls() {
    let app = default_app();
    let request = Request::builder()
        .method("GET")
        .uri("/api/webhook")
        .header("Origin", "https://assistant.example")
        .body(Body::empty())
        .unwrap();
    let response = router(app.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn rooms_list_member_tags() {
    let app = default_app();
    register(&app, "u1", 1).await;
    register(&app, "u2", 2).await;
    tag(&app, "u1", &["music", "tech"]).await;
    tag(&app, "u2", &["music"]).await;

    let uri = format!("/api/rooms?walletAddress={}", wallet(1));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let rooms = body["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0]["tag"], "music");
    assert_eq!(rooms[0]["topic"], "/friendcircle/1/music/json");
    assert_eq!(rooms[0]["members"], 2);
    assert_eq!(rooms[1]["members"], 1);
}

#[tokio::test]
async fn members_post_and_read_room_messages() {
    let app = default_app();
    register(&app, "u1", 1).await;
    register(&app, "u2", 2).await;
    tag(&app, "u1", &["football"]).await;
    tag(&app, "u2", &["football"]).await;

    let (status, body) = send(
        &app,
        post(
            "/api/rooms/football/messages",
            json!({ "walletAddress": wallet(1).to_string(), "text": "  kickoff at 8  " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["text"], "kickoff at 8");
    assert_eq!(
        app.chat.published.lock().unwrap().as_slice(),
        ["/friendcircle/1/football/json"]
    );

    let uri = format!("/api/rooms/football/messages?walletAddress={}", wallet(2));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    // the relay echo and the local copy share an id, so only one is kept
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sender"], wallet(1).to_string());
}

#[tokio::test]
async fn non_members_are_forbidden() {
    let app = default_app();
    register(&app, "u1", 1).await;
    tag(&app, "u1", &["art"]).await;

    let (status, _) = send(
        &app,
        post(
            "/api/rooms/football/messages",
            json!({ "walletAddress": wallet(1).to_string(), "text": "hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/rooms/football/messages?walletAddress={}", wallet(1));
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn room_validation_errors() {
    let app = default_app();
    register(&app, "u1", 1).await;
    tag(&app, "u1", &["art"]).await;

    let (status, _) = send(
        &app,
        post(
            "/api/rooms/yoga/messages",
            json!({ "walletAddress": wallet(1).to_string(), "text": "hi" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post(
            "/api/rooms/art/messages",
            json!({ "walletAddress": wallet(1).to_string(), "text": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/rooms?walletAddress={}", wallet(9));
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unregistered_wallet_is_not_a_member() {
    let app = default_app();

    let uri = format!("/api/rooms/art/messages?walletAddress={}", wallet(9));
    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post(
            "/api/rooms/art/messages",
            json!({ "walletAddress": wallet(9).to_string(), "text": "hello?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.chat.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn relay_outage_fails_post_but_read_serves_cache() {
    let app = test_app(
        FakeClassifier::default(),
        FakeArchive::default(),
        FakeTransport::failing(),
        2,
    );
    register(&app, "u1", 1).await;
    tag(&app, "u1", &["dance"]).await;

    let (status, _) = send(
        &app,
        post(
            "/api/rooms/dance/messages",
            json!({ "walletAddress": wallet(1).to_string(), "text": "salsa tonight?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let uri = format!("/api/rooms/dance/messages?walletAddress={}", wallet(1));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], json!([]));
    assert_eq!(body["room"], Tag::Dance.as_str());
}
