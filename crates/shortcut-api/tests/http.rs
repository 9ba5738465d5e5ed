//! HTTP-level tests for `HttpClient` against a wiremock server.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use shortcut_api::{ApiError, HttpClient, RetryPolicy, ShortcutApi};
use shortcut_core::entity::EntityType;
use shortcut_core::payload::{BulkLabelUpdate, CreateStory, LabelRef};
use wiremock::matchers::{body_json, body_string_contains, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(format!("{}/api/v3", server.uri()), TOKEN)
        .with_retry_policy(RetryPolicy::new(2, Duration::from_millis(10)))
}

/// Runs blocking client code off the async runtime.
async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn token_is_sent_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/members"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m-1", "disabled": false,
             "profile": {"name": "Ann", "mention_name": "ann", "email_address": "ann@example.com"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let members = blocking(move || c.list_members()).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(
        members[0].profile.email_address.as_deref(),
        Some("ann@example.com")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_create_preserves_order_and_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/stories/bulk"))
        .and(body_json(json!({"stories": [{"name": "A"}, {"name": "B"}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 1, "name": "A", "app_url": "https://app/story/1", "entity_type": "story"},
            {"id": 2, "name": "B", "app_url": "https://app/story/2", "entity_type": "story"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let created = blocking(move || {
        c.create_stories(&[
            CreateStory {
                name: "A".into(),
                ..Default::default()
            },
            CreateStory {
                name: "B".into(),
                ..Default::default()
            },
        ])
    })
    .await
    .unwrap();

    assert_eq!(created.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(created.iter().all(|c| c.entity_type == EntityType::Story));
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_is_retried_after_hint() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/epics/7"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/epics/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    blocking(move || c.delete_entity(EntityType::Epic, 7))
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/members"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let c = client(&server);
    let err = blocking(move || c.list_members()).await.unwrap_err();
    match err {
        ApiError::RateLimited { retries, .. } => assert_eq!(retries, 2),
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_and_unauthorized_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/stories/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/members"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let c = client(&server);
    let (deleted, members) = blocking(move || {
        (
            c.delete_entity(EntityType::Story, 404),
            c.list_members(),
        )
    })
    .await;
    assert!(deleted.unwrap_err().is_not_found());
    assert!(members.unwrap_err().is_unauthorized());
}

#[tokio::test(flavor = "multi_thread")]
async fn search_follows_next_cursor() {
    let server = MockServer::start().await;
    // Second page first: wiremock picks the earliest mounted match.
    Mock::given(method("GET"))
        .and(path("/api/v3/search/stories"))
        .and(query_param("next", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3, "name": "C"}],
            "next": null,
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/search/stories"))
        .and(query_param("query", "label:\"x\""))
        .and(query_param("page_size", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "next": "/api/v3/search/stories?query=label%3A%22x%22&page_size=25&next=abc",
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let stories = blocking(move || c.search_stories("label:\"x\""))
        .await
        .unwrap();
    assert_eq!(
        stories.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn group_stories_walk_offsets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/groups/g-1/stories"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "A", "external_id": "100"},
            {"id": 11, "name": "B"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let stories = blocking(move || c.group_stories("g-1")).await.unwrap();
    assert_eq!(stories.len(), 2);
    assert_eq!(stories[0].external_id.as_deref(), Some("100"));
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_sends_multipart_body() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("shot.png");
    std::fs::write(&file, b"PNGDATA").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/files"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("filename=\"shot.png\""))
        .and(body_string_contains("PNGDATA"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 55, "filename": "shot.png", "url": "https://files/55/shot.png"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let uploaded = blocking(move || c.upload_file(&file)).await.unwrap();
    assert_eq!(uploaded.id, 55);
    assert_eq!(uploaded.url, "https://files/55/shot.png");
}

#[tokio::test(flavor = "multi_thread")]
async fn comments_and_labels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/stories/9/comments"))
        .and(body_json(json!({"text": "Pivotal Tracker Id 123"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 77, "text": "Pivotal Tracker Id 123", "created_at": "2024-03-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/stories/9/comments/77"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/stories/bulk"))
        .and(body_json(json!({"story_ids": [9], "labels_add": [{"name": "done"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "name": "S", "labels": [{"id": 1, "name": "done"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let c = client(&server);
    let (comment, deleted, labelled) = blocking(move || {
        let comment = c.create_story_comment(9, "Pivotal Tracker Id 123");
        let deleted = c.delete_story_comment(9, 77);
        let labelled = c.add_labels(&BulkLabelUpdate {
            story_ids: vec![9],
            labels_add: vec![LabelRef::new("done")],
        });
        (comment, deleted, labelled)
    })
    .await;

    assert_eq!(comment.unwrap().id, 77);
    deleted.unwrap();
    assert!(labelled.unwrap()[0].has_label("done"));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/stories"))
        .respond_with(ResponseTemplate::new(422).set_body_string("{\"message\":\"bad\"}"))
        .mount(&server)
        .await;

    let c = client(&server);
    let err = blocking(move || {
        c.create_story(&CreateStory {
            name: "x".into(),
            ..Default::default()
        })
    })
    .await
    .unwrap_err();
    match err {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 422);
            assert!(body.contains("bad"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}
