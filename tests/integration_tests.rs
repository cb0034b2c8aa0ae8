//! Integration tests using wiremock to simulate the platform API.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sheetwire::{CancellationToken, Client, Error, JsonCodec, Method, MultipartPayload};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

fn transient_error() -> serde_json::Value {
    json!({"errorCode": 4001, "message": "Internal temporary failure", "refId": "ref-1"})
}

async fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn success_terminates_after_one_attempt() {
    let server = MockServer::start().await;
    let body = TestData {
        id: 1,
        name: "Sheet".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client.get::<TestData>("/test").await.unwrap();

    assert_eq!(response.data, body);
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
}

#[tokio::test]
async fn transient_error_code_is_retried_until_success() {
    let server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let counter = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(503).set_body_json(transient_error())
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "ok"}))
            }
        })
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let started = Instant::now();
    let response = client.get::<TestData>("/test").await.unwrap();

    assert_eq!(response.attempts, 2);
    assert!(response.was_retried());
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    // First backoff is 2^0 * 1000ms plus up to 1000ms jitter.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3000), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn two_transient_failures_accumulate_both_backoffs() {
    let server = MockServer::start().await;
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_json(transient_error())
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "ok"}))
            }
        })
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let started = Instant::now();
    let response = client.get::<TestData>("/test").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.attempts, 3);
    // Backoffs are at least 1000ms then 2000ms, at most 2000ms then 3000ms,
    // and both must fit inside the default 15s budget.
    assert!(elapsed >= Duration::from_millis(3000), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(7000), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn non_allow_listed_code_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(404).set_body_json(
            json!({"errorCode": 1006, "message": "Not Found", "refId": "ref-2"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let started = Instant::now();
    let result = client.get::<TestData>("/test").await;

    match result {
        Err(Error::Http { status, error, .. }) => {
            assert_eq!(status.as_u16(), 404);
            let error = error.unwrap();
            assert_eq!(error.error_code, 1006);
            assert_eq!(error.ref_id.as_deref(), Some("ref-2"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn non_json_failure_is_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw(b"<html>gateway error</html>".to_vec(), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<TestData>("/test").await;

    match result {
        Err(Error::Http { status, error, raw_response, .. }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(error.is_none());
            assert!(raw_response.contains("gateway error"));
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_json_error_body_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(500).set_body_raw(b"{not valid json".to_vec(), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.get::<TestData>("/test").await;

    match result {
        Err(Error::Deserialization { raw_body, .. }) => {
            assert_eq!(raw_body, "{not valid json");
        }
        other => panic!("expected Deserialization error, got {:?}", other),
    }
}

#[tokio::test]
async fn json_failure_without_an_error_code_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "oops"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let started = Instant::now();
    let result = client.get::<TestData>("/test").await;

    match result {
        Err(Error::Http { status, error, .. }) => {
            assert_eq!(status.as_u16(), 500);
            let error = error.unwrap();
            assert_eq!(error.error_code, 0);
            assert_eq!(error.message, "oops");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn exhausted_budget_surfaces_the_last_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(503).set_body_json(transient_error()))
        .expect(1)
        .mount(&server)
        .await;

    // The first backoff needs at least 1000ms; a 500ms budget can never
    // accommodate a retry.
    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .max_retry_timeout(Duration::from_millis(500))
        .build()
        .unwrap();

    let started = Instant::now();
    let result = client.get::<TestData>("/test").await;

    match result {
        Err(Error::RetryBudgetExhausted { attempts, last }) => {
            assert_eq!(attempts, 1);
            assert_eq!(last.api_error().unwrap().error_code, 4001);
            assert_eq!(last.status().unwrap().as_u16(), 503);
        }
        other => panic!("expected RetryBudgetExhausted, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn cancellation_interrupts_the_backoff_delay() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(503).set_body_json(transient_error()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = client.request(Method::Get, "/test").unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = client.execute_cancellable(&request, &token).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    // The cancel arrives during a backoff of at least 1000ms and must cut
    // it short.
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn bearer_token_and_default_headers_are_applied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("X-Client", "sync-job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9, "name": "me"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .unwrap()
        .access_token("secret-token")
        .default_header("X-Client", "sync-job")
        .unwrap()
        .build()
        .unwrap();

    let response = client.get::<TestData>("/users/me").await.unwrap();
    assert_eq!(response.data.id, 9);
}

#[tokio::test]
async fn execute_returns_the_raw_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sheets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "made"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request = client
        .request(Method::Post, "/sheets")
        .unwrap()
        .with_entity(sheetwire::Entity::json(b"{\"name\":\"made\"}".to_vec()));

    let envelope = client.execute(&request).await.unwrap();
    assert_eq!(envelope.status.as_u16(), 200);
    let entity = envelope.entity.as_ref().unwrap();
    assert!(entity.is_json());
    assert_eq!(entity.content_length, entity.content.len() as u64);

    let made: TestData = client.codec().deserialize(envelope.body_bytes()).unwrap();
    assert_eq!(made.name, "made");
}

#[tokio::test]
async fn paginated_and_list_shapes_materialize() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1, "name": "a"}],
            "totalCount": 1,
            "pageNumber": 1,
            "pageSize": 100
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/columns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "name": "c"},
            {"id": 1, "name": "a"},
            {"id": 2, "name": "b"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let page = client.get_paginated::<TestData>("/users").await.unwrap();
    assert_eq!(page.data.data, vec![TestData { id: 1, name: "a".into() }]);
    assert_eq!(page.data.total_count, Some(1));
    assert_eq!(page.data.page_number, Some(1));
    assert_eq!(page.data.page_size, Some(100));

    let columns = client.get_list::<TestData>("/columns").await.unwrap();
    let ids: Vec<u32> = columns.data.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn empty_success_body_fails_materialization() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rows/7"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.delete::<serde_json::Value>("/rows/7").await;

    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn multipart_upload_succeeds_in_one_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sheets/1/attachments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "file"})))
        .expect(1)
        .mount(&server)
        .await;

    let file_path = std::env::temp_dir().join("sheetwire_upload_ok.csv");
    std::fs::write(&file_path, b"a,b\n1,2\n").unwrap();

    let client = client_for(&server).await;
    let request = client
        .request(Method::Post, "/sheets/1/attachments")
        .unwrap()
        .with_entity(sheetwire::Entity::json(b"{\"description\":\"data\"}".to_vec()));
    let payload = MultipartPayload::new(&file_path, "text/csv", "Attachment");

    let envelope = client.execute_multipart(&request, &payload).await.unwrap();
    assert_eq!(envelope.status.as_u16(), 200);
}

#[tokio::test]
async fn multipart_failure_is_not_retried_even_for_transient_codes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sheets/1/attachments"))
        .respond_with(ResponseTemplate::new(503).set_body_json(transient_error()))
        .expect(1)
        .mount(&server)
        .await;

    let file_path = std::env::temp_dir().join("sheetwire_upload_fail.csv");
    std::fs::write(&file_path, b"a,b\n").unwrap();

    let client = client_for(&server).await;
    let request = client.request(Method::Post, "/sheets/1/attachments").unwrap();
    let payload = MultipartPayload::new(&file_path, "text/csv", "Attachment");

    let started = Instant::now();
    let result = client.execute_multipart(&request, &payload).await;

    match result {
        Err(Error::Http { status, error, .. }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(error.unwrap().error_code, 4001);
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn multipart_malformed_json_error_body_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/sheets/1/attachments"))
        .respond_with(
            ResponseTemplate::new(500).set_body_raw(b"{not valid json".to_vec(), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file_path = std::env::temp_dir().join("sheetwire_upload_bad_error.csv");
    std::fs::write(&file_path, b"a,b\n").unwrap();

    let client = client_for(&server).await;
    let request = client.request(Method::Post, "/sheets/1/attachments").unwrap();
    let payload = MultipartPayload::new(&file_path, "text/csv", "Attachment");

    let result = client.execute_multipart(&request, &payload).await;

    match result {
        Err(Error::Deserialization { raw_body, .. }) => {
            assert_eq!(raw_body, "{not valid json");
        }
        other => panic!("expected Deserialization error, got {:?}", other),
    }
}
