//! HttpFetcher against a mock server.

use std::time::Duration;

use waypoint_actions::HttpFetcher;
use waypoint_core::{Error, PageFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manual"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<title>Forklift manual</title>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let body = fetcher
        .fetch(&format!("{}/manual", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<title>Forklift manual</title>");
}

#[tokio::test]
async fn test_fetch_maps_error_status_to_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let err = fetcher
        .fetch(&format!("{}/gone", server.uri()))
        .await
        .unwrap_err();
    match err {
        Error::Request(msg) => assert!(msg.contains("404"), "unexpected message: {}", msg),
        other => panic!("expected request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(100)).unwrap();
    let err = fetcher.fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err, Error::Request(_)));
}
