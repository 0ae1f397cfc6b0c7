//! The Embedding Service endpoint is operator-configured, not fetched from
//! a hostile feed URL, so it is exercised directly against a local mock
//! server rather than through the URL Gatekeeper (which would reject the
//! loopback address `wiremock` necessarily binds to).

use planetcf::infrastructure::embedding::{EmbeddingService, HttpEmbeddingService};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn embeds_text_against_configured_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.1, 0.2, 0.3, 0.4]
        })))
        .mount(&server)
        .await;

    let endpoint = format!("{}/embed", server.uri());
    let service = HttpEmbeddingService::new(endpoint, 4, Duration::from_secs(5)).unwrap();

    let vector = service.embed("hello world").await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3, 0.4]);
}

#[tokio::test]
async fn dimension_mismatch_is_reported_as_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": [0.1, 0.2]
        })))
        .mount(&server)
        .await;

    let endpoint = format!("{}/embed", server.uri());
    let service = HttpEmbeddingService::new(endpoint, 768, Duration::from_secs(5)).unwrap();

    let err = service.embed("hello world").await.unwrap_err();
    assert!(matches!(
        err,
        planetcf::infrastructure::embedding::EmbeddingError::DimensionMismatch { .. }
    ));
}

#[tokio::test]
async fn upstream_error_status_surfaces_as_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let endpoint = format!("{}/embed", server.uri());
    let service = HttpEmbeddingService::new(endpoint, 4, Duration::from_secs(5)).unwrap();

    assert!(service.embed("hello world").await.is_err());
}
