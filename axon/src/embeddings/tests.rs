//! Tests for the hosted embeddings client and provider.
//!
//! Tests cover:
//! 1. API client success and request format
//! 2. Authorization header
//! 3. Order preservation by response index
//! 4. Rate limit (429) surfaces without retry
//! 5. Server error (5xx) retry behavior
//! 6. Auth error (401/403) no retry
//! 7. Provider construction and dimension checks

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::EmbeddingsConfig;
use crate::embeddings::api::{ApiConfig, EmbeddingApiClient};
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::error::AxonError;

fn test_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
        model: "text-embedding-004".to_string(),
        timeout_secs: 10,
        max_retries: 3,
    }
}

fn provider_config(base_url: &str, dimensions: usize) -> EmbeddingsConfig {
    EmbeddingsConfig {
        model: "gemini/text-embedding-004".to_string(),
        dimensions,
        batch_size: 2,
        api_key: Some("test-api-key".to_string()),
        base_url: Some(base_url.to_string()),
        timeout_secs: 10,
        max_retries: 0,
    }
}

fn embedding_response(embeddings: Vec<Vec<f32>>) -> serde_json::Value {
    json!({
        "data": embeddings
            .into_iter()
            .enumerate()
            .map(|(i, e)| json!({ "embedding": e, "index": i }))
            .collect::<Vec<_>>()
    })
}

// =============================================================================
// API client
// =============================================================================

#[tokio::test]
async fn test_api_client_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&["test text"]).await.unwrap();

    assert_eq!(embeddings.len(), 1);
    assert_eq!(embeddings[0], vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_api_client_request_format_and_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_json(json!({
            "model": "text-embedding-004",
            "input": ["hello world"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.5]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    assert!(client.embed(&["hello world"]).await.is_ok());
}

#[tokio::test]
async fn test_api_client_restores_input_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "embedding": [2.0], "index": 1 },
                { "embedding": [1.0], "index": 0 }
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&["first", "second"]).await.unwrap();
    assert_eq!(embeddings, vec![vec![1.0], vec![2.0]]);
}

#[tokio::test]
async fn test_api_client_rejects_short_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![1.0]])),
        )
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, AxonError::Embedding(_)));
}

#[tokio::test]
async fn test_api_client_rate_limit_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["text"]).await.unwrap_err();

    match err {
        AxonError::ApiRateLimit { retry_after } => assert_eq!(retry_after, Some(7)),
        other => panic!("Expected ApiRateLimit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_api_client_retries_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.9]])),
        )
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&["text"]).await.unwrap();
    assert_eq!(embeddings[0], vec![0.9]);
}

#[tokio::test]
async fn test_api_client_server_errors_exhaust_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["text"]).await.unwrap_err();
    assert!(matches!(err, AxonError::Embedding(_)));
}

#[tokio::test]
async fn test_api_client_auth_error_no_retry() {
    for status in [401, 403] {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(status).set_body_string("bad key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
        let err = client.embed(&["text"]).await.unwrap_err();
        assert!(matches!(err, AxonError::ApiAuth(_)), "status {status}");
    }
}

// =============================================================================
// Provider
// =============================================================================

#[test]
fn test_provider_requires_api_key_for_hosted_models() {
    let mut config = provider_config("http://localhost:1", 3);
    config.api_key = None;

    let err = EmbeddingProvider::new(&config).err().unwrap();
    assert!(matches!(err, AxonError::Config(_)));
}

#[test]
fn test_provider_allows_keyless_ollama() {
    let mut config = provider_config("http://localhost:1", 3);
    config.model = "ollama/nomic-embed-text".to_string();
    config.api_key = None;

    let provider = EmbeddingProvider::new(&config).unwrap();
    assert_eq!(provider.model_name(), "nomic-embed-text");
    assert_eq!(provider.dimensions(), 3);
}

#[tokio::test]
async fn test_provider_batches_and_preserves_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_json(json!({ "model": "text-embedding-004", "input": ["a", "b"] })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_response(vec![vec![1.0, 0.0], vec![2.0, 0.0]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_json(json!({ "model": "text-embedding-004", "input": ["c"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![3.0, 0.0]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 2)).unwrap();
    let vectors = provider
        .embed_documents(vec!["a".into(), "b".into(), "c".into()])
        .await
        .unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]);
}

#[tokio::test]
async fn test_provider_rejects_wrong_dimensions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![1.0, 2.0]])),
        )
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::new(&provider_config(&mock_server.uri(), 768)).unwrap();
    let err = provider.embed_query("question").await.unwrap_err();
    assert!(matches!(err, AxonError::Embedding(_)));
}
