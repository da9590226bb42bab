//! Images API client against a mock server

use imex_export::config::SourceConfig;
use imex_export::models::RawVisionAnnotations;
use imex_export::source::{ImageApiClient, ImageSource, SourceError};
use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> ImageApiClient {
    ImageApiClient::new(&SourceConfig {
        host: format!("{}/v1/", server.uri()),
        debug: true,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_parses_items_and_total() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/tenants/acme/projects/p1/images"))
        .and(query_param("offset", "100"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "project_id": "p1",
                    "id": "img-1",
                    "version": "2",
                    "job_id": "j-1",
                    "original_uri": "gs://raw/img-1.jpg",
                    "exif_annotations": {"Make": "Canon"},
                    "vision_annotations": "{\"labelAnnotations\": []}",
                    "annotations": {"state": "reviewed"}
                },
                {
                    "id": "img-2",
                    "version": "1",
                    "job_id": "j-1",
                    "vision_annotations": {"labels": "[]"}
                }
            ],
            "meta": {"total": 250}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server).list("acme", "p1", 100, 2).await.unwrap();

    assert_eq!(page.total, 250);
    assert_eq!(page.items.len(), 2);
    assert!(matches!(
        page.items[0].vision_annotations,
        Some(RawVisionAnnotations::Encoded(_))
    ));
    assert!(matches!(
        page.items[1].vision_annotations,
        Some(RawVisionAnnotations::Map(_))
    ));
    assert_eq!(page.items[1].project_id, None);
}

#[tokio::test]
async fn test_count_requests_a_single_item() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/tenants/acme/projects/p1/images"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "meta": {"total": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client(&server).count("acme", "p1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_error_status_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("tenant disabled"))
        .mount(&server)
        .await;

    let err = client(&server).list("acme", "p1", 0, 1).await.unwrap_err();

    match err {
        SourceError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "tenant disabled");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"items\": 3}"))
        .mount(&server)
        .await;

    let err = client(&server).list("acme", "p1", 0, 1).await.unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)));
}
