//! End-to-end HTTP tests driven against the router directly via
//! `tower::ServiceExt::oneshot`, avoiding a real port bind.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ocrsvc_api::state::AppState;
use ocrsvc_core::ServiceConfig;
use ocrsvc_documents::DocumentRegistry;
use ocrsvc_ocr::engine::Recognizer;
use ocrsvc_ocr::preprocessor::PreprocessorTunables;
use ocrsvc_ocr::OcrPipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_router() -> axum::Router {
    let recognizer = Recognizer::new(vec!["eng".to_string()]);
    let pipeline = Arc::new(OcrPipeline::new(
        recognizer,
        PreprocessorTunables::default(),
        0.5,
        0.1,
    ));
    let documents = Arc::new(DocumentRegistry::with_defaults());
    let dispatcher = ocrsvc_dispatch::Dispatcher::new(pipeline, documents, ServiceConfig::default());
    let state = Arc::new(AppState::new(dispatcher));
    ocrsvc_api::routes::build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_not_initialized_before_any_recognition() {
    let response = test_router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ocr_status"], "not_initialized");
}

#[tokio::test]
async fn supported_formats_lists_every_allowlisted_extension() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/supported_formats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["images"].as_array().unwrap().contains(&json!(".png")));
    assert!(body["videos"].as_array().unwrap().contains(&json!(".mp4")));
    assert!(body["documents"].as_array().unwrap().contains(&json!(".txt")));
}

#[tokio::test]
async fn metrics_starts_at_zero_counts() {
    let response = test_router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["images_processed"], 0);
    assert_eq!(body["errors"], 0);
}

#[tokio::test]
async fn image_ocr_on_missing_file_returns_404() {
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/image")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"file_path": "/nonexistent/path/image.png"}).to_string(),
        ))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn image_ocr_without_file_or_file_path_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/image")
        .header("content-type", "application/json")
        .body(Body::from(json!({}).to_string()))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_ocr_rejects_empty_file_list() {
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/batch")
        .header("content-type", "application/json")
        .body(Body::from(json!({"file_paths": []}).to_string()))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_ocr_preserves_per_file_order_through_http() {
    let request = Request::builder()
        .method("POST")
        .uri("/ocr/batch")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "file_paths": [
                    "/nonexistent/one.png",
                    "/nonexistent/two.png",
                ]
            })
            .to_string(),
        ))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["files_failed"], 2);
    assert_eq!(body["files_processed"], 0);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["error_message"], "File not found");
    assert_eq!(results[1]["error_message"], "File not found");
}

#[tokio::test]
async fn document_extraction_of_txt_file_succeeds_over_http() {
    let mut tmp = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    use std::io::Write;
    tmp.write_all(b"hello from disk").unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/extract/document")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"file_path": tmp.path().to_str().unwrap()}).to_string(),
        ))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["text"], "hello from disk");
}

#[tokio::test]
async fn document_extraction_rejects_unsupported_extension() {
    let tmp = tempfile::Builder::new().suffix(".xyz").tempfile().unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/extract/document")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"file_path": tmp.path().to_str().unwrap()}).to_string(),
        ))
        .unwrap();

    let response = test_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
