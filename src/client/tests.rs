use super::*;
use crate::error::{
    CREATE_TASK_FALLBACK, FETCH_TASK_FALLBACK, PROCESS_IMAGE_FALLBACK, SubmissionError,
    ValidationError,
};
use crate::types::{OutputFormat, ProcessOptions, TaskId, TaskResult, TaskStatus, TaskType};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> VtoolClient {
    VtoolClient::builder().base_url(server.uri()).build().unwrap()
}

fn task_body(id: &str, status: &str, progress: u8) -> serde_json::Value {
    json!({
        "id": id,
        "type": "summary",
        "status": status,
        "progress": progress,
        "input_url": "https://youtube.com/watch?v=x",
        "result": null,
        "error_message": null,
        "created_at": "2024-05-01T10:00:00.000001",
        "updated_at": "2024-05-01T10:00:01.000001"
    })
}

// Task creation

#[tokio::test]
async fn test_create_task_posts_type_and_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .and(body_json(json!({
            "type": "download",
            "url": "https://tiktok.com/@a/video/123"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"task_id": "t-1", "message": "Task created"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server)
        .create_task(TaskType::Download, "  https://tiktok.com/@a/video/123 ", None)
        .await
        .unwrap();

    assert_eq!(created.task_id, "t-1");
    assert_eq!(created.message, "Task created");
}

#[tokio::test]
async fn test_create_task_flattens_options_into_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .and(body_json(json!({
            "type": "download",
            "url": "https://youtube.com/watch?v=x",
            "format": "video",
            "quality": "720p (.mp4)",
            "ytdlp_format": "bestvideo[height<=720]+bestaudio/best[height<=720]/best"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let options = crate::catalog::FormatPreset::find("video-720")
        .unwrap()
        .to_options();
    let created = client_for(&server)
        .create_task(
            TaskType::Download,
            "https://youtube.com/watch?v=x",
            Some(&options),
        )
        .await
        .unwrap();

    assert_eq!(created.task_id, "t-2");
    assert!(created.message.is_empty());
}

#[tokio::test]
async fn test_create_task_sends_separation_when_set() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .and(body_json(json!({
            "type": "audio",
            "url": "https://youtube.com/watch?v=x",
            "format": "audio",
            "separation": "vocals"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-3"})))
        .expect(1)
        .mount(&server)
        .await;

    let options = ProcessOptions {
        format: Some(OutputFormat::Audio),
        separation: Some(crate::types::SeparationMode::Vocals),
        ..Default::default()
    };
    client_for(&server)
        .create_task(TaskType::Audio, "https://youtube.com/watch?v=x", Some(&options))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_task_invalid_url_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client
        .create_task(TaskType::Download, "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::EmptyUrl)));

    let err = client
        .create_task(TaskType::Spy, "not a url", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MalformedUrl { .. })
    ));

    let err = client
        .create_task(TaskType::RemoveBg, "https://example.com/a.png", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::ImageUploadRequired(TaskType::RemoveBg))
    ));
}

#[tokio::test]
async fn test_create_task_surfaces_backend_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Invalid URL"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_task(TaskType::Download, "https://example.com/v", None)
        .await
        .unwrap_err();

    match err {
        Error::Submission(e) => {
            assert_eq!(e.message, "Invalid URL");
            assert_eq!(e.status, Some(400));
        }
        other => panic!("expected submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_task_falls_back_on_unusable_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_task(TaskType::Download, "https://example.com/v", None)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), CREATE_TASK_FALLBACK);
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_create_task_unreachable_backend() {
    // Nothing listens on port 1
    let client = VtoolClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let err = client
        .create_task(TaskType::Download, "https://example.com/v", None)
        .await
        .unwrap_err();

    match err {
        Error::Submission(e) => assert!(e.status.is_none()),
        other => panic!("expected submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_task_respects_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"task_id": "late"}))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = VtoolClient::builder()
        .base_url(server.uri())
        .request_timeout(std::time::Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client
        .create_task(TaskType::Download, "https://example.com/v", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission(SubmissionError { status: None, .. })));
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/backend/api/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = VtoolClient::builder()
        .base_url(format!("{}/backend", server.uri()))
        .build()
        .unwrap();
    assert!(client.base_url().path().ends_with("/backend/"));

    client
        .create_task(TaskType::Spy, "https://example.com/v", None)
        .await
        .unwrap();
}

#[test]
fn test_builder_rejects_invalid_base_url() {
    let err = VtoolClient::builder().base_url("::nope").build().unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_client_debug_shows_base_url() {
    let client = VtoolClient::builder()
        .base_url("http://localhost:8000")
        .build()
        .unwrap();
    let printed = format!("{client:?}");
    assert!(printed.starts_with("VtoolClient"));
    assert!(printed.contains("http://localhost:8000/"));
}

// Status fetches

#[tokio::test]
async fn test_get_task_decodes_record() {
    let server = MockServer::start().await;

    let mut body = task_body("t-1", "completed", 100);
    body["result"] = json!({
        "type": "summary",
        "markdown": "# Key points",
        "word_count": 2,
        "topics": ["rust"]
    });

    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let task = client_for(&server)
        .get_task(&TaskId::from("t-1"))
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert!(matches!(task.result, Some(TaskResult::Summary(_))));
}

#[tokio::test]
async fn test_get_task_accepts_record_without_timestamps() {
    let server = MockServer::start().await;

    let mut body = task_body("t-2", "processing", 30);
    body["created_at"] = serde_json::Value::Null;
    body.as_object_mut().unwrap().remove("updated_at");

    Mock::given(method("GET"))
        .and(path("/api/tasks/t-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let task = client_for(&server)
        .get_task(&TaskId::from("t-2"))
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Processing);
    assert!(task.created_at.is_none());
    assert!(task.updated_at.is_none());
}

#[tokio::test]
async fn test_get_task_not_found_is_poll_fetch_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Task not found"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_task(&TaskId::from("missing"))
        .await
        .unwrap_err();

    match err {
        Error::PollFetch(e) => {
            assert_eq!(e.task_id, "missing");
            assert_eq!(e.message, "Task not found");
            assert_eq!(e.status, Some(404));
            assert!(!e.timed_out);
        }
        other => panic!("expected poll fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_task_malformed_record_uses_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks/t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "t-1"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_task(&TaskId::from("t-1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), FETCH_TASK_FALLBACK);
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_get_task_escapes_identifier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("a/b", "pending", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let task = client_for(&server)
        .get_task(&TaskId::from("a/b"))
        .await
        .unwrap();
    assert_eq!(task.id, "a/b");
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "healthy", "redis": "connected"})),
        )
        .mount(&server)
        .await;

    let health = client_for(&server).health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.extra["redis"], "connected");
}

// Image uploads

#[tokio::test]
async fn test_remove_background_returns_png_and_filename() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/remove-bg"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"cat.jpg\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .insert_header(
                    "Content-Disposition",
                    "attachment; filename=removed_bg_cat.png",
                )
                .set_body_bytes(b"\x89PNG-data".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let image = ImageUpload::new("cat.jpg", b"jpeg-bytes".to_vec(), "image/jpeg");
    let processed = client_for(&server)
        .process_image(ImageMode::RemoveBackground, image, None)
        .await
        .unwrap();

    assert_eq!(processed.bytes, b"\x89PNG-data");
    assert_eq!(processed.filename.as_deref(), Some("removed_bg_cat.png"));
    assert_eq!(processed.content_type.as_deref(), Some("image/png"));
    assert_eq!(processed.filename_or("cat.jpg"), "removed_bg_cat.png");
}

#[tokio::test]
async fn test_remove_object_sends_image_and_mask() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/inpainting/remove-object"))
        .and(body_string_contains("name=\"image\""))
        .and(body_string_contains("name=\"mask\""))
        .and(body_string_contains("filename=\"mask.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let image = ImageUpload::new("room.png", b"png-bytes".to_vec(), "image/png");
    let processed = client_for(&server)
        .process_image(ImageMode::RemoveObject, image, Some(b"mask-bytes".to_vec()))
        .await
        .unwrap();

    assert!(processed.filename.is_none());
    assert_eq!(processed.filename_or("room.png"), "processed_room.png");
}

#[tokio::test]
async fn test_process_image_rejects_empty_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let image = ImageUpload::new("empty.png", Vec::new(), "image/png");
    let err = client_for(&server)
        .process_image(ImageMode::RemoveBackground, image, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::EmptyImage { .. })
    ));
}

#[tokio::test]
async fn test_process_image_rejects_invalid_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let image = ImageUpload::new("cat.jpg", b"jpeg-bytes".to_vec(), "jpeg");
    let err = client_for(&server)
        .process_image(ImageMode::RemoveBackground, image, None)
        .await
        .unwrap_err();

    match err {
        Error::Validation(ValidationError::InvalidContentType {
            filename,
            content_type,
        }) => {
            assert_eq!(filename, "cat.jpg");
            assert_eq!(content_type, "jpeg");
        }
        other => panic!("expected invalid content type, got {other:?}"),
    }
}

#[tokio::test]
async fn test_process_image_error_detail_and_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/remove-bg"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "File must be an image"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/inpainting/remove-object"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client
        .process_image(
            ImageMode::RemoveBackground,
            ImageUpload::new("a.txt", b"text".to_vec(), "text/plain"),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "File must be an image");

    let err = client
        .process_image(
            ImageMode::RemoveObject,
            ImageUpload::new("a.png", b"png".to_vec(), "image/png"),
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), PROCESS_IMAGE_FALLBACK);
}
