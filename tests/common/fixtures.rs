//! Backend payload fixtures and scripted responders

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use wiremock::{Request, Respond, ResponseTemplate};

/// Source URL used by the reference scenarios
pub const TIKTOK_URL: &str = "https://tiktok.com/@a/video/123";

/// Task record as the backend serializes it (naive ISO timestamps)
pub fn task_json(id: &str, task_type: &str, status: &str, progress: u8) -> Value {
    json!({
        "id": id,
        "type": task_type,
        "status": status,
        "progress": progress,
        "input_url": TIKTOK_URL,
        "result": null,
        "error_message": null,
        "created_at": "2024-05-01T10:00:00.123456",
        "updated_at": "2024-05-01T10:00:01.654321"
    })
}

/// Completed task record carrying `result`
pub fn completed_json(id: &str, task_type: &str, result: Value) -> Value {
    let mut task = task_json(id, task_type, "completed", 100);
    task["result"] = result;
    task
}

/// Failed task record carrying `error_message`
pub fn failed_json(id: &str, task_type: &str, message: &str) -> Value {
    let mut task = task_json(id, task_type, "failed", 100);
    task["error_message"] = json!(message);
    task
}

/// Download result payload
pub fn download_result_json() -> Value {
    json!({
        "type": "download",
        "download_url": "http://localhost:8000/api/files/abc.mp4",
        "filename": "v.mp4",
        "file_size": 1048576
    })
}

/// `200 OK` with a JSON body
pub fn ok_json(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Error response with a `{detail}` body
pub fn detail(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "detail": message }))
}

/// Answers with each template in turn, then repeats the last one
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    next: AtomicUsize,
}

impl SequenceResponder {
    /// Create a responder; `responses` must not be empty
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        assert!(!responses.is_empty(), "SequenceResponder needs at least one response");
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.responses[index.min(self.responses.len() - 1)].clone()
    }
}
