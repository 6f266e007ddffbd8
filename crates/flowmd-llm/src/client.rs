//! Model clients.
//!
//! [`GeminiClient`] talks to the generateContent endpoint and asks for JSON
//! output constrained by a response schema. [`ScriptedModel`] replays canned
//! replies in-process for tests and demos.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{InferenceError, InferenceResult};

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Task identifiers, used for logging and for scripting replies.
pub mod tasks {
    pub const INTAKE_PREDICTIONS: &str = "intake_predictions";
    pub const RELATED_SYMPTOMS: &str = "related_symptoms";
    pub const CLINICAL_CONTEXT: &str = "clinical_context";
    pub const PLAN_SUGGESTIONS: &str = "plan_suggestions";
    pub const REGIMEN_SUGGESTIONS: &str = "regimen_suggestions";
    pub const TRANSCRIPT: &str = "transcript";
    pub const PATIENT_SUMMARY: &str = "patient_summary";
    pub const CLAIM: &str = "claim";
    pub const DISCHARGE_SUMMARY: &str = "discharge_summary";
    pub const SCHEDULE: &str = "schedule";
}

/// One model invocation.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub task: &'static str,
    pub system: Option<String>,
    pub prompt: String,
    /// Declared JSON output shape; `None` requests free text.
    pub response_schema: Option<Value>,
}

/// A remote (or scripted) generative model.
///
/// Implementations make exactly one attempt; retries are layered on top.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String>;
}

// =========================================================================
// Gemini
// =========================================================================

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> InferenceResult<Self> {
        Self::with_endpoint(api_key, model, GEMINI_ENDPOINT, timeout)
    }

    pub fn with_endpoint(
        api_key: &str,
        model: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> InferenceResult<Self> {
        if api_key.trim().is_empty() {
            return Err(InferenceError::Unavailable(
                "Gemini API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        info!("GeminiClient created for model {}", model);

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn build_request_body(request: &ModelRequest) -> Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }]
        });
        if let Some(system) = &request.system {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system }] });
        }
        if let Some(schema) = &request.response_schema {
            body["generationConfig"] = serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        body
    }

    pub fn extract_text(response: &GeminiResponse) -> Option<String> {
        let candidate = response.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Whether an error body carries the quota-exhausted marker.
fn is_rate_limit_marker(body: &str) -> bool {
    body.contains("RESOURCE_EXHAUSTED")
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String> {
        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = Self::build_request_body(request);

        debug!(
            task = request.task,
            "Gemini request: prompt={} chars, schema={}",
            request.prompt.len(),
            request.response_schema.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(
                "x-goog-api-key",
                HeaderValue::from_str(&self.api_key)
                    .map_err(|e| InferenceError::Unavailable(format!("Invalid API key header: {}", e)))?,
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Error bodies may echo the prompt; keep only the head.
            let truncated = truncate_chars(&error_body, MAX_ERROR_BODY_CHARS);
            let message = format!("Gemini API error {}: {}", status, truncated);
            warn!(task = request.task, "{}", message);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || is_rate_limit_marker(&error_body) {
                return Err(InferenceError::RateLimited(message));
            }
            return Err(InferenceError::Unavailable(message));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            InferenceError::Unavailable(format!("Failed to parse Gemini response: {}", e))
        })?;

        Self::extract_text(&gemini_response).ok_or_else(|| {
            InferenceError::Unavailable("Gemini response contained no text".to_string())
        })
    }
}

// =========================================================================
// Scripted model
// =========================================================================

/// In-process model that replays canned replies per task.
///
/// Queued replies are consumed first; after that the standing reply for the
/// task is returned. A task with neither fails with `Unavailable`.
#[derive(Default)]
pub struct ScriptedModel {
    queued: Mutex<HashMap<String, VecDeque<InferenceResult<String>>>>,
    standing: Mutex<HashMap<String, InferenceResult<String>>>,
    calls: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `body` to every call for `task`.
    pub fn respond(self, task: &str, body: &str) -> Self {
        self.set_standing(task, Ok(body.to_string()));
        self
    }

    /// Fail every call for `task` with `error`.
    pub fn fail(self, task: &str, error: InferenceError) -> Self {
        self.set_standing(task, Err(error));
        self
    }

    pub fn set_standing(&self, task: &str, reply: InferenceResult<String>) {
        self.standing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task.to_string(), reply);
    }

    /// Queue a one-shot reply for `task`.
    pub fn push_reply(&self, task: &str, reply: InferenceResult<String>) {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(task.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Number of calls made for `task`.
    pub fn calls(&self, task: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.task == task)
            .count()
    }

    /// The most recent request for `task`.
    pub fn last_request(&self, task: &str) -> Option<ModelRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|r| r.task == task)
            .cloned()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(request.task)
            .and_then(|q| q.pop_front());
        if let Some(reply) = queued {
            return reply;
        }

        self.standing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request.task)
            .cloned()
            .unwrap_or_else(|| {
                Err(InferenceError::Unavailable(format!(
                    "no scripted reply for task {}",
                    request.task
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(task: &'static str) -> ModelRequest {
        ModelRequest {
            task,
            system: Some("be brief".into()),
            prompt: "Cough for 3 days".into(),
            response_schema: Some(serde_json::json!({"type": "OBJECT"})),
        }
    }

    #[test]
    fn test_build_request_body() {
        let body = GeminiClient::build_request_body(&request(tasks::CLAIM));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Cough for 3 days");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_build_request_body_free_text() {
        let mut req = request(tasks::DISCHARGE_SUMMARY);
        req.response_schema = None;
        req.system = None;
        let body = GeminiClient::build_request_body(&req);
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] }
            }]
        }))
        .unwrap();
        assert_eq!(GeminiClient::extract_text(&response), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response: GeminiResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(GeminiClient::extract_text(&response).is_none());
    }

    #[test]
    fn test_new_empty_api_key() {
        assert!(GeminiClient::new("  ", DEFAULT_MODEL, DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn test_new_valid_api_key() {
        assert!(GeminiClient::new("test-key-123", DEFAULT_MODEL, DEFAULT_TIMEOUT).is_ok());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_rate_limit_marker() {
        assert!(is_rate_limit_marker(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#));
        assert!(!is_rate_limit_marker(r#"{"error":{"status":"INVALID_ARGUMENT"}}"#));
    }

    #[tokio::test]
    async fn test_scripted_model_queue_then_standing() {
        let model = ScriptedModel::new().respond(tasks::CLAIM, "standing");
        model.push_reply(tasks::CLAIM, Err(InferenceError::RateLimited("429".into())));

        let first = model.generate(&request(tasks::CLAIM)).await;
        assert!(matches!(first, Err(InferenceError::RateLimited(_))));
        let second = model.generate(&request(tasks::CLAIM)).await.unwrap();
        assert_eq!(second, "standing");
        assert_eq!(model.calls(tasks::CLAIM), 2);
    }

    #[tokio::test]
    async fn test_scripted_model_unscripted_task() {
        let model = ScriptedModel::new();
        let result = model.generate(&request(tasks::SCHEDULE)).await;
        assert!(matches!(result, Err(InferenceError::Unavailable(_))));
    }
}
