//! Model interaction: send the PDF and prompt, get back raw JSON text.
//!
//! [`GenerativeModel`] is the seam between the request flow and the outside
//! world. The production implementation, [`GeminiClient`], calls the Google
//! Generative Language REST API with the PDF as an inline document part and
//! asks for a JSON response. Tests swap in scripted implementations.
//!
//! The call is made once. There is no retry: a failure is reported to the
//! caller as-is, and a blocked prompt is reported as
//! [`MindMapError::ContentBlocked`] so the HTTP layer can answer 400.

use crate::config::ServiceConfig;
use crate::error::MindMapError;
use crate::pipeline::upload::PDF_MIME;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Finish reasons that mean the model refused to answer.
const BLOCKING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Text returned by the model plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    /// The reply text; expected to be a single JSON object.
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A generative model that can read a PDF and answer a prompt about it.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs and `/health`.
    fn model_name(&self) -> &str;

    /// Send `prompt` together with the PDF `document` and return the reply.
    async fn generate(&self, prompt: &str, document: &[u8]) -> Result<ModelReply, MindMapError>;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Build a client from the service configuration.
    ///
    /// Fails with [`MindMapError::MissingCredential`] when no API key is set.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, MindMapError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(MindMapError::MissingCredential)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MindMapError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: generate_content_url(&config.api_base_url, &config.model),
            temperature: config.temperature,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Full URL of the `generateContent` call.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, document: &[u8]) -> Result<ModelReply, MindMapError> {
        let body = build_request(prompt, document, self.temperature);
        let start = Instant::now();
        info!(
            "Sending {} byte document to {} ({})",
            document.len(),
            self.model,
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = api_error_message(&text);
            error!("Model API returned HTTP {}: {}", status.as_u16(), message);
            return Err(MindMapError::ModelApi {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            MindMapError::ModelApi {
                status: Some(status.as_u16()),
                message: format!("Unreadable response envelope: {e}"),
            }
        })?;

        let reply = interpret_response(parsed)?;
        debug!(
            "Model replied in {:?}: {} input tokens, {} output tokens, {} chars",
            start.elapsed(),
            reply.input_tokens,
            reply.output_tokens,
            reply.text.len()
        );
        Ok(reply)
    }
}

impl GeminiClient {
    fn transport_error(&self, e: reqwest::Error) -> MindMapError {
        if e.is_timeout() {
            error!("Model call timed out after {}s", self.timeout_secs);
            MindMapError::ModelTimeout {
                secs: self.timeout_secs,
            }
        } else {
            error!("Model call failed: {e}");
            MindMapError::ModelApi {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// `{base}/v1beta/models/{model}:generateContent`.
pub fn generate_content_url(base_url: &str, model: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: &'static str,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    pub block_reason_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

/// Build the request body: prompt text, then the PDF, JSON output requested.
pub fn build_request(
    prompt: &str,
    document: &[u8],
    temperature: Option<f32>,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: PDF_MIME,
                        data: STANDARD.encode(document),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            temperature,
        },
    }
}

/// Turn a successful HTTP reply into text, or classify why there is none.
pub fn interpret_response(response: GenerateContentResponse) -> Result<ModelReply, MindMapError> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            let reason = match &feedback.block_reason_message {
                Some(msg) => format!("{reason}: {msg}"),
                None => reason.clone(),
            };
            error!("Model blocked the prompt: {}", reason);
            return Err(MindMapError::ContentBlocked { reason });
        }
    }

    let (input_tokens, output_tokens) = response
        .usage_metadata
        .as_ref()
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((0, 0));

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| MindMapError::ModelApi {
            status: None,
            message: "Response contained no candidates".into(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(match candidate.finish_reason {
            Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
                error!("Model stopped with finish reason {}", reason);
                MindMapError::ContentBlocked { reason }
            }
            other => MindMapError::ModelApi {
                status: None,
                message: format!(
                    "Response contained no text (finish reason: {})",
                    other.as_deref().unwrap_or("unknown")
                ),
            },
        });
    }

    Ok(ModelReply {
        text,
        input_tokens,
        output_tokens,
    })
}

/// Pull `error.message` out of an API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorBody,
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => body.chars().take(500).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn url_layout() {
        assert_eq!(
            generate_content_url("https://generativelanguage.googleapis.com/", "gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            generate_content_url("http://localhost:1", "models/gemini-pro"),
            "http://localhost:1/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(build_request("PROMPT", b"%PDF-1.4", None)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "PROMPT"},
                        {"inlineData": {"mimeType": "application/pdf", "data": "JVBERi0xLjQ="}}
                    ]
                }],
                "generationConfig": {"responseMimeType": "application/json"}
            })
        );
    }

    #[test]
    fn request_body_includes_temperature_when_set() {
        let body = serde_json::to_value(build_request("p", b"x", Some(0.5))).unwrap();
        assert_eq!(body["generationConfig"]["temperature"], json!(0.5));
    }

    #[test]
    fn joins_candidate_text_parts() {
        let reply = interpret_response(response(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"topic\":"}, {"text": "\"A\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 1200, "candidatesTokenCount": 300}
        })))
        .unwrap();
        assert_eq!(reply.text, "{\"topic\":\"A\"}");
        assert_eq!(reply.input_tokens, 1200);
        assert_eq!(reply.output_tokens, 300);
    }

    #[test]
    fn prompt_block_is_content_blocked() {
        let err = interpret_response(response(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .unwrap_err();
        assert!(matches!(err, MindMapError::ContentBlocked { ref reason } if reason == "SAFETY"));
    }

    #[test]
    fn safety_finish_without_text_is_content_blocked() {
        let err = interpret_response(response(json!({
            "candidates": [{"finishReason": "PROHIBITED_CONTENT"}]
        })))
        .unwrap_err();
        assert!(matches!(err, MindMapError::ContentBlocked { .. }));
    }

    #[test]
    fn empty_reply_is_api_error() {
        let err = interpret_response(response(json!({"candidates": []}))).unwrap_err();
        assert!(matches!(err, MindMapError::ModelApi { .. }));

        let err = interpret_response(response(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"), "got: {err}");
    }

    #[test]
    fn api_error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn client_requires_key() {
        let err = GeminiClient::from_config(&ServiceConfig::default()).unwrap_err();
        assert!(matches!(err, MindMapError::MissingCredential));

        let config = ServiceConfig::builder()
            .api_key("k")
            .api_base_url("http://localhost:8089")
            .build()
            .unwrap();
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.model_name(), "gemini-2.0-flash");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8089/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
