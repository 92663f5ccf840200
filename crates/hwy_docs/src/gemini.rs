//! Gemini client for document analysis.
//!
//! Uses the `generateContent` REST method. PDFs are sent inline as base64
//! next to the analysis prompt; answers are the concatenated text parts of
//! the first candidate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analyzer::DocumentAnalyzer;
use crate::config::GeminiConfig;
use crate::enrich::enrich_analysis;
use crate::error::{DocumentError, DocumentResult};
use crate::prompt;
use crate::types::{AnalysisResult, DocumentKind};

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    status: Option<String>,
}

/// Turn a non-success response into a [`DocumentError::Remote`].
fn remote_error(status: u16, body: &str) -> DocumentError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => DocumentError::Remote(format!("{} ({})", envelope.error.message, code)),
            None => DocumentError::Remote(envelope.error.message),
        },
        Err(_) if body.trim().is_empty() => DocumentError::Remote(format!("HTTP {}", status)),
        Err(_) => DocumentError::Remote(format!("HTTP {}: {}", status, body.trim())),
    }
}

/// Extract the answer text from a `generateContent` response body.
fn response_text(body: &str) -> DocumentResult<String> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(DocumentError::Remote(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| DocumentError::Protocol("response has no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(DocumentError::Protocol(format!(
            "candidate has no text (finish reason: {})",
            reason
        )));
    }
    Ok(text)
}

/// HTTP client for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> DocumentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DocumentError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from `GEMINI_API_KEY`
    pub fn from_env() -> DocumentResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Analyze already-extracted document text.
    pub async fn analyze_text(
        &self,
        content: &str,
        kind: DocumentKind,
    ) -> DocumentResult<AnalysisResult> {
        tracing::info!(kind = kind.display_name(), "Starting text analysis");
        let prompt = prompt::text_prompt(kind, content);
        let text = self.generate(vec![Part::Text { text: &prompt }]).await?;
        tracing::info!(chars = text.len(), "Text analysis completed");
        Ok(enrich_analysis(&text, kind))
    }

    /// Answer a question about document content.
    pub async fn ask_question(&self, question: &str, context: &str) -> DocumentResult<String> {
        let prompt = prompt::question_prompt(question, context);
        self.generate(vec![Part::Text { text: &prompt }]).await
    }

    async fn generate(&self, parts: Vec<Part<'_>>) -> DocumentResult<String> {
        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model = %self.config.model, "Gemini request failed: {}", e);
                DocumentError::from(e)
            })?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(model = %self.config.model, status = status.as_u16(), "Gemini response received");

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Gemini API error response: {}", text);
            return Err(remote_error(status.as_u16(), &text));
        }

        response_text(&text)
    }
}

#[async_trait]
impl DocumentAnalyzer for GeminiClient {
    async fn analyze_pdf(&self, base64_pdf: &str, file_name: &str) -> DocumentResult<String> {
        tracing::info!(file_name, model = %self.config.model, "Submitting PDF for analysis");

        let prompt = prompt::pdf_prompt(file_name);
        let parts = vec![
            Part::Text { text: &prompt },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: "application/pdf",
                    data: base64_pdf,
                },
            },
        ];

        let text = self.generate(parts).await?;
        tracing::info!(file_name, chars = text.len(), "PDF analysis completed");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwy_chat::ErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response; resolves to the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    fn client_for(base_url: &str) -> GeminiClient {
        GeminiClient::new(GeminiConfig::new("test-key").base_url(base_url)).unwrap()
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"SUBTASK 1"},{"text":" done"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(response_text(body).unwrap(), "SUBTASK 1 done");
    }

    #[test]
    fn test_response_without_candidates_is_protocol_error() {
        let err = response_text(r#"{"candidates":[]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = response_text("not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_blocked_prompt_is_remote_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = response_text(body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_remote_error_uses_error_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = remote_error(400, body);
        assert_eq!(
            err.to_string(),
            "Analysis failed: API key not valid (INVALID_ARGUMENT)"
        );
        assert_eq!(remote_error(503, "").to_string(), "Analysis failed: HTTP 503");
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "analyze" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "application/pdf",
                            data: "JVBERi0=",
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_k: 40,
                top_p: 0.8,
                max_output_tokens: 8192,
            },
            safety_settings: Vec::new(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "analyze");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "application/pdf"
        );
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[tokio::test]
    async fn test_analyze_text_enriches_answer() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"The design is good and adequate. Missing drainage details."}]}}]}"#,
        )
        .await;

        let result = client_for(&url)
            .analyze_text("Pavement notes", DocumentKind::General)
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.analysis.unwrap().contains("Missing drainage details"));
        assert!(result.summary.is_some());
        assert!(result.compliance_score.is_some());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1beta/models/gemini-1.5-pro:generateContent"));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains("Document Content:"));
        assert!(request.contains("Pavement notes"));
    }

    #[tokio::test]
    async fn test_ask_question_returns_answer_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Use IRC 37 for flexible pavements."}]}}]}"#,
        )
        .await;

        let answer = client_for(&url)
            .ask_question("Which code applies?", "Flexible pavement design")
            .await
            .unwrap();
        assert_eq!(answer, "Use IRC 37 for flexible pavements.");

        let request = server.await.unwrap();
        assert!(request.contains("Which code applies?"));
        assert!(request.contains("BLOCK_NONE"));
    }

    #[tokio::test]
    async fn test_ask_question_surfaces_service_error() {
        let (url, server) = serve_once(
            "429 Too Many Requests",
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .await;

        let err = client_for(&url)
            .ask_question("Which code applies?", "context")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(
            err.to_string(),
            "Analysis failed: Quota exceeded (RESOURCE_EXHAUSTED)"
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        let config = GeminiConfig::new("key")
            .base_url("http://127.0.0.1:9")
            .request_timeout(std::time::Duration::from_secs(2));
        let client = GeminiClient::new(config).unwrap();

        let err = client.analyze_pdf("JVBERi0=", "a.pdf").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
