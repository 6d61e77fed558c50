use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{ApiConfig, DEFAULT_MODEL};
use crate::session::{InferenceProvider, Screenshot, SessionError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_PROMPT: &str = "Can you solve the question for me and give the final answer/code?";

const MAX_COMPLETION_TOKENS: u32 = 5000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat completions request types
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

/// Chat completions response types
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// One user message: the note (or the default question) followed by every
/// screenshot in capture order.
fn build_request(model: &str, images: &[Screenshot], annotation: &str) -> ChatRequest {
    let question = if annotation.trim().is_empty() {
        DEFAULT_PROMPT
    } else {
        annotation
    };

    let mut content = vec![ContentPart::Text {
        text: question.to_string(),
    }];
    content.extend(images.iter().map(|img| ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: img.to_data_url(),
        },
    }));

    let model = if model.trim().is_empty() {
        DEFAULT_MODEL
    } else {
        model.trim()
    };

    ChatRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user",
            content,
        }],
        max_completion_tokens: MAX_COMPLETION_TOKENS,
    }
}

fn endpoint(base_url: Option<&str>) -> String {
    let base = base_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

/// Turn a non-2xx body into a readable message, preferring the API's own text.
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    format!("OpenAI API error {status}: {detail}")
}

fn extract_answer(response: ChatResponse) -> Result<String, String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| "Model returned an empty response".to_string())
}

/// Client for the OpenAI chat completions API.
/// Reads the shared `ApiConfig` per request so settings edits apply immediately.
pub struct OpenAiClient {
    http: reqwest::Client,
    api: Arc<Mutex<ApiConfig>>,
    runtime: tokio::runtime::Handle,
}

impl OpenAiClient {
    pub fn new(
        api: Arc<Mutex<ApiConfig>>,
        runtime: tokio::runtime::Handle,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, api, runtime })
    }
}

async fn complete(
    http: reqwest::Client,
    api: ApiConfig,
    images: Vec<Screenshot>,
    annotation: String,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let body = build_request(&api.model, &images, &annotation);
    log::debug!("Making OpenAI API request (model={})", body.model);

    let resp = http
        .post(endpoint(api.base_url.as_deref()))
        .bearer_auth(api.effective_key())
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(api_error_message(status, &text).into());
    }

    let parsed: ChatResponse = serde_json::from_str(&text)?;
    log::info!("Received API response");
    Ok(extract_answer(parsed)?)
}

#[async_trait(?Send)]
impl InferenceProvider for OpenAiClient {
    async fn infer(&self, images: &[Screenshot], annotation: &str) -> Result<String, SessionError> {
        let api = self.api.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if api.effective_key().trim().is_empty() {
            return Err(SessionError::InferenceFailed(
                "API key is missing in config".into(),
            ));
        }

        let task = complete(
            self.http.clone(),
            api,
            images.to_vec(),
            annotation.to_string(),
        );
        match self.runtime.spawn(task).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(SessionError::InferenceFailed(e.to_string())),
            Err(e) => Err(SessionError::InferenceFailed(format!(
                "inference task panicked: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let images = vec![
            Screenshot::from_png(b"one".to_vec()),
            Screenshot::from_png(b"two".to_vec()),
        ];
        let body = serde_json::to_value(build_request("gpt-4o", &images, "what is this?")).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "max_completion_tokens": 5000,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "what is this?" },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,b25l" } },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,dHdv" } },
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_empty_annotation_uses_default_prompt() {
        let body = serde_json::to_value(build_request("", &[], "  ")).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["content"][0]["text"], DEFAULT_PROMPT);
        assert_eq!(body["messages"][0]["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(endpoint(None), "https://api.openai.com/v1/chat/completions");
        assert_eq!(endpoint(Some("")), "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            endpoint(Some("http://localhost:11434/v1/")),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_api_error_message_prefers_api_text() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            api_error_message(reqwest::StatusCode::UNAUTHORIZED, body),
            "OpenAI API error 401 Unauthorized: Incorrect API key provided"
        );
        assert_eq!(
            api_error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down\n"),
            "OpenAI API error 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_extract_answer() {
        let ok: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"x = 2"}}]}"#)
                .unwrap();
        assert_eq!(extract_answer(ok), Ok("x = 2".to_string()));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_answer(empty).is_err());

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(extract_answer(null).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let api = Arc::new(Mutex::new(ApiConfig::default()));
        let client = OpenAiClient::new(api, tokio::runtime::Handle::current()).unwrap();

        let err = client.infer(&[], "").await.unwrap_err();

        assert_eq!(
            err,
            SessionError::InferenceFailed("API key is missing in config".into())
        );
    }
}
