//! Gemini generation client adapter.

use crate::error::GenerationError;
use crate::llm::prompt::GenerationRequest;
use crate::llm::routing::ModelProfile;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Seam between the conversation flow and the upstream generation API.
///
/// The retry controller and the conversation handler only see this trait,
/// so tests can substitute a scripted implementation.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
        profile: &ModelProfile,
    ) -> Result<String, GenerationError>;
}

/// Client for the Gemini `generateContent` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client sharing the process-wide HTTP client.
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut parts = vec![serde_json::json!({ "text": request.prompt })];

        if let Some(image) = &request.image {
            parts.push(serde_json::json!({
                "inline_data": {
                    "mime_type": canonical_media_type(&image.media_type),
                    "data": BASE64.encode(&image.bytes),
                }
            }));
        }

        serde_json::json!({ "contents": [{ "parts": parts }] })
    }
}

#[async_trait::async_trait]
impl Generator for GeminiClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        profile: &ModelProfile,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            profile.upstream_name
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|error| GenerationError::Transport(error.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|error| GenerationError::Transport(format!("invalid response body: {error}")))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let text: String = body["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(text)
    }
}

/// Normalize a declared media type to the canonical form Gemini accepts.
///
/// Zalo's CDN reports JPEG uploads as the legacy `image/jpg` short form,
/// which the upstream API rejects.
pub fn canonical_media_type(media_type: &str) -> &str {
    match media_type {
        "image/jpg" => "image/jpeg",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::InlineImage;

    #[test]
    fn test_canonical_media_type_fixes_legacy_jpeg() {
        assert_eq!(canonical_media_type("image/jpg"), "image/jpeg");
        assert_eq!(canonical_media_type("image/jpeg"), "image/jpeg");
        assert_eq!(canonical_media_type("image/png"), "image/png");
    }

    #[test]
    fn test_text_request_body_has_single_text_part() {
        let request = GenerationRequest {
            prompt: "xin chào".into(),
            image: None,
        };
        let body = GeminiClient::request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "xin chào");
    }

    #[test]
    fn test_image_request_body_carries_base64_inline_data() {
        let request = GenerationRequest {
            prompt: "ảnh này có gì?".into(),
            image: Some(InlineImage {
                bytes: vec![1, 2, 3],
                media_type: "image/jpg".into(),
            }),
        };
        let body = GeminiClient::request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], BASE64.encode([1, 2, 3]));
    }

    #[test]
    fn test_with_base_url_overrides_endpoint() {
        let client = GeminiClient::new(reqwest::Client::new(), "k")
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(client.base_url, "http://localhost:9999/v1beta/");
    }
}
