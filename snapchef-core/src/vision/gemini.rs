//! Google Gemini provider (hosted API).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::{ConfigError, GeminiConfig};
use super::parse::parse_recipe_in_text;
use super::prompts::{render_recipe_prompt, CLASSIFY_PROMPT};
use super::{non_blank, FoodVerdict, VisionError, VisionProvider};
use crate::image::mime_type_of;
use crate::types::RecipeDraft;

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self, ConfigError> {
        Ok(Self::new(GeminiConfig::from_env()?, client))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send the image plus a text prompt and return the first text part of the
    /// first candidate.
    async fn complete(&self, image: &[u8], prompt: &str) -> Result<String, VisionError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type_of(image).to_string(),
                            data: STANDARD.encode(image),
                        },
                    },
                    GeminiPart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        tracing::debug!(model = %self.config.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(VisionError::Api { status, message });
        }

        let response: GeminiResponse =
            serde_json::from_str(&body).map_err(|e| VisionError::Api {
                status,
                message: format!("Unexpected response body: {}", e),
            })?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
            .ok_or(VisionError::EmptyResponse)
            .and_then(non_blank)
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    async fn classify(&self, image: &[u8]) -> Result<FoodVerdict, VisionError> {
        let text = self.complete(image, CLASSIFY_PROMPT).await?;
        FoodVerdict::from_answer(text)
    }

    async fn generate_recipe(
        &self,
        image: &[u8],
        dietary_preference: &str,
        cuisine: &str,
    ) -> Result<RecipeDraft, VisionError> {
        let prompt = render_recipe_prompt(dietary_preference, cuisine);
        let text = self.complete(image, &prompt).await?;

        // Gemini tends to wrap the object in prose or fences, so take the
        // outermost brace span.
        let mut draft = parse_recipe_in_text(&text)?;
        draft.apply_requested(dietary_preference, cuisine);
        Ok(draft)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            GeminiConfig {
                api_key: "secret-key".to_string(),
                model: "gemini-1.5-flash".to_string(),
                base_url: "https://example.test/v1beta/".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            provider().endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("gemini-1.5-flash"));
    }

    #[test]
    fn test_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                    GeminiPart::Text {
                        text: "hi".to_string(),
                    },
                ],
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["contents"][0]["parts"][0]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(value["contents"][0]["parts"][1]["text"], "hi");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"A bowl of ramen"}],"role":"model"}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        let text = response.candidates[0].content.as_ref().unwrap().parts[0]
            .text
            .clone();
        assert_eq!(text.as_deref(), Some("A bowl of ramen"));
    }
}
