//! Locally hosted vision model behind an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::config::LocalLlmConfig;
use super::parse::{parse_recipe, parse_recipe_in_text, strip_code_fences};
use super::prompts::{render_recipe_prompt, CLASSIFY_PROMPT};
use super::{non_blank, FoodVerdict, VisionError, VisionProvider};
use crate::types::RecipeDraft;

/// Local model provider.
#[derive(Debug)]
pub struct LocalProvider {
    config: LocalLlmConfig,
    client: reqwest::Client,
}

impl LocalProvider {
    pub fn new(config: LocalLlmConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(LocalLlmConfig::from_env(), client)
    }

    fn build_request(&self, image: &[u8], prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{}", STANDARD.encode(image)),
                        },
                    },
                ],
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn complete(&self, image: &[u8], prompt: &str) -> Result<String, VisionError> {
        let request = self.build_request(image, prompt);

        tracing::debug!(model = %self.config.model, url = %self.config.url, "Calling local model");

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if !(200..300).contains(&status) {
            return Err(VisionError::Api {
                status,
                message: body,
            });
        }

        let response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| VisionError::Api {
                status,
                message: format!("Unexpected response body: {}", e),
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(VisionError::EmptyResponse)
            .and_then(non_blank)?;

        tracing::debug!(response = %content, "Local model response");
        Ok(content)
    }
}

/// Local models mostly answer with a fenced object; anything else falls back to
/// the outermost brace span.
fn parse_local_recipe(text: &str) -> Result<RecipeDraft, VisionError> {
    parse_recipe(strip_code_fences(text), text).or_else(|_| parse_recipe_in_text(text))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl VisionProvider for LocalProvider {
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

        let mut draft = parse_local_recipe(&text)?;
        draft.apply_requested(dietary_preference, cuisine);
        Ok(draft)
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider = LocalProvider::new(LocalLlmConfig::default(), reqwest::Client::new());
        let request = provider.build_request(&[1, 2, 3], "What is this?");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gemma-3-12b-it:2");
        assert_eq!(value["max_tokens"], 1024);
        let content = &value["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "What is this?");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"NO a parked car"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "NO a parked car");
    }

    #[test]
    fn test_parse_fenced_recipe() {
        let text = "```json\n{\"title\":\"Pad Thai\"}\n```";
        assert_eq!(parse_local_recipe(text).unwrap().title, "Pad Thai");
    }

    #[test]
    fn test_parse_recipe_surrounded_by_prose() {
        let leading = "Here you go:\n{\"title\":\"Pad Thai\"}";
        assert_eq!(parse_local_recipe(leading).unwrap().title, "Pad Thai");

        let trailing = "```json\n{\"title\":\"Pad Thai\"}\n```\nEnjoy your meal!";
        assert_eq!(parse_local_recipe(trailing).unwrap().title, "Pad Thai");
    }

    #[test]
    fn test_parse_without_object_is_malformed() {
        assert!(matches!(
            parse_local_recipe("I cannot help with that."),
            Err(VisionError::MalformedOutput { .. })
        ));
    }
}
