use super::{build_client, ensure_success, trim_base};
use crate::config::AnalysisSettings;
use crate::core::{AnalysisRequest, AnalysisService};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "Bedrock";
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Bedrock runtime client speaking the Anthropic messages format.
pub struct BedrockClient {
    client: Client,
    endpoint: String,
    api_token: String,
    model_id: String,
    temperature: f32,
}

impl BedrockClient {
    pub fn new(settings: &AnalysisSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.timeout_seconds)?,
            endpoint: trim_base(&settings.endpoint),
            api_token: settings.api_token.clone(),
            model_id: settings.model_id.clone(),
            temperature: settings.temperature,
        })
    }

    fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint, self.model_id)
    }

    fn body<'a>(&self, request: &'a AnalysisRequest) -> InvokeBody<'a> {
        // images first, then the instruction text
        let mut content: Vec<ContentBlock<'a>> = request
            .images
            .iter()
            .map(|image| ContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: &image.media_type,
                    data: &image.data,
                },
            })
            .collect();
        content.push(ContentBlock::Text {
            text: &request.prompt,
        });

        InvokeBody {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            temperature: request.temperature.unwrap_or(self.temperature),
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl AnalysisService for BedrockClient {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<String> {
        tracing::info!(
            "🤖 Invoking {} with {} image(s), max_tokens {}",
            self.model_id,
            request.images.len(),
            request.max_tokens
        );

        let response = self
            .client
            .post(self.invoke_url())
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .json(&self.body(request))
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;

        let parsed: InvokeResponse = response
            .json()
            .await
            .map_err(|e| BotError::response_format(SERVICE, e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.trim().is_empty() {
            return Err(BotError::response_format(SERVICE, "response contained no text"));
        }

        tracing::debug!("Bedrock returned {} characters", text.len());
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ImageAttachment;
    use std::path::PathBuf;

    fn client(temperature: f32) -> BedrockClient {
        BedrockClient::new(&AnalysisSettings {
            endpoint: "https://bedrock-runtime.us-west-2.amazonaws.com".to_string(),
            api_token: "token".to_string(),
            model_id: "test-model".to_string(),
            temperature,
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_body_puts_images_before_text() {
        let request = AnalysisRequest::text("describe", 100).with_images(vec![ImageAttachment {
            path: PathBuf::from("a.png"),
            media_type: "image/png".to_string(),
            data: "QUJD".to_string(),
            size_bytes: 3,
        }]);

        let body = serde_json::to_value(client(0.1).body(&request)).unwrap();
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 100);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[1], serde_json::json!({"type": "text", "text": "describe"}));
    }

    #[test]
    fn test_configured_temperature_is_the_default() {
        let client = client(0.7);

        let body = serde_json::to_value(client.body(&AnalysisRequest::text("hi", 10))).unwrap();
        assert_eq!(body["temperature"], serde_json::json!(0.7_f32));

        let explicit = AnalysisRequest::text("hi", 10).with_temperature(0.0);
        let body = serde_json::to_value(client.body(&explicit)).unwrap();
        assert_eq!(body["temperature"], serde_json::json!(0.0_f32));
    }
}
