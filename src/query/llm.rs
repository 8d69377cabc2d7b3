//! Chat-model query parsing with heuristic fallback

use super::{HeuristicParser, ParseMethod, ParsedQuery, QueryParser};
use crate::config::QuerySettings;
use crate::openai::{ChatMessage, ChatOptions, OpenAiClient};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "Split a travel request into where and what. \
Reply with a JSON object with string fields \"location\" and \"intent\".\n\
\"hidden gems in Pikeville KY\" => {\"location\": \"Pikeville, KY\", \"intent\": \"hidden gems\"}\n\
\"cool underground spots near Atlanta\" => {\"location\": \"Atlanta, GA\", \"intent\": \"underground spots\"}\n\
\"weird stuff to do in Portland Oregon\" => {\"location\": \"Portland, OR\", \"intent\": \"weird stuff\"}\n\
Use the most specific place named and the plainest description of what the user wants.";

#[derive(Debug, Deserialize)]
struct ModelAnswer {
    #[serde(default)]
    location: String,
    #[serde(default)]
    intent: String,
}

pub struct LlmQueryParser {
    client: OpenAiClient,
    fallback: HeuristicParser,
    settings: QuerySettings,
}

impl LlmQueryParser {
    pub fn new(client: OpenAiClient, settings: QuerySettings) -> Self {
        Self {
            client,
            fallback: HeuristicParser::new(settings.clone()),
            settings,
        }
    }

    async fn ask(&self, input: &str) -> Result<ModelAnswer> {
        let options = ChatOptions {
            temperature: 0.3,
            max_tokens: 200,
            json: true,
        };
        let content = self
            .client
            .chat(
                vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(input)],
                &options,
            )
            .await?;
        Ok(serde_json::from_str(content.trim())?)
    }
}

#[async_trait]
impl QueryParser for LlmQueryParser {
    async fn parse(&self, input: &str) -> ParsedQuery {
        match self.ask(input).await {
            Ok(answer) if !answer.location.trim().is_empty() && !answer.intent.trim().is_empty() => {
                debug!(location = %answer.location, intent = %answer.intent, "Model parsed query");
                ParsedQuery {
                    location: answer.location.trim().to_string(),
                    intent: answer.intent.trim().to_string(),
                    confidence: self.settings.llm_confidence,
                    method: ParseMethod::Llm,
                }
            }
            Ok(_) => {
                debug!("Model answer incomplete, using heuristic parser");
                self.fallback.parse_sync(input)
            }
            Err(e) => {
                warn!("Model query parsing failed: {}", e);
                self.fallback.parse_sync(input)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiSettings;
    use crate::network::HttpClient;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn parser_answering(server: &MockServer, status: u16, content: &str) -> LlmQueryParser {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            })))
            .mount(server)
            .await;

        let client = OpenAiClient::new(
            HttpClient::new().unwrap(),
            OpenAiSettings {
                api_key: "sk-test".to_string(),
                base_url: server.uri(),
                ..Default::default()
            },
        );
        LlmQueryParser::new(client, QuerySettings::default())
    }

    #[tokio::test]
    async fn test_model_answer() {
        let server = MockServer::start().await;
        let parser = parser_answering(
            &server,
            200,
            r#"{"location": "Portland, OR", "intent": "weird stuff"}"#,
        )
        .await;

        let parsed = parser.parse("weird stuff to do in Portland Oregon").await;
        assert_eq!(parsed.location, "Portland, OR");
        assert_eq!(parsed.intent, "weird stuff");
        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.method, ParseMethod::Llm);
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let server = MockServer::start().await;
        let parser = parser_answering(&server, 500, "").await;

        let parsed = parser.parse("hidden gems in Pikeville KY").await;
        assert_eq!(parsed.method, ParseMethod::Heuristic);
        assert_eq!(parsed.location, "Pikeville KY");
    }

    #[tokio::test]
    async fn test_falls_back_on_incomplete_answer() {
        let server = MockServer::start().await;
        let parser = parser_answering(&server, 200, r#"{"intent": "murals"}"#).await;

        let parsed = parser.parse("murals near Hazard").await;
        assert_eq!(parsed.method, ParseMethod::Heuristic);
        assert_eq!(parsed.location, "Hazard");
    }
}
