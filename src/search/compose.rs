//! Short natural-language replies over categorized results

use crate::openai::{ChatMessage, ChatOptions, OpenAiClient};
use crate::results::{CategorizedResults, ScoringSummary};
use async_trait::async_trait;
use tracing::warn;

const GUIDE_PROMPT: &str = "You are a terse local guide who knows the overlooked corners of a place. \
Answer in two or three sentences. Name specific places from the list and add one practical tip. \
Stay calm and understated; no exclamation marks.";

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

#[async_trait]
pub trait ResponseComposer: Send + Sync {
    async fn compose(
        &self,
        intent: &str,
        location: &str,
        results: &CategorizedResults,
        summary: &ScoringSummary,
    ) -> String;
}

/// Deterministic replies for empty, strong and mixed result sets
#[derive(Debug, Clone, Default)]
pub struct TemplateComposer;

impl TemplateComposer {
    pub fn render(&self, intent: &str, location: &str, results: &CategorizedResults) -> String {
        let total = results.len();
        let primary = results.primary.len();

        if total == 0 {
            format!(
                "Nothing turned up for {} around {} this time. Try a wider area or different words; the good spots are often listed under something unexpected.",
                intent, location
            )
        } else if primary >= 3 {
            format!(
                "{} has {} solid finds for {}. Start with the first few and let the rest be a reason to come back.",
                location, primary, intent
            )
        } else {
            format!(
                "{} turned up {} places for {}. A few sit a short drive out, but each is off the usual tourist path.",
                location, total, intent
            )
        }
    }
}

#[async_trait]
impl ResponseComposer for TemplateComposer {
    async fn compose(
        &self,
        intent: &str,
        location: &str,
        results: &CategorizedResults,
        _summary: &ScoringSummary,
    ) -> String {
        self.render(intent, location, results)
    }
}

/// Chat-model replies, falling back to [`TemplateComposer`]
pub struct LlmComposer {
    client: OpenAiClient,
    fallback: TemplateComposer,
}

impl LlmComposer {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            fallback: TemplateComposer,
        }
    }

    fn prompt(intent: &str, location: &str, results: &CategorizedResults, summary: &ScoringSummary) -> String {
        let places: Vec<String> = results
            .primary
            .iter()
            .chain(&results.nearby)
            .map(|p| {
                let preview: String = p
                    .candidate
                    .description
                    .chars()
                    .take(DESCRIPTION_PREVIEW_CHARS)
                    .collect();
                format!("- {}: {}", p.candidate.name, preview)
            })
            .collect();

        format!(
            "Looking for: {} in {}\n\nPlaces:\n{}\n\n{} results, average score {:.2} of 1.0.\n\nWrite the reply.",
            intent,
            location,
            places.join("\n"),
            summary.total_results,
            summary.average_score
        )
    }
}

#[async_trait]
impl ResponseComposer for LlmComposer {
    async fn compose(
        &self,
        intent: &str,
        location: &str,
        results: &CategorizedResults,
        summary: &ScoringSummary,
    ) -> String {
        if results.is_empty() {
            return self.fallback.render(intent, location, results);
        }

        let options = ChatOptions {
            temperature: 0.4,
            max_tokens: 300,
            json: false,
        };
        let messages = vec![
            ChatMessage::system(GUIDE_PROMPT),
            ChatMessage::user(Self::prompt(intent, location, results, summary)),
        ];

        match self.client.chat(messages, &options).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => self.fallback.render(intent, location, results),
            Err(e) => {
                warn!("Response composition failed: {}", e);
                self.fallback.render(intent, location, results)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiSettings;
    use crate::network::HttpClient;
    use crate::results::{Candidate, ProviderKind, ScoreFactors, ScoredResult};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scored(name: &str) -> ScoredResult {
        ScoredResult {
            candidate: Candidate::new(name, format!("https://x.test/{}", name), "serpapi", ProviderKind::WebSearch),
            score: 0.7,
            star_rating: 3.5,
            score_factors: ScoreFactors::default(),
        }
    }

    fn results(primary: usize, nearby: usize) -> CategorizedResults {
        CategorizedResults {
            primary: (0..primary).map(|i| scored(&format!("p{}", i))).collect(),
            nearby: (0..nearby).map(|i| scored(&format!("n{}", i))).collect(),
        }
    }

    #[test]
    fn test_template_cases() {
        let composer = TemplateComposer;
        assert!(composer.render("murals", "Hazard", &results(0, 0)).starts_with("Nothing turned up"));
        assert!(composer.render("murals", "Hazard", &results(3, 1)).contains("3 solid finds"));
        assert!(composer.render("murals", "Hazard", &results(1, 2)).contains("turned up 3 places"));
    }

    #[tokio::test]
    async fn test_llm_falls_back_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let composer = LlmComposer::new(OpenAiClient::new(
            HttpClient::new().unwrap(),
            OpenAiSettings {
                base_url: server.uri(),
                ..Default::default()
            },
        ));
        let text = composer
            .compose("murals", "Hazard", &results(3, 0), &ScoringSummary::default())
            .await;
        assert!(text.contains("3 solid finds"));
    }

    #[tokio::test]
    async fn test_llm_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": " Visit p0 first. "}}]
            })))
            .mount(&server)
            .await;

        let composer = LlmComposer::new(OpenAiClient::new(
            HttpClient::new().unwrap(),
            OpenAiSettings {
                base_url: server.uri(),
                ..Default::default()
            },
        ));
        let text = composer
            .compose("murals", "Hazard", &results(1, 0), &ScoringSummary::default())
            .await;
        assert_eq!(text, "Visit p0 first.");
    }
}
