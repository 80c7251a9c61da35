use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::LlmConfig;
use crate::semantic::snippet;
use crate::summary::{Summarizer, SummaryError};

const SYSTEM_PROMPT: &str = "You are an expert YouTube analyst. Output JSON only.";
const PING_PROMPT: &str = "Say OK";
const PING_MAX_TOKENS: u32 = 3;

/// Chat completion client for Groq or any OpenAI-compatible endpoint.
pub struct GroqClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_prompt_chars: usize,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Result<Self, SummaryError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SummaryError::MissingApiKey)?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_prompt_chars: config.max_prompt_chars,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Round-trip a trivial prompt and check the model answers "OK".
    pub fn test_connection(&self) -> Result<bool, SummaryError> {
        let body = json!({
            "model": self.model,
            "max_tokens": PING_MAX_TOKENS,
            "messages": [{"role": "user", "content": PING_PROMPT}],
        });
        let reply = self.complete(&body)?;
        Ok(reply.contains("OK"))
    }

    fn complete(&self, body: &serde_json::Value) -> Result<String, SummaryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?;

        let status = resp.status();
        let text = resp.text()?;

        match serde_json::from_str::<CompletionResponse>(&text) {
            Ok(CompletionResponse::Data { choices }) if status.is_success() => choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| SummaryError::Malformed("no choices in response".to_string())),
            Ok(CompletionResponse::Error { error }) => Err(SummaryError::Api {
                status: status.as_u16(),
                message: error.message,
            }),
            _ if !status.is_success() => Err(SummaryError::Api {
                status: status.as_u16(),
                message: snippet(&text, 200).to_string(),
            }),
            Ok(_) => Err(SummaryError::Malformed("unexpected response shape".to_string())),
            Err(err) => {
                log::error!("{err}. tried to parse: {text:?}");
                Err(SummaryError::Malformed(err.to_string()))
            }
        }
    }
}

impl Summarizer for GroqClient {
    fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        if prompt.trim().is_empty() {
            return Err(SummaryError::EmptyPrompt);
        }

        let prompt = clip_prompt(prompt, self.max_prompt_chars);

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
        });

        log::info!("llm request model={} prompt_chars={}", self.model, prompt.chars().count());
        let output = self.complete(&body)?;
        log::debug!("llm response chars={}", output.chars().count());
        Ok(output)
    }
}

fn clip_prompt(prompt: &str, max_chars: usize) -> &str {
    let clipped = snippet(prompt, max_chars);
    if clipped.len() < prompt.len() {
        log::warn!("prompt too large; clipped to {max_chars} chars before LLM call");
    }
    clipped
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum CompletionResponse {
    Error { error: ApiErrorDetail },
    Data { choices: Vec<Choice> },
}

#[derive(Debug, Deserialize, Serialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig {
            api_key: Some("test-key".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(GroqClient::new(&config), Err(SummaryError::MissingApiKey)));
    }

    #[test]
    fn test_empty_prompt_rejected_before_request() {
        let client = GroqClient::new(&config()).unwrap();
        assert!(matches!(client.generate(""), Err(SummaryError::EmptyPrompt)));
        assert!(matches!(client.generate("  \n"), Err(SummaryError::EmptyPrompt)));
    }

    #[test]
    fn test_clip_prompt() {
        assert_eq!(clip_prompt("abcdef", 4), "abcd");
        assert_eq!(clip_prompt("abc", 10), "abc");
    }

    #[test]
    fn test_completion_response_shapes() {
        let ok = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" {\"a\":1} "}}]}"#;
        match serde_json::from_str::<CompletionResponse>(ok).unwrap() {
            CompletionResponse::Data { choices } => {
                assert_eq!(choices[0].message.content.as_deref(), Some(" {\"a\":1} "));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let err = r#"{"error":{"message":"Rate limit reached","type":"tokens"}}"#;
        assert!(matches!(
            serde_json::from_str::<CompletionResponse>(err).unwrap(),
            CompletionResponse::Error { .. }
        ));
    }
}
