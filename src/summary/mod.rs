//! Report generation from the retrieved context.
//!
//! - `prompt`: condenses channel, video sample and neighbors into a prompt
//! - `client`: OpenAI-compatible chat completion backend (Groq by default)
//! - `report`: lenient parsing of the model output

pub mod client;
pub mod prompt;
pub mod report;

pub use client::GroqClient;
pub use prompt::build_prompt;
pub use report::{parse_report, Report, ReportBody};

/// Text-generation capability consumed by the analyzer.
pub trait Summarizer: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("LLM API key is not configured (set GROQ_API_KEY)")]
    MissingApiKey,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed LLM response: {0}")]
    Malformed(String),
}
