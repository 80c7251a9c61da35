use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured analysis as requested in the prompt. Every field is optional
/// since models do not always follow the requested shape; unknown keys are
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    /// Strings or `{name, frequency}` objects
    #[serde(default)]
    pub themes: Vec<Value>,
    /// Usually `{title, priority}` objects
    #[serde(default)]
    pub top_recommendations: Vec<Value>,
    #[serde(default)]
    pub short_actionable_tips: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Model output: parsed when it is a JSON object, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportBody {
    Structured(Report),
    Raw(String),
}

pub fn parse_report(raw: &str) -> ReportBody {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<Report>(body) {
        Ok(report) => ReportBody::Structured(report),
        Err(err) => {
            log::debug!("report is not structured JSON ({err}), keeping raw text");
            ReportBody::Raw(raw.trim().to_string())
        }
    }
}

/// Remove a surrounding ```json ... ``` block if present.
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the language tag line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
