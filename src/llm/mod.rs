//! LLM provider abstraction and analysis orchestration.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//! Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
//!
//! Provider instances are shared immutable capabilities — clone them freely.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("empty or missing content in completion")]
    EmptyCompletion,
    #[error("malformed completion: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transient failures worth another attempt: transport errors,
    /// rate limits and upstream 5xx. Auth and other 4xx are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Domain types ──────────────────────────────────────────────────────────────

/// Bounded sentiment label attached to every analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Case-insensitive parse; anything outside the enumeration is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

const DEFAULT_TITLE: &str = "No Title Generated";
const FALLBACK_TITLE: &str = "Analysis Failed - Manual Review Required";
const TITLE_MAX_CHARS: usize = 50;
const TOPIC_COUNT: usize = 3;
const TOPIC_PAD: [&str; 3] = ["general", "information", "content"];

/// Normalized metadata block produced per analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmMetadata {
    /// Descriptive title, at most 50 chars.
    pub title: String,
    /// Always exactly three topics.
    pub topics: Vec<String>,
    pub sentiment: Sentiment,
}

impl LlmMetadata {
    /// Metadata used when extraction fails — the analysis itself still
    /// succeeds with this placeholder.
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            topics: TOPIC_PAD.iter().map(|t| t.to_string()).collect(),
            sentiment: Sentiment::Neutral,
        }
    }

    /// Normalize a raw JSON object from the model into well-formed metadata.
    ///
    /// Lenient by design: a missing or oversize title is defaulted or
    /// truncated, topics are padded to exactly three, and an out-of-range
    /// sentiment collapses to neutral.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let title = value
            .get("title")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let title: String = title.chars().take(TITLE_MAX_CHARS).collect();

        let mut topics: Vec<String> = match value.get("topics") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                vec![s.trim().to_string()]
            }
            _ => Vec::new(),
        };
        while topics.len() < TOPIC_COUNT {
            topics.push(TOPIC_PAD[topics.len().min(TOPIC_PAD.len() - 1)].to_string());
        }
        topics.truncate(TOPIC_COUNT);

        let sentiment = value
            .get("sentiment")
            .and_then(|v| v.as_str())
            .and_then(Sentiment::parse)
            .unwrap_or(Sentiment::Neutral);

        Self { title, topics, sentiment }
    }
}

/// Combined result of one LLM round: summary plus normalized metadata.
#[derive(Debug, Clone)]
pub struct LlmAnalysis {
    pub summary: String,
    pub metadata: LlmMetadata,
}

/// Pull the first `{…}` block out of a completion and parse it.
///
/// Models occasionally wrap their JSON in prose or code fences; taking the
/// outermost brace span recovers it. Falls back to parsing the whole string.
pub fn extract_json_block(content: &str) -> Option<serde_json::Value> {
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&content[start..=end]) {
                return Some(value);
            }
        }
    }
    serde_json::from_str(content).ok()
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Dummy(providers::dummy::DummyProvider),
}

impl LlmProvider {
    /// Generate a two-sentence summary of `text`.
    pub async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.summarize(text).await,
            LlmProvider::Dummy(p) => p.summarize(text).await,
        }
    }

    /// Extract normalized `{title, topics, sentiment}` metadata from `text`.
    pub async fn extract_metadata(&self, text: &str) -> Result<LlmMetadata, ProviderError> {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.extract_metadata(text).await,
            LlmProvider::Dummy(p) => p.extract_metadata(text).await,
        }
    }

    /// Full analysis: summary and metadata, requested concurrently.
    ///
    /// A summary failure fails the analysis. A metadata failure degrades to
    /// [`LlmMetadata::fallback`] — the row is still written.
    pub async fn analyze(&self, text: &str) -> Result<LlmAnalysis, ProviderError> {
        let (summary, metadata) = tokio::join!(self.summarize(text), self.extract_metadata(text));

        let summary = summary?;
        let metadata = metadata.unwrap_or_else(|e| {
            warn!(error = %e, "metadata extraction failed, using fallback");
            LlmMetadata::fallback()
        });

        Ok(LlmAnalysis { summary, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentiment_parses_known_labels() {
        assert_eq!(Sentiment::parse("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::parse("  Negative "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::parse("NEUTRAL"), Some(Sentiment::Neutral));
    }

    #[test]
    fn sentiment_rejects_unknown_labels() {
        assert_eq!(Sentiment::parse("angry"), None);
        assert_eq!(Sentiment::parse(""), None);
    }

    #[test]
    fn sentiment_round_trips_as_str() {
        for s in [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative] {
            assert_eq!(Sentiment::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn metadata_normalizes_complete_object() {
        let meta = LlmMetadata::from_json(&json!({
            "title": "Rust Memory Safety",
            "topics": ["rust", "memory", "safety"],
            "sentiment": "positive"
        }));
        assert_eq!(meta.title, "Rust Memory Safety");
        assert_eq!(meta.topics, vec!["rust", "memory", "safety"]);
        assert_eq!(meta.sentiment, Sentiment::Positive);
    }

    #[test]
    fn metadata_invalid_sentiment_collapses_to_neutral() {
        let meta = LlmMetadata::from_json(&json!({ "sentiment": "ecstatic" }));
        assert_eq!(meta.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn metadata_pads_topics_to_three() {
        let meta = LlmMetadata::from_json(&json!({ "topics": ["databases"] }));
        assert_eq!(meta.topics, vec!["databases", "information", "content"]);

        let meta = LlmMetadata::from_json(&json!({}));
        assert_eq!(meta.topics, vec!["general", "information", "content"]);
    }

    #[test]
    fn metadata_truncates_extra_topics() {
        let meta = LlmMetadata::from_json(&json!({ "topics": ["a", "b", "c", "d", "e"] }));
        assert_eq!(meta.topics, vec!["a", "b", "c"]);
    }

    #[test]
    fn metadata_wraps_scalar_topics() {
        let meta = LlmMetadata::from_json(&json!({ "topics": "economics" }));
        assert_eq!(meta.topics[0], "economics");
        assert_eq!(meta.topics.len(), 3);
    }

    #[test]
    fn metadata_defaults_and_truncates_title() {
        let meta = LlmMetadata::from_json(&json!({}));
        assert_eq!(meta.title, "No Title Generated");

        let long = "x".repeat(80);
        let meta = LlmMetadata::from_json(&json!({ "title": long }));
        assert_eq!(meta.title.chars().count(), 50);
    }

    #[test]
    fn fallback_metadata_is_well_formed() {
        let meta = LlmMetadata::fallback();
        assert_eq!(meta.topics.len(), 3);
        assert_eq!(meta.sentiment, Sentiment::Neutral);
        assert!(meta.title.chars().count() <= 50);
    }

    #[test]
    fn json_block_extracted_from_prose() {
        let content = "Sure! Here is the JSON:\n```json\n{\"title\": \"T\"}\n```";
        let value = extract_json_block(content).unwrap();
        assert_eq!(value["title"], "T");
    }

    #[test]
    fn json_block_parses_bare_object() {
        let value = extract_json_block("{\"sentiment\": \"negative\"}").unwrap();
        assert_eq!(value["sentiment"], "negative");
    }

    #[test]
    fn json_block_rejects_garbage() {
        assert!(extract_json_block("no json here").is_none());
        assert!(extract_json_block("{broken").is_none());
    }

    #[tokio::test]
    async fn analyze_returns_summary_and_metadata() {
        let provider = LlmProvider::Dummy(providers::dummy::DummyProvider);
        let analysis = provider.analyze("Rust services are fast.").await.unwrap();
        assert!(!analysis.summary.is_empty());
        assert_eq!(analysis.metadata.topics.len(), 3);
    }
}
