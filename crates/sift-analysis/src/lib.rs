//! Generative incident analysis for Sift.
//!
//! - [`LlmProvider`] abstracts the model backend ([`GeminiProvider`],
//!   [`MockLlmProvider`]); [`RetryWrapper`] adds backoff for transient errors.
//! - [`IncidentAnalyzer`] turns incident text into an [`IncidentAnalysis`],
//!   falling back to fixed answers when the model misbehaves.

pub mod analyzer;
pub mod gemini;
pub mod mock;
pub mod provider;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_core::Result;

pub use analyzer::{IncidentAnalysis, IncidentAnalyzer, IncidentCategory};
pub use gemini::GeminiProvider;
pub use mock::{MockLlmProvider, MockReply};
pub use provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, Role, StopReason, TokenUsage,
};
pub use retry::RetryWrapper;

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Gemini model ID.
    pub model: String,

    /// API key; falls back to the `GEMINI_API_KEY` environment variable.
    pub api_key: Option<String>,

    /// Alternative API base URL.
    pub base_url: Option<String>,

    /// Hard limit for one analysis, in seconds.
    pub timeout_secs: u64,

    /// Attempts per analysis, including the first call.
    pub max_attempts: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

impl AnalysisConfig {
    /// The hard analysis timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured key, or the one from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(gemini::API_KEY_ENV).ok())
    }
}

/// Build a Gemini-backed analyzer with retries from configuration.
///
/// A missing API key is not an error here; it is reported by each
/// [`IncidentAnalyzer::analyze`] call instead.
pub fn create_analyzer(config: &AnalysisConfig) -> Result<IncidentAnalyzer> {
    let mut gemini = GeminiProvider::new(config.resolved_api_key(), &config.model, config.timeout())?;
    if let Some(base_url) = &config.base_url {
        gemini = gemini.with_base_url(base_url);
    }
    if !gemini.has_api_key() {
        log::warn!("{} not set; /analyze will fail until it is configured", gemini::API_KEY_ENV);
    }

    let provider = RetryWrapper::new(Arc::new(gemini)).with_max_attempts(config.max_attempts);
    Ok(IncidentAnalyzer::new(Arc::new(provider)).with_timeout(config.timeout()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_defaults() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_explicit_key_wins() {
        let config = AnalysisConfig {
            api_key: Some("from-config".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_create_analyzer() {
        let config = AnalysisConfig {
            api_key: Some("k".to_string()),
            base_url: Some("http://127.0.0.1:9".to_string()),
            ..Default::default()
        };
        let analyzer = create_analyzer(&config).unwrap();
        assert_eq!(analyzer.provider_name(), "gemini-2.0-flash");
    }
}
