//! Incident analysis on top of an [`LlmProvider`].
//!
//! [`IncidentAnalyzer::analyze`] classifies an incident description and
//! returns a category, a one-sentence summary and a probable cause. Upstream
//! trouble never escapes as an error: unusable model output and failed calls
//! are turned into fixed fallback analyses. Only empty input and missing
//! configuration are reported to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_core::{Error, Result};

use crate::provider::{CompletionRequest, LlmProvider, Message};

/// Default hard limit for one analysis, retries included.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

const PREVIEW_CHARS: usize = 100;

/// Incident category assigned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentCategory {
    /// Database outages, slow queries, replication lag.
    Database,
    /// Connectivity, DNS, load balancers.
    Network,
    /// Application bugs and crashes.
    Application,
    /// Logins, tokens, permissions.
    Authentication,
    /// Hosts, disks, capacity.
    Infrastructure,
    /// Anything else.
    General,
}

impl IncidentCategory {
    /// Every category, in prompt order.
    pub const ALL: [Self; 6] = [
        Self::Database,
        Self::Network,
        Self::Application,
        Self::Authentication,
        Self::Infrastructure,
        Self::General,
    ];

    /// The label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "Database",
            Self::Network => "Network",
            Self::Application => "Application",
            Self::Authentication => "Authentication",
            Self::Infrastructure => "Infrastructure",
            Self::General => "General",
        }
    }

    /// Parse a label case-insensitively; unknown labels become `General`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
            .unwrap_or(Self::General)
    }
}

impl std::fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured analysis of one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentAnalysis {
    /// Incident category.
    pub category: IncidentCategory,
    /// One-sentence summary.
    pub summary: String,
    /// Most likely root cause.
    pub probable_cause: String,
}

#[derive(Deserialize)]
struct RawAnalysis {
    category: String,
    summary: String,
    probable_cause: String,
}

impl IncidentAnalysis {
    /// Fallback when the model answered with something unusable.
    pub fn unparseable() -> Self {
        Self {
            category: IncidentCategory::General,
            summary: "Could not analyze text.".to_string(),
            probable_cause: "Unknown".to_string(),
        }
    }

    /// Fallback when the model could not be reached in time.
    pub fn call_failed() -> Self {
        Self {
            category: IncidentCategory::General,
            summary: "Error during analysis.".to_string(),
            probable_cause: "API call failed".to_string(),
        }
    }

    /// Parse the model's JSON answer.
    ///
    /// Returns `None` unless all three fields are present as strings.
    pub fn from_model_output(content: &str) -> Option<Self> {
        let raw: RawAnalysis = serde_json::from_str(strip_code_fence(content)).ok()?;
        Some(Self {
            category: IncidentCategory::from_label(&raw.category),
            summary: raw.summary,
            probable_cause: raw.probable_cause,
        })
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// JSON schema sent with every analysis request.
pub fn response_schema() -> serde_json::Value {
    let categories: Vec<&str> = IncidentCategory::ALL.iter().map(|c| c.as_str()).collect();
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "category": {"type": "STRING", "enum": categories},
            "summary": {"type": "STRING"},
            "probable_cause": {"type": "STRING"}
        },
        "required": ["category", "summary", "probable_cause"]
    })
}

fn build_prompt(text: &str) -> String {
    let categories: Vec<&str> = IncidentCategory::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "Analyze the following incident description. Provide a detailed analysis in JSON format.\n\
         The JSON object must contain three fields: 'category', 'summary', and 'probable_cause'.\n\
         - 'category': Classify the incident into one of the following categories: {}.\n\
         - 'summary': Provide a concise, one-sentence summary of the issue.\n\
         - 'probable_cause': Briefly state the most likely root cause of the incident.\n\
         \n\
         Incident Description:\n\
         ---\n\
         {text}\n\
         ---\n",
        categories.join(", ")
    )
}

/// Classifies incident descriptions with a generative model.
pub struct IncidentAnalyzer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl IncidentAnalyzer {
    /// Creates an analyzer with the default 30 second limit.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }

    /// Sets the hard limit for one analysis.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Analyze an incident description.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for empty text, before any model call
    /// - `Error::Config` when the provider is not configured (missing key)
    ///
    /// Every other failure yields a fallback analysis instead of an error.
    pub async fn analyze(&self, text: &str) -> Result<IncidentAnalysis> {
        if text.trim().is_empty() {
            return Err(Error::invalid_input("Text for analysis cannot be empty."));
        }

        log::info!(
            "Requesting analysis from {} for: {:?}",
            self.provider.name(),
            text.chars().take(PREVIEW_CHARS).collect::<String>()
        );

        let request = CompletionRequest::new(vec![Message::user(build_prompt(text))])
            .with_response_schema(response_schema());

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Err(_) => {
                log::warn!("Analysis timed out after {:?}", self.timeout);
                return Ok(IncidentAnalysis::call_failed());
            }
            Ok(Err(e)) if e.is_config() => return Err(e),
            Ok(Err(Error::Parse(reason))) => {
                log::warn!("Could not read the model response: {reason}");
                return Ok(IncidentAnalysis::unparseable());
            }
            Ok(Err(e)) => {
                log::warn!("Analysis call failed: {e}");
                return Ok(IncidentAnalysis::call_failed());
            }
            Ok(Ok(response)) => response,
        };

        match IncidentAnalysis::from_model_output(&response.content) {
            Some(analysis) => {
                log::debug!("Analysis result: {analysis:?}");
                Ok(analysis)
            }
            None => {
                log::warn!("Model returned an unusable analysis: {:?}", response.content);
                Ok(IncidentAnalysis::unparseable())
            }
        }
    }
}

impl std::fmt::Debug for IncidentAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentAnalyzer")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
