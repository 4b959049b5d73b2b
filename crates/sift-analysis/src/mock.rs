//! Mock LLM provider for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sift_core::{Error, Result};
use tokio::sync::Mutex;

use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider, StopReason, TokenUsage};

/// A scripted reply from [`MockLlmProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Succeed with this content.
    Text(String),
    /// Fail with a retryable error.
    Transient(String),
    /// Fail with a non-retryable error.
    Fatal(String),
}

/// Mock LLM provider that returns canned replies.
///
/// Replies are returned in order and cycle once exhausted. Clones share the
/// same script and call counter.
#[derive(Clone)]
pub struct MockLlmProvider {
    replies: Arc<Mutex<MockReplies>>,
    calls: Arc<AtomicUsize>,
}

struct MockReplies {
    canned: Vec<MockReply>,
    index: usize,
}

impl MockLlmProvider {
    /// Creates a mock provider with canned text responses.
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_analysis::MockLlmProvider;
    ///
    /// let provider = MockLlmProvider::new(vec![
    ///     r#"{"category":"Database","summary":"s","probable_cause":"c"}"#.to_string(),
    /// ]);
    /// ```
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Text).collect())
    }

    /// Creates a mock provider with a single response.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Creates a mock provider from an explicit reply script.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(MockReplies {
                canned: replies,
                index: 0,
            })),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `complete` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().await;

        if replies.canned.is_empty() {
            return Err(Error::llm("Mock provider has no canned replies"));
        }
        let reply = replies.canned[replies.index].clone();
        replies.index = (replies.index + 1) % replies.canned.len();

        match reply {
            MockReply::Text(content) => Ok(CompletionResponse {
                content,
                tokens_used: TokenUsage {
                    input: 10,
                    output: 20,
                },
                stop_reason: StopReason::EndTurn,
            }),
            MockReply::Transient(message) => Err(Error::llm_retryable(message)),
            MockReply::Fatal(message) => Err(Error::llm(message)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
