//! Question-status classifier service.
//!
//! Asks a classification model which pending fallback questions an
//! utterance addresses. Never fails: an outage or a malformed response
//! means no matches, so chat is never blocked.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::conversation::{
    classification_instruction, classification_request, keyword_overlap_matches, parse_matches,
};
use crate::domain::foundation::SessionId;
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata, RequestPurpose, TokenUsage};

/// Where a classification result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Nothing was pending, so no call was made.
    Skipped,
    /// The classification model answered.
    Model,
    /// The model call failed and the keyword matcher was used.
    KeywordFallback,
    /// The model call failed or its answer was unusable.
    Unavailable,
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// 1-based indices into the unasked list.
    pub matches: BTreeSet<usize>,
    pub source: ClassificationSource,
    pub usage: TokenUsage,
}

impl Classification {
    fn empty(source: ClassificationSource) -> Self {
        Self {
            matches: BTreeSet::new(),
            source,
            usage: TokenUsage::zero(),
        }
    }
}

/// Classifies utterances against pending fallback questions.
pub struct QuestionStatusClassifier {
    provider: Arc<dyn AIProvider>,
    model: Option<String>,
    keyword_fallback: bool,
}

impl QuestionStatusClassifier {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            model: None,
            keyword_fallback: false,
        }
    }

    /// Sets the model used for classification.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Enables the keyword matcher as a last resort when the model call fails.
    pub fn with_keyword_fallback(mut self, enabled: bool) -> Self {
        self.keyword_fallback = enabled;
        self
    }

    /// Returns the 1-based indices of `unasked` that `utterance` directly addresses.
    pub async fn classify(
        &self,
        session_id: SessionId,
        utterance: &str,
        unasked: &[String],
    ) -> Classification {
        if unasked.is_empty() || utterance.trim().is_empty() {
            return Classification::empty(ClassificationSource::Skipped);
        }

        let mut request = CompletionRequest::new(RequestMetadata::new(
            session_id,
            RequestPurpose::Classification,
            format!("classify-{}", session_id),
        ))
        .with_system_prompt(classification_instruction())
        .with_message(MessageRole::User, classification_request(utterance, unasked))
        .with_max_tokens(50);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %err,
                    keyword_fallback = self.keyword_fallback,
                    "Question classification failed"
                );
                return self.fallback(utterance, unasked);
            }
        };

        let parsed = parse_matches(&response.content, unasked.len());
        if !parsed.well_formed {
            tracing::warn!(
                session_id = %session_id,
                response = %response.content,
                "Classifier returned a malformed response, treating as no matches"
            );
            return Classification {
                usage: response.usage,
                ..Classification::empty(ClassificationSource::Unavailable)
            };
        }
        if !parsed.dropped.is_empty() {
            tracing::warn!(
                session_id = %session_id,
                dropped = ?parsed.dropped,
                unasked = unasked.len(),
                "Dropped out-of-range classifier indices"
            );
        }

        tracing::debug!(session_id = %session_id, matches = ?parsed.matches, "Classified utterance");
        Classification {
            matches: parsed.matches,
            source: ClassificationSource::Model,
            usage: response.usage,
        }
    }

    fn fallback(&self, utterance: &str, unasked: &[String]) -> Classification {
        if !self.keyword_fallback {
            return Classification::empty(ClassificationSource::Unavailable);
        }
        Classification {
            matches: keyword_overlap_matches(utterance, unasked),
            source: ClassificationSource::KeywordFallback,
            usage: TokenUsage::zero(),
        }
    }
}
