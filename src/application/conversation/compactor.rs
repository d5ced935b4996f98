//! Memory compactor service.
//!
//! Shrinks a message history by truncation or summarization. A failed
//! summarization call still compacts, using a placeholder summary, so the
//! examinee can always keep chatting.

use std::sync::Arc;

use crate::domain::conversation::{
    plan_summary, splice_summary, summarization_instruction, summarization_request, truncate,
    FallbackQuestionTracker, MemoryMode, MessageHistory, SUMMARY_UNAVAILABLE_PLACEHOLDER,
};
use crate::domain::foundation::SessionId;
use crate::ports::{AIProvider, CompletionRequest, MessageRole, RequestMetadata, RequestPurpose, TokenUsage};

/// What a compaction pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionAction {
    Unchanged,
    Truncated { dropped: usize },
    Summarized { replaced: usize },
    /// The summarizer failed; the placeholder summary was spliced in.
    SummaryUnavailable { replaced: usize },
}

/// Result of a compaction pass.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub history: MessageHistory,
    pub action: CompactionAction,
    /// Summarizer usage, zero unless a summarization call succeeded.
    pub usage: TokenUsage,
}

/// Compacts message histories.
pub struct MemoryCompactor {
    provider: Arc<dyn AIProvider>,
    model: Option<String>,
    truncate_keep_turns: usize,
    summary_keep_turns: usize,
}

impl MemoryCompactor {
    pub fn new(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            provider,
            model: None,
            truncate_keep_turns: 10,
            summary_keep_turns: 5,
        }
    }

    /// Sets the model used for summarization.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets how many trailing turns each mode keeps verbatim.
    pub fn with_keep_turns(mut self, truncate_keep: usize, summary_keep: usize) -> Self {
        self.truncate_keep_turns = truncate_keep.max(1);
        self.summary_keep_turns = summary_keep.max(1);
        self
    }

    /// Compacts `history` using `mode`.
    pub async fn compact(
        &self,
        session_id: SessionId,
        history: &MessageHistory,
        tracker: &FallbackQuestionTracker,
        mode: MemoryMode,
    ) -> CompactionOutcome {
        match mode {
            MemoryMode::None => unchanged(history),
            MemoryMode::Truncate => {
                let truncated = truncate(history, self.truncate_keep_turns);
                let dropped = history.len() - truncated.len();
                if dropped > 0 {
                    tracing::debug!(session_id = %session_id, dropped, "Truncated history");
                }
                CompactionOutcome {
                    history: truncated,
                    action: if dropped == 0 {
                        CompactionAction::Unchanged
                    } else {
                        CompactionAction::Truncated { dropped }
                    },
                    usage: TokenUsage::zero(),
                }
            }
            MemoryMode::Summarize => self.summarize(session_id, history, tracker).await,
        }
    }

    async fn summarize(
        &self,
        session_id: SessionId,
        history: &MessageHistory,
        tracker: &FallbackQuestionTracker,
    ) -> CompactionOutcome {
        let Some(plan) = plan_summary(history, self.summary_keep_turns) else {
            return unchanged(history);
        };
        let replaced = plan.older.len();

        let mut request = CompletionRequest::new(RequestMetadata::new(
            session_id,
            RequestPurpose::Summarization,
            format!("summarize-{}", session_id),
        ))
        .with_system_prompt(summarization_instruction())
        .with_message(MessageRole::User, summarization_request(&plan, tracker));
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }

        match self.provider.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                tracing::debug!(session_id = %session_id, replaced, "Summarized history");
                CompactionOutcome {
                    history: splice_summary(history, &plan, &response.content),
                    action: CompactionAction::Summarized { replaced },
                    usage: response.usage,
                }
            }
            result => {
                match result {
                    Err(err) => tracing::warn!(
                        session_id = %session_id,
                        error = %err,
                        "Summarization failed, using placeholder summary"
                    ),
                    Ok(_) => tracing::warn!(
                        session_id = %session_id,
                        "Summarizer returned an empty summary, using placeholder"
                    ),
                }
                CompactionOutcome {
                    history: splice_summary(history, &plan, SUMMARY_UNAVAILABLE_PLACEHOLDER),
                    action: CompactionAction::SummaryUnavailable { replaced },
                    usage: TokenUsage::zero(),
                }
            }
        }
    }
}

fn unchanged(history: &MessageHistory) -> CompactionOutcome {
    CompactionOutcome {
        history: history.clone(),
        action: CompactionAction::Unchanged,
        usage: TokenUsage::zero(),
    }
}
