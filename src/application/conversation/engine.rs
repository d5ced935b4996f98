//! ConversationEngine - per-session orchestrator for simulated-patient turns.
//!
//! One engine is created per exam session. It owns the case, the fallback
//! question tracker, the message history and the token counters, and drives
//! each turn end-to-end:
//!
//! 1. append the student's utterance
//! 2. classify it against the live unasked fallback questions
//! 3. re-render the system prompt from the updated tracker
//! 4. compact the history once it crosses the threshold
//! 5. request a chat completion
//! 6. append the reply and accumulate usage
//!
//! Provider failures never fail a turn. The engine answers with an
//! in-character apology and stays usable.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::domain::case::CaseProfile;
use crate::domain::conversation::{
    apology_reply, ChatModel, CompactionPolicy, FallbackQuestionTracker, GenerationParams,
    GenerationSettings, MessageHistory, PromptBuilder, Turn, TurnRole,
};
use crate::domain::foundation::{SessionId, StateMachine, ValidationError};
use crate::ports::{
    AIProvider, CompletionRequest, FinishReason, Message, RequestMetadata, RequestPurpose,
    TokenUsage,
};

use super::classifier::QuestionStatusClassifier;
use super::compactor::{CompactionAction, MemoryCompactor};

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Prompt built and tracker populated; no turn taken yet.
    Initialized,
    /// At least one turn taken.
    Active,
    /// Closed. No further turns are accepted.
    Ended,
}

impl StateMachine for EngineState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EngineState::*;
        matches!(
            (self, target),
            (Initialized, Active) | (Initialized, Ended) | (Active, Ended)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EngineState::*;
        match self {
            Initialized => vec![Active, Ended],
            Active => vec![Ended],
            Ended => vec![],
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EngineState::Initialized => "initialized",
            EngineState::Active => "active",
            EngineState::Ended => "ended",
        };
        write!(f, "{}", label)
    }
}

/// Errors surfaced to the engine's caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The case or engine configuration is unusable; the session cannot start.
    #[error("Invalid engine configuration: {0}")]
    Configuration(#[from] ValidationError),

    /// The engine was closed.
    #[error("Conversation has ended")]
    Ended,
}

/// Provider clients for the three call kinds. They may all be the same client.
#[derive(Clone)]
pub struct EngineProviders {
    pub chat: Arc<dyn AIProvider>,
    pub classifier: Arc<dyn AIProvider>,
    pub summarizer: Arc<dyn AIProvider>,
}

impl EngineProviders {
    /// Uses one client for every call.
    pub fn shared(provider: Arc<dyn AIProvider>) -> Self {
        Self {
            chat: provider.clone(),
            classifier: provider.clone(),
            summarizer: provider,
        }
    }
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub chat_model: ChatModel,
    /// Pins the sampling seed for reproducible grading.
    pub exam_mode: bool,
    pub generation: GenerationSettings,
    pub compaction: CompactionPolicy,
    pub classifier_model: Option<String>,
    pub summarizer_model: Option<String>,
    /// Enables the keyword matcher when the classifier call fails.
    pub keyword_fallback: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.generation.validate()?;
        let counts = [
            ("max_turns_before_memory", self.compaction.max_turns_before_memory),
            ("truncate_keep_turns", self.compaction.truncate_keep_turns),
            ("summary_keep_turns", self.compaction.summary_keep_turns),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ValidationError::out_of_range(field, 1, usize::MAX, 0));
            }
        }
        Ok(())
    }
}

/// The reply to one student utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    /// Wall-clock time for the whole turn; 0.0 for a degraded turn.
    pub elapsed_secs: f64,
    /// True when the reply is the fallback apology.
    pub degraded: bool,
}

/// Per-session conversation orchestrator.
pub struct ConversationEngine {
    session_id: SessionId,
    case: CaseProfile,
    config: EngineConfig,
    generation: GenerationParams,
    chat: Arc<dyn AIProvider>,
    classifier: QuestionStatusClassifier,
    compactor: MemoryCompactor,
    tracker: FallbackQuestionTracker,
    history: MessageHistory,
    transcript: Vec<Turn>,
    state: EngineState,
    usage: TokenUsage,
    auxiliary_usage: TokenUsage,
    turn_count: u32,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("session_id", &self.session_id)
            .field("case_id", &self.case.case_id)
            .field("state", &self.state)
            .field("history_len", &self.history.len())
            .field("usage", &self.usage)
            .finish()
    }
}

impl ConversationEngine {
    /// Builds an engine for `case`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the case or the config fails
    /// validation.
    pub fn new(
        session_id: SessionId,
        case: CaseProfile,
        config: EngineConfig,
        providers: EngineProviders,
    ) -> Result<Self, EngineError> {
        case.validate()?;
        config.validate()?;

        let resolved = config.generation.resolve(config.chat_model, config.exam_mode);
        for parameter in &resolved.ignored {
            tracing::warn!(
                session_id = %session_id,
                model = config.chat_model.id(),
                parameter,
                "Ignoring generation override the model does not support"
            );
        }

        let mut classifier = QuestionStatusClassifier::new(providers.classifier)
            .with_keyword_fallback(config.keyword_fallback);
        if let Some(model) = &config.classifier_model {
            classifier = classifier.with_model(model.clone());
        }
        let mut compactor = MemoryCompactor::new(providers.summarizer).with_keep_turns(
            config.compaction.truncate_keep_turns,
            config.compaction.summary_keep_turns,
        );
        if let Some(model) = &config.summarizer_model {
            compactor = compactor.with_model(model.clone());
        }

        let tracker = FallbackQuestionTracker::from_case(&case);
        let history = MessageHistory::new(PromptBuilder::build(&case, &tracker, case.persona_kind));

        tracing::info!(
            session_id = %session_id,
            case_id = %case.case_id,
            chat_model = config.chat_model.id(),
            exam_mode = config.exam_mode,
            memory_mode = %config.compaction.mode,
            fallback_questions = tracker.questions().len(),
            "Conversation engine initialized"
        );

        Ok(Self {
            session_id,
            case,
            generation: resolved.params,
            config,
            chat: providers.chat,
            classifier,
            compactor,
            tracker,
            history,
            transcript: Vec::new(),
            state: EngineState::Initialized,
            usage: TokenUsage::zero(),
            auxiliary_usage: TokenUsage::zero(),
            turn_count: 0,
        })
    }

    /// Runs one conversation turn.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Ended` if the engine was closed. Provider
    /// failures are not errors; they yield a degraded reply.
    pub async fn chat_turn(&mut self, utterance: &str) -> Result<TurnReply, EngineError> {
        if self.state == EngineState::Ended {
            return Err(EngineError::Ended);
        }
        if self.state == EngineState::Initialized {
            self.state = self.state.transition_to(EngineState::Active)?;
        }

        let started = Instant::now();
        self.turn_count += 1;
        self.history.push_user(utterance);
        self.transcript.push(Turn::user(utterance));

        self.update_tracker(utterance).await;
        self.refresh_system_prompt();
        self.compact_if_needed().await;

        let request = self.chat_request();
        match self.chat.complete(request).await {
            Ok(response) => {
                self.usage.add(&response.usage);
                if response.content.trim().is_empty() {
                    tracing::warn!(
                        session_id = %self.session_id,
                        turn = self.turn_count,
                        "Chat completion returned an empty reply"
                    );
                    return Ok(self.degraded_reply());
                }
                // A cut-off or filtered reply is never kept as a patient turn.
                if response.finish_reason != FinishReason::Stop {
                    tracing::warn!(
                        session_id = %self.session_id,
                        turn = self.turn_count,
                        finish_reason = ?response.finish_reason,
                        "Chat completion did not finish normally, replying with apology"
                    );
                    return Ok(self.degraded_reply());
                }

                self.history.push_assistant(response.content.clone());
                self.transcript.push(Turn::assistant(response.content.clone()));
                let elapsed_secs = started.elapsed().as_secs_f64();
                tracing::debug!(
                    session_id = %self.session_id,
                    turn = self.turn_count,
                    elapsed_secs,
                    total_tokens = self.usage.total_tokens,
                    "Turn completed"
                );
                Ok(TurnReply {
                    text: response.content,
                    elapsed_secs,
                    degraded: false,
                })
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    turn = self.turn_count,
                    error = %err,
                    "Chat completion failed, replying with apology"
                );
                Ok(self.degraded_reply())
            }
        }
    }

    /// Ends the conversation and returns the final chat usage. Idempotent.
    pub fn close(&mut self) -> TokenUsage {
        if self.state != EngineState::Ended {
            self.state = EngineState::Ended;
            tracing::info!(
                session_id = %self.session_id,
                turns = self.turn_count,
                asked = self.tracker.asked_count(),
                total_tokens = self.usage.total_tokens,
                auxiliary_tokens = self.auxiliary_usage.total_tokens,
                "Conversation ended"
            );
        }
        self.usage
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn case(&self) -> &CaseProfile {
        &self.case
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Chat-completion usage only.
    pub fn token_usage(&self) -> TokenUsage {
        self.usage
    }

    /// Classifier and summarizer usage.
    pub fn auxiliary_usage(&self) -> TokenUsage {
        self.auxiliary_usage
    }

    pub fn tracker(&self) -> &FallbackQuestionTracker {
        &self.tracker
    }

    /// The message list sent to the model, as of the last turn.
    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Every student utterance and every non-degraded reply, unaffected by
    /// compaction.
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    async fn update_tracker(&mut self, utterance: &str) {
        if self.tracker.all_asked() || self.tracker.is_empty() {
            return;
        }
        let unasked = self.tracker.unasked();
        let classification = self
            .classifier
            .classify(self.session_id, utterance, unasked.texts())
            .await;
        self.auxiliary_usage.add(&classification.usage);

        let newly_asked = self.tracker.apply_matches(&unasked, &classification.matches);
        if !newly_asked.is_empty() {
            tracing::info!(
                session_id = %self.session_id,
                positions = ?newly_asked,
                source = ?classification.source,
                remaining = self.tracker.questions().len() - self.tracker.asked_count(),
                "Fallback questions marked as asked"
            );
        }
    }

    fn refresh_system_prompt(&mut self) {
        if !PromptBuilder::is_role_play_prompt(self.history.system_prompt()) {
            tracing::warn!(
                session_id = %self.session_id,
                "System turn did not hold the role-play prompt, replacing it"
            );
        }
        let prompt = PromptBuilder::build(&self.case, &self.tracker, self.case.persona_kind);
        self.history.set_system_prompt(prompt);
    }

    async fn compact_if_needed(&mut self) {
        let policy = self.config.compaction;
        if !policy.should_compact(self.history.len()) {
            return;
        }
        let outcome = self
            .compactor
            .compact(self.session_id, &self.history, &self.tracker, policy.mode)
            .await;
        self.auxiliary_usage.add(&outcome.usage);
        if outcome.action != CompactionAction::Unchanged {
            tracing::debug!(
                session_id = %self.session_id,
                action = ?outcome.action,
                before = self.history.len(),
                after = outcome.history.len(),
                "Compacted history"
            );
        }
        self.history = outcome.history;
    }

    fn chat_request(&self) -> CompletionRequest {
        let messages = self.history.turns().iter().map(to_wire).collect();
        CompletionRequest::new(RequestMetadata::new(
            self.session_id,
            RequestPurpose::Chat,
            format!("chat-{}-{}", self.session_id, self.turn_count),
        ))
        .with_model(self.config.chat_model.id())
        .with_messages(messages)
        .with_generation(&self.generation)
    }

    fn degraded_reply(&self) -> TurnReply {
        TurnReply {
            text: apology_reply(&self.case).to_string(),
            elapsed_secs: 0.0,
            degraded: true,
        }
    }
}

fn to_wire(turn: &Turn) -> Message {
    match turn.role {
        TurnRole::System => Message::system(turn.content.clone()),
        TurnRole::User => Message::user(turn.content.clone()),
        TurnRole::Assistant => Message::assistant(turn.content.clone()),
    }
}
