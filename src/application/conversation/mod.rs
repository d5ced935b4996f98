//! Conversation services: classification, compaction and the per-session engine.

mod classifier;
mod compactor;
mod engine;

pub use classifier::{Classification, ClassificationSource, QuestionStatusClassifier};
pub use compactor::{CompactionAction, CompactionOutcome, MemoryCompactor};
pub use engine::{
    ConversationEngine, EngineConfig, EngineError, EngineProviders, EngineState, TurnReply,
};
