//! Conversation domain module.
//!
//! Pure building blocks of a simulated-patient conversation: the message
//! history, fallback-question tracking, prompt rendering, classification
//! parsing, compaction planning and generation parameter policy.

mod classification;
mod compaction;
mod generation;
mod message;
mod prompt;
mod tracker;

pub use classification::{
    classification_instruction, classification_request, keyword_overlap_matches, parse_matches,
    ParsedMatches, DIRECT_TOPIC_MATCH_RULE,
};
pub use compaction::{
    plan_summary, splice_summary, summarization_instruction, summarization_request, summary_note,
    truncate, CompactionPolicy, MemoryMode, SummaryPlan, SUMMARY_HEADING,
    SUMMARY_UNAVAILABLE_PLACEHOLDER,
};
pub use generation::{
    ChatModel, GenerationParams, GenerationSettings, ResolvedGeneration, EXAM_MODE_SEED,
};
pub use message::{MessageHistory, Turn, TurnRole};
pub use prompt::{
    additional_information_section, all_questions_asked_section, apology_reply, PromptBuilder,
    ADDITIONAL_INFORMATION_HEADING, ALL_QUESTIONS_ASKED_MARKER, NO_FALLBACK_QUESTIONS_MARKER,
    NO_MORE_QUESTIONS_REPLY, PROMPT_HEADING,
};
pub use tracker::{FallbackQuestion, FallbackQuestionTracker, UnaskedQuestions};
