//! Memory compaction policy and the pure parts of each strategy.
//!
//! Truncation is lossy: turns between the system prompt and the kept tail
//! disappear from the model's view. Fallback-question flags are unaffected
//! because they live in the tracker, not in the history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

use super::message::{MessageHistory, Turn};
use super::tracker::FallbackQuestionTracker;

/// Heading of the summary note spliced in after summarization.
pub const SUMMARY_HEADING: &str = "## Previous Conversation Summary";

/// Summary text used when the summarization call fails.
pub const SUMMARY_UNAVAILABLE_PLACEHOLDER: &str =
    "(Summary unavailable: earlier turns could not be summarized. Continue the role-play using \
     the case information and the recent turns below.)";

/// Compaction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    None,
    Truncate,
    #[default]
    Summarize,
}

impl fmt::Display for MemoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryMode::None => "none",
            MemoryMode::Truncate => "truncate",
            MemoryMode::Summarize => "summarize",
        };
        f.write_str(s)
    }
}

impl FromStr for MemoryMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(MemoryMode::None),
            "truncate" => Ok(MemoryMode::Truncate),
            "summarize" => Ok(MemoryMode::Summarize),
            other => Err(ValidationError::invalid_format(
                "memory_mode",
                format!("expected none, truncate or summarize, got '{}'", other),
            )),
        }
    }
}

/// When and how much to compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    pub mode: MemoryMode,
    /// Compaction runs once the history is longer than this.
    pub max_turns_before_memory: usize,
    /// Turns kept after the system prompt in truncate mode.
    pub truncate_keep_turns: usize,
    /// Turns kept verbatim after the summary in summarize mode.
    pub summary_keep_turns: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            mode: MemoryMode::Summarize,
            max_turns_before_memory: 10,
            truncate_keep_turns: 10,
            summary_keep_turns: 5,
        }
    }
}

impl CompactionPolicy {
    pub fn should_compact(&self, history_len: usize) -> bool {
        self.mode != MemoryMode::None && history_len > self.max_turns_before_memory
    }
}

/// Keeps element 0 plus the last `keep` turns.
pub fn truncate(history: &MessageHistory, keep: usize) -> MessageHistory {
    let turns = history.turns();
    if turns.len() <= keep + 1 {
        return history.clone();
    }
    let mut kept = Vec::with_capacity(keep + 1);
    kept.push(turns[0].clone());
    kept.extend_from_slice(&turns[turns.len() - keep..]);
    rebuild(history, kept)
}

/// The split of a history for summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPlan {
    /// Turns between the system prompt and the kept tail.
    pub older: Vec<Turn>,
    /// Number of trailing turns kept verbatim.
    pub keep_recent: usize,
}

/// Plans a summarization, or returns `None` when there is nothing old
/// enough to summarize (history length at most `keep_recent + 1`).
pub fn plan_summary(history: &MessageHistory, keep_recent: usize) -> Option<SummaryPlan> {
    let turns = history.turns();
    if turns.len() <= keep_recent + 1 {
        return None;
    }
    Some(SummaryPlan {
        older: turns[1..turns.len() - keep_recent].to_vec(),
        keep_recent,
    })
}

/// System instruction for the summarization call.
pub fn summarization_instruction() -> &'static str {
    "You summarize the earlier part of a medical-exam role-play between an examinee and a \
     simulated patient or guardian. Write a short factual summary in Thai of what was asked and \
     what was answered. Keep every clinical fact that was disclosed. Do not add new facts."
}

/// User message for the summarization call: the older transcript plus the
/// tracker's question state as ground truth.
pub fn summarization_request(plan: &SummaryPlan, tracker: &FallbackQuestionTracker) -> String {
    let mut text = String::from("Conversation to summarize:\n");
    for turn in &plan.older {
        text.push_str(&format!("{}: {}\n", turn.role, turn.content.trim()));
    }

    text.push_str("\nAdditional question status (ground truth, do not alter these flags, do not guess):\n");
    if tracker.is_empty() {
        text.push_str("- (this case has no additional questions)\n");
    }
    for question in tracker.questions() {
        let status = if question.is_asked() { "asked" } else { "not asked" };
        text.push_str(&format!("- [{}] {}\n", status, question.text()));
    }
    text
}

/// Renders the summary note inserted after the system prompt.
pub fn summary_note(summary: &str) -> String {
    format!("{}\n{}", SUMMARY_HEADING, summary.trim())
}

/// Replaces the older turns with one system summary note:
/// `[system prompt, summary note, last keep_recent turns]`.
pub fn splice_summary(history: &MessageHistory, plan: &SummaryPlan, summary: &str) -> MessageHistory {
    let turns = history.turns();
    let tail_start = turns.len().saturating_sub(plan.keep_recent).max(1);

    let mut spliced = Vec::with_capacity(plan.keep_recent + 2);
    spliced.push(turns[0].clone());
    spliced.push(Turn::system(summary_note(summary)));
    spliced.extend_from_slice(&turns[tail_start..]);
    rebuild(history, spliced)
}

fn rebuild(original: &MessageHistory, turns: Vec<Turn>) -> MessageHistory {
    // Every caller keeps the original system turn at index 0.
    MessageHistory::from_turns(turns).unwrap_or_else(|_| original.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::QuestionLimitType;
    use crate::domain::conversation::TurnRole;
    use proptest::prelude::*;

    fn history_of(len: usize) -> MessageHistory {
        let mut history = MessageHistory::new("system prompt");
        for i in 1..len {
            if i % 2 == 1 {
                history.push_user(format!("user {}", i));
            } else {
                history.push_assistant(format!("assistant {}", i));
            }
        }
        history
    }

    mod policy {
        use super::*;

        #[test]
        fn triggers_only_above_threshold() {
            let policy = CompactionPolicy::default();
            assert!(!policy.should_compact(10));
            assert!(policy.should_compact(11));
        }

        #[test]
        fn none_mode_never_triggers() {
            let policy = CompactionPolicy {
                mode: MemoryMode::None,
                ..CompactionPolicy::default()
            };
            assert!(!policy.should_compact(1000));
        }

        #[test]
        fn memory_mode_parses_case_insensitively() {
            assert_eq!("Truncate".parse::<MemoryMode>().unwrap(), MemoryMode::Truncate);
            assert!("rolling".parse::<MemoryMode>().is_err());
        }
    }

    mod truncation {
        use super::*;

        #[test]
        fn keeps_system_and_last_k() {
            let history = history_of(15);
            let truncated = truncate(&history, 10);

            assert_eq!(truncated.len(), 11);
            assert_eq!(truncated.turns()[0], history.turns()[0]);
            assert_eq!(truncated.turns()[1], history.turns()[5]);
            assert_eq!(truncated.last(), history.last());
        }
    }

    mod summarization {
        use super::*;

        #[test]
        fn no_plan_at_or_below_six_turns() {
            for len in 1..=6 {
                assert!(plan_summary(&history_of(len), 5).is_none());
            }
        }

        #[test]
        fn plan_covers_turns_between_system_and_tail() {
            let plan = plan_summary(&history_of(12), 5).unwrap();
            assert_eq!(plan.older.len(), 6);
            assert_eq!(plan.older[0].content, "user 1");
            assert_eq!(plan.older[5].content, "assistant 6");
        }

        #[test]
        fn request_serializes_transcript_and_question_state() {
            let plan = plan_summary(&history_of(8), 5).unwrap();
            let mut tracker = FallbackQuestionTracker::new(QuestionLimitType::Single, ["q-one", "q-two"]);
            tracker.mark_asked(1);

            let request = summarization_request(&plan, &tracker);

            assert!(request.contains("user: user 1"));
            assert!(request.contains("assistant: assistant 2"));
            assert!(request.contains("do not alter these flags, do not guess"));
            assert!(request.contains("- [not asked] q-one"));
            assert!(request.contains("- [asked] q-two"));
        }

        #[test]
        fn splice_inserts_single_summary_note() {
            let history = history_of(12);
            let plan = plan_summary(&history, 5).unwrap();
            let spliced = splice_summary(&history, &plan, "สรุป");

            assert_eq!(spliced.len(), 7);
            assert_eq!(spliced.turns()[0], history.turns()[0]);
            assert_eq!(spliced.turns()[1].role, TurnRole::System);
            assert_eq!(spliced.turns()[1].content, format!("{}\nสรุป", SUMMARY_HEADING));
            assert_eq!(spliced.turns()[2..], history.turns()[7..]);
        }
    }

    proptest! {
        #[test]
        fn prop_truncate_length_and_head(len in 1usize..40, keep in 1usize..15) {
            let history = history_of(len);
            let truncated = truncate(&history, keep);
            prop_assert_eq!(truncated.len(), len.min(keep + 1));
            prop_assert_eq!(&truncated.turns()[0], &history.turns()[0]);
        }

        #[test]
        fn prop_small_histories_have_no_summary_plan(len in 1usize..=6) {
            prop_assert!(plan_summary(&history_of(len), 5).is_none());
        }
    }
}
