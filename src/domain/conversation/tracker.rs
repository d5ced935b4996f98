//! Fallback-question tracking.
//!
//! A fallback question is a pre-authored question the simulated speaker may
//! volunteer only when the examinee opens the floor. Each one is answerable
//! at most once per session: its `asked` flag only ever moves from false to
//! true.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::case::{CaseProfile, FallbackQuestionBlock, QuestionLimitType};

/// One tracked fallback question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackQuestion {
    text: String,
    asked: bool,
}

impl FallbackQuestion {
    /// Creates an unasked question.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            asked: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_asked(&self) -> bool {
        self.asked
    }

    /// Marks the question as asked. Returns true if the flag changed.
    fn mark_asked(&mut self) -> bool {
        let changed = !self.asked;
        self.asked = true;
        changed
    }
}

/// The unasked questions at one point in time, with their tracker positions.
///
/// Classification results are 1-based indices into `texts`; `positions`
/// maps them back onto the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnaskedQuestions {
    positions: Vec<usize>,
    texts: Vec<String>,
}

impl UnaskedQuestions {
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Resolves a 1-based index into a tracker position.
    pub fn position_of(&self, one_based: usize) -> Option<usize> {
        one_based
            .checked_sub(1)
            .and_then(|i| self.positions.get(i))
            .copied()
    }
}

/// Ordered fallback questions plus the case's limit rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackQuestionTracker {
    questions: Vec<FallbackQuestion>,
    limit_type: QuestionLimitType,
}

impl FallbackQuestionTracker {
    /// Creates a tracker with every question unasked.
    pub fn new(
        limit_type: QuestionLimitType,
        questions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            questions: questions.into_iter().map(FallbackQuestion::new).collect(),
            limit_type,
        }
    }

    /// Creates a tracker with no questions.
    pub fn empty() -> Self {
        Self {
            questions: Vec::new(),
            limit_type: QuestionLimitType::Unset,
        }
    }

    /// Builds a tracker from a case's fallback block; an absent block is empty.
    pub fn from_block(block: Option<&FallbackQuestionBlock>) -> Self {
        match block {
            Some(block) => Self::new(
                block.question_limit_type,
                block.questions.iter().map(|q| q.text.trim().to_string()),
            ),
            None => Self::empty(),
        }
    }

    pub fn from_case(case: &CaseProfile) -> Self {
        Self::from_block(case.fallback_questions.as_ref())
    }

    pub fn questions(&self) -> &[FallbackQuestion] {
        &self.questions
    }

    pub fn limit_type(&self) -> QuestionLimitType {
        self.limit_type
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when the case has questions and every one has been asked.
    pub fn all_asked(&self) -> bool {
        !self.questions.is_empty() && self.questions.iter().all(FallbackQuestion::is_asked)
    }

    pub fn asked_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_asked()).count()
    }

    /// The live unasked list, in authored order.
    pub fn unasked(&self) -> UnaskedQuestions {
        let (positions, texts) = self
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !q.is_asked())
            .map(|(i, q)| (i, q.text.clone()))
            .unzip();
        UnaskedQuestions { positions, texts }
    }

    /// Marks the question at `position` (0-based, tracker order) as asked.
    ///
    /// Returns true if the flag changed. Out-of-range positions are ignored.
    pub fn mark_asked(&mut self, position: usize) -> bool {
        self.questions
            .get_mut(position)
            .map(FallbackQuestion::mark_asked)
            .unwrap_or(false)
    }

    /// Applies classifier matches (1-based into `unasked`) and returns the
    /// tracker positions that flipped to asked.
    pub fn apply_matches(&mut self, unasked: &UnaskedQuestions, matches: &BTreeSet<usize>) -> Vec<usize> {
        let mut flipped = Vec::new();
        for &index in matches {
            match unasked.position_of(index) {
                Some(position) => {
                    if self.mark_asked(position) {
                        flipped.push(position);
                    }
                }
                None => {
                    tracing::debug!(index, unasked = unasked.len(), "Dropping out-of-range match");
                }
            }
        }
        flipped
    }
}

impl Default for FallbackQuestionTracker {
    fn default() -> Self {
        Self::empty()
    }
}
