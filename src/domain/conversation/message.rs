//! Turns and the message history of a conversation.
//!
//! The history is never empty and its first turn is always the system
//! prompt. After summarization a second system turn carries the summary
//! of older exchanges.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Speaker of a turn.
///
/// Mirrors the AI provider message roles for consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::System => "system",
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered turns; element 0 is the authoritative system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHistory {
    turns: Vec<Turn>,
}

impl MessageHistory {
    /// Starts a history holding only the system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
        }
    }

    /// Rebuilds a history from raw turns.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `turns` is empty or does not start with
    /// a system turn.
    pub fn from_turns(turns: Vec<Turn>) -> Result<Self, ValidationError> {
        match turns.first() {
            None => Err(ValidationError::empty_field("history")),
            Some(first) if first.role != TurnRole::System => Err(ValidationError::invalid_format(
                "history",
                format!("first turn must be system, got {}", first.role),
            )),
            Some(_) => Ok(Self { turns }),
        }
    }

    pub fn system_prompt(&self) -> &str {
        // Construction guarantees a leading system turn.
        self.turns.first().map(|t| t.content.as_str()).unwrap_or_default()
    }

    /// Replaces the system prompt in place.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        if let Some(first) = self.turns.first_mut() {
            first.content = prompt.into();
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }
}
