//! Conversation engine configuration

use serde::Deserialize;

use crate::application::conversation::EngineConfig;
use crate::domain::conversation::{ChatModel, CompactionPolicy, GenerationSettings, MemoryMode};

use super::ai::AiConfig;
use super::error::ValidationError;

/// Conversation engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Chat model: `gpt-4o-mini` (tunable) or `o4-mini` (deterministic)
    #[serde(default)]
    pub chat_model: ChatModel,

    /// Fixed-seed generation for graded sessions
    #[serde(default)]
    pub exam_mode: bool,

    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub max_reply_tokens: Option<u32>,

    #[serde(default)]
    pub memory_mode: MemoryMode,

    #[serde(default = "default_max_turns_before_memory")]
    pub max_turns_before_memory: usize,

    #[serde(default = "default_truncate_keep_turns")]
    pub truncate_keep_turns: usize,

    #[serde(default = "default_summary_keep_turns")]
    pub summary_keep_turns: usize,

    /// Keyword matching when the classifier call fails
    #[serde(default)]
    pub keyword_fallback: bool,
}

impl ConversationConfig {
    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            max_reply_tokens: self.max_reply_tokens,
        }
    }

    pub fn compaction(&self) -> CompactionPolicy {
        CompactionPolicy {
            mode: self.memory_mode,
            max_turns_before_memory: self.max_turns_before_memory,
            truncate_keep_turns: self.truncate_keep_turns,
            summary_keep_turns: self.summary_keep_turns,
        }
    }

    /// Combine with the auxiliary model names into an engine config
    pub fn to_engine_config(&self, ai: &AiConfig) -> EngineConfig {
        EngineConfig {
            chat_model: self.chat_model,
            exam_mode: self.exam_mode,
            generation: self.generation(),
            compaction: self.compaction(),
            classifier_model: Some(ai.classifier_model.clone()),
            summarizer_model: Some(ai.summarizer_model.clone()),
            keyword_fallback: self.keyword_fallback,
        }
    }

    /// Validate conversation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let engine = EngineConfig {
            generation: self.generation(),
            compaction: self.compaction(),
            ..EngineConfig::default()
        };
        engine.validate()?;
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            chat_model: ChatModel::default(),
            exam_mode: false,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_reply_tokens: None,
            memory_mode: MemoryMode::default(),
            max_turns_before_memory: default_max_turns_before_memory(),
            truncate_keep_turns: default_truncate_keep_turns(),
            summary_keep_turns: default_summary_keep_turns(),
            keyword_fallback: false,
        }
    }
}

fn default_max_turns_before_memory() -> usize {
    10
}

fn default_truncate_keep_turns() -> usize {
    10
}

fn default_summary_keep_turns() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_defaults_match_engine_defaults() {
        let config = ConversationConfig::default();
        assert_eq!(config.chat_model, ChatModel::Gpt4oMini);
        assert_eq!(config.memory_mode, MemoryMode::Summarize);
        assert_eq!(config.compaction(), CompactionPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range_temperature() {
        let config = ConversationConfig {
            temperature: Some(2.5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Conversation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_keep_turns() {
        let config = ConversationConfig {
            truncate_keep_turns: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_carries_auxiliary_models() {
        let ai = AiConfig {
            classifier_model: "gpt-4.1-nano".to_string(),
            ..Default::default()
        };
        let config = ConversationConfig {
            chat_model: ChatModel::O4Mini,
            exam_mode: true,
            ..Default::default()
        };

        let engine = config.to_engine_config(&ai);

        assert_eq!(engine.chat_model, ChatModel::O4Mini);
        assert!(engine.exam_mode);
        assert_eq!(engine.classifier_model.as_deref(), Some("gpt-4.1-nano"));
        assert_eq!(engine.summarizer_model.as_deref(), Some("gpt-4o-mini"));
    }
}
