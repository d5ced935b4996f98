//! Chat model choice and generation parameter policy.
//!
//! Two models are supported. The tunable one accepts sampling overrides;
//! the deterministic one accepts none of them. Both honor exam mode, which
//! pins a fixed seed so graded sessions are reproducible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Seed used for every completion while exam mode is on.
pub const EXAM_MODE_SEED: i64 = 42;

/// Backing chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChatModel {
    /// Exposes temperature, top_p and both penalties.
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    /// Exposes no sampling tunables.
    #[serde(rename = "o4-mini")]
    O4Mini,
}

impl ChatModel {
    pub fn id(&self) -> &'static str {
        match self {
            ChatModel::Gpt4oMini => "gpt-4o-mini",
            ChatModel::O4Mini => "o4-mini",
        }
    }

    pub fn is_tunable(&self) -> bool {
        matches!(self, ChatModel::Gpt4oMini)
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChatModel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpt-4o-mini" => Ok(ChatModel::Gpt4oMini),
            "o4-mini" => Ok(ChatModel::O4Mini),
            other => Err(ValidationError::invalid_format(
                "chat_model",
                format!("unsupported model '{}', expected gpt-4o-mini or o4-mini", other),
            )),
        }
    }
}

/// Requested sampling overrides. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub max_reply_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Range-checks every override that is set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("temperature", self.temperature, 0.0, 2.0)?;
        check_range("top_p", self.top_p, 0.0, 1.0)?;
        check_range("frequency_penalty", self.frequency_penalty, -2.0, 2.0)?;
        check_range("presence_penalty", self.presence_penalty, -2.0, 2.0)?;
        if self.max_reply_tokens == Some(0) {
            return Err(ValidationError::out_of_range("max_reply_tokens", 1, u32::MAX, 0));
        }
        Ok(())
    }

    /// Resolves the parameters actually sent for `model`.
    ///
    /// Overrides the model does not support are dropped and reported in
    /// `ignored` rather than forwarded.
    pub fn resolve(&self, model: ChatModel, exam_mode: bool) -> ResolvedGeneration {
        let seed = exam_mode.then_some(EXAM_MODE_SEED);
        if model.is_tunable() {
            return ResolvedGeneration {
                params: GenerationParams {
                    temperature: self.temperature,
                    top_p: self.top_p,
                    frequency_penalty: self.frequency_penalty,
                    presence_penalty: self.presence_penalty,
                    seed,
                    max_tokens: self.max_reply_tokens,
                },
                ignored: Vec::new(),
            };
        }

        let ignored = [
            ("temperature", self.temperature.is_some()),
            ("top_p", self.top_p.is_some()),
            ("frequency_penalty", self.frequency_penalty.is_some()),
            ("presence_penalty", self.presence_penalty.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect();

        ResolvedGeneration {
            params: GenerationParams {
                seed,
                max_tokens: self.max_reply_tokens,
                ..GenerationParams::default()
            },
            ignored,
        }
    }
}

fn check_range(field: &str, value: Option<f32>, min: f32, max: f32) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => {
            Err(ValidationError::out_of_range(field, min, max, v))
        }
        _ => Ok(()),
    }
}

/// Parameters attached to one chat completion request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub seed: Option<i64>,
    pub max_tokens: Option<u32>,
}

/// Resolved parameters plus the names of dropped overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeneration {
    pub params: GenerationParams,
    pub ignored: Vec<&'static str>,
}
