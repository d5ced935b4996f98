//! Case profile - the immutable, authored description of one exam station.
//!
//! A profile is produced by the case-loading collaborator (see
//! `ports::CaseRepository`) and never mutated after a session starts.
//! Only `case_id` and `simulator.name` are required; every other field
//! falls back to an empty default so that prompt rendering never fails.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CaseId, ValidationError};

/// Which role template governs the simulated speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersonaKind {
    /// A parent or guardian speaking on behalf of a minor patient.
    Guardian,
    /// The patient speaking for themselves.
    #[default]
    Patient,
}

/// How many fallback questions the simulated speaker may reveal per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionLimitType {
    /// Only one question per invitation.
    Single,
    /// Several questions per invitation.
    Multiple,
    /// Not specified by the case author.
    #[default]
    Unset,
}

/// The person the model plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorPersona {
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub occupation: String,
    /// Relationship to the patient (guardian cases only), e.g. "มารดา".
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub emotional_state: String,
    #[serde(default)]
    pub behavior_notes: Vec<String>,
}

/// The patient being discussed when the simulator is a guardian.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
}

/// Scenario and illness history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub present_illness: String,
    #[serde(default)]
    pub timeline: Vec<String>,
    #[serde(default)]
    pub past_history: String,
    #[serde(default)]
    pub family_history: String,
    #[serde(default)]
    pub social_history: String,
    #[serde(default)]
    pub additional_facts: Vec<String>,
}

impl Scenario {
    /// Returns true when no scenario field carries content.
    pub fn is_empty(&self) -> bool {
        self.setting.trim().is_empty()
            && self.chief_complaint.trim().is_empty()
            && self.present_illness.trim().is_empty()
            && self.timeline.is_empty()
            && self.past_history.trim().is_empty()
            && self.family_history.trim().is_empty()
            && self.social_history.trim().is_empty()
            && self.additional_facts.is_empty()
    }
}

/// An example exchange showing the intended tone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleDialogue {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// One authored fallback question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackQuestionSource {
    pub text: String,
}

/// The fallback-question block of a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackQuestionBlock {
    #[serde(default)]
    pub question_limit_type: QuestionLimitType,
    #[serde(default)]
    pub questions: Vec<FallbackQuestionSource>,
}

/// Immutable per-case structured document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseProfile {
    pub case_id: CaseId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub persona_kind: PersonaKind,
    pub simulator: SimulatorPersona,
    #[serde(default)]
    pub patient: Option<PatientDetails>,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub sample_dialogues: Vec<SampleDialogue>,
    /// `null` or absent maps to an empty tracker.
    #[serde(default)]
    pub fallback_questions: Option<FallbackQuestionBlock>,
}

impl CaseProfile {
    /// Creates a minimal profile with only the required fields.
    pub fn new(case_id: CaseId, persona_kind: PersonaKind, simulator_name: impl Into<String>) -> Self {
        Self {
            case_id,
            title: String::new(),
            persona_kind,
            simulator: SimulatorPersona {
                name: simulator_name.into(),
                age: String::new(),
                sex: String::new(),
                occupation: String::new(),
                relationship: String::new(),
                emotional_state: String::new(),
                behavior_notes: Vec::new(),
            },
            patient: None,
            scenario: Scenario::default(),
            sample_dialogues: Vec::new(),
            fallback_questions: None,
        }
    }

    /// Sets the fallback-question block.
    pub fn with_fallback_questions(
        mut self,
        limit_type: QuestionLimitType,
        questions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.fallback_questions = Some(FallbackQuestionBlock {
            question_limit_type: limit_type,
            questions: questions
                .into_iter()
                .map(|text| FallbackQuestionSource { text: text.into() })
                .collect(),
        });
        self
    }

    /// Sets the scenario block.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = scenario;
        self
    }

    /// Sets the patient details (guardian cases).
    pub fn with_patient(mut self, patient: PatientDetails) -> Self {
        self.patient = Some(patient);
        self
    }

    /// Validates the fields the simulator cannot run without.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.simulator.name.trim().is_empty() {
            return Err(ValidationError::empty_field("simulator.name"));
        }
        if let Some(block) = &self.fallback_questions {
            for (i, question) in block.questions.iter().enumerate() {
                if question.text.trim().is_empty() {
                    return Err(ValidationError::empty_field(format!(
                        "fallback_questions.questions[{}].text",
                        i
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_id() -> CaseId {
        CaseId::new("peds-fever-01").unwrap()
    }

    #[test]
    fn minimal_json_profile_deserializes_with_defaults() {
        let json = r#"{"case_id":"peds-fever-01","simulator":{"name":"คุณสมศรี"}}"#;
        let profile: CaseProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.persona_kind, PersonaKind::Patient);
        assert!(profile.fallback_questions.is_none());
        assert!(profile.scenario.is_empty());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn null_fallback_block_is_accepted() {
        let json = r#"{"case_id":"x","simulator":{"name":"A"},"fallback_questions":null}"#;
        let profile: CaseProfile = serde_json::from_str(json).unwrap();
        assert!(profile.fallback_questions.is_none());
    }

    #[test]
    fn limit_type_defaults_to_unset() {
        let json = r#"{"case_id":"x","simulator":{"name":"A"},
            "fallback_questions":{"questions":[{"text":"ลูกจะเป็นอะไรมากมั๊ยคะ"}]}}"#;
        let profile: CaseProfile = serde_json::from_str(json).unwrap();
        let block = profile.fallback_questions.unwrap();
        assert_eq!(block.question_limit_type, QuestionLimitType::Unset);
        assert_eq!(block.questions.len(), 1);
    }

    #[test]
    fn guardian_profile_deserializes_from_yaml() {
        let yaml = r#"
case_id: peds-fever-01
persona_kind: guardian
simulator:
  name: คุณมาลี
  relationship: มารดา
  sex: female
patient:
  name: น้องบี
  age: 3 ปี
fallback_questions:
  question_limit_type: single
  questions:
    - text: ลูกจะเป็นอะไรมากมั๊ยคะ
"#;
        let profile: CaseProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.persona_kind, PersonaKind::Guardian);
        assert_eq!(profile.patient.unwrap().name, "น้องบี");
        assert_eq!(
            profile.fallback_questions.unwrap().question_limit_type,
            QuestionLimitType::Single
        );
    }

    #[test]
    fn missing_simulator_is_a_parse_error() {
        let json = r#"{"case_id":"x"}"#;
        assert!(serde_json::from_str::<CaseProfile>(json).is_err());
    }

    #[test]
    fn blank_simulator_name_fails_validation() {
        let profile = CaseProfile::new(case_id(), PersonaKind::Patient, "  ");
        assert_eq!(
            profile.validate(),
            Err(ValidationError::empty_field("simulator.name"))
        );
    }

    #[test]
    fn blank_fallback_question_fails_validation() {
        let profile = CaseProfile::new(case_id(), PersonaKind::Patient, "A")
            .with_fallback_questions(QuestionLimitType::Multiple, ["ok", " "]);
        let err = profile.validate().unwrap_err();
        assert_eq!(err.field(), "fallback_questions.questions[1].text");
    }
}
