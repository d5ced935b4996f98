//! Case domain module.
//!
//! Authored exam-station data consumed by the conversation core.

mod profile;

pub use profile::{
    CaseProfile, FallbackQuestionBlock, FallbackQuestionSource, PatientDetails, PersonaKind,
    QuestionLimitType, SampleDialogue, Scenario, SimulatorPersona,
};
