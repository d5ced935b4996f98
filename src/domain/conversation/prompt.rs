//! Role-play system prompt rendering.
//!
//! The prompt is rebuilt from the case and the live tracker on every turn.
//! Sections always appear in the same order: rules, identity, scenario,
//! sample dialogue, additional information. Guardian and patient cases
//! share everything except the identity block and its honorifics.

use crate::domain::case::{CaseProfile, PersonaKind, QuestionLimitType};

use super::tracker::FallbackQuestionTracker;

/// First line of every rendered role-play prompt.
pub const PROMPT_HEADING: &str = "# OSCE Simulated Patient Role-Play";

/// Heading of the additional-information section.
pub const ADDITIONAL_INFORMATION_HEADING: &str = "## Additional Information";

/// Marker rendered when the case defines no fallback questions.
pub const NO_FALLBACK_QUESTIONS_MARKER: &str = "[NO ADDITIONAL QUESTIONS FOR THIS CASE]";

/// Marker rendered once every fallback question has been asked.
pub const ALL_QUESTIONS_ASKED_MARKER: &str = "[ALL ADDITIONAL QUESTIONS HAVE BEEN ASKED]";

/// What the simulated speaker says when it has nothing left to ask.
pub const NO_MORE_QUESTIONS_REPLY: &str = "ไม่มีคำถามเพิ่มเติมแล้ว";

/// Renders role-play prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Renders the complete system prompt. Never fails: missing optional
    /// fields render as placeholders.
    pub fn build(
        case: &CaseProfile,
        tracker: &FallbackQuestionTracker,
        persona_kind: PersonaKind,
    ) -> String {
        let sections = [
            PROMPT_HEADING.to_string(),
            response_rules(),
            identity_section(case, persona_kind),
            scenario_section(case),
            sample_dialogue_section(case),
            additional_information_section(tracker),
        ];

        sections
            .into_iter()
            .filter(|section| !section.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Returns true if `text` looks like a prompt produced by `build`.
    pub fn is_role_play_prompt(text: &str) -> bool {
        text.starts_with(PROMPT_HEADING)
    }
}

fn response_rules() -> String {
    [
        "## Response Rules",
        "- Reply in Thai only, even if the examinee writes in another language.",
        "- Keep every reply short: at most 2-3 sentences.",
        "- Answer only what the examinee asks. Never volunteer information that was not requested.",
        "- Never give medical advice, diagnoses or treatment recommendations. You are not a clinician.",
        "- Stay in character at all times and never mention that this is a simulation.",
        "- If asked about something this case does not cover, say you do not know or are not sure.",
    ]
    .join("\n")
}

fn identity_section(case: &CaseProfile, persona_kind: PersonaKind) -> String {
    let persona = &case.simulator;
    let honorifics = Honorifics::for_speaker(&persona.sex, &persona.relationship, persona_kind);

    let mut lines = vec!["## Your Identity".to_string()];
    match persona_kind {
        PersonaKind::Guardian => {
            let relationship = or_placeholder(&persona.relationship, "guardian");
            lines.push(format!(
                "You are {}, the {} of the patient. You speak on the patient's behalf.",
                persona.name, relationship
            ));
            let patient = case.patient.clone().unwrap_or_default();
            lines.push(format!(
                "- Patient: {} (age: {}, sex: {})",
                or_placeholder(&patient.name, "-"),
                or_placeholder(&patient.age, "-"),
                or_placeholder(&patient.sex, "-"),
            ));
            lines.push(
                "- Describe the patient's symptoms as things you have observed, not as your own."
                    .to_string(),
            );
            lines.push("- Refer to the patient as \"ลูก\".".to_string());
        }
        PersonaKind::Patient => {
            lines.push(format!(
                "You are {}, the patient. Describe your own symptoms in the first person.",
                persona.name
            ));
        }
    }
    lines.push(format!("- Age: {}", or_placeholder(&persona.age, "-")));
    lines.push(format!("- Occupation: {}", or_placeholder(&persona.occupation, "-")));
    lines.push(format!(
        "- Emotional state: {}",
        or_placeholder(&persona.emotional_state, "calm")
    ));
    for note in persona.behavior_notes.iter().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("- {}", note.trim()));
    }
    lines.push(format!(
        "- Refer to yourself as \"{}\" and end sentences politely with \"{}\".",
        honorifics.self_reference, honorifics.particle
    ));
    lines.join("\n")
}

fn scenario_section(case: &CaseProfile) -> String {
    let scenario = &case.scenario;
    let mut lines = vec!["## Scenario and History".to_string()];

    let fields = [
        ("Setting", &scenario.setting),
        ("Chief complaint", &scenario.chief_complaint),
        ("Present illness", &scenario.present_illness),
        ("Past history", &scenario.past_history),
        ("Family history", &scenario.family_history),
        ("Social history", &scenario.social_history),
    ];
    for (label, value) in fields {
        if !value.trim().is_empty() {
            lines.push(format!("- {}: {}", label, value.trim()));
        }
    }
    if !scenario.timeline.is_empty() {
        lines.push("- Timeline:".to_string());
        for event in &scenario.timeline {
            lines.push(format!("  - {}", event.trim()));
        }
    }
    for fact in &scenario.additional_facts {
        lines.push(format!("- {}", fact.trim()));
    }
    if scenario.is_empty() {
        lines.push("- (no further history provided)".to_string());
    }
    lines.join("\n")
}

fn sample_dialogue_section(case: &CaseProfile) -> String {
    let samples: Vec<_> = case
        .sample_dialogues
        .iter()
        .filter(|d| !d.question.trim().is_empty() || !d.answer.trim().is_empty())
        .collect();
    if samples.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "## Sample Dialogue".to_string(),
        "Match the tone and length of these examples:".to_string(),
    ];
    for sample in samples {
        lines.push(format!("Examinee: {}", sample.question.trim()));
        lines.push(format!("You: {}", sample.answer.trim()));
    }
    lines.join("\n")
}

/// Renders the additional-information section for the tracker's live state.
pub fn additional_information_section(tracker: &FallbackQuestionTracker) -> String {
    if tracker.is_empty() {
        return no_fallback_questions_section();
    }
    if tracker.all_asked() {
        return all_questions_asked_section();
    }

    let mut lines = vec![
        ADDITIONAL_INFORMATION_HEADING.to_string(),
        limit_rule(tracker.limit_type()).to_string(),
        "Only ask these when the examinee invites your questions. Each may be asked at most once:"
            .to_string(),
    ];
    for (i, text) in tracker.unasked().texts().iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, text));
    }
    lines.push("- Never ask a question that is not on this list.".to_string());
    lines.join("\n")
}

/// The fixed rendering used once every fallback question has been asked.
pub fn all_questions_asked_section() -> String {
    format!(
        "{heading}\n{marker}\n\
         - Every additional question for this case has already been asked and answered.\n\
         - If the examinee asks whether you have more questions or concerns, answer: \"{reply}\"\n\
         - Do not invent new questions and do not repeat earlier ones.",
        heading = ADDITIONAL_INFORMATION_HEADING,
        marker = ALL_QUESTIONS_ASKED_MARKER,
        reply = NO_MORE_QUESTIONS_REPLY,
    )
}

fn no_fallback_questions_section() -> String {
    format!(
        "{heading}\n{marker}\n\
         - If the examinee asks whether you have any questions, answer: \"{reply}\"\n\
         - Do not invent questions of your own.",
        heading = ADDITIONAL_INFORMATION_HEADING,
        marker = NO_FALLBACK_QUESTIONS_MARKER,
        reply = NO_MORE_QUESTIONS_REPLY,
    )
}

fn limit_rule(limit_type: QuestionLimitType) -> &'static str {
    match limit_type {
        QuestionLimitType::Multiple => {
            "- When invited, you may ask several of the questions below in one reply."
        }
        QuestionLimitType::Single | QuestionLimitType::Unset => {
            "- When invited, you may ask only one of the questions below per reply."
        }
    }
}

/// In-character apology returned when a reply could not be generated.
pub fn apology_reply(case: &CaseProfile) -> &'static str {
    let persona = &case.simulator;
    let honorifics = Honorifics::for_speaker(&persona.sex, &persona.relationship, case.persona_kind);
    if honorifics.particle == "ค่ะ" {
        "ขอโทษค่ะ เมื่อกี้ไม่ทันได้ยิน ช่วยถามอีกครั้งได้ไหมคะ"
    } else {
        "ขอโทษครับ เมื่อกี้ไม่ทันได้ยิน ช่วยถามอีกครั้งได้ไหมครับ"
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder
    } else {
        trimmed
    }
}

/// Thai self-reference and polite particle for the speaker.
struct Honorifics {
    self_reference: &'static str,
    particle: &'static str,
}

impl Honorifics {
    fn for_speaker(sex: &str, relationship: &str, persona_kind: PersonaKind) -> Self {
        let sex = sex.trim().to_lowercase();
        let relationship = relationship.trim().to_lowercase();
        let female = sex.starts_with('f') || sex.contains("หญิง")
            || relationship.contains("แม่")
            || relationship.contains("มารดา")
            || relationship.contains("mother");

        let self_reference = match persona_kind {
            PersonaKind::Guardian if relationship.contains("แม่")
                || relationship.contains("มารดา")
                || relationship.contains("mother") =>
            {
                "แม่"
            }
            PersonaKind::Guardian if relationship.contains("พ่อ")
                || relationship.contains("บิดา")
                || relationship.contains("father") =>
            {
                "พ่อ"
            }
            _ if female => "ดิฉัน",
            _ => "ผม",
        };

        Self {
            self_reference,
            particle: if female { "ค่ะ" } else { "ครับ" },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::{PatientDetails, SampleDialogue, Scenario};
    use crate::domain::foundation::CaseId;
    use proptest::prelude::*;

    fn guardian_case() -> CaseProfile {
        let mut case = CaseProfile::new(CaseId::new("peds-fever-01").unwrap(), PersonaKind::Guardian, "คุณมาลี")
            .with_patient(PatientDetails {
                name: "น้องบี".to_string(),
                age: "3 ปี".to_string(),
                sex: "ชาย".to_string(),
            })
            .with_scenario(Scenario {
                chief_complaint: "ไข้สูง 2 วัน".to_string(),
                timeline: vec!["วันแรก ไข้ 38.5".to_string()],
                ..Scenario::default()
            })
            .with_fallback_questions(QuestionLimitType::Single, ["ลูกจะเป็นอะไรมากมั๊ยคะ"]);
        case.simulator.relationship = "มารดา".to_string();
        case.sample_dialogues.push(SampleDialogue {
            question: "น้องเป็นอะไรมาครับ".to_string(),
            answer: "ลูกไข้สูงค่ะ".to_string(),
        });
        case
    }

    mod sections {
        use super::*;

        #[test]
        fn renders_sections_in_fixed_order() {
            let case = guardian_case();
            let tracker = FallbackQuestionTracker::from_case(&case);
            let prompt = PromptBuilder::build(&case, &tracker, PersonaKind::Guardian);

            let order = [
                PROMPT_HEADING,
                "## Response Rules",
                "## Your Identity",
                "## Scenario and History",
                "## Sample Dialogue",
                ADDITIONAL_INFORMATION_HEADING,
            ];
            let positions: Vec<usize> = order.iter().map(|h| prompt.find(h).unwrap()).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
            assert!(PromptBuilder::is_role_play_prompt(&prompt));
        }

        #[test]
        fn rules_state_language_and_length_constraints() {
            let prompt = PromptBuilder::build(
                &guardian_case(),
                &FallbackQuestionTracker::empty(),
                PersonaKind::Guardian,
            );
            assert!(prompt.contains("Reply in Thai only"));
            assert!(prompt.contains("at most 2-3 sentences"));
            assert!(prompt.contains("Never give medical advice"));
        }

        #[test]
        fn missing_optional_fields_render_placeholders() {
            let case = CaseProfile::new(CaseId::new("bare").unwrap(), PersonaKind::Patient, "นายสมชาย");
            let prompt = PromptBuilder::build(
                &case,
                &FallbackQuestionTracker::empty(),
                PersonaKind::Patient,
            );
            assert!(prompt.contains("(no further history provided)"));
            assert!(!prompt.contains("## Sample Dialogue"));
        }
    }

    mod persona {
        use super::*;

        #[test]
        fn guardian_identity_names_patient_and_uses_mother_self_reference() {
            let case = guardian_case();
            let prompt = PromptBuilder::build(&case, &FallbackQuestionTracker::empty(), PersonaKind::Guardian);
            assert!(prompt.contains("the มารดา of the patient"));
            assert!(prompt.contains("Patient: น้องบี"));
            assert!(prompt.contains("\"แม่\""));
            assert!(prompt.contains("\"ค่ะ\""));
        }

        #[test]
        fn apology_follows_speaker_particle() {
            assert!(apology_reply(&guardian_case()).contains("ค่ะ"));
            let case = CaseProfile::new(CaseId::new("c").unwrap(), PersonaKind::Patient, "นายสมชาย");
            assert!(apology_reply(&case).contains("ครับ"));
        }

        #[test]
        fn patient_identity_speaks_in_first_person() {
            let mut case = CaseProfile::new(CaseId::new("c").unwrap(), PersonaKind::Patient, "นายสมชาย");
            case.simulator.sex = "male".to_string();
            let prompt = PromptBuilder::build(&case, &FallbackQuestionTracker::empty(), PersonaKind::Patient);
            assert!(prompt.contains("You are นายสมชาย, the patient."));
            assert!(prompt.contains("\"ผม\""));
            assert!(prompt.contains("\"ครับ\""));
        }
    }

    mod additional_information {
        use super::*;
        use std::collections::BTreeSet;

        #[test]
        fn empty_tracker_renders_no_questions_marker() {
            let section = additional_information_section(&FallbackQuestionTracker::empty());
            assert!(section.contains(NO_FALLBACK_QUESTIONS_MARKER));
            assert!(!section.contains(ALL_QUESTIONS_ASKED_MARKER));
        }

        #[test]
        fn limit_rule_follows_limit_type() {
            let single = FallbackQuestionTracker::new(QuestionLimitType::Single, ["a"]);
            let multiple = FallbackQuestionTracker::new(QuestionLimitType::Multiple, ["a"]);
            assert!(additional_information_section(&single).contains("only one"));
            assert!(additional_information_section(&multiple).contains("several"));
        }

        #[test]
        fn asked_questions_disappear_from_prompt() {
            let case = guardian_case();
            let mut tracker =
                FallbackQuestionTracker::new(QuestionLimitType::Multiple, ["คำถามหนึ่ง", "คำถามสอง"]);
            tracker.mark_asked(0);
            let prompt = PromptBuilder::build(&case, &tracker, PersonaKind::Guardian);

            assert!(!prompt.contains("คำถามหนึ่ง"));
            assert!(prompt.contains("1. คำถามสอง"));
        }

        #[test]
        fn all_asked_renders_exact_terminal_section() {
            let case = guardian_case();
            let mut tracker = FallbackQuestionTracker::from_case(&case);
            let unasked = tracker.unasked();
            tracker.apply_matches(&unasked, &BTreeSet::from([1]));

            assert_eq!(
                additional_information_section(&tracker),
                all_questions_asked_section()
            );
            let prompt = PromptBuilder::build(&case, &tracker, PersonaKind::Guardian);
            assert!(prompt.ends_with(&all_questions_asked_section()));
            assert!(prompt.contains(NO_MORE_QUESTIONS_REPLY));
            assert!(!prompt.contains("ลูกจะเป็นอะไรมากมั๊ยคะ"));
        }
    }

    proptest! {
        #[test]
        fn prop_prompt_lists_exactly_the_unasked_questions(
            asked in proptest::collection::vec(any::<bool>(), 1..8)
        ) {
            let texts: Vec<String> = (0..asked.len()).map(|i| format!("fallback-question-{:02}", i)).collect();
            let mut tracker = FallbackQuestionTracker::new(QuestionLimitType::Multiple, texts.clone());
            for (i, flag) in asked.iter().enumerate() {
                if *flag {
                    tracker.mark_asked(i);
                }
            }
            let case = CaseProfile::new(CaseId::new("p").unwrap(), PersonaKind::Patient, "A");
            let prompt = PromptBuilder::build(&case, &tracker, PersonaKind::Patient);

            for (text, flag) in texts.iter().zip(asked.iter()) {
                prop_assert_eq!(prompt.contains(text.as_str()), !*flag);
            }
        }
    }
}
