//! Question-status classification: instruction text and response parsing.
//!
//! The classifier decides which still-unasked fallback questions a single
//! examinee utterance addresses. Only direct topic equality counts.

use std::collections::BTreeSet;

/// The strictness rule given to the classification model.
pub const DIRECT_TOPIC_MATCH_RULE: &str = "Classify by direct topic match only. \
A question counts as addressed only if the utterance asks about exactly the same topic. \
Do not infer or imply relevance: a general history-taking question does not address a specific \
fallback topic, and a question about treatment does not address a question about symptoms.";

/// System instruction for the classification call.
pub fn classification_instruction() -> String {
    format!(
        "You check which of a simulated patient's pending questions have already been \
         addressed by the examinee.\n\n{}\n\n\
         Respond with a JSON array of the 1-based numbers of the addressed questions, \
         for example [1] or [1, 3]. Respond with [] if none are addressed. \
         Output the array only.",
        DIRECT_TOPIC_MATCH_RULE
    )
}

/// User message for the classification call.
pub fn classification_request(utterance: &str, unasked: &[String]) -> String {
    let mut text = format!("Examinee utterance:\n{}\n\nPending questions:\n", utterance.trim());
    for (i, question) in unasked.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, question));
    }
    text
}

/// Result of parsing a classifier response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMatches {
    /// Valid 1-based indices.
    pub matches: BTreeSet<usize>,
    /// Entries that were present but not usable.
    pub dropped: Vec<String>,
    /// False when the response was not a JSON array at all.
    pub well_formed: bool,
}

/// Parses a classifier response against an unasked list of `unasked_len`.
///
/// Tolerates a surrounding code fence. Anything that is not a JSON array
/// yields no matches; out-of-range and non-integer entries are dropped.
pub fn parse_matches(raw: &str, unasked_len: usize) -> ParsedMatches {
    let body = strip_code_fence(raw);
    let values = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(values)) => values,
        _ => return ParsedMatches::default(),
    };

    let mut parsed = ParsedMatches {
        well_formed: true,
        ..ParsedMatches::default()
    };
    for value in values {
        match value.as_u64().map(|n| n as usize) {
            Some(index) if (1..=unasked_len).contains(&index) => {
                parsed.matches.insert(index);
            }
            _ => parsed.dropped.push(value.to_string()),
        }
    }
    parsed
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

const STOP_WORDS: &[&str] = &[
    "ไหม", "มั้ย", "มั๊ย", "หรือ", "อะไร", "ครับ", "ค่ะ", "คะ", "จะ", "ได้", "ไม่", "the", "and",
    "what", "does", "have", "with",
];

/// Last-resort keyword matcher: a question matches when one of its words
/// of at least three characters appears in the utterance.
///
/// Words are split on whitespace and ASCII punctuation only. Thai is written
/// without spaces between words, so an unspaced Thai question is one long
/// "word" that matches only when the utterance contains it verbatim. Useful
/// mainly for English or space-separated questions.
///
/// Prone to false positives and disabled unless configured.
pub fn keyword_overlap_matches(utterance: &str, unasked: &[String]) -> BTreeSet<usize> {
    let utterance = utterance.to_lowercase();
    unasked
        .iter()
        .enumerate()
        .filter(|(_, question)| {
            keywords(question).any(|word| utterance.contains(word.as_str()))
        })
        .map(|(i, _)| i + 1)
        .collect()
}

fn keywords(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= 3 && !STOP_WORDS.contains(&word.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod instruction {
        use super::*;

        #[test]
        fn instruction_embeds_direct_topic_rule_verbatim() {
            assert!(classification_instruction().contains(DIRECT_TOPIC_MATCH_RULE));
            assert!(DIRECT_TOPIC_MATCH_RULE.contains("direct topic match only"));
        }

        #[test]
        fn request_enumerates_questions_from_one() {
            let request = classification_request(
                " อาการเป็นมาตั้งแต่เมื่อไหร่ครับ ",
                &["ลูกจะเป็นอะไรมากมั๊ยคะ".to_string()],
            );
            assert!(request.contains("อาการเป็นมาตั้งแต่เมื่อไหร่ครับ\n"));
            assert!(request.contains("1. ลูกจะเป็นอะไรมากมั๊ยคะ"));
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn parses_plain_array() {
            let parsed = parse_matches("[1, 3]", 3);
            assert_eq!(parsed.matches, BTreeSet::from([1, 3]));
            assert!(parsed.well_formed);
        }

        #[test]
        fn parses_fenced_array() {
            let parsed = parse_matches("```json\n[2]\n```", 2);
            assert_eq!(parsed.matches, BTreeSet::from([2]));
        }

        #[test]
        fn drops_out_of_range_and_non_integer_entries() {
            let parsed = parse_matches("[0, 1, 5, \"2\", 1.5, -1]", 2);
            assert_eq!(parsed.matches, BTreeSet::from([1]));
            assert_eq!(parsed.dropped.len(), 5);
        }

        #[test]
        fn malformed_response_yields_no_matches() {
            for raw in ["", "none", "{\"matches\":[1]}", "[1,", "1"] {
                let parsed = parse_matches(raw, 3);
                assert!(parsed.matches.is_empty(), "raw = {raw:?}");
                assert!(!parsed.well_formed);
            }
        }

        #[test]
        fn empty_array_is_well_formed() {
            let parsed = parse_matches("[]", 1);
            assert!(parsed.matches.is_empty());
            assert!(parsed.well_formed);
        }
    }

    mod keyword_fallback {
        use super::*;

        #[test]
        fn matches_on_shared_keyword() {
            let unasked = vec!["Will she need surgery?".to_string()];
            let matches = keyword_overlap_matches("Is surgery likely?", &unasked);
            assert_eq!(matches, BTreeSet::from([1]));
        }

        #[test]
        fn ignores_short_and_common_words() {
            let unasked = vec!["What is it?".to_string()];
            assert!(keyword_overlap_matches("what is that", &unasked).is_empty());
        }

        #[test]
        fn unspaced_thai_question_needs_verbatim_text() {
            let unasked = vec!["ลูกจะเป็นอะไรมากมั๊ยคะ".to_string()];
            assert!(keyword_overlap_matches("ลูกจะเป็นอะไรมากไหม", &unasked).is_empty());
            assert_eq!(
                keyword_overlap_matches("แล้วลูกจะเป็นอะไรมากมั๊ยคะ", &unasked),
                BTreeSet::from([1])
            );
        }

        #[test]
        fn spaced_thai_question_matches_on_shared_word() {
            let unasked = vec!["ต้อง นอนโรงพยาบาล ไหมคะ".to_string()];
            let matches = keyword_overlap_matches("ต้องนอนโรงพยาบาลหรือเปล่า", &unasked);
            assert_eq!(matches, BTreeSet::from([1]));
        }
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics_and_stays_in_range(raw in ".*", len in 0usize..10) {
            let parsed = parse_matches(&raw, len);
            prop_assert!(parsed.matches.iter().all(|i| (1..=len).contains(i)));
        }
    }
}
