//! Quiz records: extraction from free-form model output, validation, and
//! mapping of learner input onto the quiz options.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{error, warn};

/// Fenced markdown block with an optional `json` tag.
static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*\n?(.*?)\n?```").expect("code block pattern is valid")
});

/// Widest `{...}` span, across newlines.
static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"));

/// One validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    /// Always one of `options`.
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Quiz fields as the model sent them, before any validation.
///
/// Every field is loosely typed so a wrong type is reported per field
/// instead of failing the whole document. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RawQuiz {
    question: Option<Value>,
    options: Option<Value>,
    correct_answer: Option<Value>,
    explanation: Option<Value>,
}

impl QuizItem {
    /// Case-insensitive comparison against the correct answer.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer.to_lowercase() == self.correct_answer.to_lowercase()
    }
}

/// Picks the JSON candidate out of a raw model reply.
///
/// Tries the last fenced block, then the widest brace span, then the whole
/// trimmed reply.
pub fn extract_json_candidate(raw: &str) -> &str {
    let cleaned = raw.trim();

    if let Some(block) = CODE_BLOCK
        .captures_iter(cleaned)
        .last()
        .and_then(|caps| caps.get(1))
    {
        return block.as_str().trim();
    }

    match BRACE_SPAN.find(cleaned) {
        Some(span) => span.as_str().trim(),
        None => cleaned,
    }
}

/// Parses and validates a quiz from a raw model reply.
///
/// Returns `None` (with the reason logged) for anything that cannot be shown
/// as a question. A `correct_answer` missing from `options` is repaired to the
/// first option instead of rejected.
pub fn parse_quiz(raw: &str) -> Option<QuizItem> {
    if raw.is_empty() {
        return None;
    }

    let candidate = extract_json_candidate(raw);
    let data: Value = match serde_json::from_str(candidate) {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, payload = raw, "Quiz JSON parsing failed");
            return None;
        }
    };

    if !data.is_object() {
        error!(payload = %data, "Quiz JSON is not an object");
        return None;
    }
    let payload = data.to_string();
    let fields: RawQuiz = match serde_json::from_value(data) {
        Ok(fields) => fields,
        Err(e) => {
            error!(error = %e, %payload, "Quiz JSON has an unexpected shape");
            return None;
        }
    };

    let Some(question) = fields.question.and_then(non_empty_str) else {
        error!(%payload, "Quiz JSON missing or invalid 'question' field");
        return None;
    };

    let Some(Value::Array(options)) = fields.options else {
        error!(%payload, "Quiz JSON missing or invalid 'options' field");
        return None;
    };
    if options.len() < 2 {
        error!(%payload, "Quiz JSON 'options' must have at least 2 items");
        return None;
    }
    let Some(options) = options
        .into_iter()
        .map(non_empty_str)
        .collect::<Option<Vec<_>>>()
    else {
        error!(%payload, "Quiz JSON 'options' must all be non-empty strings");
        return None;
    };

    let Some(mut correct_answer) = fields.correct_answer.and_then(non_empty_str) else {
        error!(%payload, "Quiz JSON missing or invalid 'correct_answer' field");
        return None;
    };

    let explanation = match fields.explanation {
        Some(Value::String(text)) => Some(text),
        _ => None,
    };

    if !options.contains(&correct_answer) {
        warn!(
            answer = %correct_answer,
            "Correct answer not found in options. Using first option as fallback."
        );
        correct_answer = options[0].clone();
    }

    Some(QuizItem {
        question,
        options,
        correct_answer,
        explanation,
    })
}

fn non_empty_str(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// True when `input` is non-empty and made only of ASCII digits.
pub(crate) fn is_all_digits(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

/// Resolves a 1-based option number, if it is in range.
pub(crate) fn option_at<'a>(input: &str, options: &'a [String]) -> Option<&'a String> {
    let index: usize = input.parse().ok()?;
    index.checked_sub(1).and_then(|i| options.get(i))
}

/// Maps raw learner input onto one of `options`.
///
/// Digits select by 1-based index; other text selects the first option it is
/// a case-insensitive prefix of. Anything unmatched is returned unchanged.
pub fn normalize_answer(user_input: &str, options: &[String]) -> Option<String> {
    if user_input.is_empty() {
        return None;
    }

    if is_all_digits(user_input) {
        if let Some(option) = option_at(user_input, options) {
            return Some(option.clone());
        }
    }

    let needle = user_input.to_lowercase();
    let matched = options
        .iter()
        .find(|option| option.to_lowercase().starts_with(&needle));

    Some(matched.cloned().unwrap_or_else(|| user_input.to_string()))
}
