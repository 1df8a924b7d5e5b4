//! Bounded collection of a learner's answer.

use crate::console::Console;
use crate::quiz::{is_all_digits, option_at};
use std::io;

/// Sentinel that ends the quiz loop early.
pub const QUIT: &str = "q";

/// What the learner gave us for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnerReply {
    /// Raw, trimmed input accepted for grading.
    Answer(String),
    /// Blank input on every attempt; grading proceeds without an answer.
    NoAnswer,
    /// The learner typed the quit sentinel or closed the input.
    Quit,
}

/// Prompts up to `max_retries` times for an answer to a question with `options`.
///
/// Blank input and out-of-range option numbers are re-prompted until the
/// final attempt, which accepts them as "no answer" and a literal text answer
/// respectively. Any other input is accepted immediately.
pub fn collect_answer(
    console: &mut dyn Console,
    options: &[String],
    max_retries: usize,
) -> io::Result<LearnerReply> {
    let max_retries = max_retries.max(1);

    for attempt in 1..=max_retries {
        let is_final = attempt == max_retries;
        let prompt = format!(
            "Your answer (number or text, '{}' to quit) [{}/{}]: ",
            QUIT, attempt, max_retries
        );

        let Some(line) = console.read_line(&prompt)? else {
            return Ok(LearnerReply::Quit);
        };
        let input = line.trim();

        if input.is_empty() {
            if is_final {
                console.print("No answer provided. Moving on to feedback.");
                return Ok(LearnerReply::NoAnswer);
            }
            console.print(&format!("Please provide an answer or '{}' to quit.", QUIT));
            continue;
        }

        if input.eq_ignore_ascii_case(QUIT) {
            return Ok(LearnerReply::Quit);
        }

        if is_all_digits(input) && option_at(input, options).is_none() {
            if is_final {
                console.print(&format!("Invalid number. Using '{}' as text answer.", input));
                return Ok(LearnerReply::Answer(input.to_string()));
            }
            console.print(&format!(
                "Please enter a number between 1 and {}.",
                options.len()
            ));
            continue;
        }

        return Ok(LearnerReply::Answer(input.to_string()));
    }

    Ok(LearnerReply::NoAnswer)
}
