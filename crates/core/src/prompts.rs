//! Prompt templates for the three study agents.
//!
//! Pure functions only: each one assembles a single text payload for one
//! agent invocation.

/// Placeholder used in place of an empty session memory.
pub const EMPTY_MEMORY: &str = "None yet.";

/// Placeholder handed to the tutor when the learner gave no answer.
pub const NO_ANSWER: &str = "No answer provided";

/// Wraps role instructions, session memory and the focused input for an agent.
///
/// Memory entries keep buffer order (oldest first).
pub fn format_agent_prompt(
    agent_name: &str,
    instructions: &str,
    context: &str,
    memory: &[String],
) -> String {
    let memory_section = if memory.is_empty() {
        EMPTY_MEMORY.to_string()
    } else {
        memory.join("\n")
    };

    format!(
        "You are the {agent_name} agent.\n\
         Instructions: {instructions}\n\
         \n\
         Session memory (may be empty):\n\
         {memory_section}\n\
         ---\n\
         Focused input:\n\
         {context}\n"
    )
}

pub fn format_researcher_prompt(topic: &str, search_digest: &str) -> String {
    format!(
        "Topic: {topic}\n\
         Use the search digest as factual grounding. Provide:\n\
         - A brief overview\n\
         - 3-5 bullet points of core insights\n\
         - One memorable example or analogy\n\
         \n\
         Search digest:\n\
         {search_digest}\n"
    )
}

pub fn format_quiz_master_prompt(study_note: &str) -> String {
    format!(
        "You must return valid JSON only.\n\
         Study note source:\n\
         {study_note}\n"
    )
}

pub fn format_tutor_prompt(
    question: &str,
    options: &[String],
    correct_answer: &str,
    user_answer: Option<&str>,
    study_note: &str,
) -> String {
    let learner_answer = user_answer.filter(|a| !a.is_empty()).unwrap_or(NO_ANSWER);
    let options = render_options(options);
    format!(
        "Question: {question}\n\
         Options: {options}\n\
         Correct Answer: {correct_answer}\n\
         Learner Answer: {learner_answer}\n\
         Study Note:\n\
         {study_note}\n"
    )
}

/// Renders options as a bracketed list of quoted strings, `['A', 'B']`.
///
/// Single quotes are preferred; an option containing a single quote but no
/// double quote is wrapped in double quotes instead.
fn render_options(options: &[String]) -> String {
    let quoted: Vec<String> = options.iter().map(|option| quote_option(option)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote_option(option: &str) -> String {
    let quote = if option.contains('\'') && !option.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(option.len() + 2);
    out.push(quote);
    for c in option.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
