//! Role Agents
//!
//! A role agent binds a model endpoint, a fixed instruction string and a
//! response format. The three study roles (researcher, quiz master, tutor)
//! differ only in that configuration.

use crate::llm_client::{LLMClient, ResponseFormat};
use crate::prompts::format_agent_prompt;
use std::sync::Arc;
use tracing::error;

pub const RESEARCHER_INSTRUCTIONS: &str = "Aggregate the most important definitions, core principles, \
and real-world examples. Cite search snippets concisely.";

pub const QUIZ_MASTER_INSTRUCTIONS: &str = "Create a single multiple-choice question based on the study note. \
Respond with strict JSON containing keys question, options (list), correct_answer, explanation.";

pub const TUTOR_INSTRUCTIONS: &str = "Evaluate the learner's answer, explain correctness, and add a follow-up tip. \
Encourage active recall and reference the study note when helpful.";

/// Raised when the underlying model call fails for any reason.
#[derive(Debug, thiserror::Error)]
#[error("{agent} agent call failed: {source}")]
pub struct AgentInvocationError {
    pub agent: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// A model endpoint plus role-specific instructions.
#[derive(Clone)]
pub struct RoleAgent {
    name: String,
    instructions: String,
    format: ResponseFormat,
    client: Arc<dyn LLMClient>,
}

impl RoleAgent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        format: ResponseFormat,
        client: Arc<dyn LLMClient>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            format,
            client,
        }
    }

    /// Gathers definitions, principles and examples into a study note.
    pub fn researcher(client: Arc<dyn LLMClient>) -> Self {
        Self::new("Researcher", RESEARCHER_INSTRUCTIONS, ResponseFormat::Text, client)
    }

    /// Writes one multiple-choice question as JSON.
    pub fn quiz_master(client: Arc<dyn LLMClient>) -> Self {
        Self::new("QuizMaster", QUIZ_MASTER_INSTRUCTIONS, ResponseFormat::Json, client)
    }

    /// Grades an answer and explains it.
    pub fn tutor(client: Arc<dyn LLMClient>) -> Self {
        Self::new("Tutor", TUTOR_INSTRUCTIONS, ResponseFormat::Text, client)
    }

    /// Runs the agent once against `context`, with `memory` oldest first.
    ///
    /// The call is never retried. Output is trimmed; an empty reply is
    /// returned as an empty string rather than an error.
    pub async fn run(&self, context: &str, memory: &[String]) -> Result<String, AgentInvocationError> {
        let prompt = format_agent_prompt(&self.name, &self.instructions, context, memory);

        match self.client.generate(prompt, self.format).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => {
                error!(agent = %self.name, error = %e, "Agent call failed");
                Err(AgentInvocationError {
                    agent: self.name.clone(),
                    source: e.into(),
                })
            }
        }
    }
}
