//! Study Session Coordinator
//!
//! Drives one session: research a topic, then for each question generate a
//! quiz, collect the learner's answer and produce tutor feedback. The
//! coordinator owns the only cross-call state, the bounded memory buffer.
//!
//! Failure policies differ per collaborator:
//! - search failures degrade to sentinel text inside [`SearchTool`];
//! - researcher and tutor failures propagate and end the session;
//! - an unparseable quiz ends the session without retrying generation.

use crate::agent::{AgentInvocationError, RoleAgent};
use crate::console::Console;
use crate::input::{LearnerReply, collect_answer};
use crate::llm_client::LLMClient;
use crate::memory::{MemoryBuffer, MemoryKind};
use crate::prompts::{format_quiz_master_prompt, format_researcher_prompt, format_tutor_prompt};
use crate::quiz::{QuizItem, normalize_answer, parse_quiz};
use crate::search::SearchTool;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Tunables the coordinator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub memory_limit: usize,
    pub max_input_retries: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            memory_limit: 10,
            max_input_retries: 3,
        }
    }
}

/// Where the coordinator is in its research → quiz → answer → grading loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Researching,
    QuizPending,
    AwaitingAnswer,
    Grading,
    Done,
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Agent(#[from] AgentInvocationError),
    #[error("Quiz generation failed for question {question}. Aborting session.")]
    QuizGeneration { question: usize },
    #[error("Failed to read learner input: {0}")]
    Io(#[from] io::Error),
}

/// Final tally of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub correct: usize,
    pub total: usize,
    /// The learner quit before every question was asked.
    pub quit_early: bool,
}

impl SessionSummary {
    /// Percentage of `total` answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}% accuracy)",
            self.correct,
            self.total,
            self.accuracy()
        )
    }
}

/// Coordinates the search tool and the three role agents for one learner.
pub struct StudyBuddy {
    settings: SessionSettings,
    memory: MemoryBuffer,
    search_tool: SearchTool,
    researcher: RoleAgent,
    quiz_master: RoleAgent,
    tutor: RoleAgent,
    state: SessionState,
}

impl StudyBuddy {
    pub fn new(settings: SessionSettings, search_tool: SearchTool, client: Arc<dyn LLMClient>) -> Self {
        Self {
            settings,
            memory: MemoryBuffer::new(settings.memory_limit),
            search_tool,
            researcher: RoleAgent::researcher(client.clone()),
            quiz_master: RoleAgent::quiz_master(client.clone()),
            tutor: RoleAgent::tutor(client),
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn memory(&self) -> &MemoryBuffer {
        &self.memory
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }

    /// Runs a full session on `topic` with `questions` quiz rounds.
    ///
    /// The study note is generated once and reused for every question.
    #[instrument(name = "study_session", skip(self, console))]
    pub async fn run(
        &mut self,
        topic: &str,
        questions: usize,
        console: &mut dyn Console,
    ) -> Result<SessionSummary, SessionError> {
        let result = self.drive(topic, questions, console).await;
        match &result {
            Ok(summary) => {
                self.transition(SessionState::Done);
                info!(%summary, "Session complete");
            }
            Err(e) => {
                self.transition(SessionState::Aborted);
                error!(error = %e, "Session aborted");
            }
        }
        result
    }

    async fn drive(
        &mut self,
        topic: &str,
        questions: usize,
        console: &mut dyn Console,
    ) -> Result<SessionSummary, SessionError> {
        self.transition(SessionState::Researching);
        let study_note = self.generate_study_note(topic).await?;
        info!(questions, "Study note ready. Generating quiz questions...");

        let mut summary = SessionSummary {
            correct: 0,
            total: questions,
            quit_early: false,
        };

        for idx in 1..=questions {
            self.transition(SessionState::QuizPending);
            let Some(quiz) = self.generate_quiz(&study_note).await? else {
                return Err(SessionError::QuizGeneration { question: idx });
            };

            self.transition(SessionState::AwaitingAnswer);
            console.print(&render_quiz(&quiz, idx, questions));

            let answer = match collect_answer(console, &quiz.options, self.settings.max_input_retries)? {
                LearnerReply::Quit => {
                    info!(question = idx, "Learner quit");
                    summary.quit_early = true;
                    break;
                }
                LearnerReply::NoAnswer => None,
                LearnerReply::Answer(raw) => normalize_answer(&raw, &quiz.options),
            };

            self.transition(SessionState::Grading);
            let feedback = self
                .grade_and_feedback(&quiz, answer.as_deref(), &study_note)
                .await?;
            console.print(&format!("\nFeedback:\n{}", feedback));

            if answer.as_deref().is_some_and(|a| quiz.is_correct(a)) {
                summary.correct += 1;
            }
        }

        if summary.total > 0 {
            console.print(&format!("\nSession complete. Score: {}.", summary));
        }
        Ok(summary)
    }

    async fn generate_study_note(&mut self, topic: &str) -> Result<String, SessionError> {
        let search_digest = self.search_tool.run(topic).await;
        let context = format_researcher_prompt(topic, &search_digest);

        let note = self.researcher.run(&context, self.memory.entries()).await?;
        self.memory.remember(MemoryKind::StudyNote, &note);
        Ok(note)
    }

    async fn generate_quiz(&mut self, study_note: &str) -> Result<Option<QuizItem>, SessionError> {
        let context = format_quiz_master_prompt(study_note);

        let raw_response = self.quiz_master.run(&context, self.memory.entries()).await?;
        let quiz = parse_quiz(&raw_response);
        if let Some(quiz) = &quiz {
            self.memory.remember(MemoryKind::Quiz, &quiz.question);
        }
        Ok(quiz)
    }

    async fn grade_and_feedback(
        &mut self,
        quiz: &QuizItem,
        user_answer: Option<&str>,
        study_note: &str,
    ) -> Result<String, SessionError> {
        let context = format_tutor_prompt(
            &quiz.question,
            &quiz.options,
            &quiz.correct_answer,
            user_answer,
            study_note,
        );

        let feedback = self.tutor.run(&context, self.memory.entries()).await?;
        self.memory.remember(MemoryKind::Feedback, &feedback);
        Ok(feedback)
    }
}

/// Renders a quiz header, the question and its numbered options.
pub fn render_quiz(quiz: &QuizItem, idx: usize, total: usize) -> String {
    let mut out = format!("\n==== Quiz {} / {} ====\n{}", idx, total, quiz.question);
    for (option_idx, option) in quiz.options.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", option_idx + 1, option));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::llm_client::{MockLLMClient, ResponseFormat};
    use crate::search::{MockSearchProvider, SearchHit, SearchSettings};
    use anyhow::anyhow;
    use mockall::Sequence;

    const QUIZ_JSON: &str =
        r#"{"question": "What gas do plants absorb?", "options": ["Oxygen", "Carbon dioxide", "Nitrogen"], "correct_answer": "Carbon dioxide", "explanation": "CO2 feeds the Calvin cycle."}"#;

    fn search_tool() -> SearchTool {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .returning(|_, _| Ok(vec![SearchHit::new("Leaf", "Leaves are green.")]));
        SearchTool::new(Box::new(provider), SearchSettings::default())
    }

    /// Routes each call to the role named at the top of the prompt.
    fn scripted_client(quiz_reply: &'static str) -> MockLLMClient {
        let mut client = MockLLMClient::new();
        client.expect_generate().returning(move |prompt, format| {
            if prompt.starts_with("You are the Researcher agent.") {
                Ok("Plants turn light into sugar.".to_string())
            } else if prompt.starts_with("You are the QuizMaster agent.") {
                assert_eq!(format, ResponseFormat::Json);
                Ok(quiz_reply.to_string())
            } else {
                Ok("Nice work.".to_string())
            }
        });
        client
    }

    fn buddy(client: MockLLMClient, memory_limit: usize) -> StudyBuddy {
        StudyBuddy::new(
            SessionSettings {
                memory_limit,
                max_input_retries: 3,
            },
            search_tool(),
            Arc::new(client),
        )
    }

    #[test]
    fn test_summary_display() {
        let summary = SessionSummary {
            correct: 2,
            total: 3,
            quit_early: false,
        };
        assert_eq!(summary.to_string(), "2/3 (67% accuracy)");
        let empty = SessionSummary {
            correct: 0,
            total: 0,
            quit_early: false,
        };
        assert_eq!(empty.to_string(), "0/0 (0% accuracy)");
    }

    #[test]
    fn test_render_quiz() {
        let quiz = parse_quiz(QUIZ_JSON).unwrap();
        assert_eq!(
            render_quiz(&quiz, 1, 2),
            "\n==== Quiz 1 / 2 ====\nWhat gas do plants absorb?\n  1. Oxygen\n  2. Carbon dioxide\n  3. Nitrogen"
        );
    }

    #[tokio::test]
    async fn test_session_scores_and_fills_memory_in_order() {
        let mut buddy = buddy(scripted_client(QUIZ_JSON), 10);
        let mut console = ScriptedConsole::new(["carbon", "1"]);

        let summary = buddy.run("Photosynthesis", 2, &mut console).await.unwrap();

        assert_eq!(summary.correct, 1);
        assert_eq!(summary.total, 2);
        assert!(!summary.quit_early);
        assert_eq!(buddy.state(), SessionState::Done);
        assert_eq!(
            buddy.memory().entries(),
            &[
                "StudyNote::Plants turn light into sugar.",
                "Quiz::What gas do plants absorb?",
                "Feedback::Nice work.",
                "Quiz::What gas do plants absorb?",
                "Feedback::Nice work.",
            ]
        );
        assert!(console.transcript().contains("Session complete. Score: 1/2 (50% accuracy)."));
    }

    #[tokio::test]
    async fn test_memory_stays_bounded() {
        let mut buddy = buddy(scripted_client(QUIZ_JSON), 2);
        let mut console = ScriptedConsole::new(["2", "2", "2"]);

        buddy.run("Photosynthesis", 3, &mut console).await.unwrap();

        assert_eq!(
            buddy.memory().entries(),
            &["Quiz::What gas do plants absorb?", "Feedback::Nice work."]
        );
    }

    #[tokio::test]
    async fn test_quit_ends_loop_without_feedback() {
        let mut buddy = buddy(scripted_client(QUIZ_JSON), 10);
        let mut console = ScriptedConsole::new(["q"]);

        let summary = buddy.run("Photosynthesis", 3, &mut console).await.unwrap();

        assert!(summary.quit_early);
        assert_eq!(summary.correct, 0);
        assert_eq!(buddy.memory().len(), 2);
        assert!(console.transcript().contains("Score: 0/3 (0% accuracy)"));
        assert!(!console.transcript().contains("Feedback:"));
    }

    #[tokio::test]
    async fn test_no_answer_still_gets_feedback() {
        let mut client = MockLLMClient::new();
        client.expect_generate().returning(|prompt, _| {
            if prompt.starts_with("You are the Researcher agent.") {
                Ok("note".to_string())
            } else if prompt.starts_with("You are the QuizMaster agent.") {
                Ok(QUIZ_JSON.to_string())
            } else {
                assert!(prompt.contains("Learner Answer: No answer provided"));
                Ok("Try again next time.".to_string())
            }
        });
        let mut buddy = buddy(client, 10);
        let mut console = ScriptedConsole::new(["", "", ""]);

        let summary = buddy.run("Photosynthesis", 1, &mut console).await.unwrap();

        assert_eq!(summary.correct, 0);
        assert!(console.transcript().contains("Feedback:\nTry again next time."));
    }

    #[tokio::test]
    async fn test_unparseable_quiz_aborts_session() {
        let mut buddy = buddy(scripted_client("I cannot write a quiz today."), 10);
        let mut console = ScriptedConsole::new(["1"]);

        let err = buddy.run("Photosynthesis", 2, &mut console).await.unwrap_err();

        assert!(matches!(err, SessionError::QuizGeneration { question: 1 }));
        assert_eq!(buddy.state(), SessionState::Aborted);
        assert!(console.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_researcher_failure_propagates() {
        let mut client = MockLLMClient::new();
        client
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(anyhow!("invalid api key")));
        let mut buddy = buddy(client, 10);
        let mut console = ScriptedConsole::default();

        let err = buddy.run("Photosynthesis", 1, &mut console).await.unwrap_err();

        assert!(matches!(err, SessionError::Agent(ref e) if e.agent == "Researcher"));
        assert!(buddy.memory().is_empty());
    }

    #[tokio::test]
    async fn test_tutor_failure_propagates() {
        let mut seq = Sequence::new();
        let mut client = MockLLMClient::new();
        client
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("note".to_string()));
        client
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(QUIZ_JSON.to_string()));
        client
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow!("service unavailable")));
        let mut buddy = buddy(client, 10);
        let mut console = ScriptedConsole::new(["2"]);

        let err = buddy.run("Photosynthesis", 1, &mut console).await.unwrap_err();

        assert!(matches!(err, SessionError::Agent(ref e) if e.agent == "Tutor"));
        assert_eq!(buddy.state(), SessionState::Aborted);
    }
}
