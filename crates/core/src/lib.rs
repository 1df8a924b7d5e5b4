pub mod agent;
pub mod console;
pub mod input;
pub mod llm_client;
pub mod memory;
pub mod prompts;
pub mod quiz;
pub mod search;
pub mod session;

pub use session::{SessionError, SessionSettings, SessionSummary, StudyBuddy};
