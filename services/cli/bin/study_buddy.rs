//! Main Entrypoint for the Study Buddy CLI
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Parsing command-line arguments and resolving the topic.
//! 4. Initializing the model client and the search tool.
//! 5. Running one interactive study session.

use anyhow::{Context, bail};
use async_openai::config::OpenAIConfig;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use study_buddy_cli::{config::Config, console::StdConsole};
use study_buddy_core::{
    StudyBuddy,
    console::Console,
    llm_client::{LLMClient, OpenAICompatibleClient},
    search::{DuckDuckGoSearch, SearchTool},
};
use tracing::info;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the Smart Study Buddy agent.
#[derive(Parser, Debug)]
#[command(name = "study-buddy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Topic to study. If omitted you'll be prompted.
    #[arg(short, long)]
    topic: Option<String>,

    /// Number of quiz questions to generate.
    #[arg(short, long, default_value_t = 1)]
    questions: usize,

    /// How many search results to fetch for grounding context.
    #[arg(long)]
    max_results: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Resolve Arguments ---
    let cli = Cli::parse();
    if let Some(max_results) = cli.max_results {
        config.default_max_results = max_results;
        config.validate().context("Invalid --max-results")?;
    }

    let mut console = StdConsole;
    let topic = match cli.topic {
        Some(topic) => topic.trim().to_string(),
        None => console
            .read_line("Enter a topic to study: ")?
            .unwrap_or_default()
            .trim()
            .to_string(),
    };
    if topic.is_empty() {
        bail!("A topic is required to run the study buddy.");
    }
    let questions = cli.questions.max(1);

    // --- 4. Initialize Services ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.gemini_api_key)
        .with_api_base(&config.api_base);
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.gemini_model.clone(),
    ));

    let search_provider =
        DuckDuckGoSearch::new(SEARCH_TIMEOUT).context("Failed to build search client")?;
    let search_tool = SearchTool::new(Box::new(search_provider), config.search_settings()?);

    info!(
        model = %config.gemini_model,
        %topic,
        questions,
        max_results = config.default_max_results,
        "Service configured. Starting study session..."
    );

    // --- 5. Run Session ---
    let mut buddy = StudyBuddy::new(config.session_settings(), search_tool, llm_client);
    let summary = buddy.run(&topic, questions, &mut console).await?;

    info!(%summary, quit_early = summary.quit_early, "Study session finished.");
    Ok(())
}
