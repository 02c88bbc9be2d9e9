//! Chat with the tutor in the terminal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Start a session with default preferences
//! tutor
//!
//! # Pick preferences up front
//! tutor --set depth="Surface level" --set learning_style=Visual
//!
//! # Show every category and its options
//! tutor --list-options
//! ```
//!
//! Type `/reset` to start over, `/prefs` to show the current selections,
//! `/quit` (or end of input) to leave.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tutor_rs::prelude::*;

/// Chat with the tutor in the terminal.
///
/// Reads the API key from the OPENROUTER_KEY environment variable.
#[derive(Parser)]
#[command(name = "tutor")]
struct Cli {
    /// Path to a tutor configuration JSON file (defaults to the built-in one)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Select a preference, as `category=option`. Repeatable.
    #[arg(long = "set", value_name = "CATEGORY=OPTION")]
    set: Vec<String>,

    /// Print every preference category and its options, then exit
    #[arg(long)]
    list_options: bool,

    // ── Model ──────────────────────────────────────────────────
    /// Model to use for completions
    #[arg(long, default_value = tutor_rs::DEFAULT_MODEL)]
    model: String,

    /// Maximum tokens per LLM response
    #[arg(long, default_value_t = tutor_rs::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Temperature for the stage classifier
    #[arg(long, default_value_t = 0.0)]
    classify_temperature: f32,

    /// Temperature for the tutor's replies
    #[arg(long, default_value_t = 0.9)]
    response_temperature: f32,

    /// Prompt size budget in estimated tokens
    #[arg(long, default_value_t = 12_000)]
    max_prompt_tokens: usize,
}

impl Cli {
    fn settings(&self) -> TutorSettings {
        TutorSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            classify_temperature: self.classify_temperature,
            response_temperature: self.response_temperature,
            max_prompt_tokens: self.max_prompt_tokens,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_options(config: &TutorConfig) {
    for cat in config.personalization.iter() {
        println!("{} ({})", cat.title, cat.id);
        for (i, opt) in cat.options.iter().enumerate() {
            let marker = if i == cat.default_index { "*" } else { " " };
            println!("  {marker} {} -- {}", opt.label, opt.description);
        }
        println!();
    }
}

fn print_preferences(panel: &PreferencePanel) {
    for widget in panel.widgets() {
        eprintln!("  {}: {}", widget.title, widget.selected);
    }
}

/// Apply `--set category=option` flags.
fn apply_selections(panel: &mut PreferencePanel, pairs: &[String]) -> Result<(), String> {
    for pair in pairs {
        let (category, option) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected CATEGORY=OPTION, got '{pair}'"))?;
        panel
            .select(category.trim(), option.trim())
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = TutorConfig::load_or_builtin(cli.config.as_deref()).map_err(|e| e.to_string())?;
    let config = Arc::new(config);

    if cli.list_options {
        print_options(&config);
        return Ok(());
    }

    let mut panel = PreferencePanel::new(config.clone());
    apply_selections(&mut panel, &cli.set)?;

    let settings = cli.settings();
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| "OPENROUTER_KEY environment variable is not set".to_string())?;
    let client = settings.build_client(api_key).map_err(|e| e.to_string())?;

    let agent_name = config.agent.name.clone();
    let mut controller = ConversationController::new(Arc::new(client), config, settings);

    let greeting = controller
        .greet(&panel.snapshot())
        .await
        .map_err(|e| e.to_string())?;
    println!("{agent_name}: {greeting}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("You: ");
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("failed to read stdin: {e}"))?
        else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/prefs" => {
                print_preferences(&panel);
                continue;
            }
            "/reset" => match controller.greet(&panel.snapshot()).await {
                Ok(reply) => {
                    println!("{agent_name}: {reply}\n");
                    continue;
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    continue;
                }
            },
            text => {
                if let Err(e) = controller.submit_user_turn(text) {
                    eprintln!("Error: {e}");
                    continue;
                }
            }
        }

        match controller.advance(&panel.snapshot()).await {
            Ok(reply) => println!("{agent_name}: {reply}\n"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
