//! Research Rundown CLI.
//!
//! Turns a research paper into a narrated multi-voice debate: staged
//! analysis through an OpenAI-compatible generation service, robust script
//! synthesis, and audio assembly.

use clap::Parser;
use colored::Colorize;
use rundown_core::{
    Config, GenerationConfig, KokoroVoice, OpenAiGeneration, PipelineConfig, PipelineEvent,
    PipelineOrchestrator, PlainTextSource, RundownError, default_config,
};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rundown",
    version,
    about = "Research Rundown - turn a paper into a narrated AI debate",
    long_about = "Analyzes a research document in two stages, synthesizes a two-debater \
                  script with a narrator, and assembles the narrated audio."
)]
struct Cli {
    /// Path to the source document (plain text)
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    /// Maximum number of discussion topics
    #[arg(short = 't', long, default_value = "3", value_name = "N")]
    max_topics: usize,

    /// Exchanges per topic
    #[arg(short = 'e', long, default_value = "4", value_name = "N")]
    exchanges_per_topic: usize,

    /// Output directory for intermediate state and audio
    #[arg(short, long, default_value = "data/output", value_name = "DIR")]
    output_dir: PathBuf,

    /// Model name for the generation service
    #[arg(short, long, default_value = "llama3.1:8b", value_name = "MODEL")]
    model: String,

    /// OpenAI-compatible API base URL (overrides the environment)
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// TOML config file overriding the built-in defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Get API configuration from the flag or environment.
    let api_base = cli.api_base.clone().unwrap_or_else(|| {
        env::var("OPENAI_API_BASE")
            .or_else(|_| env::var("OPENAI_BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:11434/v1".to_string())
    });

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let max_topics = cli.max_topics.max(1);
    let exchanges_per_topic = cli.exchanges_per_topic.max(1);
    if max_topics != cli.max_topics || exchanges_per_topic != cli.exchanges_per_topic {
        eprintln!(
            "{}",
            "Warning: topics and exchanges must be at least 1; adjusted.".yellow()
        );
    }

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        },
        None => default_config(),
    };

    // Print header.
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - AI research debate generator", "Research Rundown".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!(
        "{} {}",
        "Document:".bold(),
        cli.document.display().to_string().bright_white()
    );
    println!(
        "{} {} topics x {} exchanges",
        "Plan:".bold(),
        max_topics,
        exchanges_per_topic
    );
    println!();
    println!("{}", "Speakers:".bold());
    println!(
        "  1. {} ({})",
        config.personalities.optimist.name.bright_cyan(),
        config.personalities.optimist.role.yellow()
    );
    println!(
        "  2. {} ({})",
        config.personalities.skeptic.name.bright_cyan(),
        config.personalities.skeptic.role.yellow()
    );
    println!("  3. {} ({})", "Narrator".bright_cyan(), "Host".yellow());
    println!();
    println!("{}", "─".repeat(70).dimmed());

    let generation =
        OpenAiGeneration::new(GenerationConfig::new(api_base, api_key, cli.model.clone()));

    // Voice engine init downloads the model on first run; its absence is
    // fatal only here, where it is actually needed.
    let mut voice = match KokoroVoice::new().await {
        Ok(voice) => voice,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let source = PlainTextSource;
    let pipeline = PipelineConfig {
        max_topics,
        exchanges_per_topic,
        output_dir: cli.output_dir.clone(),
    };

    let mut orchestrator =
        PipelineOrchestrator::new(&source, &generation, &mut voice, &config, pipeline)
            .with_callback(create_console_callback());

    match orchestrator.run(&cli.document).await {
        Ok(artifacts) => {
            println!();
            println!("{}", "═".repeat(70).bright_blue());
            println!("{}", "  Rundown complete.".bright_green().bold());
            println!("{}", "═".repeat(70).bright_blue());
            println!();
            println!(
                "  {} {}",
                "Audio:".bold(),
                artifacts.audio.output_file.bright_white()
            );
            println!(
                "  {} {:.1}s across {} segments ({})",
                "Duration:".bold(),
                artifacts.audio.total_duration,
                artifacts.audio.num_segments,
                artifacts.audio.method
            );
            println!(
                "  {} {} via {} generation, quality {:?}",
                "Script:".bold(),
                format!("{} turns", artifacts.script.turns.len()),
                artifacts.script.method,
                artifacts.script.quality_tier
            );
            println!(
                "  {} {}/20 (ready: {})",
                "Analysis:".bold(),
                artifacts.quality.score,
                artifacts.quality.ready
            );
            println!();
        }
        Err(e) => {
            report_failure(&e);
            std::process::exit(1);
        }
    }
}

/// Print the failing phase and cause. Partial phase state stays in the
/// output directory for post-mortem.
fn report_failure(error: &RundownError) {
    match error {
        RundownError::Phase {
            document,
            phase,
            source,
        } => {
            eprintln!();
            eprintln!(
                "{} phase '{}' failed for document '{}'",
                "Error:".red().bold(),
                phase.bright_white(),
                document.bright_white()
            );
            eprintln!("  {} {}", "Cause:".bold(), source);
        }
        other => {
            eprintln!("{} {}", "Error:".red().bold(), other);
        }
    }
}

/// Create a callback that prints pipeline events to the console.
fn create_console_callback() -> Box<dyn Fn(PipelineEvent) + Send + Sync> {
    Box::new(move |event| match event {
        PipelineEvent::PhaseStart { phase } => {
            println!();
            println!(
                "{} {}",
                "▶".bright_cyan(),
                phase.replace('-', " ").bright_cyan().bold()
            );
        }
        PipelineEvent::PhaseComplete { summary, .. } => {
            println!("  {}", summary.dimmed());
        }
        PipelineEvent::PipelineComplete { .. } => {
            // Summary is printed in main.
        }
    })
}
