//! CLI tool for summarizing and reviewing PowerPoint decks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deck_azure::config::DEBUG_MODE_VAR;
use deck_azure::{AzureConfig, AzureOpenAiClient};
use deck_core::{AnalysisSession, ContextField, DeckSummarizer, Error, Gateway, ReportFormatter};
use deck_pptx::PptxParser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Summarize PowerPoint decks and get design suggestions from Azure OpenAI.
#[derive(Parser, Debug)]
#[command(name = "deck-assist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print extracted slide text and notes (no model calls)
    Slides {
        /// Input PowerPoint file (.pptx)
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze a deck and print the report
    Analyze {
        /// Input PowerPoint file (.pptx)
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Include each slide's raw text in the report
        #[arg(long)]
        raw: bool,
    },

    /// Analyze a deck and generate a visual concept for one slide
    Visual {
        /// Input PowerPoint file (.pptx)
        file: PathBuf,

        /// Slide number (1-based)
        #[arg(short, long)]
        slide: usize,
    },

    /// Analyze a deck, then answer questions about it interactively
    Chat {
        /// Input PowerPoint file (.pptx)
        file: PathBuf,
    },

    /// Check the connection to the configured Azure OpenAI resource
    Check,
}

/// One line typed at the chat prompt.
#[derive(Debug, PartialEq)]
enum ChatLine<'a> {
    Question(&'a str),
    Visual(usize),
    Fill(ContextField, &'a str),
    Reanalyze,
    Quit,
    Empty,
    Invalid(String),
}

impl<'a> ChatLine<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatLine::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ChatLine::Question(line);
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "exit" => ChatLine::Quit,
            "reanalyze" => ChatLine::Reanalyze,
            "topic" | "region" if arg.is_empty() => {
                ChatLine::Invalid(format!("/{name} needs a value"))
            }
            "topic" => ChatLine::Fill(ContextField::Topic, arg),
            "region" => ChatLine::Fill(ContextField::Region, arg),
            "visual" => match arg.parse::<usize>() {
                Ok(n) if n > 0 => ChatLine::Visual(n),
                _ => ChatLine::Invalid("usage: /visual <slide number>".to_string()),
            },
            _ => ChatLine::Invalid(format!("unknown command /{name}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let debug_mode = std::env::var(DEBUG_MODE_VAR).is_ok_and(|v| v.trim().eq_ignore_ascii_case("true"));
    let filter = if cli.verbose || debug_mode { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Command::Slides { file, json } => print_slides(&file, json),
        Command::Analyze { file, json, raw } => analyze(&file, json, raw).await,
        Command::Visual { file, slide } => visual(&file, slide).await,
        Command::Chat { file } => chat(&file).await,
        Command::Check => check().await,
    }
}

/// Read a deck from disk into a fresh session.
fn open_deck(path: &Path) -> Result<AnalysisSession> {
    let data = std::fs::read(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    if !deck_pptx::is_pptx(&data, filename) {
        return Err(Error::UnsupportedFormat(filename.to_string()).into());
    }

    let mut session = AnalysisSession::new();
    let slides = session
        .open_file(filename, &data, &PptxParser::new())
        .with_context(|| format!("Failed to read {}", path.display()))?;
    log::info!("Found {} slides in {}", slides.len(), filename);
    Ok(session)
}

/// Build the summarizer on top of the configured Azure resource.
fn connect() -> Result<(AzureConfig, DeckSummarizer)> {
    let config = AzureConfig::from_env()?;
    let client = Arc::new(AzureOpenAiClient::new(&config)?);

    let mut gateway = Gateway::new(client.clone());
    if config.image_deployment.is_some() {
        gateway = gateway.with_image_backend(client);
    } else {
        log::debug!("No image deployment configured; visuals will be prompt-only");
    }
    Ok((config, DeckSummarizer::new(gateway)))
}

fn print_slides(path: &Path, json: bool) -> Result<()> {
    let session = open_deck(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(session.slides())?);
    } else {
        print!("{}", ReportFormatter::new().format_slides(session.slides()));
    }
    Ok(())
}

async fn analyze(path: &Path, json: bool, raw: bool) -> Result<()> {
    let mut session = open_deck(path)?;
    let (_, summarizer) = connect()?;

    let analysis = session
        .analyze(&summarizer)
        .await
        .context("Analysis failed")?
        .clone();

    if json {
        let output = serde_json::json!({
            "slides": session.slides(),
            "analysis": analysis,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let formatter = ReportFormatter::new().with_raw_text(raw);
        print!("{}", formatter.format(session.slides(), &analysis));
    }
    Ok(())
}

async fn visual(path: &Path, slide: usize) -> Result<()> {
    let mut session = open_deck(path)?;
    let (_, summarizer) = connect()?;
    session
        .analyze(&summarizer)
        .await
        .context("Analysis failed")?;

    let index = slide_index(slide, session.slides().len())?;
    let concept = session.generate_visual(index, &summarizer).await?;
    print!("{}", ReportFormatter::new().format_visual(slide, concept));
    Ok(())
}

/// Convert a 1-based slide number into an index.
fn slide_index(slide: usize, count: usize) -> Result<usize> {
    match slide.checked_sub(1) {
        Some(index) if index < count => Ok(index),
        _ => bail!(Error::SlideOutOfRange {
            slide,
            count
        }),
    }
}

async fn chat(path: &Path) -> Result<()> {
    let mut session = open_deck(path)?;
    let (_, summarizer) = connect()?;
    let formatter = ReportFormatter::new();

    let analysis = session
        .analyze(&summarizer)
        .await
        .context("Analysis failed")?
        .clone();
    print!("{}", formatter.format(session.slides(), &analysis));
    println!();
    println!("Ask a question about the deck, or /visual N, /topic TEXT, /region TEXT, /reanalyze, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatLine::parse(&line) {
            ChatLine::Empty => {}
            ChatLine::Quit => break,
            ChatLine::Invalid(message) => eprintln!("{message}"),
            ChatLine::Question(question) => match session.ask(question, &summarizer).await {
                Ok(answer) => println!("{answer}"),
                Err(e) => eprintln!("Error: {e}"),
            },
            ChatLine::Visual(slide) => {
                let index = match slide_index(slide, session.slides().len()) {
                    Ok(index) => index,
                    Err(e) => {
                        eprintln!("{e}");
                        continue;
                    }
                };
                match session.generate_visual(index, &summarizer).await {
                    Ok(concept) => print!("{}", formatter.format_visual(slide, concept)),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            ChatLine::Fill(field, value) => match session.fill_context(field, value) {
                Ok(true) => {
                    if let Some(analysis) = session.analysis() {
                        println!("{}", formatter.format_context(&analysis.context));
                    }
                }
                Ok(false) => eprintln!("Only fields still marked Unknown can be filled in"),
                Err(e) => eprintln!("Error: {e}"),
            },
            ChatLine::Reanalyze => match session.reanalyze(&summarizer).await {
                Ok(analysis) => {
                    let analysis = analysis.clone();
                    print!("{}", formatter.format(session.slides(), &analysis));
                }
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }

    log::info!("Chat ended after {} messages", session.transcript().len());
    Ok(())
}

async fn check() -> Result<()> {
    let config = AzureConfig::from_env()?;
    let client = AzureOpenAiClient::new(&config)?;

    let deployments = client
        .list_deployments()
        .await
        .with_context(|| format!("Could not reach {}", config.base_url()))?;

    println!("Connected to {}", config.base_url());
    if config.debug {
        println!("Model: {}", config.chat_deployment);
        println!("API version: {}", config.api_version);
    }

    for deployment in &deployments {
        match &deployment.model {
            Some(model) => println!("  {} ({})", deployment.id, model),
            None => println!("  {}", deployment.id),
        }
    }
    if !deployments.iter().any(|d| d.id == config.chat_deployment) {
        log::warn!(
            "Chat deployment '{}' not listed on this resource",
            config.chat_deployment
        );
    }
    Ok(())
}
