use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use ragchat::app::App;
use ragchat::tui::{self, EventHandler, Tui};
use ragchat::{handler, logging, ui};
use ragchat::{ChatClient, Config, Document};

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Chat with your documents through a retrieval-augmented answering service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Base address of the answering service
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Collapse rapid submissions into one request
    #[arg(long, global = true)]
    debounce: bool,

    /// Send the whole conversation with each question
    #[arg(long, global = true)]
    history: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Upload a document to the service
    Upload {
        /// File to upload (.pdf, .doc, .docx, .txt)
        file: PathBuf,
    },
    /// Check whether the service is up
    Health,
    /// Remember a service address for future runs
    SetUrl {
        url: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|_| Config::new()),
    };

    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if cli.debounce {
        config.debounce = true;
    }
    if cli.history {
        config.send_history = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Err(err) = logging::init(config.log_level.as_deref()) {
        eprintln!("{}: {}", "Logging disabled".yellow(), err);
    }
    tracing::info!(base_url = %config.base_url, debounce = config.debounce, "starting");

    match cli.command {
        None => run_tui(&config).await?,
        Some(Commands::Ask { question }) => ask(&config, &question).await?,
        Some(Commands::Upload { file }) => upload(&config, file).await?,
        Some(Commands::Health) => health(&config).await?,
        Some(Commands::SetUrl { url }) => {
            match &cli.config {
                Some(path) => {
                    let mut file_config = Config::load_from(path)?;
                    file_config.base_url = url.clone();
                    file_config.save_to(path)?;
                }
                None => Config::save_base_url(&url)?,
            }
            println!("Service address set to {}", url.bold());
        }
    }

    Ok(())
}

async fn run_tui(config: &Config) -> Result<()> {
    let (mut app, session_rx) = App::new(config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(tui::TICK_RATE, session_rx);
    app.spawn_health_probe(events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

/// Redraw after every event, so each transcript mutation is shown.
async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn client_for(config: &Config) -> ChatClient {
    ChatClient::new(&config.base_url).with_options(config.chat_options())
}

async fn ask(config: &Config, question: &str) -> Result<()> {
    let client = client_for(config);

    println!("🤖 Asking {}...\n", client.base_url().bold().magenta());

    match client.submit_query(question).await {
        Ok(reply) => {
            println!("{}", "Answer:".bold().green());
            println!("{}", reply.answer);

            if !reply.sources.is_empty() {
                println!("\n{}", "Sources:".bold().blue());
                for source in reply.sources {
                    println!(
                        "• {} {}",
                        source.filename.yellow(),
                        format!("({:.2})", source.score).dimmed()
                    );
                }
            }
        }
        Err(e) => {
            tracing::warn!(%e, "one-shot question failed");
            println!("{}: {}", "Error querying service".red(), e);
            println!("Make sure the service is running at {}", client.base_url().bold());
        }
    }

    Ok(())
}

async fn upload(config: &Config, file: PathBuf) -> Result<()> {
    let client = client_for(config);
    let document = Document::read(&file).await?;
    let filename = document.filename.clone();

    if !document.has_suggested_extension() {
        println!(
            "⚠️  {} is not a .pdf, .doc, .docx or .txt file; sending it anyway",
            filename.yellow()
        );
    }

    match client.upload_document(document).await {
        Ok(result) => {
            println!("✅ Processed file: {}", filename.bold());
            println!(
                "{} text fragments extracted.",
                result.document_count.to_string().bold().green()
            );
        }
        Err(e) => {
            tracing::warn!(%e, %filename, "one-shot upload failed");
            println!("❌ {}: {}", "Error processing the file".red(), e);
        }
    }

    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let client = client_for(config);

    match client.health().await {
        Ok(true) => println!("{} {}", "●".green(), format!("{} is healthy", client.base_url())),
        Ok(false) => println!("{} {}", "●".yellow(), format!("{} answered but is not healthy", client.base_url())),
        Err(e) => {
            println!("{} {}: {}", "●".red(), "Service unreachable".red(), e);
            println!("Check the address with {}", "--base-url".bold());
        }
    }

    Ok(())
}
