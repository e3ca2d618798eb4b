use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use proofline::editor::correction::apply_all_corrections;
use proofline::render::RenderedDocument;
use proofline::settings::{default_settings_path, load_settings, save_settings};
use proofline::storage::KeyValueStore;
use proofline::terminal::{SharedSnapshot, TerminalCommand, TerminalView, describe_issues};
use proofline::{Checker, EditorController, EditorSettings, LanguageToolClient, init_logging};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Live spelling and grammar checking backed by LanguageTool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PROOFLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Key-value store holding the saved document and theme
    #[arg(long, global = true, env = "PROOFLINE_STORE")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a file (or stdin) once and list the issues
    Check {
        file: Option<PathBuf>,

        /// Print the highlighted markup instead of a list
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Print the issues as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply the first suggestion of every issue
    Fix {
        file: Option<PathBuf>,

        /// Write the corrected text back to FILE instead of printing it
        #[arg(long, requires = "file")]
        write: bool,
    },
    /// Interactive session: typed lines are appended to the document
    Edit,
    /// Update stored settings; the API key goes to the OS keyring when available
    Config {
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_settings_path);
    let settings = load_settings(&config_path)
        .with_context(|| format!("failed to load settings from {}", config_path.display()))?;

    match cli.command {
        Commands::Check { file, html, json } => check(&settings, file.as_deref(), html, json).await,
        Commands::Fix { file, write } => fix(&settings, file.as_deref(), write).await,
        Commands::Edit => {
            let store_path = cli.store.unwrap_or_else(KeyValueStore::default_path);
            edit(settings, KeyValueStore::new(store_path)).await
        }
        Commands::Config {
            endpoint,
            language,
            username,
            api_key,
        } => {
            let mut updated = settings;
            if let Some(endpoint) = endpoint {
                updated.endpoint = endpoint;
            }
            if let Some(language) = language {
                updated.language = language;
            }
            if let Some(username) = username {
                updated.username = username;
            }
            if let Some(api_key) = api_key {
                updated.api_key = api_key;
            }
            save_settings(&config_path, updated)?;
            println!("Settings saved to {}", config_path.display());
            Ok(())
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn check(settings: &EditorSettings, file: Option<&Path>, html: bool, json: bool) -> Result<()> {
    let text = read_input(file)?;
    let client = LanguageToolClient::new(settings.language_tool_config())?;
    let issues = client.check(&text).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else if html {
        println!("{}", RenderedDocument::new(1, &text, &issues).markup);
    } else if issues.is_empty() {
        println!("No issues found.");
    } else {
        for line in describe_issues(&text, &issues) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn fix(settings: &EditorSettings, file: Option<&Path>, write: bool) -> Result<()> {
    let text = read_input(file)?;
    let client = LanguageToolClient::new(settings.language_tool_config())?;
    let issues = client.check(&text).await?;
    let (corrected, applied) = apply_all_corrections(&text, &issues);
    info!(applied, "applied all corrections");

    match file {
        Some(path) if write => std::fs::write(path, &corrected)
            .with_context(|| format!("failed to write {}", path.display()))?,
        _ => print!("{corrected}"),
    }
    Ok(())
}

async fn edit(settings: EditorSettings, store: KeyValueStore) -> Result<()> {
    let checker: Arc<dyn Checker> = Arc::new(LanguageToolClient::new(settings.language_tool_config())?);
    let snapshot = SharedSnapshot::default();
    let view = TerminalView::new(std::io::stdout(), snapshot.clone());
    let export_dir = std::env::current_dir().context("failed to resolve working directory")?;

    let controller = EditorController::new(settings, checker, view)
        .with_store(store)
        .with_export_dir(export_dir);
    let handle = controller.handle();
    let session = tokio::spawn(controller.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match TerminalCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                warn!("{message}");
                continue;
            }
        };

        match command {
            TerminalCommand::Quit => break,
            TerminalCommand::Report => {
                let report = handle.report().await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            other => {
                if let Some(event) = other.into_event(&snapshot) {
                    handle.send(event)?;
                }
            }
        }
    }

    handle.shutdown()?;
    if session.await.is_err() {
        bail!("editor session ended abnormally");
    }
    Ok(())
}
