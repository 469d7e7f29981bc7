#![deny(unsafe_code)]

//! cmdalias CLI: manage the alias table and run the engine over stdin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cmdalias_config::AppConfig;
use cmdalias_core::engine::format_list;
use cmdalias_core::{
    AliasDaemon, AliasEngine, Envelope, EnvelopeKind, Event, LogCollector, LogReader,
    MemorySessionData, UpsertOutcome, build_info,
};

/// cmdalias: expand short aliases into sequences of commands.
#[derive(Parser)]
#[command(name = "cmdalias", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "cmdalias.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or replace an alias.
    Add {
        name: String,
        /// Command words. Under the prefix convention a word starting with
        /// the prefix begins a new command; a lone separator ends one.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        commands: Vec<String>,
    },

    /// Delete an alias.
    Remove { name: String },

    /// List every alias in registration order.
    List {
        /// Print the table as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show what a line of input expands to, without running anything.
    Expand {
        text: String,
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Read lines from stdin and print what the host would execute.
    Run {
        #[arg(long, default_value = "cli")]
        session: String,
        /// Print captured warnings after input ends.
        #[arg(long)]
        show_logs: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Print build information.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;
    let logs = init_tracing(cli.verbose, &config.logging.level);

    match cli.command {
        Commands::Add { name, commands } => cmd_add(&config, &name, &commands).await?,
        Commands::Remove { name } => cmd_remove(&config, &name).await?,
        Commands::List { json } => cmd_list(&config, json).await?,
        Commands::Expand { text, session } => cmd_expand(&config, &text, &session).await?,
        Commands::Run { session, show_logs } => {
            cmd_run(&config, &session).await?;
            if show_logs {
                print_logs(&logs);
            }
        }
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Version => println!("cmdalias {}", build_info::version_string()),
    }

    Ok(())
}

fn init_tracing(verbose: u8, configured: &str) -> LogReader {
    let filter = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let collector = LogCollector::new(1024).with_min_level(Level::WARN);
    let reader = collector.reader();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(collector)
        .init();
    reader
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        AppConfig::load(path)
            .await
            .with_context(|| format!("invalid config at '{}'", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

async fn engine(config: &AppConfig) -> Result<AliasEngine> {
    let engine = AliasEngine::from_config(config, Arc::new(MemorySessionData::new())).await?;
    info!(
        path = %engine.store().path().display(),
        aliases = engine.store().len(),
        "Alias table ready"
    );
    Ok(engine)
}

async fn cmd_add(config: &AppConfig, name: &str, commands: &[String]) -> Result<()> {
    let engine = engine(config).await?;
    let outcome = engine
        .add_alias_words(name, commands)
        .await
        .with_context(|| format!("cannot add alias `{name}`"))?;
    engine
        .store()
        .flush()
        .await
        .context("alias saved in memory but the file could not be written")?;

    let verb = match outcome {
        UpsertOutcome::Created => "Added",
        UpsertOutcome::Updated => "Updated",
    };
    println!("{verb} alias `{}`", name.trim());
    if let Some(alias) = engine.store().get(name.trim()) {
        for command in &alias.commands {
            println!("  {command}");
        }
    }
    Ok(())
}

async fn cmd_remove(config: &AppConfig, name: &str) -> Result<()> {
    let engine = engine(config).await?;
    engine.remove_alias(name).await?;
    engine
        .store()
        .flush()
        .await
        .context("alias removed in memory but the file could not be written")?;
    println!("Removed alias `{}`", name.trim());
    Ok(())
}

async fn cmd_list(config: &AppConfig, json: bool) -> Result<()> {
    let engine = engine(config).await?;
    let aliases = engine.list_aliases();
    if json {
        println!("{}", serde_json::to_string_pretty(aliases.as_slice())?);
    } else {
        println!("{}", format_list(&aliases));
    }
    Ok(())
}

async fn cmd_expand(config: &AppConfig, text: &str, session: &str) -> Result<()> {
    let engine = engine(config).await?;
    let Some(expansion) = engine.expand(&Event::raw(session, text)) else {
        bail!("no alias matches {text:?}");
    };
    println!("{} (args: {:?})", expansion.alias, expansion.args);
    for command in expansion.texts() {
        println!("  {command}");
    }
    Ok(())
}

async fn cmd_run(config: &AppConfig, session: &str) -> Result<()> {
    let engine = Arc::new(engine(config).await?);
    let (daemon, handle) = AliasDaemon::new(engine);
    let mut bus_rx = handle.subscribe();

    let daemon_task = tokio::spawn(daemon.run());
    let printer = tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(envelope) => {
                    if let Some(line) = render(&envelope) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Output fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    handle.submit(session, &line).await?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C received, finishing queued input");
                break;
            }
        }
    }

    handle.shutdown().await?;
    daemon_task.await?;
    drop(handle);
    printer.await?;
    Ok(())
}

/// One output line per envelope; suppression markers are not shown.
fn render(envelope: &Envelope) -> Option<String> {
    let tag = match envelope.kind {
        EnvelopeKind::Reply => "reply",
        EnvelopeKind::Command => "exec",
        EnvelopeKind::Passthrough => "pass",
        EnvelopeKind::Suppressed => return None,
    };
    let mut lines = envelope.body.lines();
    let first = lines.next().unwrap_or_default();
    let mut out = format!("[{}] {tag}: {first}", envelope.session_id);
    for line in lines {
        out.push_str("\n    ");
        out.push_str(line);
    }
    Some(out)
}

fn print_logs(logs: &LogReader) {
    for entry in logs.entries() {
        eprintln!("{entry}");
    }
}

fn cmd_config(path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    cmdalias_core::EngineSettings::from_config(config)?;
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdalias_core::EventId;
    use cmdalias_test_utils::TestConfigBuilder;
    use pretty_assertions::assert_eq;

    fn words(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    async fn stored(config: &AppConfig, name: &str) -> Vec<String> {
        engine(config).await.unwrap().store().get(name).unwrap().commands
    }

    #[test]
    fn test_render_envelopes() {
        let event = EventId::next();
        let reply = Envelope::new(EnvelopeKind::Reply, "cli", "Aliases:\nhi -> /greet", event);
        assert_eq!(
            render(&reply).as_deref(),
            Some("[cli] reply: Aliases:\n    hi -> /greet")
        );

        let command = Envelope::new(EnvelopeKind::Command, "cli", "/greet bob", event);
        assert_eq!(render(&command).as_deref(), Some("[cli] exec: /greet bob"));

        let suppressed = Envelope::new(EnvelopeKind::Suppressed, "cli", "", event);
        assert_eq!(render(&suppressed), None);
    }

    #[test]
    fn test_cli_parses_add() {
        let cli =
            Cli::try_parse_from(["cmdalias", "add", "combo", "/cmd1", "/cmd2 {args}"]).unwrap();
        match cli.command {
            Commands::Add { name, commands } => {
                assert_eq!(name, "combo");
                assert_eq!(commands, vec!["/cmd1", "/cmd2 {args}"]);
            }
            _ => panic!("expected add"),
        }
    }

    #[tokio::test]
    async fn test_load_config_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.store.path, AppConfig::default().store.path);
    }

    #[test_log::test(tokio::test)]
    async fn test_add_then_expand_via_commands() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = TestConfigBuilder::new()
            .store_path(tmp.path().join("aliases.json"))
            .build();

        cmd_add(&config, "hi", &words(&["/greet {args}"])).await.unwrap();
        cmd_expand(&config, "hi there", "cli").await.unwrap();
        assert!(cmd_expand(&config, "nothing", "cli").await.is_err());
        cmd_remove(&config, "hi").await.unwrap();
        assert!(cmd_remove(&config, "hi").await.is_err());
    }

    #[tokio::test]
    async fn test_add_keeps_unquoted_placeholder_word() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = TestConfigBuilder::new()
            .store_path(tmp.path().join("aliases.json"))
            .build();

        cmd_add(&config, "hi", &words(&["/greet", "{args}", ";", "/wave"]))
            .await
            .unwrap();
        assert_eq!(stored(&config, "hi").await, vec!["/greet {args}", "/wave"]);

        let engine = engine(&config).await.unwrap();
        let expansion = engine.expand(&Event::raw("cli", "hi there")).unwrap();
        assert_eq!(expansion.texts(), vec!["/greet there", "/wave"]);
    }

    #[tokio::test]
    async fn test_add_under_delimiter_convention() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = TestConfigBuilder::new()
            .store_path(tmp.path().join("aliases.json"))
            .delimiter_convention(';')
            .build();

        cmd_add(&config, "x", &words(&["/say hi", "/bye"])).await.unwrap();
        assert_eq!(stored(&config, "x").await, vec!["/say hi", "/bye"]);

        cmd_add(&config, "y", &words(&["/say", "hi", ";", "/bye"])).await.unwrap();
        assert_eq!(stored(&config, "y").await, vec!["/say hi", "/bye"]);
    }

    #[tokio::test]
    async fn test_add_rejects_separator_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = TestConfigBuilder::new()
            .store_path(tmp.path().join("aliases.json"))
            .build();
        assert!(cmd_add(&config, "x", &words(&[";"])).await.is_err());
        assert!(engine(&config).await.unwrap().store().is_empty());
    }
}
