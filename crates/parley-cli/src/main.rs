//! parley CLI: Command-line interface for the parley chat client

use clap::{Args, Parser, Subcommand};
use parley_engine::{Config, HistorySource, HttpHistory, Participants, Roster};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Terminal chat client for a single conversation
#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, default_value = "parley.json")]
    config: PathBuf,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "PARLEY_BASE_URL")]
    base_url: Option<String>,

    /// Where log output goes while the TUI owns the terminal
    #[arg(long, global = true, default_value = "parley.log")]
    log_file: PathBuf,

    #[command(flatten)]
    chat: ChatArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct ChatArgs {
    /// Your user id
    #[arg(long, env = "PARLEY_USER")]
    user: Option<String>,

    /// User id of the person you are talking to
    #[arg(long = "with", env = "PARLEY_WITH")]
    counterpart: Option<String>,

    /// Conversation id to open
    #[arg(long, env = "PARLEY_CONVERSATION")]
    conversation: Option<String>,

    /// JSON file with `[{"id": .., "name": ..}]` for display names
    #[arg(long)]
    roster: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat TUI (default when no command specified)
    Chat(ChatArgs),

    /// Write a config file with default values
    Init,

    /// Fetch and print a conversation's history
    History {
        /// Conversation id
        conversation: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        None => cmd_chat(&cli, &cli.chat),
        Some(Commands::Chat(args)) => cmd_chat(&cli, &args.or(&cli.chat)),
        Some(Commands::Init) => cmd_init(&cli.config),
        Some(Commands::History { conversation, json }) => cmd_history(&cli, conversation, *json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

impl ChatArgs {
    /// Fill unset fields from `fallback` (flags given before the subcommand).
    fn or(&self, fallback: &ChatArgs) -> ChatArgs {
        ChatArgs {
            user: self.user.clone().or_else(|| fallback.user.clone()),
            counterpart: self.counterpart.clone().or_else(|| fallback.counterpart.clone()),
            conversation: self.conversation.clone().or_else(|| fallback.conversation.clone()),
            roster: self.roster.clone().or_else(|| fallback.roster.clone()),
        }
    }
}

fn init_logging(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env("PARLEY_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Load the config file if present, then apply flag overrides.
fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    Ok(config)
}

fn cmd_chat(cli: &Cli, args: &ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(user), Some(counterpart), Some(conversation)) =
        (&args.user, &args.counterpart, &args.conversation)
    else {
        return Err("--user, --with and --conversation are required to open a chat".into());
    };

    let config = load_config(cli)?;
    let roster = match &args.roster {
        Some(path) => Roster::from_json(&std::fs::read_to_string(path)?)?,
        None => Roster::default(),
    };

    init_logging(&cli.log_file)?;
    info!(
        base_url = %config.base_url,
        user = %user,
        conversation = %conversation,
        roster = roster.len(),
        "opening chat"
    );

    let participants = Participants {
        current_user: user.clone(),
        counterpart: counterpart.clone(),
        roster,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(parley_tui::run_tui(config, participants, conversation.clone()))
}

fn cmd_init(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    Config::default().save(config_path)?;
    println!("Created {}", config_path.display());
    Ok(())
}

fn cmd_history(cli: &Cli, conversation: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    let history = HttpHistory::new(config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let messages = rt.block_on(history.fetch(conversation))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No messages in {conversation}");
        return Ok(());
    }
    for m in &messages {
        println!(
            "[{}] {}: {}",
            m.created_at.format("%Y-%m-%d %H:%M"),
            m.sender,
            m.body
        );
    }
    Ok(())
}
