//! inbox - messaging inbox with a streaming AI assistant

mod commands;
mod config;
mod seed;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inbox_assistant::AnalysisScope;
use inbox_store::{FileSlot, MessageStatus, Store};
use tracing_subscriber::EnvFilter;

use commands::assistant::Request;

/// inbox - messaging inbox with a streaming AI assistant
#[derive(Parser, Debug)]
#[command(name = "inbox")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.config/inbox/config.toml or $INBOX_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inbox state file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Streaming generation endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config file and print an annotated example
    InitConfig,
    /// Replace the inbox with generated demo conversations
    Seed {
        #[arg(long, default_value_t = 6)]
        conversations: usize,
        #[arg(long, default_value_t = 40)]
        messages: usize,
    },
    /// List conversations, optionally filtering by name
    List {
        /// Name filter; an empty string clears it
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a conversation's messages
    Show { conversation: String },
    /// Make a conversation active (clears the selection)
    Select { conversation: String },
    /// Mark messages of a conversation as read
    Read {
        conversation: String,
        ids: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Add or remove a message of the active conversation from the selection
    Toggle { message: String },
    /// Deselect all messages
    ClearSelection,
    /// Set a message's status (none, interesting, prepared, considered)
    Status {
        message: String,
        status: MessageStatus,
    },
    /// Toggle a message's bookmark
    Bookmark { message: String },
    /// Add a reaction to a message
    React { message: String, label: String },
    /// Send a text message to the active conversation
    Send {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Analyze unread, selected or all messages of the active conversation
    Analyze { scope: AnalysisScope },
    /// Ask the assistant about the active conversation
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("inbox=debug,inbox_store=debug,inbox_stream=debug,inbox_assistant=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone().unwrap_or_else(config::Config::config_path);

    // Initialize config and exit
    if let Command::InitConfig = args.command {
        let path = config::Config::init(&config_path)?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    // Merge config with CLI args (CLI takes precedence)
    let mut cfg = config::Config::load(&config_path);
    if let Some(endpoint) = args.endpoint {
        cfg.endpoint = endpoint;
    }
    if let Some(state) = args.state {
        cfg.state_path = Some(state);
    }

    let state_path = cfg.state_path();
    tracing::debug!(config = %config_path.display(), state = %state_path.display(), "Opening inbox");
    let mut store = Store::open(FileSlot::new(state_path));

    let output = match args.command {
        Command::InitConfig => return Ok(()),
        Command::Seed {
            conversations,
            messages,
        } => commands::inbox::seed(&mut store, conversations, messages, chrono::Utc::now()),
        Command::List { search } => commands::inbox::list(&mut store, search),
        Command::Show { conversation } => commands::inbox::show(&store, &conversation)?,
        Command::Select { conversation } => commands::inbox::select(&mut store, &conversation)?,
        Command::Read {
            conversation,
            ids,
            all,
        } => commands::inbox::read(&mut store, &conversation, ids, all)?,
        Command::Toggle { message } => commands::inbox::toggle(&mut store, &message)?,
        Command::ClearSelection => commands::inbox::clear_selection(&mut store),
        Command::Status { message, status } => {
            commands::inbox::status(&mut store, &message, status)?
        }
        Command::Bookmark { message } => commands::inbox::bookmark(&mut store, &message)?,
        Command::React { message, label } => commands::inbox::react(&mut store, &message, &label)?,
        Command::Send { text } => {
            commands::inbox::send(&mut store, &text.join(" "), chrono::Utc::now())?
        }
        Command::Analyze { scope } => {
            return commands::assistant::run(&cfg, store.state(), Request::Analyze(scope)).await;
        }
        Command::Ask { question } => {
            return commands::assistant::run(&cfg, store.state(), Request::Ask(question.join(" ")))
                .await;
        }
    };

    println!("{}", output);
    Ok(())
}
