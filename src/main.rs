use std::io::Write as _;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use haven_chat::render::{TYPING_INDICATOR, format_message, speech_status, toggle_label};
use haven_chat::{ChatSession, Config, ConversationEvent};

/// Haven - chat that pairs every reply with an emotion reading
#[derive(Parser)]
#[command(name = "haven", version, about)]
struct Cli {
    /// Base URL of the reply/emotion backend
    #[arg(long, env = "HAVEN_API_BASE")]
    api_base: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice input
    #[arg(long)]
    no_voice: bool,

    /// Don't read replies aloud
    #[arg(long)]
    no_narration: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send a single message and print the reply
    Send {
        /// Message text
        text: String,
    },
    /// Show the effective configuration
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,haven_chat=info",
        1 => "info,haven_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(api_base) = cli.api_base {
        config.backend.base_url = api_base;
    }
    if cli.no_voice {
        config.voice.enabled = false;
    }
    if cli.no_narration {
        config.voice.narration = false;
    }
    config.validate()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Send { text }) => send_once(config, &text).await,
        Some(Command::Check) => {
            check(&config);
            Ok(())
        }
        None => chat(ChatSession::from_config(&config)?).await,
    }
}

/// Run one turn without voice and print the bot message
async fn send_once(mut config: Config, text: &str) -> anyhow::Result<()> {
    config.voice.enabled = false;
    config.voice.narration = false;
    let session = ChatSession::from_config(&config)?;

    let Some(turn) = session.orchestrator().submit(text) else {
        anyhow::bail!("nothing to send");
    };
    turn.await?;

    if let Some(reply) = session.orchestrator().store().messages().last() {
        println!("{}", format_message(reply));
    }
    Ok(())
}

fn check(config: &Config) {
    println!("backend:     {}", config.backend.base_url);
    println!(
        "voice input: {}",
        capability_status(config.voice.enabled, config)
    );
    println!(
        "narration:   {}",
        capability_status(config.voice.narration, config)
    );
    if let Some(path) = haven_chat::config::file::config_file_path() {
        println!("config file: {}", path.display());
    }
}

fn capability_status(enabled: bool, config: &Config) -> &'static str {
    if !enabled {
        "disabled"
    } else if !cfg!(feature = "audio") {
        "unavailable (built without audio)"
    } else if config.api_keys.openai.is_none() {
        "unavailable (no OPENAI_API_KEY)"
    } else {
        "enabled"
    }
}

/// Interactive chat on stdin/stdout
async fn chat(mut session: ChatSession) -> anyhow::Result<()> {
    let mut events = session.orchestrator().store().subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type how you're feeling. /voice toggles speech input, /quit exits.");
    if let Some(error) = session.speech().last_error() {
        println!("! {error}");
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" | "/exit" => break,
                    "/voice" => {
                        session.speech_mut().toggle();
                        if session.speech().is_supported() {
                            println!("[{}]", toggle_label(session.speech().is_capturing()));
                        }
                        print_speech_status(&session);
                    }
                    _ => {
                        session.orchestrator().stage(line.as_str());
                        if session.orchestrator().submit_staged().is_none()
                            && session.orchestrator().store().is_pending()
                        {
                            println!("(still waiting for the last reply)");
                        }
                    }
                }
            }
            Some(event) = session.next_capture_event() => {
                session.handle_capture_event(event);
                print_speech_status(&session);
            }
            event = events.recv() => match event {
                Ok(ConversationEvent::MessageAppended(message)) => {
                    println!("{}", format_message(&message));
                    if !message.is_bot() && session.orchestrator().store().is_pending() {
                        println!("{TYPING_INDICATOR}");
                    }
                }
                Ok(ConversationEvent::PendingChanged(_)) => {}
                Ok(ConversationEvent::ScrollToLatest) => std::io::stdout().flush()?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}

fn print_speech_status(session: &ChatSession) {
    for line in speech_status(session.speech().session()) {
        println!("{line}");
    }
}
