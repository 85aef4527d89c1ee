//! asciifarm-client - chat with an asciifarm server from the terminal.
//!
//! This is the main binary entry point. See the `asciifarm_client`
//! library for the session and transport.

use anyhow::{Context, Result};
use asciifarm_client::{session, Address, CommandLine, Config, Session, SessionEnd};
use clap::Parser;

// CLI
#[derive(Parser, Debug)]
#[command(name = "asciifarm-client")]
#[command(version)]
#[command(about = "Chat client for asciifarm servers")]
struct Cli {
    /// Server address: abstract:NAME, unix:PATH or inet:HOST:PORT
    #[arg(short, long)]
    address: Option<Address>,

    /// Send the old ["name", ...] handshake instead of auth
    #[arg(long)]
    legacy: bool,

    /// Largest incoming frame to accept, in bytes
    #[arg(long, value_name = "BYTES")]
    max_frame_size: Option<u32>,

    /// Display name, plus the keywords `join` and `inet`
    #[arg(value_name = "NAME|join|inet")]
    tokens: Vec<String>,
}

impl Cli {
    fn into_command_line(self) -> CommandLine {
        CommandLine {
            address: self.address,
            legacy_handshake: self.legacy,
            max_frame_size: self.max_frame_size,
            ..CommandLine::from_positionals(&self.tokens)
        }
    }
}

/// Log to stderr, or to `ASCIIFARM_LOG_FILE` when set, so stdout carries
/// only the chat transcript.
fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("ASCIIFARM_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let mut config = Config::load()?;
    config.apply_command_line(cli.into_command_line());
    log::debug!("Config: {config:?}");

    let handshake = session::handshake(&config)?;
    let session = Session::connect(&config).await?;
    let input = session::spawn_stdin_reader()?;

    let end = session.run(handshake, input, tokio::io::stdout()).await?;
    if end == SessionEnd::InputExhausted {
        log::info!("End of input, disconnecting");
    }

    Ok(())
}
