//! `leadhub`: command-line client for the lead relay.
//!
//! ```text
//! leadhub listen --count 10
//! leadhub emit status --lead-id 42 QUALIFIED
//! leadhub say "hello"
//! ```

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use leadhub::domain::events::ServerEvent;
use leadhub::domain::leads::{ChatMessage, Lead, LeadMessage, LeadStatus, StatusChange};
use leadhub::domain::wire::Field;
use leadhub::features::realtime::client::{
    DEFAULT_SOCKET_PATH, DEFAULT_SOCKET_URL, SOCKET_URL_ENV,
};
use leadhub::features::realtime::protocol;
use leadhub::features::realtime::{EventClient, TransportKind};
use leadhub_logger::{LevelFilter, Logger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tracing::warn;

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "leadhub", version, about = "Command-line client for the lead relay")]
struct Cli {
    /// Relay base URL.
    #[arg(long, env = SOCKET_URL_ENV, default_value = DEFAULT_SOCKET_URL, global = true)]
    url: String,

    /// Socket mount path on the relay.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH, global = true)]
    path: String,

    /// Force a single transport instead of WebSocket with polling fallback.
    #[arg(long, value_enum, global = true)]
    transport: Option<Transport>,

    /// More log output on stderr (-v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    Websocket,
    Polling,
}

impl From<Transport> for TransportKind {
    fn from(value: Transport) -> Self {
        match value {
            Transport::Websocket => Self::WebSocket,
            Transport::Polling => Self::Polling,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every relay event as one JSON envelope per line.
    Listen {
        /// Exit after this many events.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Emit a lead event and wait for the relay to broadcast it.
    Emit {
        #[command(subcommand)]
        event: Emit,
    },
    /// Send a chat line and print the relay's echo.
    Say {
        text: String,
        #[arg(long, default_value = "cli")]
        sender: String,
    },
}

#[derive(Debug, Subcommand)]
enum Emit {
    /// `lead:created`
    LeadCreated {
        #[arg(long)]
        id: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// `lead:updated`
    LeadUpdated {
        #[arg(long)]
        id: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "NEW")]
        status: LeadStatus,
    },
    /// `message:new`
    Message {
        #[arg(long)]
        lead_id: String,
        text: String,
    },
    /// `lead:status-changed`
    Status {
        #[arg(long)]
        lead_id: String,
        status: LeadStatus,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).stderr(true).level(level).init()?;

    let transports = cli.transport.map_or_else(
        || vec![TransportKind::WebSocket, TransportKind::Polling],
        |transport| vec![transport.into()],
    );
    let client = EventClient::builder()
        .url(&cli.url)
        .path(&cli.path)
        .transports(transports)
        .auto_connect(false)
        .build()
        .await?;
    let mut events = client.subscribe();
    client.connect().await.with_context(|| format!("Connecting to {}", cli.url))?;

    let outcome = match cli.command {
        Command::Listen { count } => listen(&client, &mut events, count).await,
        Command::Emit { event } => emit(&client, &mut events, event).await,
        Command::Say { text, sender } => say(&client, &mut events, text, sender).await,
    };

    client.close().await;
    outcome
}

async fn listen(
    client: &EventClient,
    events: &mut Receiver<Arc<ServerEvent>>,
    count: Option<usize>,
) -> Result<()> {
    let mut seen = 0;
    let mut liveness = tokio::time::interval(Duration::from_secs(1));

    while count.is_none_or(|limit| seen < limit) {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    println!("{}", protocol::encode(event.as_ref())?);
                    seen += 1;
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind; events skipped");
                },
                Err(RecvError::Closed) => break,
            },
            _ = liveness.tick() => {
                if !client.is_connected() {
                    bail!("Connection to the relay was lost");
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn emit(
    client: &EventClient,
    events: &mut Receiver<Arc<ServerEvent>>,
    event: Emit,
) -> Result<()> {
    let (sent, expected) = match event {
        Emit::LeadCreated { id, phone, name } => {
            let lead = Lead { name: Field::from_option(name), ..Lead::new(id, phone) };
            (client.emit_lead_created(lead), "lead:new")
        },
        Emit::LeadUpdated { id, phone, name, status } => {
            let lead = Lead { name: Field::from_option(name), status, ..Lead::new(id, phone) };
            (client.emit_lead_updated(lead), "lead:update")
        },
        Emit::Message { lead_id, text } => {
            (client.emit_message_new(LeadMessage::incoming(lead_id, text)), "message:received")
        },
        Emit::Status { lead_id, status } => {
            (client.emit_lead_status_changed(StatusChange::new(lead_id, status)), "lead:status")
        },
    };
    if !sent {
        bail!("Not connected; event was not sent");
    }

    // The relay broadcasts to the sender too; its copy confirms delivery.
    let event = wait_for(events, |event| event.name() == expected).await?;
    println!("{}", protocol::encode(event.as_ref())?);
    Ok(())
}

async fn say(
    client: &EventClient,
    events: &mut Receiver<Arc<ServerEvent>>,
    text: String,
    sender: String,
) -> Result<()> {
    if !client.send_message(ChatMessage { text, sender_id: sender }) {
        bail!("Not connected; message was not sent");
    }

    let echo = wait_for(events, |event| {
        matches!(event, ServerEvent::Message(m) if m.text.starts_with("Echo: "))
    })
    .await?;
    if let ServerEvent::Message(message) = echo.as_ref() {
        println!("{}", message.text);
    }
    Ok(())
}

async fn wait_for(
    events: &mut Receiver<Arc<ServerEvent>>,
    predicate: impl Fn(&ServerEvent) -> bool,
) -> Result<Arc<ServerEvent>> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(event.as_ref()) => return Ok(event),
                Ok(_) | Err(RecvError::Lagged(_)) => {},
                Err(RecvError::Closed) => bail!("Event stream closed"),
            }
        }
    };
    timeout(REPLY_TIMEOUT, wait).await.context("No reply from the relay")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_is_parsed_case_insensitively() {
        let cli = Cli::try_parse_from(["leadhub", "emit", "status", "--lead-id", "42", "qualified"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Emit { event: Emit::Status { status: LeadStatus::Qualified, .. } }
        ));
    }

    #[test]
    fn unknown_status_is_rejected() {
        let parsed = Cli::try_parse_from(["leadhub", "emit", "status", "--lead-id", "1", "LOST"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn transport_can_be_forced() {
        let cli = Cli::try_parse_from(["leadhub", "--transport", "polling", "listen"])
            .expect("parse");
        assert!(matches!(cli.transport.map(TransportKind::from), Some(TransportKind::Polling)));
        assert!(matches!(cli.command, Command::Listen { count: None }));
    }
}
