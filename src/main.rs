use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voicecart::{
    serve, Commands, Container, ContainerConfig, ConversationActor, ConversationEvent,
    ConversationSession, ConversationState, Role, Router, SessionSnapshot,
};

#[derive(Parser)]
#[command(name = "voicecart")]
#[command(author, version, about = "Voice shopping assistant over a product catalog", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.voicecart")]
    data_dir: String,

    /// Offline embeddings, chat and speech
    #[arg(long, global = true)]
    mock_services: bool,

    #[arg(long, global = true)]
    memory_storage: bool,

    /// Hand the whole catalog to the model instead of retrieving
    #[arg(long, global = true)]
    no_rag: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ContainerConfig::from_env();
    config.data_dir = cli.data_dir;
    config.mock_services = cli.mock_services;
    config.memory_storage = cli.memory_storage;
    if cli.no_rag {
        config.use_rag = false;
    }

    let container = Container::new(config).await?;

    match cli.command {
        Commands::Serve { port, public } => {
            let host = if public { [0, 0, 0, 0] } else { [127, 0, 0, 1] };
            serve(Arc::new(container), SocketAddr::from((host, port))).await?;
        }
        Commands::Converse {
            audio_in,
            audio_out,
        } => {
            converse(&container, audio_in, audio_out).await?;
        }
        command => {
            let router = Router::new(&container);
            let output = router.route(command).await?;
            println!("{}", output);
        }
    }

    Ok(())
}

async fn converse(container: &Container, audio_in: PathBuf, audio_out: PathBuf) -> Result<()> {
    let services = Arc::new(container.conversation_services(&audio_in, &audio_out)?);
    let handle = ConversationActor::spawn(ConversationSession::new(services));

    println!("Voice session ready (input: {}).", audio_in.display());
    println!("  Enter  start / stop listening");
    println!("  x      cancel listening");
    println!("  s      stop speaking");
    println!("  c      clear conversation");
    println!("  q      quit");

    let mut snapshots = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = SessionSnapshot::default();
        while snapshots.changed().await.is_ok() {
            let current = snapshots.borrow_and_update().clone();
            report(&last, &current);
            last = current;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match line.trim() {
            "" => match handle.snapshot().state {
                ConversationState::Idle => ConversationEvent::Start,
                _ => ConversationEvent::Stop,
            },
            "x" => ConversationEvent::Cancel,
            "s" => ConversationEvent::Stop,
            "c" => ConversationEvent::Clear,
            "q" => break,
            other => {
                println!("Unknown command {:?}", other);
                continue;
            }
        };
        handle.send(event)?;
    }

    info!("Ending voice session");
    handle.shutdown().await?;
    printer.abort();
    Ok(())
}

fn report(last: &SessionSnapshot, current: &SessionSnapshot) {
    if current.history.len() < last.history.len() {
        println!("[conversation cleared]");
    } else {
        for turn in &current.history[last.history.len()..] {
            let speaker = match turn.role() {
                Role::User => "You",
                Role::Assistant => "Assistant",
            };
            println!("{}: {}", speaker, turn.content());
        }
    }

    if current.error != last.error {
        if let Some(error) = &current.error {
            println!("! {}", error);
        }
    }

    if current.state != last.state {
        println!("[{}]", current.state);
    }
}
