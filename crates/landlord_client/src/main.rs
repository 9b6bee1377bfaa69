//! Terminal client for Landlord tables.
//!
//! Reads lines from stdin and prints every envelope from the server as
//! plain text. `!text` chats, `/cmd` runs a table command and anything else
//! is played as cards.

mod input;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use landlord_server::messaging::codec::{read_frame, write_frame, DEFAULT_MAX_FRAME_LEN};
use landlord_server::messaging::{ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};
use view::Mirror;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for Landlord tables", long_about = None)]
struct Args {
    /// The hostname of the server
    hostname: String,

    /// The port of the server
    port: u16,

    /// Your name at the table
    name: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();

    let stream = TcpStream::connect((args.hostname.as_str(), args.port))
        .await
        .with_context(|| format!("cannot connect to {}:{}", args.hostname, args.port))?;
    info!("Connected to {}:{}", args.hostname, args.port);

    let (mut reader, mut writer) = stream.into_split();
    write_frame(&mut writer, &ClientMessage::Join { name: args.name.clone() }).await?;

    let mut receiver = tokio::spawn(async move {
        let mut mirror = Mirror::default();
        loop {
            match read_frame::<_, ServerMessage>(&mut reader, DEFAULT_MAX_FRAME_LEN).await {
                Ok(Some(message)) => {
                    debug!("Received {:?}", message);
                    for line in view::render(&message, &mut mirror) {
                        println!("{line}");
                    }
                }
                Ok(None) => {
                    println!("Connection closed by server");
                    break;
                }
                Err(e) => {
                    println!("Connection lost: {e}");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut receiver => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(message) = input::parse_line(&line) {
                    write_frame(&mut writer, &message).await?;
                }
            }
        }
    }

    receiver.abort();
    Ok(())
}
