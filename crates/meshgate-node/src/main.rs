//! Mesh gateway bridge daemon
//!
//! This binary runs the full bridge:
//! - serial link to the gateway device (reader/writer workers)
//! - gRPC interface server streaming logs and accepting control commands
//!
//! A transport failure on the serial link is fatal: the process exits and
//! leaves restarting to process-level supervision.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tonic::transport::Server;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use meshgate_bridge::config::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT};
use meshgate_bridge::{LinkConfig, LinkService, LogRecord, SerialConfig, SerialLink, ServerConfig, Worker};
use meshgate_proto::InterfaceServer;

#[derive(Parser)]
#[command(name = "meshgate-node")]
#[command(about = "Mesh gateway bridge: serial link to gRPC interface")]
struct Args {
    /// Serial device path for the gateway
    #[arg(long, default_value = DEFAULT_SERIAL_PORT)]
    serial_port: PathBuf,

    /// Baud rate for the serial link
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Listening port for the interface server
    #[arg(long, default_value_t = meshgate_proto::DEFAULT_PORT)]
    port: u16,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = LinkConfig {
        serial: SerialConfig {
            port: args.serial_port,
            baud_rate: args.baud,
        },
        server: ServerConfig {
            listen_port: args.port,
        },
    };

    info!("Starting meshgate bridge");

    // The serial connection is owned exclusively by the two workers: the
    // reader holds the read half, the writer the write half.
    let (frame_reader, frame_writer) = SerialLink::open(&config.serial)?;

    // The two bridge queues: inbound log records, outbound commands
    let (log_tx, log_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let mut reader = Worker::spawn_reader(frame_reader, log_tx.clone());
    let mut writer = Worker::spawn_writer(frame_writer, command_rx);

    let addr: SocketAddr = format!("[::]:{}", config.server.listen_port).parse()?;

    let _ = log_tx.send(LogRecord::server_log(format!(
        "interface server started on port {}",
        config.server.listen_port
    )));

    let service = LinkService::new(log_tx, log_rx, command_tx);

    info!(address = %addr, "Interface server listening");
    let server = Server::builder()
        .add_service(InterfaceServer::new(service))
        .serve(addr);
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result?;
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }

        result = reader.wait() => {
            error!("Reader worker stopped");
            result?;
            anyhow::bail!("reader worker exited unexpectedly");
        }

        result = writer.wait() => {
            error!("Writer worker stopped");
            result?;
            anyhow::bail!("writer worker exited unexpectedly");
        }
    }

    reader.stop().await;
    writer.stop().await;

    info!("Meshgate bridge stopped");
    Ok(())
}
