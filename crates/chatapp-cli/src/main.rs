//! ChatApp entry point.
//!
//! # Usage
//!
//! ```bash
//! # Server mode
//! chatapp -s <port>
//!
//! # Client mode
//! chatapp -c <name> <server-ip> <server-port> <client-port>
//! ```

mod args;

use std::process::ExitCode;

use chatapp_client::{ClientConfig, ClientError};
use chatapp_core::shutdown_channel;
use chatapp_server::{Server, ServerConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Invocation;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout belongs to the prompt/echo layer.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match args::parse(&raw) {
        Ok(invocation) => invocation,
        Err(e) => {
            println!("Invalid arg: {e}");
            return ExitCode::FAILURE;
        }
    };

    match invocation {
        Invocation::Server { port } => run_server(port).await,
        Invocation::Client { name, server_ip, server_port, client_port } => {
            let config = ClientConfig::new(name, server_ip, server_port, client_port);
            run_client(config).await
        }
    }
}

async fn run_server(port: u16) -> ExitCode {
    let server = match Server::bind(ServerConfig::new(port)).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Server error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // First interrupt stops the server cleanly; any further interrupts land
    // here again and flipping the flag twice is a no-op.
    let (handle, signal) = shutdown_channel();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            handle.shutdown();
        }
    });

    match server.run(signal).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_client(config: ClientConfig) -> ExitCode {
    match chatapp_client::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        // These two have already said everything on stdout.
        Err(ClientError::NameTaken | ClientError::ServerUnresponsive) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Client error: {e}");
            ExitCode::FAILURE
        }
    }
}
