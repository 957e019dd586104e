//! product-relay binary
//!
//! - `serve`: run the collector until Ctrl-C
//! - `send`: validate one product from the command line and submit it

use product_relay::config::{Command, Config, SendArgs};
use product_relay::{submit_form, ProductForm, ProductStore, Server};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load configuration
    let (config, command) = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match command {
        Command::Serve(_) => serve(config).await,
        Command::Send(args) => send(config, args).await,
    }
}

async fn serve(config: Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        max_connections = config.server.max_connections,
        "Starting product collector"
    );

    let store = ProductStore::new();
    let server = match Server::bind(config.server, Arc::clone(&store)).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to start TCP server");
            return Ok(ExitCode::FAILURE);
        }
    };

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    Ok(ExitCode::SUCCESS)
}

async fn send(config: Config, args: SendArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let form = ProductForm {
        model: args.model,
        brand: args.brand,
        length: args.length,
        width: args.width,
        height: args.height,
        files: args.files,
    };

    match submit_form(&form, &config.catalog, &config.client).await {
        Ok((record, reply)) => {
            println!("Sent:\n{}", serde_json::to_string_pretty(&record)?);
            println!("Reply:\n{}", reply.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
