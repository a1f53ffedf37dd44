// OliveFly Command Line Interface
// Talks to a running detection service over HTTP

mod client;

use clap::{Parser, Subcommand};
use client::ApiClient;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "olivefly")]
#[command(about = "OliveFly detection service client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "http://localhost:8080", global = true)]
    server: String,

    /// Sent as X-API-Key
    #[arg(long, env = "OLIVEFLY_API_KEY", global = true)]
    api_key: Option<String>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server health
    Health,

    /// Run detection on an image file
    Detect {
        /// Image to upload
        image: PathBuf,

        /// Confidence threshold, clamped by the server to [0.05, 0.95]
        #[arg(long)]
        min_conf: Option<f64>,
    },

    /// Send a WhatsApp message through the server
    Notify {
        /// Recipient phone number
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging if verbose
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let client = ApiClient::new(&cli.server, cli.api_key.clone());

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            let loaded = health.get("model_loaded").and_then(Value::as_bool).unwrap_or(false);
            println!("Server is up, model loaded: {}", loaded);
            print_json(&health)?;
        }
        Commands::Detect { image, min_conf } => {
            let summary = client.detect(&image, min_conf).await?;
            print_json(&summary)?;
        }
        Commands::Notify { to, text } => {
            let reply = client.notify(&to, &text).await?;
            print_json(&reply)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
