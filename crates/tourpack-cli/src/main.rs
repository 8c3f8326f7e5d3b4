//! tourpack: run the extraction pipeline and talk to the webhook from a shell.
//!
//! Configuration comes from the environment (and `.env`); see `Config::from_env`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tourpack_core::{Config, LogFormat, WebhookConfig};
use tourpack_infra::signature::{canonical_json, signature_header};
use tourpack_infra::{init_telemetry, shutdown_telemetry, verify_signature, WebhookClient};
use tourpack_worker::build_processor;

#[derive(Parser)]
#[command(name = "tourpack", about = "Tour archive extraction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a storage trigger event (JSON file, or `-` for stdin)
    Process {
        event: PathBuf,
    },
    /// Read or replace a tour's status on the webhook endpoint
    Status {
        #[command(subcommand)]
        sub: StatusCommands,
    },
    /// Print the canonical body and X-Signature header for a JSON payload
    Sign {
        /// JSON file, or `-` for stdin
        payload: PathBuf,
        /// Signing secret (defaults to WEBHOOK_SECRET)
        #[arg(long)]
        secret: Option<String>,
    },
    /// Check an X-Signature header against a received body
    Verify {
        /// Body exactly as received, or `-` for stdin
        body: PathBuf,
        /// Header value, with or without the `sha256=` prefix
        #[arg(long)]
        signature: String,
        /// Signing secret (defaults to WEBHOOK_SECRET)
        #[arg(long)]
        secret: Option<String>,
    },
}

#[derive(Subcommand)]
enum StatusCommands {
    /// Fetch the status record of a tour
    Get { tour: String },
    /// Replace the status record of a tour with a JSON document
    Set { tour: String, status: String },
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    serde_json::from_str(&read_input(path)?).context("Input is not valid JSON")
}

fn webhook_client() -> Result<WebhookClient> {
    let config = WebhookConfig::from_env().context("Invalid webhook configuration")?;
    WebhookClient::from_config(&config)?
        .context("WEBHOOK_URL (or WORDPRESS_WEBHOOK_URL) must be set")
}

fn secret_or_env(secret: Option<String>) -> Result<Option<String>> {
    match secret {
        Some(secret) => Ok(Some(secret)),
        None => Ok(WebhookConfig::from_env()
            .context("Invalid webhook configuration")?
            .secret),
    }
}

/// Logging is best effort: the command still runs without a subscriber.
fn start_telemetry(format: LogFormat) {
    if let Err(e) = init_telemetry(format) {
        eprintln!("tourpack: logging disabled: {}", e);
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Process { event } => {
            let config = Config::from_env().context("Invalid configuration")?;
            start_telemetry(config.log_format);

            let processor = build_processor(&config).await?;
            let response = processor.handle(read_json(&event)?).await;
            print_json(&response)?;

            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status { sub } => {
            start_telemetry(LogFormat::Pretty);
            let client = webhook_client()?;
            match sub {
                StatusCommands::Get { tour } => match client.get_status(&tour).await? {
                    Some(status) => print_json(&status)?,
                    None => {
                        eprintln!("No status found for tour {}", tour);
                        return Ok(ExitCode::FAILURE);
                    }
                },
                StatusCommands::Set { tour, status } => {
                    let status: Value =
                        serde_json::from_str(&status).context("Status must be a JSON document")?;
                    let updated = client.update_status(&tour, &status).await?;
                    print_json(&serde_json::json!({ "tour": tour, "updated": updated }))?;
                    if !updated {
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
        }
        Commands::Sign { payload, secret } => {
            let secret =
                secret_or_env(secret)?.context("No secret given and WEBHOOK_SECRET unset")?;
            let body = canonical_json(&read_json(&payload)?);
            print_json(&serde_json::json!({
                "body": body,
                "x_signature": signature_header(&body, &secret)?,
            }))?;
        }
        Commands::Verify {
            body,
            signature,
            secret,
        } => {
            let body = read_input(&body)?;
            let secret = secret_or_env(secret)?;
            let valid = verify_signature(&body, &signature, secret.as_deref());
            print_json(&serde_json::json!({ "valid": valid }))?;
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let code = run(cli.command).await;
    shutdown_telemetry();
    code
}
