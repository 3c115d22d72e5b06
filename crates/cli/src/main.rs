//! Remediation agent CLI
//!
//! Drives the agent's HTTP API: trigger a reconciliation pass, scale the
//! target deployment by hand, or query agent health.

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// CLI for the log-driven remediation agent
#[derive(Parser)]
#[command(name = "remedyctl")]
#[command(author, version, about = "CLI for the remediation agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via AGENT_API_URL env var)
    #[arg(long, env = "AGENT_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Emit raw JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trigger a reconciliation pass (runs in the agent's background)
    Trigger,

    /// Scale the target deployment directly, bypassing the decision engine
    Scale {
        /// Desired replica count
        replicas: u32,
    },

    /// Show agent health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Trigger => {
            let ack = client.trigger().await?;
            if cli.json {
                println!("{}", serde_json::json!({ "message": ack.message }));
            } else {
                println!("{}", ack.message);
            }
        }
        Commands::Scale { replicas } => {
            let result = client.scale(replicas).await?;
            if cli.json {
                println!("{}", serde_json::json!({ "message": result.message }));
            } else {
                println!("{}", result.message);
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": health.status,
                        "components": health.components,
                    })
                );
            } else {
                println!("status: {}", health.status);
                for (name, component) in &health.components {
                    let status = component
                        .get("status")
                        .and_then(|s| s.as_str())
                        .unwrap_or("unknown");
                    println!("  {}: {}", name, status);
                }
            }
        }
    }

    Ok(())
}
