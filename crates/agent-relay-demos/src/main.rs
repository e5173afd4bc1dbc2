//! Demo runs for the stream coordinator and the payment receipt verifier.

mod agent;
mod config;
mod paywall;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agent_relay_paywall::{DEFAULT_PAID_CALL, PaymentAmount, PaywallFlow};
use agent_relay_stream::{CollectOptions, init_observability, stream_agent_response};
use clap::{Parser, Subcommand};

use crate::agent::ScriptedExplorer;
use crate::paywall::{SimulatedPaywall, verify_log_file};

#[derive(Parser)]
#[command(name = "agent-relay-demos", about = "Stream coordination and payment receipt demos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scripted agent and print the events it streamed.
    Stream {
        #[arg(long, default_value = "What's the current status of the Neo testnet?")]
        question: String,
        #[arg(long, default_value = "testnet")]
        network: String,
        /// Per-run timeout in seconds (overrides AGENT_RELAY_STREAM_TIMEOUT_SECS).
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Probe a simulated paywall, pay, and print the recovered receipt.
    Paywall {
        /// Target URL (defaults to X402_DEMO_URL).
        #[arg(long)]
        url: Option<String>,
        /// Amount in USDC to authorize.
        #[arg(long, default_value = "0.01")]
        amount: String,
        /// Serve the receipt under the legacy X-Payment-Response header.
        #[arg(long)]
        legacy: bool,
    },
    /// Look for a payment receipt in a JSON response log.
    VerifyReceipt {
        #[arg(long)]
        log: PathBuf,
        #[arg(long, default_value = DEFAULT_PAID_CALL)]
        call: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_files = config::init()?;
    init_observability()?;
    tracing::debug!(files = ?env_files, "environment files loaded");
    let cli = Cli::parse();

    match cli.command {
        Command::Stream {
            question,
            network,
            timeout_secs,
        } => {
            let mut options = CollectOptions::from_env()?;
            if let Some(secs) = timeout_secs {
                options = options.timeout(Duration::from_secs(secs));
            }
            options.validate()?;
            let agent = Arc::new(ScriptedExplorer::new(network, config::step_delay()));

            println!("=== Streaming agent demo ===\n");
            println!("Q: {question}\n");
            match stream_agent_response(&agent, question, &options).await {
                Ok(run) => {
                    println!("Captured {} streaming events", run.events().len());
                    for event in run.events() {
                        println!("  {}", serde_json::to_string(event)?);
                    }
                    println!("\nFinal result:\n{}", run.output());
                    println!("(agent history: {} request)", agent.history_len());
                }
                Err(err) => {
                    eprintln!("Run failed: {err}");
                    for event in err.events() {
                        eprintln!("  {}", serde_json::to_string(event)?);
                    }
                }
            }
        }
        Command::Paywall {
            url,
            amount,
            legacy,
        } => {
            let url = url.unwrap_or_else(config::paywalled_url);
            let requested = PaymentAmount::parse_usdc(&amount)?;
            let paywall = SimulatedPaywall {
                network: "base-sepolia".into(),
                payer: "0x0000000000000000000000000000000000000001".into(),
                legacy_header: legacy,
            };

            println!("=== Paywall demo ===\n");
            println!("Target: {url} | requested: {requested} USDC\n");
            let outcome = PaywallFlow::default().run(&paywall, &url, requested).await?;
            println!("Paid {} USDC, content:\n{}", outcome.amount, serde_json::to_string_pretty(&outcome.body)?);
            match outcome.receipt {
                Some(found) => println!(
                    "\nPayment confirmed ({}):\n{}",
                    found.header,
                    serde_json::to_string_pretty(&found.receipt)?
                ),
                None => println!("\nNo payment receipt found"),
            }
        }
        Command::VerifyReceipt { log, call } => match verify_log_file(&log, &call)? {
            Some(found) => println!(
                "Receipt from record {} ({}):\n{}",
                found.record_index,
                found.header,
                serde_json::to_string_pretty(&found.receipt)?
            ),
            None => println!("No payment receipt found for {call}"),
        },
    }
    Ok(())
}
