//! Nescrowee Investigator
//!
//! Autonomous dispute investigator for Nescrowee escrow contracts. Polls the
//! escrow contract for disputed milestones, investigates each with a
//! TEE-hosted model, and submits the attested resolution on-chain.
//!
//! # Usage
//!
//! ```bash
//! # Run the poller and control API
//! AGENT_ACCOUNT_ID=agent.testnet AGENT_PRIVATE_KEY=ed25519:... NEAR_AI_KEY=... \
//!     nescrowee-investigator serve
//!
//! # Investigate one dispute without attesting or writing anything
//! nescrowee-investigator dry-run --contract-id c1 --milestone-id m1
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nescrowee_agent::{
    Coordinator, CoordinatorConfig, Investigator, InvestigatorConfig, Poller, RingHistory,
    ToolExecutor,
};
use nescrowee_api::{create_router, AgentInfo, ApiConfig, AppState};
use nescrowee_chain::{
    EscrowChain, InMemorySigner, MessageFeed, NearEscrowClient, NearRpcClient, SocialDbFeed,
    TransactionSender,
};
use nescrowee_llm::{OpenAICompatConfig, OpenAICompatProvider, SignatureClient};
use nescrowee_types::normalize;
use nescrowee_vault::{EvidenceVault, NovaConfig, NovaVaultClient};

use crate::config::{AgentConfig, Settings};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Nescrowee Investigator - autonomous dispute resolution agent
#[derive(Parser)]
#[command(name = "nescrowee-investigator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll for disputes and serve the control API (default)
    Serve,

    /// Investigate one dispute and print the analysis; nothing is attested or
    /// written
    DryRun {
        #[arg(long)]
        contract_id: String,

        #[arg(long)]
        milestone_id: String,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging();

    let config = cli.settings.resolve()?;
    tracing::debug!(?config, "Configuration resolved");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::DryRun {
            contract_id,
            milestone_id,
        } => dry_run(config, &contract_id, &milestone_id).await,
    }
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Clients and agent components built from the configuration
struct Components {
    chain: Arc<dyn EscrowChain>,
    feed: Arc<dyn MessageFeed>,
    investigator: Arc<Investigator>,
}

fn build_components(config: &AgentConfig, publish_steps: bool) -> anyhow::Result<Components> {
    let rpc = Arc::new(NearRpcClient::new(&config.rpc_url, config.request_timeout)?);
    let signer = InMemorySigner::from_secret_key(&config.agent_account_id, &config.agent_private_key)
        .context("AGENT_PRIVATE_KEY is not a valid key for AGENT_ACCOUNT_ID")?;
    let sender = Arc::new(TransactionSender::new(rpc.clone(), signer));

    let chain: Arc<dyn EscrowChain> = Arc::new(NearEscrowClient::new(
        rpc.clone(),
        sender.clone(),
        &config.contract_id,
    ));
    let feed: Arc<dyn MessageFeed> =
        Arc::new(SocialDbFeed::new(rpc, sender, &config.social_contract_id));

    let llm = Arc::new(OpenAICompatProvider::new(OpenAICompatConfig {
        base_url: config.near_ai_base_url.clone(),
        timeout: config.request_timeout,
        ..OpenAICompatConfig::near_ai(&config.near_ai_key)
    })?);

    let vault: Option<Arc<dyn EvidenceVault>> = match &config.nova {
        Some((proxy_url, api_key)) => {
            let client = NovaVaultClient::new(NovaConfig {
                proxy_url: proxy_url.clone(),
                api_key: api_key.clone(),
                account_id: config.agent_account_id.clone(),
                timeout: config.request_timeout,
            })?;
            Some(Arc::new(client) as Arc<dyn EvidenceVault>)
        }
        None => {
            tracing::warn!("NOVA proxy not configured, evidence files cannot be decrypted");
            None
        }
    };

    let tools = ToolExecutor::new(chain.clone(), feed.clone(), vault);
    let investigator = Arc::new(Investigator::new(
        llm,
        tools,
        feed.clone(),
        InvestigatorConfig {
            publish_steps,
            ..InvestigatorConfig::default()
        },
    ));

    Ok(Components {
        chain,
        feed,
        investigator,
    })
}

// =============================================================================
// Commands
// =============================================================================

async fn serve(config: AgentConfig) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        agent = %config.agent_account_id,
        network = %config.network,
        contract = %config.contract_id,
        "Starting Nescrowee investigator"
    );

    let components = build_components(&config, true)?;
    let attestations = Arc::new(SignatureClient::new(
        &config.near_ai_base_url,
        &config.near_ai_key,
        config.request_timeout,
    )?);

    let coordinator = Arc::new(Coordinator::new(
        components.chain,
        components.feed,
        components.investigator,
        attestations,
        Arc::new(RingHistory::new(config.history_capacity)),
        CoordinatorConfig {
            investigation_timeout: config.investigation_timeout,
            verify_attestation: config.verify_attestation,
        },
    ));
    let poller = Arc::new(Poller::new(coordinator.clone(), config.poll_interval));

    let state = Arc::new(AppState::new(
        coordinator,
        poller.clone(),
        AgentInfo {
            agent: config.agent_account_id.clone(),
            network: config.network.to_string(),
            contract: config.contract_id.clone(),
        },
    ));
    let app = create_router(state, ApiConfig::default());

    let shutdown = CancellationToken::new();
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(host = %config.host, port = config.port, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    poller_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn dry_run(config: AgentConfig, contract_id: &str, milestone_id: &str) -> anyhow::Result<()> {
    tracing::info!(contract_id, milestone_id, "Dry run, nothing will be written");

    let components = build_components(&config, false)?;

    let contract = components
        .chain
        .get_contract(contract_id)
        .await?
        .with_context(|| format!("Contract {} not found", contract_id))?;

    let Some(context) = components.feed.read_context(contract_id).await? else {
        println!("{}", serde_json::json!({ "result": "no context found" }));
        return Ok(());
    };

    let result = components
        .investigator
        .investigate(&contract.model_id, contract_id, &context)
        .await?;

    let report = serde_json::json!({
        "contract_id": contract_id,
        "milestone_id": milestone_id,
        "model_id": contract.model_id,
        "submittable": normalize(&result.resolution).known().is_some(),
        "analysis": result,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::parse_from(["nescrowee-investigator", "--port", "8080"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.settings.port, 8080);
    }

    #[test]
    fn test_dry_run_parsing() {
        let cli = Cli::parse_from([
            "nescrowee-investigator",
            "dry-run",
            "--contract-id",
            "c1",
            "--milestone-id",
            "m1",
            "--network",
            "mainnet",
        ]);
        match cli.command {
            Some(Command::DryRun {
                contract_id,
                milestone_id,
            }) => {
                assert_eq!(contract_id, "c1");
                assert_eq!(milestone_id, "m1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.settings.network, "mainnet");
    }
}
