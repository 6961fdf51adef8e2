//! Billing-side provisioning connector for the flowgate panel.
//!
//! Each subcommand maps to one lifecycle event in the billing host. The
//! contract with the host is deliberately simple: mutations print `success`
//! on stdout, queries print JSON, and any failure prints `{"error": "..."}`
//! and exits non-zero for the host to render.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

mod audit;
mod config;
mod provision;
mod store;

use audit::MySqlModuleLog;
use config::{ProductArgs, ProductConfig, ServerArgs};
use flowgate_client::PanelClient;
use provision::Provisioner;
use store::MySqlFieldStore;

#[derive(Parser, Debug)]
#[command(
    name = "flowgate-billing",
    version,
    about = "Provisions traffic-forwarding accounts on a flowgate panel"
)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the panel user, assign the tunnel and store the service ids
    Create {
        #[arg(long)]
        service_id: i64,
        /// Service domain, used to derive the panel username
        #[arg(long)]
        domain: Option<String>,
        /// Client email, username fallback when no domain is set
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Disable the service's tunnel binding
    Suspend {
        #[arg(long)]
        service_id: i64,
    },
    /// Re-enable the service's tunnel binding
    Unsuspend {
        #[arg(long)]
        service_id: i64,
    },
    /// Remove the tunnel binding and clear all stored fields
    Terminate {
        #[arg(long)]
        service_id: i64,
    },
    /// Update the panel user's password
    ChangePassword {
        #[arg(long)]
        service_id: i64,
        #[arg(long)]
        password: String,
    },
    /// Apply new product limits to the binding and the user
    ChangePackage {
        #[arg(long)]
        service_id: i64,
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Print the client-area overview as JSON
    Info {
        #[arg(long)]
        service_id: i64,
        #[command(flatten)]
        product: ProductArgs,
    },
    /// Report live usage for the given services as JSON
    UsageSync {
        #[arg(long = "service-id")]
        service_ids: Vec<i64>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            println!("{}", json!({ "error": format!("{e:#}") }));
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let server = cli.server.to_config()?;

    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&server.database_url)
        .await
        .context("Failed to connect to the billing database")?;

    let client = PanelClient::builder()
        .base_url(server.base_url())
        .login(&server.username, &server.password)
        .build()?;

    let provisioner = Provisioner::new(
        client,
        Arc::new(MySqlFieldStore::new(pool.clone())),
        Arc::new(MySqlModuleLog::new(pool)),
        server.default_tunnel_id,
    );

    match cli.command {
        Command::Create {
            service_id,
            domain,
            email,
            product,
        } => {
            info!(service_id, "creating account");
            provisioner
                .create_account(
                    service_id,
                    domain.as_deref(),
                    email.as_deref(),
                    &ProductConfig::from(&product),
                )
                .await?;
            Ok("success".into())
        }
        Command::Suspend { service_id } => {
            provisioner.suspend_account(service_id).await?;
            Ok("success".into())
        }
        Command::Unsuspend { service_id } => {
            provisioner.unsuspend_account(service_id).await?;
            Ok("success".into())
        }
        Command::Terminate { service_id } => {
            provisioner.terminate_account(service_id).await?;
            Ok("success".into())
        }
        Command::ChangePassword {
            service_id,
            password,
        } => {
            provisioner.change_password(service_id, &password).await?;
            Ok("success".into())
        }
        Command::ChangePackage {
            service_id,
            product,
        } => {
            provisioner
                .change_package(service_id, &ProductConfig::from(&product))
                .await?;
            Ok("success".into())
        }
        Command::Info {
            service_id,
            product,
        } => {
            let overview = provisioner
                .service_overview(service_id, &ProductConfig::from(&product), &server.base_url())
                .await?;
            Ok(serde_json::to_string_pretty(&overview)?)
        }
        Command::UsageSync { service_ids } => {
            let reports = provisioner.usage_sync(&service_ids).await?;
            Ok(serde_json::to_string_pretty(&reports)?)
        }
    }
}
