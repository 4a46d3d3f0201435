// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use klstr::config::{Cli, Commands, Config, UsersCommand};
use klstr::kubernetes::{create_client_from_kubeconfig, load_source_kubeconfig};
use klstr::pipeline::issue_user_credentials;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klstr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Users(UsersCommand::Create(args)) => {
            let config = Config::from_args(cli.kubeconfig, cli.context, args);
            info!("Creating user {}", config.identity);

            let source = load_source_kubeconfig(config.kubeconfig.as_deref())?;
            let client = create_client_from_kubeconfig(&source, config.context.as_deref()).await?;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, canceling");
                    trigger.cancel();
                }
            });

            let issued = issue_user_credentials(client, &config, &source, &cancel).await?;
            println!(
                "User {} can use namespace {} with {}",
                issued.identity,
                issued.scope.namespace,
                issued.profile_path.display()
            );
        }
    }

    Ok(())
}
