// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Source kubeconfig loading and client creation

use crate::error::{KlstrError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Load the kubeconfig used as both the admin credential and the template for the new profile.
/// Without an explicit path this follows `$KUBECONFIG` and then `~/.kube/config`.
#[instrument]
pub fn load_source_kubeconfig(path: Option<&Path>) -> Result<Kubeconfig> {
    let kubeconfig = match path {
        Some(path) => {
            debug!("Reading kubeconfig from {}", path.display());
            Kubeconfig::read_from(path).map_err(|e| {
                KlstrError::Kubeconfig(format!("Failed to read {}: {}", path.display(), e))
            })?
        }
        None => Kubeconfig::read()
            .map_err(|e| KlstrError::Kubeconfig(format!("Failed to read default kubeconfig: {}", e)))?,
    };

    Ok(kubeconfig)
}

/// Create a Kubernetes client from an already loaded kubeconfig
pub async fn create_client_from_kubeconfig(
    kubeconfig: &Kubeconfig,
    context: Option<&str>,
) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let client_config = kube::Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
        .await
        .map_err(|e| KlstrError::Kubeconfig(format!("Failed to create config: {}", e)))?;

    info!("Using cluster at {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| KlstrError::Kubeconfig(format!("Failed to create client: {}", e)))
}
