// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! User creation: key material, signing request, approval, issuance, scope and kubeconfig.

use crate::config::Config;
use crate::error::{KlstrError, Result, Stage};
use crate::kubernetes::{
    approve_signing_request, provision_scope, submit_signing_request, AuthorizationScope,
    CreatedObject, IssuanceWaiter,
};
use crate::pki::KeyMaterial;
use crate::profile::write_user_profile;
use kube::config::Kubeconfig;
use kube::Client;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Result of a successful user creation
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub identity: String,
    pub scope: AuthorizationScope,
    pub profile_path: PathBuf,
}

/// Create the user described by `config`.
///
/// Stages run in order and the first failure ends the run. Nothing created in the cluster is
/// removed on failure; the objects left behind are logged so they can be cleaned up by hand.
#[instrument(skip_all, fields(identity = %config.identity))]
pub async fn issue_user_credentials(
    client: Client,
    config: &Config,
    source: &Kubeconfig,
    cancel: &CancellationToken,
) -> Result<IssuedCredential> {
    let mut created = Vec::new();
    let result = run_stages(client, config, source, cancel, &mut created).await;

    if let Err(e) = &result {
        error!("User creation failed during {}: {}", e.stage(), e);
        for object in &created {
            error!("Left in cluster: {}", object);
        }
    }
    result
}

async fn run_stages(
    client: Client,
    config: &Config,
    source: &Kubeconfig,
    cancel: &CancellationToken,
    created: &mut Vec<CreatedObject>,
) -> Result<IssuedCredential> {
    let identity = config.identity.as_str();
    let material = KeyMaterial::generate(identity)?;

    check_canceled(cancel, Stage::Submission)?;
    let submitted = submit_signing_request(&client, identity, material.csr_pem()).await?;
    created.push(CreatedObject {
        kind: "CertificateSigningRequest".to_string(),
        namespace: None,
        name: identity.to_string(),
    });

    check_canceled(cancel, Stage::Approval)?;
    approve_signing_request(&client, submitted).await?;

    info!("Waiting for certificate of {} to be issued", identity);
    let certificate = IssuanceWaiter::new(client.clone(), config.poll)
        .wait_for_certificate(identity, cancel)
        .await?;

    check_canceled(cancel, Stage::ScopeProvisioning)?;
    let scope = provision_scope(&client, identity, created).await?;

    check_canceled(cancel, Stage::ProfileWrite)?;
    let profile_path = write_user_profile(
        source,
        config.context.as_deref(),
        identity,
        &certificate,
        material.private_key_pem(),
        &config.output_dir,
    )?;

    info!("User {} created, kubeconfig at {}", identity, profile_path.display());
    Ok(IssuedCredential {
        identity: identity.to_string(),
        scope,
        profile_path,
    })
}

/// Stages are not interrupted midway; a cancel takes effect before the next one starts
fn check_canceled(cancel: &CancellationToken, next: Stage) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(KlstrError::Canceled(next));
    }
    Ok(())
}
