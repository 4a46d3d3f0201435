// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Client profile (kubeconfig) assembly for a newly issued identity.

use crate::constants::PROFILE_FILE_SUFFIX;
use crate::error::{KlstrError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use kube::config::{AuthInfo, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Name of the context created for `identity` on `cluster`
pub fn context_name(identity: &str, cluster: &str) -> String {
    format!("{}@{}", identity, cluster)
}

/// File the profile for `identity` is written to inside `dir`
pub fn profile_path(dir: &Path, identity: &str) -> PathBuf {
    dir.join(format!("{}{}", identity, PROFILE_FILE_SUFFIX))
}

/// Copy the cluster entry referenced by `context` (or the current context) of `source`
pub fn resolve_source_cluster(source: &Kubeconfig, context: Option<&str>) -> Result<NamedCluster> {
    let context_name = context
        .map(str::to_string)
        .or_else(|| source.current_context.clone())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| KlstrError::ProfileWrite("source kubeconfig has no current context".to_string()))?;

    let cluster_name = source
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .and_then(|c| c.context.as_ref())
        .map(|c| c.cluster.clone())
        .ok_or_else(|| {
            KlstrError::ProfileWrite(format!("context {} not found in source kubeconfig", context_name))
        })?;

    source
        .clusters
        .iter()
        .find(|c| c.name == cluster_name)
        .cloned()
        .ok_or_else(|| {
            KlstrError::ProfileWrite(format!(
                "cluster {} referenced by context {} not found in source kubeconfig",
                cluster_name, context_name
            ))
        })
}

/// Add `identity` to `profile`: the cluster entry, a user carrying the certificate and key, and
/// a context defaulting to the identity's namespace, which becomes current. Entries with the same
/// names are replaced, everything else is kept. Returns the new context name.
pub fn merge_identity(
    profile: &mut Kubeconfig,
    cluster: &NamedCluster,
    identity: &str,
    certificate_pem: &[u8],
    key_pem: &[u8],
) -> Result<String> {
    let auth_info: AuthInfo = serde_json::from_value(serde_json::json!({
        "client-certificate-data": STANDARD.encode(certificate_pem),
        "client-key-data": STANDARD.encode(key_pem),
    }))
    .map_err(|e| KlstrError::ProfileWrite(format!("Failed to build user entry: {}", e)))?;

    let context: Context = serde_json::from_value(serde_json::json!({
        "cluster": cluster.name,
        "user": identity,
        "namespace": identity,
    }))
    .map_err(|e| KlstrError::ProfileWrite(format!("Failed to build context entry: {}", e)))?;

    let ctx_name = context_name(identity, &cluster.name);

    upsert(&mut profile.clusters, cluster.clone(), |c| &c.name);
    upsert(
        &mut profile.auth_infos,
        NamedAuthInfo {
            name: identity.to_string(),
            auth_info: Some(auth_info),
        },
        |a| &a.name,
    );
    upsert(
        &mut profile.contexts,
        NamedContext {
            name: ctx_name.clone(),
            context: Some(context),
        },
        |c| &c.name,
    );
    profile.current_context = Some(ctx_name.clone());

    Ok(ctx_name)
}

fn upsert<T>(entries: &mut Vec<T>, entry: T, name: impl Fn(&T) -> &String) {
    match entries.iter_mut().find(|e| name(e) == name(&entry)) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

/// A fresh profile holding only `identity`'s cluster, user and context
pub fn build_profile(
    source: &Kubeconfig,
    context: Option<&str>,
    identity: &str,
    certificate_pem: &[u8],
    key_pem: &[u8],
) -> Result<Kubeconfig> {
    let cluster = resolve_source_cluster(source, context)?;
    let mut profile = Kubeconfig {
        api_version: Some("v1".to_string()),
        kind: Some("Config".to_string()),
        ..Default::default()
    };
    merge_identity(&mut profile, &cluster, identity, certificate_pem, key_pem)?;
    Ok(profile)
}

/// Read a profile previously written to `path`
pub fn read_profile(path: &Path) -> Result<Kubeconfig> {
    Kubeconfig::read_from(path)
        .map_err(|e| KlstrError::ProfileWrite(format!("Failed to read {}: {}", path.display(), e)))
}

/// Serialize `profile` to `path`, replacing any existing file. The file holds a private key and
/// is only readable by its owner.
pub fn write_profile(profile: &Kubeconfig, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(profile)
        .map_err(|e| KlstrError::ProfileWrite(format!("Failed to serialize profile: {}", e)))?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|e| KlstrError::ProfileWrite(format!("Failed to open {}: {}", path.display(), e)))?;

    // `mode` only applies to new files, an existing one keeps its bits until restricted here
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600)).map_err(|e| {
            KlstrError::ProfileWrite(format!("Failed to restrict {}: {}", path.display(), e))
        })?;
    }

    file.write_all(yaml.as_bytes())
        .map_err(|e| KlstrError::ProfileWrite(format!("Failed to write {}: {}", path.display(), e)))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Build the profile for `identity` and write it to `<output_dir>/<identity>-config.yaml`
#[instrument(skip(source, certificate_pem, key_pem))]
pub fn write_user_profile(
    source: &Kubeconfig,
    context: Option<&str>,
    identity: &str,
    certificate_pem: &[u8],
    key_pem: &[u8],
    output_dir: &Path,
) -> Result<PathBuf> {
    let profile = build_profile(source, context, identity, certificate_pem, key_pem)?;
    let path = profile_path(output_dir, identity);
    write_profile(&profile, &path)?;

    info!(
        "Wrote kubeconfig for {} to {} (context {})",
        identity,
        path.display(),
        profile.current_context.as_deref().unwrap_or_default()
    );
    Ok(path)
}
