// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Private namespace, role and role binding for a new identity

use crate::constants::rbac::{
    API_GROUP, ROLE_BINDING_SUFFIX, ROLE_KIND, ROLE_SUFFIX, USER_KIND, WILDCARD,
};
use crate::error::{is_api_status, KlstrError, Result};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{info, instrument, warn};

/// Names of the objects granting an identity control of its own namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationScope {
    pub identity: String,
    pub namespace: String,
    pub role: String,
    pub role_binding: String,
}

impl AuthorizationScope {
    pub fn for_identity(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            namespace: identity.to_string(),
            role: format!("{}{}", identity, ROLE_SUFFIX),
            role_binding: format!("{}{}", identity, ROLE_BINDING_SUFFIX),
        }
    }

    pub fn namespace_object(&self) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(self.namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// All verbs on all resources of all API groups, inside the namespace only
    pub fn role_object(&self) -> Role {
        Role {
            metadata: ObjectMeta {
                name: Some(self.role.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            rules: Some(vec![PolicyRule {
                api_groups: Some(vec![WILDCARD.to_string()]),
                resources: Some(vec![WILDCARD.to_string()]),
                verbs: vec![WILDCARD.to_string()],
                ..Default::default()
            }]),
        }
    }

    pub fn role_binding_object(&self) -> RoleBinding {
        RoleBinding {
            metadata: ObjectMeta {
                name: Some(self.role_binding.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            role_ref: RoleRef {
                api_group: API_GROUP.to_string(),
                kind: ROLE_KIND.to_string(),
                name: self.role.clone(),
            },
            subjects: Some(vec![Subject {
                api_group: Some(API_GROUP.to_string()),
                kind: USER_KIND.to_string(),
                name: self.identity.clone(),
                namespace: None,
            }]),
        }
    }
}

/// A scope object created by this run, for cleanup reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl std::fmt::Display for CreatedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Create the namespace, role and role binding in that order.
///
/// The namespace must not exist yet: the role grants everything inside it, so an existing
/// namespace such as `default` is never handed over. The first failure, an existing object
/// included, stops provisioning; objects created before it stay in the cluster and are listed
/// in `created`.
#[instrument(skip(client, created))]
pub async fn provision_scope(
    client: &Client,
    identity: &str,
    created: &mut Vec<CreatedObject>,
) -> Result<AuthorizationScope> {
    let scope = AuthorizationScope::for_identity(identity);

    let namespaces: Api<Namespace> = Api::all(client.clone());
    create_new(&namespaces, &scope.namespace_object(), created).await?;

    let roles: Api<Role> = Api::namespaced(client.clone(), &scope.namespace);
    create_new(&roles, &scope.role_object(), created).await?;

    let bindings: Api<RoleBinding> = Api::namespaced(client.clone(), &scope.namespace);
    create_new(&bindings, &scope.role_binding_object(), created).await?;

    info!(
        "User {} scoped to namespace {} via {}",
        identity, scope.namespace, scope.role_binding
    );
    Ok(scope)
}

async fn create_new<K>(api: &Api<K>, object: &K, created: &mut Vec<CreatedObject>) -> Result<()>
where
    K: Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned,
{
    let kind = K::kind(&()).to_string();
    let name = object.meta().name.clone().unwrap_or_default();
    let namespace = object.meta().namespace.clone();

    match api.create(&PostParams::default(), object).await {
        Ok(_) => {
            info!("Created {} {}", kind, name);
            created.push(CreatedObject {
                kind,
                namespace,
                name,
            });
            Ok(())
        }
        Err(e) if is_api_status(&e, 409) => {
            warn!("{} {} already exists, refusing to take it over", kind, name);
            Err(KlstrError::ScopeProvision(format!(
                "{} {} already exists",
                kind, name
            )))
        }
        Err(e) => Err(KlstrError::ScopeProvision(format!(
            "Failed to create {} {}: {}",
            kind, name, e
        ))),
    }
}
