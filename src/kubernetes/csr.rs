// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Certificate signing request submission, approval and status.

use crate::constants::csr::{
    APPROVAL_MESSAGE, APPROVAL_REASON, AUTHENTICATED_GROUP, CONDITION_APPROVED, CONDITION_DENIED,
    CONDITION_FAILED, LABEL_KEY, LABEL_VALUE, SIGNER_NAME, USAGE_CLIENT_AUTH,
};
use crate::error::{is_api_status, KlstrError, Result};
use k8s_openapi::api::certificates::v1::{
    CertificateSigningRequest, CertificateSigningRequestCondition, CertificateSigningRequestSpec,
    CertificateSigningRequestStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::chrono::Utc;
use k8s_openapi::ByteString;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Observed state of a signing request, derived from its conditions and certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningRequestStatus {
    Submitted,
    Approved,
    Issued(Vec<u8>),
    Denied(String),
    Failed(String),
}

impl SigningRequestStatus {
    pub fn of(csr: &CertificateSigningRequest) -> Self {
        let Some(status) = csr.status.as_ref() else {
            return SigningRequestStatus::Submitted;
        };

        if let Some(cert) = status.certificate.as_ref().filter(|c| !c.0.is_empty()) {
            return SigningRequestStatus::Issued(cert.0.clone());
        }

        let conditions = status.conditions.as_deref().unwrap_or_default();
        let active = |kind: &str| {
            conditions
                .iter()
                .find(|c| c.type_ == kind && c.status == "True")
                .map(describe_condition)
        };

        if let Some(reason) = active(CONDITION_DENIED) {
            SigningRequestStatus::Denied(reason)
        } else if let Some(reason) = active(CONDITION_FAILED) {
            SigningRequestStatus::Failed(reason)
        } else if active(CONDITION_APPROVED).is_some() {
            SigningRequestStatus::Approved
        } else {
            SigningRequestStatus::Submitted
        }
    }
}

fn describe_condition(c: &CertificateSigningRequestCondition) -> String {
    match (c.reason.as_deref(), c.message.as_deref()) {
        (Some(reason), Some(message)) => format!("{}: {}", reason, message),
        (Some(text), None) | (None, Some(text)) => text.to_string(),
        (None, None) => c.type_.clone(),
    }
}

/// Build the signing request for `name` carrying the PEM encoded `csr_pem`
pub fn build_signing_request(name: &str, csr_pem: &[u8]) -> CertificateSigningRequest {
    CertificateSigningRequest {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                LABEL_KEY.to_string(),
                LABEL_VALUE.to_string(),
            )])),
            ..Default::default()
        },
        spec: CertificateSigningRequestSpec {
            request: ByteString(csr_pem.to_vec()),
            signer_name: SIGNER_NAME.to_string(),
            groups: Some(vec![AUTHENTICATED_GROUP.to_string()]),
            usages: Some(vec![USAGE_CLIENT_AUTH.to_string()]),
            ..Default::default()
        },
        status: None,
    }
}

/// Submit a new signing request. The name must not already be taken.
#[instrument(skip(client, csr_pem))]
pub async fn submit_signing_request(
    client: &Client,
    name: &str,
    csr_pem: &[u8],
) -> Result<CertificateSigningRequest> {
    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    let request = build_signing_request(name, csr_pem);

    match csrs.create(&PostParams::default(), &request).await {
        Ok(created) => {
            info!("Created signing request {}", created.name_any());
            Ok(created)
        }
        Err(e) if is_api_status(&e, 409) => Err(KlstrError::SigningRequestExists(name.to_string())),
        Err(e) => Err(KlstrError::Submission(format!(
            "Failed to create signing request {}: {}",
            name, e
        ))),
    }
}

/// Append an approved condition to `csr`
pub fn with_approval(mut csr: CertificateSigningRequest) -> CertificateSigningRequest {
    let condition = CertificateSigningRequestCondition {
        type_: CONDITION_APPROVED.to_string(),
        status: "True".to_string(),
        reason: Some(APPROVAL_REASON.to_string()),
        message: Some(APPROVAL_MESSAGE.to_string()),
        last_update_time: Some(Time(Utc::now())),
        ..Default::default()
    };

    csr.status
        .get_or_insert_with(CertificateSigningRequestStatus::default)
        .conditions
        .get_or_insert_with(Vec::new)
        .push(condition);
    csr
}

/// Approve a submitted signing request on behalf of the caller
#[instrument(skip(client, csr), fields(csr = %csr.name_any()))]
pub async fn approve_signing_request(
    client: &Client,
    csr: CertificateSigningRequest,
) -> Result<CertificateSigningRequest> {
    let name = csr.name_any();
    let csrs: Api<CertificateSigningRequest> = Api::all(client.clone());
    let approved = with_approval(csr);

    let data = serde_json::to_vec(&approved).map_err(|e| {
        KlstrError::Approval(format!("Failed to encode signing request {}: {}", name, e))
    })?;

    let updated = csrs
        .replace_subresource("approval", &name, &PostParams::default(), data)
        .await
        .map_err(|e| {
            KlstrError::Approval(format!("Failed to approve signing request {}: {}", name, e))
        })?;

    debug!("Signing request {} is now {:?}", name, SigningRequestStatus::of(&updated));
    info!("Approved signing request {}", name);
    Ok(updated)
}
