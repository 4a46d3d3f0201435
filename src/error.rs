// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KlstrError {
    #[error("Invalid identity name '{name}': {reason}")]
    InvalidIdentity { name: String, reason: String },

    #[error("Key generation failed: {0}")]
    KeyGen(String),

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("Signing request '{0}' already exists")]
    SigningRequestExists(String),

    #[error("Signing request submission failed: {0}")]
    Submission(String),

    #[error("Signing request approval failed: {0}")]
    Approval(String),

    #[error("Certificate for '{name}' was not issued within {waited:?}")]
    IssuanceTimedOut { name: String, waited: Duration },

    #[error("Waiting for certificate '{0}' was canceled")]
    IssuanceCanceled(String),

    #[error("Certificate for '{name}' will not be issued: {reason}")]
    IssuanceRejected { name: String, reason: String },

    #[error("Canceled before {0}")]
    Canceled(Stage),

    #[error("Scope provisioning failed: {0}")]
    ScopeProvision(String),

    #[error("Failed to write client profile: {0}")]
    ProfileWrite(String),
}

/// Pipeline stage an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    KeyGeneration,
    Connection,
    Submission,
    Approval,
    Issuance,
    ScopeProvisioning,
    ProfileWrite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::KeyGeneration => "key generation",
            Stage::Connection => "connection",
            Stage::Submission => "submission",
            Stage::Approval => "approval",
            Stage::Issuance => "issuance",
            Stage::ScopeProvisioning => "scope provisioning",
            Stage::ProfileWrite => "profile write",
        };
        f.write_str(name)
    }
}

impl KlstrError {
    pub fn stage(&self) -> Stage {
        match self {
            KlstrError::InvalidIdentity { .. } => Stage::Validation,
            KlstrError::KeyGen(_) => Stage::KeyGeneration,
            KlstrError::Kubeconfig(_) => Stage::Connection,
            KlstrError::SigningRequestExists(_) | KlstrError::Submission(_) => Stage::Submission,
            KlstrError::Approval(_) => Stage::Approval,
            KlstrError::IssuanceTimedOut { .. }
            | KlstrError::IssuanceCanceled(_)
            | KlstrError::IssuanceRejected { .. } => Stage::Issuance,
            KlstrError::Canceled(stage) => *stage,
            KlstrError::ScopeProvision(_) => Stage::ScopeProvisioning,
            KlstrError::ProfileWrite(_) => Stage::ProfileWrite,
        }
    }

    /// Only a timed out or interrupted run can succeed by running again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KlstrError::IssuanceTimedOut { .. }
                | KlstrError::IssuanceCanceled(_)
                | KlstrError::Canceled(_)
        )
    }
}

/// Returns true if the error is a Kubernetes API response with the given status code
pub fn is_api_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == code)
}

pub type Result<T> = std::result::Result<T, KlstrError>;
