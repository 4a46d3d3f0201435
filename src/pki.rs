// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Key pair and certificate signing request generation for new identities.

use crate::error::{KlstrError, Result};
use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue, KeyPair, PKCS_ECDSA_P256_SHA256};
use tracing::{debug, instrument};

/// Longest name accepted, since the identity also names its namespace
const MAX_IDENTITY_LEN: usize = 63;

/// Private key and CSR for one identity. The key only leaves the process inside the written profile.
pub struct KeyMaterial {
    name: String,
    key_pem: String,
    csr_pem: String,
}

impl KeyMaterial {
    /// Generate a P-256 key pair and a CSR whose subject CN is `name`
    #[instrument]
    pub fn generate(name: &str) -> Result<Self> {
        validate_identity_name(name)?;

        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| KlstrError::KeyGen(format!("failed to generate key pair: {}", e)))?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(name.to_string()));
        params.distinguished_name = dn;

        let csr = params
            .serialize_request(&key_pair)
            .map_err(|e| KlstrError::KeyGen(format!("failed to create CSR: {}", e)))?;
        let csr_pem = csr
            .pem()
            .map_err(|e| KlstrError::KeyGen(format!("failed to encode CSR: {}", e)))?;

        debug!("Generated key pair and CSR for {}", name);

        Ok(Self {
            name: name.to_string(),
            key_pem: key_pair.serialize_pem(),
            csr_pem,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn csr_pem(&self) -> &[u8] {
        self.csr_pem.as_bytes()
    }

    pub fn private_key_pem(&self) -> &[u8] {
        self.key_pem.as_bytes()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("name", &self.name)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Check that `name` can be used as a CSR name, namespace and role prefix (an RFC 1123 label)
pub fn validate_identity_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| KlstrError::InvalidIdentity {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.len() > MAX_IDENTITY_LEN {
        return Err(invalid("name must be at most 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "name may only contain lowercase letters, digits and '-'",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("name must start and end with a letter or digit"));
    }

    Ok(())
}
