// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Certificate signing request claims
pub mod csr {
    /// Built-in signer for client certificates trusted by the API server
    pub const SIGNER_NAME: &str = "kubernetes.io/kube-apiserver-client";
    /// Group claim carried by every request
    pub const AUTHENTICATED_GROUP: &str = "system:authenticated";
    /// The only usage requested
    pub const USAGE_CLIENT_AUTH: &str = "client auth";
    /// Label put on submitted requests
    pub const LABEL_KEY: &str = "name";
    pub const LABEL_VALUE: &str = "username";

    pub const CONDITION_APPROVED: &str = "Approved";
    pub const CONDITION_DENIED: &str = "Denied";
    pub const CONDITION_FAILED: &str = "Failed";
    pub const APPROVAL_REASON: &str = "AutoApproved";
    pub const APPROVAL_MESSAGE: &str =
        "This CSR was generated and automatically approved by klstr";
}

/// Issuance polling configuration
pub mod issuance {
    /// Initial polling interval in seconds while waiting for the certificate
    pub const POLL_INTERVAL_SECS: u64 = 1;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 10;
    /// Give up waiting after this many seconds
    pub const TIMEOUT_SECS: u64 = 300;
}

/// RBAC naming for the per-identity scope
pub mod rbac {
    pub const API_GROUP: &str = "rbac.authorization.k8s.io";
    pub const ROLE_KIND: &str = "Role";
    pub const USER_KIND: &str = "User";
    pub const WILDCARD: &str = "*";
    pub const ROLE_SUFFIX: &str = "-manager";
    pub const ROLE_BINDING_SUFFIX: &str = "-manager-binding";
}

/// Suffix of the written client profile, prefixed by the identity name
pub const PROFILE_FILE_SUFFIX: &str = "-config.yaml";
