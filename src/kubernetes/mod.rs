// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes side of user creation: client setup, signing requests, issuance and RBAC scope.

pub mod client;
pub mod csr;
pub mod issuance;
pub mod scope;

pub use client::{create_client_from_kubeconfig, load_source_kubeconfig};
pub use csr::{approve_signing_request, submit_signing_request, SigningRequestStatus};
pub use issuance::{IssuanceWaiter, PollPolicy};
pub use scope::{provision_scope, AuthorizationScope, CreatedObject};
