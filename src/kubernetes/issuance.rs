// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Waiting for an approved signing request to be issued.
//!
//! Each poll fetches the request and classifies it. The wait ends when a certificate appears,
//! when the request is denied, failed or deleted, when the deadline passes, or when the caller
//! cancels. Time is read from the tokio clock so tests can pause it.

use crate::constants::issuance::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, TIMEOUT_SECS};
use crate::error::{is_api_status, KlstrError, Result};
use crate::kubernetes::csr::SigningRequestStatus;
use k8s_openapi::api::certificates::v1::CertificateSigningRequest;
use kube::{Api, Client};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How often and for how long to poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    /// Exponential backoff cap
    pub max_interval: Duration,
    /// Total time allowed before giving up
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            max_interval: Duration::from_secs(POLL_MAX_INTERVAL_SECS),
            timeout: Duration::from_secs(TIMEOUT_SECS),
        }
    }
}

/// Where a wait currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceState {
    /// Approved, certificate not seen yet
    Waiting { polls: u32, next_interval: Duration },
    Issued(Vec<u8>),
    Rejected(String),
    TimedOut,
    Canceled,
}

impl IssuanceState {
    fn is_terminal(&self) -> bool {
        !matches!(self, IssuanceState::Waiting { .. })
    }
}

/// Outcome of one poll
#[derive(Debug)]
enum Observation {
    Status(SigningRequestStatus),
    Missing,
    Unavailable(String),
}

pub struct IssuanceWaiter {
    csrs: Api<CertificateSigningRequest>,
    policy: PollPolicy,
}

impl IssuanceWaiter {
    pub fn new(client: Client, policy: PollPolicy) -> Self {
        Self {
            csrs: Api::all(client),
            policy,
        }
    }

    /// Poll `name` until its certificate is issued. Returns the certificate bytes.
    #[instrument(skip(self, cancel))]
    pub async fn wait_for_certificate(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut state = IssuanceState::Waiting {
            polls: 0,
            next_interval: self.policy.initial_interval,
        };

        loop {
            state = if cancel.is_cancelled() {
                IssuanceState::Canceled
            } else if Instant::now() >= deadline {
                IssuanceState::TimedOut
            } else {
                // A stalled API server must not outlive the deadline or a cancel
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => IssuanceState::Canceled,
                    observation = self.observe(name) => self.advance(state, observation),
                    _ = sleep_until(deadline) => {
                        warn!("Request for {} still pending at the deadline", name);
                        IssuanceState::TimedOut
                    }
                }
            };

            let IssuanceState::Waiting { polls, next_interval } = &state else {
                break;
            };

            let now = Instant::now();
            let wake_at = (now + *next_interval).min(deadline);
            debug!(
                "Certificate for {} not issued after {} polls, next poll in {:?}",
                name,
                polls,
                wake_at - now
            );

            tokio::select! {
                _ = cancel.cancelled() => state = IssuanceState::Canceled,
                _ = sleep_until(wake_at) => {}
            }
            if state.is_terminal() {
                break;
            }
        }

        match state {
            IssuanceState::Issued(cert) => {
                info!("Certificate for {} issued after {:?}", name, started.elapsed());
                Ok(cert)
            }
            IssuanceState::Rejected(reason) => Err(KlstrError::IssuanceRejected {
                name: name.to_string(),
                reason,
            }),
            IssuanceState::TimedOut => Err(KlstrError::IssuanceTimedOut {
                name: name.to_string(),
                waited: started.elapsed(),
            }),
            IssuanceState::Canceled | IssuanceState::Waiting { .. } => {
                warn!(
                    "Stopped waiting for {}, the approved signing request is left in place",
                    name
                );
                Err(KlstrError::IssuanceCanceled(name.to_string()))
            }
        }
    }

    async fn observe(&self, name: &str) -> Observation {
        match self.csrs.get(name).await {
            Ok(csr) => Observation::Status(SigningRequestStatus::of(&csr)),
            Err(e) if is_api_status(&e, 404) => Observation::Missing,
            Err(e) => Observation::Unavailable(e.to_string()),
        }
    }

    /// Move from `state` given one observation
    fn advance(&self, state: IssuanceState, observation: Observation) -> IssuanceState {
        let IssuanceState::Waiting { polls, next_interval } = state else {
            return state;
        };

        match observation {
            Observation::Status(SigningRequestStatus::Issued(cert)) => {
                return IssuanceState::Issued(cert)
            }
            Observation::Status(SigningRequestStatus::Denied(reason)) => {
                return IssuanceState::Rejected(format!("denied: {}", reason))
            }
            Observation::Status(SigningRequestStatus::Failed(reason)) => {
                return IssuanceState::Rejected(format!("failed: {}", reason))
            }
            Observation::Missing => {
                return IssuanceState::Rejected("signing request no longer exists".to_string())
            }
            Observation::Unavailable(e) => {
                warn!("Error fetching signing request: {}, will retry", e);
            }
            Observation::Status(_) => {}
        }

        let next_interval = if polls == 0 {
            next_interval
        } else {
            (next_interval * 2).min(self.policy.max_interval)
        };
        IssuanceState::Waiting {
            polls: polls + 1,
            next_interval,
        }
    }
}
