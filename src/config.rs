// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::issuance::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, TIMEOUT_SECS};
use crate::kubernetes::issuance::PollPolicy;

#[derive(Parser, Debug)]
#[command(name = "klstr", version, about = "friendly neighborhood kubernetes helper")]
pub struct Cli {
    /// Kubeconfig used to reach the cluster and as the source of the new profile.
    /// Defaults to `$KUBECONFIG`, then `~/.kube/config`.
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Context to use instead of the kubeconfig's current context
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage cluster users
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// Create a user with its own namespace and write a kubeconfig for it
    Create(CreateUserArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateUserArgs {
    /// Name of the user, also used for its namespace
    #[arg(long)]
    pub name: String,

    /// Directory the new kubeconfig is written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Seconds to wait for the certificate to be issued
    #[arg(long, env = "KLSTR_ISSUANCE_TIMEOUT_SECS", default_value_t = TIMEOUT_SECS)]
    pub timeout: u64,

    /// Initial seconds between polls for the issued certificate
    #[arg(long, default_value_t = POLL_INTERVAL_SECS)]
    pub poll_interval: u64,

    /// Upper bound on seconds between polls
    #[arg(long, default_value_t = POLL_MAX_INTERVAL_SECS)]
    pub max_poll_interval: u64,
}

/// Everything a single user creation needs, built once per invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity name of the user being created
    pub identity: String,
    /// Source kubeconfig, `None` falls back to the default lookup
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub output_dir: PathBuf,
    pub poll: PollPolicy,
}

impl Config {
    pub fn from_args(
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
        args: CreateUserArgs,
    ) -> Self {
        let initial = args.poll_interval.max(1);
        let poll = PollPolicy {
            initial_interval: Duration::from_secs(initial),
            max_interval: Duration::from_secs(args.max_poll_interval.max(initial)),
            timeout: Duration::from_secs(args.timeout),
        };

        Config {
            identity: args.name,
            kubeconfig,
            context,
            output_dir: args.output_dir,
            poll,
        }
    }
}
