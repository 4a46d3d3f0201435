// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod pipeline;
pub mod pki;
pub mod profile;

#[cfg(test)]
mod test_utils;
