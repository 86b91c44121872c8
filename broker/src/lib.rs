// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Vault Broker
//!
//! Issues short-lived AWS credentials and reads Vault secrets on behalf of
//! chat users.
//!
//! The broker runs on an EC2 instance and authenticates to HashiCorp Vault
//! with the instance identity document, so it holds no long-lived secret of
//! its own.
//!
//! ## Architecture
//!
//! ```text
//! Chat adapter -> HTTP API -> Broker (this crate) -> Vault
//!                                  |
//!                                  +-> IMDS (identity document)
//! ```
//!
//! For every command the broker:
//!
//! - **Dispatches** the chat text into a typed command
//! - **Rate limits** credential generation per user and account
//! - **Logs in** to Vault with the signed identity document (`aws` auth)
//! - **Reads** the credential or secret path with the session token
//! - **Delivers** the result privately, whatever channel the request came from
//!
//! ## Modules
//!
//! - [`application`]: HTTP server setup with Axum
//! - [`commands`]: Chat text dispatch into [`commands::Command`]
//! - [`configuration`]: CLI argument parsing with clap
//! - [`constants`]: Configuration constants for the application
//! - [`cooldown`]: Per-requester cool-down for credential generation
//! - [`errors`]: Request outcome and HTTP error types
//! - [`handler`]: Credential and secret request orchestration
//! - [`imds`]: Instance identity from the EC2 Instance Metadata Service
//! - [`messenger`]: Outbound chat delivery
//! - [`models`]: Wire and domain types
//! - [`routes`]: HTTP route handlers (health, commands, messages)
//! - [`vault`]: Vault login and reads
//!
//! ## Usage
//!
//! ```bash
//! vault-broker --vault-server vault.internal --vault-port 8200
//! ```
//!
//! ## Security Considerations
//!
//! - Credentials and secrets are only ever sent as private messages
//! - Secret reads requested from shared rooms are refused before any login
//! - Session tokens and credentials are zeroized on drop and redacted in logs
//! - Every outbound call is bounded by the configured request timeout

pub mod application;
pub mod commands;
pub mod configuration;
pub mod constants;
pub mod cooldown;
pub mod errors;
pub mod handler;
pub mod imds;
pub mod messenger;
pub mod models;
pub mod routes;
pub mod vault;

#[cfg(test)]
pub(crate) mod testutil;
