// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

use clap::Parser;

use crate::constants::{
    DEFAULT_COOLDOWN_SECS, DEFAULT_GENERATE_ROLE, DEFAULT_IMDS_ENDPOINT, DEFAULT_READ_ROLE,
    DEFAULT_REQUEST_TIMEOUT_SECS, MAX_COOLDOWN_SECS,
};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct BrokerOptions {
    #[arg(long, default_value = "127.0.0.1", env("BROKER_HTTP_HOST"))]
    pub host: String,
    #[arg(long, default_value = "8080", env("BROKER_HTTP_PORT"))]
    pub port: u16,
    #[arg(long, env("VAULT_SERVER"))]
    pub vault_server: String,
    #[arg(long, env("VAULT_PORT"))]
    pub vault_port: u16,
    #[arg(long, default_value = "https", env("VAULT_SCHEME"))]
    pub vault_scheme: String,
    #[arg(long, default_value = DEFAULT_IMDS_ENDPOINT, env("BROKER_IMDS_ENDPOINT"))]
    pub imds_endpoint: String,
    #[arg(long, default_value = DEFAULT_GENERATE_ROLE, env("BROKER_GENERATE_ROLE"))]
    pub generate_role: String,
    #[arg(long, default_value = DEFAULT_READ_ROLE, env("BROKER_READ_ROLE"))]
    pub read_role: String,
    #[arg(
        long,
        default_value_t = DEFAULT_COOLDOWN_SECS,
        env("BROKER_COOLDOWN_SECS"),
        value_parser = clap::value_parser!(u64).range(..=MAX_COOLDOWN_SECS)
    )]
    pub cooldown_secs: u64,
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env("BROKER_REQUEST_TIMEOUT_SECS"))]
    pub request_timeout_secs: u64,
}

impl BrokerOptions {
    /// Base URL of the Vault server, e.g. `https://vault.internal:8200`.
    pub fn vault_address(&self) -> String {
        format!(
            "{}://{}:{}",
            self.vault_scheme, self.vault_server, self.vault_port
        )
    }

    pub fn cooldown_ttl(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BrokerOptions {
    fn default() -> Self {
        BrokerOptions {
            host: "127.0.0.1".to_string(),
            port: 8080,
            vault_server: "127.0.0.1".to_string(),
            vault_port: 8200,
            vault_scheme: "https".to_string(),
            imds_endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            generate_role: DEFAULT_GENERATE_ROLE.to_string(),
            read_role: DEFAULT_READ_ROLE.to_string(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
