// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vault_broker::application::Application;
use vault_broker::configuration::BrokerOptions;
use vault_broker::constants;
use vault_broker::cooldown::CooldownGate;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // this needs to be set to false, otherwise ANSI color codes will
        // show up in a confusing manner in CloudWatch logs.
        .with_ansi(false)
        .with_target(false)
        .init();

    // get configuration options from environment variables
    let options = BrokerOptions::parse();

    tracing::info!("[broker] {:?}", &options);

    // cool-down entries outlive individual requests, so the process owns them
    let cooldown = Arc::new(CooldownGate::new());

    let purger = cooldown.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(constants::COOLDOWN_PURGE_INTERVAL).await;
            let purged = purger.purge_expired();
            tracing::debug!(
                "[broker] purged {} expired cool-down entries, {} active",
                purged,
                purger.len()
            );
        }
    });

    let application = Application::build(options, cooldown).await?;

    application.run_until_stopped().await?;

    Ok(())
}
