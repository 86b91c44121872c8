// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use crate::configuration::BrokerOptions;
use crate::constants::MAX_REQUEST_BODY_SIZE;
use crate::cooldown::CooldownGate;
use crate::errors::AppError;
use crate::handler::CredentialRequestHandler;
use crate::routes;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::serve::Serve;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct AppState {
    pub handler: CredentialRequestHandler,
    pub cooldown: Arc<CooldownGate>,
}

impl AppState {
    pub fn new(options: BrokerOptions, cooldown: Arc<CooldownGate>) -> Result<Self, AppError> {
        let handler = CredentialRequestHandler::new(&options, cooldown.clone())?;

        Ok(Self { handler, cooldown })
    }
}

pub struct Application {
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(
        options: BrokerOptions,
        cooldown: Arc<CooldownGate>,
    ) -> Result<Self, AppError> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;
        let host = options.host.clone();
        let server = run(listener, options, cooldown)?;
        let port = server.local_addr()?.port();

        tracing::info!("[broker] listening at http://{}:{}", host, port);

        Ok(Self { server })
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Builds the router with the same layers production uses.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/commands", get(routes::list_commands))
        .route("/messages", post(routes::post_message))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .with_state(state)
}

#[tracing::instrument(skip(listener, cooldown))]
pub fn run(
    listener: TcpListener,
    options: BrokerOptions,
    cooldown: Arc<CooldownGate>,
) -> Result<Serve<TcpListener, Router, Router>, AppError> {
    let state = Arc::new(AppState::new(options, cooldown)?);
    let app = create_router(state);

    Ok(axum::serve(listener, app))
}
