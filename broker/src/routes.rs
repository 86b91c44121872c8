// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the broker API.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `/health` | [`health`] | Health check endpoint |
//! | GET | `/commands` | [`list_commands`] | Supported chat commands |
//! | POST | `/messages` | [`post_message`] | Handle one inbound chat message |

use std::sync::Arc;

use crate::application::AppState;
use crate::commands::{self, CommandHelp, parse_command};
use crate::errors::AppError;
use crate::messenger::{DeliveryLog, RequestContext, Requester};
use crate::models::{InboundMessage, MessageResponse};

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use validator::Validate;

/// Health check endpoint.
///
/// # Response
///
/// ```json
/// {"status": "ok", "active_cooldowns": 0}
/// ```
///
/// `active_cooldowns` counts tracked cool-down entries, including lapsed ones
/// the purge task has not dropped yet.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({"status": "ok", "active_cooldowns": state.cooldown.len()}))
}

/// Lists the chat commands understood by [`post_message`].
pub async fn list_commands() -> Json<Vec<CommandHelp>> {
    Json(commands::help())
}

/// Handles one chat message relayed by the chat adapter.
///
/// # Request Flow
///
/// 1. Validate the incoming [`InboundMessage`]
/// 2. Parse the text into a command
/// 3. Run the command, recording every message it sends
/// 4. Return the outcome and the recorded deliveries for the adapter to post
///
/// Refusals (cool-down, failed login, shared-room secret reads, ...) are
/// normal outcomes and answered with `200`.
///
/// # Errors
///
/// - [`AppError::ValidationError`] - Request validation failed
/// - [`AppError::UnknownCommand`] - The text matches no command
#[tracing::instrument(skip(state, message), fields(nick = %message.nick))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<InboundMessage>,
) -> Result<Json<MessageResponse>, AppError> {
    // 1. Validate incoming message
    message.validate().map_err(|e| {
        tracing::error!("[broker] validation failed: {}", e);
        AppError::ValidationError(e.to_string())
    })?;
    message.validate_room().map_err(AppError::ValidationError)?;

    // 2. Dispatch
    let command = parse_command(&message.text).ok_or(AppError::UnknownCommand)?;
    tracing::debug!("[broker] dispatching {:?}", command);

    let context = RequestContext {
        requester: Requester {
            nick: message.nick,
            user_id: message.user_id,
        },
        channel: message.channel,
        room: message.room,
    };

    // 3. Handle
    let log = DeliveryLog::new();
    let outcome = match state.handler.handle(command, &context, &log).await {
        Ok(disclosure) => disclosure.outcome(),
        Err(e) => e.outcome(),
    };

    tracing::info!("[broker] request finished with outcome {}", outcome);

    // 4. Respond
    Ok(Json(MessageResponse {
        outcome: outcome.to_string(),
        deliveries: log.into_deliveries(),
    }))
}
