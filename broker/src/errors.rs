// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::commands::Environment;

/// Terminal failure states of a credential or secret request.
///
/// Every variant maps to a fixed message for the requester; none of them
/// abort the request handler.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("instance identity unavailable")]
    IdentityUnavailable,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("failed to generate {environment} credentials")]
    CredentialsUnavailable { environment: Environment },
    #[error("secret unavailable at {path}")]
    SecretUnavailable { path: String },
    #[error("previously generated credentials still valid")]
    CooldownActive,
    #[error("secret requested from a shared channel")]
    ChannelDisallowed,
}

impl BrokerError {
    /// The text shown to the requester for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            Self::IdentityUnavailable | Self::AuthenticationFailed => {
                "Failed to get Vault token, please contact on-call.".to_string()
            }
            Self::CredentialsUnavailable { environment } => format!(
                "Failed to generate {environment} AWS credentials, please contact on-call."
            ),
            Self::SecretUnavailable { path } => {
                format!("Error reading value, does {path} exist?")
            }
            Self::CooldownActive => "Previously generated keys still valid, please re-use.".to_string(),
            Self::ChannelDisallowed => "I do not share secrets in public".to_string(),
        }
    }

    /// Stable snake_case name reported by the HTTP API.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::IdentityUnavailable | Self::AuthenticationFailed => "authentication_failed",
            Self::CredentialsUnavailable { .. } => "credentials_unavailable",
            Self::SecretUnavailable { .. } => "secret_unavailable",
            Self::CooldownActive => "cooldown_active",
            Self::ChannelDisallowed => "channel_disallowed",
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("unrecognized command")]
    UnknownCommand,
    #[error("internal server error")]
    InternalServerError,
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::UnknownCommand => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Unrecognized command".to_string(),
            ),
            Self::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({"code": status.as_u16(), "message": message}));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(source: reqwest::Error) -> Self {
        AppError::ConfigError(source.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(_source: std::io::Error) -> Self {
        tracing::error!("{:?}", _source);
        AppError::InternalServerError
    }
}
