// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Vault client for the `aws` auth method.
//!
//! # Login
//!
//! [`AuthClient::login`] presents the instance identity to
//! `POST /v1/auth/aws/login`:
//!
//! ```json
//! {"role": "<role>", "pkcs7": "<signed document>", "nonce": "<account id>"}
//! ```
//!
//! A `200` response carries `{"auth": {"client_token": "..."}}`. Every other
//! result (identity unavailable, transport failure, other status, malformed
//! body) leaves the client without a token. There is no retry and no refresh;
//! each request logs in again.
//!
//! # Reads
//!
//! [`SecretReader`] sends `GET /v1/{path}` with the `X-Vault-Token` header.
//! AWS credentials are minted by reading `{env}/creds/{env}-swe`.

use reqwest::StatusCode;
use serde_json::Value;

use crate::commands::Environment;
use crate::constants::{VAULT_LOGIN_PATH, VAULT_TOKEN_HEADER};
use crate::errors::BrokerError;
use crate::imds::IdentityDocumentSource;
use crate::models::{LoginRequest, LoginResponse, SessionToken, TemporaryCredential};

/// Result of a single login attempt.
#[derive(Debug)]
pub struct AuthClient {
    token: Option<SessionToken>,
}

impl AuthClient {
    /// Logs in to Vault as `role`. Never fails; check [`AuthClient::token`].
    #[tracing::instrument(skip(http, identity))]
    pub async fn login(
        http: &reqwest::Client,
        vault_address: &str,
        role: &str,
        identity: &IdentityDocumentSource,
    ) -> Self {
        match authenticate(http, vault_address, role, identity).await {
            Ok(token) => {
                tracing::info!("[broker] obtained Vault token for role {}", role);
                Self { token: Some(token) }
            }
            Err(e) => {
                tracing::warn!("[broker] Vault login failed for role {}: {}", role, e);
                Self { token: None }
            }
        }
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    pub fn into_token(self) -> Option<SessionToken> {
        self.token
    }
}

async fn authenticate(
    http: &reqwest::Client,
    vault_address: &str,
    role: &str,
    identity: &IdentityDocumentSource,
) -> Result<SessionToken, BrokerError> {
    let proof = identity.fetch_proof().await?;

    let payload = LoginRequest {
        role,
        pkcs7: &proof.signed_document,
        nonce: &proof.account_id,
    };

    let response = http
        .post(format!("{vault_address}/{VAULT_LOGIN_PATH}"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("[broker] login request failed: {}", e);
            BrokerError::AuthenticationFailed
        })?;

    if response.status() != StatusCode::OK {
        tracing::warn!("[broker] login rejected with status {}", response.status());
        return Err(BrokerError::AuthenticationFailed);
    }

    let body: LoginResponse = response.json().await.map_err(|e| {
        tracing::error!("[broker] malformed login response: {}", e);
        BrokerError::AuthenticationFailed
    })?;

    Ok(SessionToken {
        value: body.auth.client_token,
        role: role.to_string(),
    })
}

/// Reads secrets and mints credentials with a session token.
#[derive(Debug, Clone)]
pub struct SecretReader {
    http: reqwest::Client,
    vault_address: String,
}

impl SecretReader {
    pub fn new(http: reqwest::Client, vault_address: impl Into<String>) -> Self {
        Self {
            http,
            vault_address: vault_address.into(),
        }
    }

    /// Returns the JSON body stored at `path`, or `None` on any failure.
    #[tracing::instrument(skip(self, token))]
    pub async fn read_path(&self, token: &SessionToken, path: &str) -> Option<Value> {
        let url = format!(
            "{}/v1/{}",
            self.vault_address,
            path.trim().trim_start_matches('/')
        );

        let response = match self
            .http
            .get(url)
            .header(VAULT_TOKEN_HEADER, token.value.as_str())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("[broker] read request failed: {}", e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::warn!("[broker] read returned status {}", response.status());
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::error!("[broker] malformed read response: {}", e);
                None
            }
        }
    }

    /// Returns `data.value` at `path`. Non-string values come back as JSON
    /// text.
    pub async fn read_value(&self, token: &SessionToken, path: &str) -> Option<String> {
        let body = self.read_path(token, path).await?;
        match body.get("data")?.get("value")? {
            Value::String(value) => Some(value.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Mints temporary AWS credentials for `environment`.
    ///
    /// Returns a credential only when both keys are present.
    #[tracing::instrument(skip(self, token))]
    pub async fn generate_aws_keys(
        &self,
        token: &SessionToken,
        environment: Environment,
    ) -> Option<TemporaryCredential> {
        let body = self
            .read_path(token, &environment.credentials_path())
            .await?;
        let data = body.get("data")?;

        let access_key = data.get("access_key")?.as_str()?;
        let secret_key = data.get("secret_key")?.as_str()?;

        Some(TemporaryCredential {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}
