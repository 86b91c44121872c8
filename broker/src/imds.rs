// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

use aws_config::imds::client::Client;

use crate::constants::{IMDS_IDENTITY_DOCUMENT_PATH, IMDS_IDENTITY_PKCS7_PATH, IMDS_TOKEN_TTL};
use crate::errors::{AppError, BrokerError};
use crate::models::{IdentityDocument, IdentityProof};

/// Reads the instance identity from the EC2 Instance Metadata Service.
///
/// Each fetch is a single attempt. Failures are logged and reported as
/// `None`; the caller decides what a missing identity means.
pub struct IdentityDocumentSource {
    client: Client,
}

impl IdentityDocumentSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .endpoint(endpoint)
            .map_err(|e| AppError::ConfigError(e.to_string()))?
            .token_ttl(IMDS_TOKEN_TTL)
            .max_attempts(1)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build();

        Ok(Self { client })
    }

    /// Returns the AWS account id from the identity document.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_account_id(&self) -> Option<String> {
        let document = match self.client.get(IMDS_IDENTITY_DOCUMENT_PATH).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("[broker] failed to fetch identity document: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<IdentityDocument>(document.as_ref()) {
            Ok(document) => Some(document.account_id),
            Err(e) => {
                tracing::warn!("[broker] malformed identity document: {}", e);
                None
            }
        }
    }

    /// Returns the PKCS7 signature of the identity document as a single line.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_signed_document(&self) -> Option<String> {
        match self.client.get(IMDS_IDENTITY_PKCS7_PATH).await {
            Ok(pkcs7) => Some(strip_line_breaks(pkcs7.as_ref())),
            Err(e) => {
                tracing::warn!("[broker] failed to fetch identity signature: {}", e);
                None
            }
        }
    }

    /// Fetches the account id, then the signed document.
    pub async fn fetch_proof(&self) -> Result<IdentityProof, BrokerError> {
        let account_id = self
            .fetch_account_id()
            .await
            .ok_or(BrokerError::IdentityUnavailable)?;
        let signed_document = self
            .fetch_signed_document()
            .await
            .ok_or(BrokerError::IdentityUnavailable)?;

        Ok(IdentityProof {
            account_id,
            signed_document,
        })
    }
}

fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}
