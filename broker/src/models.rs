// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::ZeroizeOnDrop;

use crate::constants::MAX_ROOM_LENGTH;
use crate::messenger::{ChannelKind, Delivery};

/// Proof of the instance's identity, presented once to the Vault login
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProof {
    pub account_id: String,
    /// PKCS7 envelope with line breaks removed.
    pub signed_document: String,
}

/// The subset of the instance identity document that is needed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct IdentityDocument {
    #[serde(rename = "accountId")]
    pub account_id: String,
}

#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionToken {
    pub value: String,
    pub role: String,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct TemporaryCredential {
    pub access_key: String,
    pub secret_key: String,
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for TemporaryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredential")
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /v1/auth/aws/login`.
///
/// `nonce` carries the account id. The field name is what the login endpoint
/// expects; the value is not single-use.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub role: &'a str,
    pub pkcs7: &'a str,
    pub nonce: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    pub auth: LoginAuth,
}

#[derive(Deserialize)]
pub(crate) struct LoginAuth {
    pub client_token: String,
}

/// An inbound chat message as handed over by the chat adapter.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InboundMessage {
    #[validate(length(min = 1, max = 256))]
    pub nick: String,

    #[validate(length(min = 1, max = 256))]
    pub user_id: String,

    pub channel: ChannelKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    #[validate(length(min = 1, max = 4096))]
    pub text: String,
}

impl InboundMessage {
    /// Room checks that field-level validation cannot express.
    pub fn validate_room(&self) -> Result<(), String> {
        match (&self.channel, &self.room) {
            (ChannelKind::Shared, None) => Err("room: required for shared channels".to_string()),
            (_, Some(room)) if room.is_empty() || room.len() > MAX_ROOM_LENGTH => {
                Err("room: length".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub outcome: String,
    pub deliveries: Vec<Delivery>,
}
