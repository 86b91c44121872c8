// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
pub const IMDS_IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
pub const IMDS_IDENTITY_PKCS7_PATH: &str = "/latest/dynamic/instance-identity/pkcs7";
pub const IMDS_TOKEN_TTL: Duration = Duration::from_secs(300); // 5 minutes

pub const VAULT_LOGIN_PATH: &str = "v1/auth/aws/login";
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

pub const DEFAULT_GENERATE_ROLE: &str = "amy-generate-keys-read-only";
pub const DEFAULT_READ_ROLE: &str = "read-only-production";

pub const DEFAULT_COOLDOWN_SECS: u64 = 3600;
pub const MAX_COOLDOWN_SECS: u64 = 30 * 24 * 3600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const COOLDOWN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// root segment plus four more, e.g. `secret/team/app/env/KEY`
pub const SECRET_ROOT_SEGMENT: &str = "secret";
pub const SECRET_PATH_SEGMENTS: usize = 5;

pub const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024; // 64 KiB
pub const MAX_ROOM_LENGTH: usize = 256;
