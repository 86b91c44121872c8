// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Command dispatch for inbound chat text.
//!
//! Free text is matched here, once, and turned into a [`Command`]. Everything
//! downstream of this module works with the structured command only.
//!
//! | Text | Command |
//! |------|---------|
//! | `generate aws keys [production\|staging]` | [`Command::GenerateAwsKeys`] |
//! | `get secret/a/b/c/KEY from vault` | [`Command::ReadSecret`] |

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::constants::{SECRET_PATH_SEGMENTS, SECRET_ROOT_SEGMENT};

// Command words match case-insensitively; arguments are compared as given.
#[allow(clippy::expect_used)]
static GENERATE_AWS_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^generate aws keys?(?:\s+(?P<account>.*))?$")
        .expect("command pattern should always compile")
});

#[allow(clippy::expect_used)]
static READ_SECRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^get\s*(?P<path>secret/\S+)\s+from\s+(?:consul|vault|backend)\b")
        .expect("command pattern should always compile")
});

/// AWS account a credential set is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
}

impl Environment {
    /// Only the literal `production` selects production; anything else,
    /// including no argument at all, falls back to staging.
    pub fn from_argument(argument: &str) -> Self {
        if argument.trim() == "production" {
            Self::Production
        } else {
            Self::Staging
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
        }
    }

    /// Vault path of the role that mints credentials for this account.
    pub fn credentials_path(&self) -> String {
        let name = self.as_str();
        format!("{name}/creds/{name}-swe")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structurally valid secret path: `secret` followed by exactly four
/// non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPath(String);

impl SecretPath {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let segments: Vec<&str> = path.split('/').collect();

        if segments.len() != SECRET_PATH_SEGMENTS || segments[0] != SECRET_ROOT_SEGMENT {
            return None;
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || s.chars().any(char::is_whitespace))
        {
            return None;
        }

        Some(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GenerateAwsKeys { environment: Environment },
    ReadSecret { path: SecretPath },
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandHelp {
    pub usage: &'static str,
    pub description: &'static str,
}

/// Matches inbound text against the supported commands.
///
/// Returns `None` for unrecognized text and for secret paths that do not
/// have the expected shape.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();

    if let Some(captures) = GENERATE_AWS_KEYS.captures(text) {
        let account = captures.name("account").map_or("", |m| m.as_str());
        return Some(Command::GenerateAwsKeys {
            environment: Environment::from_argument(account),
        });
    }

    if let Some(captures) = READ_SECRET.captures(text) {
        let path = SecretPath::parse(captures.name("path")?.as_str())?;
        return Some(Command::ReadSecret { path });
    }

    None
}

pub fn help() -> Vec<CommandHelp> {
    vec![
        CommandHelp {
            usage: "generate aws keys [production/staging]",
            description: "Generate temporary AWS keys",
        },
        CommandHelp {
            usage: "get secret/../../../KEY from vault",
            description: "Fetch a value from Vault (works only in private messages)",
        },
    ]
}
