// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Credential and secret request handling.
//!
//! # Credential generation
//!
//! ```text
//! Idle -> CooldownCheck -> CooldownBlocked
//!                       -> Authenticating -> AuthFailed
//!                                         -> Authenticated -> GenerationFailed
//!                                                          -> Delivered
//! ```
//!
//! The cool-down permit is taken before any backend call and is kept even if
//! generation fails afterwards. Whatever the outcome, the message goes to the
//! requester privately; a shared room only gets a pointer to it.
//!
//! # Secret reads
//!
//! Refused outright in shared rooms, before any login. Private reads log in
//! with the read-only role and are not subject to the cool-down.

use std::sync::Arc;
use std::time::Duration;

use crate::commands::{Command, Environment, SecretPath};
use crate::configuration::BrokerOptions;
use crate::cooldown::CooldownGate;
use crate::errors::{AppError, BrokerError};
use crate::imds::IdentityDocumentSource;
use crate::messenger::{Messenger, RequestContext};
use crate::models::{SessionToken, TemporaryCredential};
use crate::vault::{AuthClient, SecretReader};

/// What a successful request disclosed to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosure {
    CredentialsIssued { environment: Environment },
    SecretRevealed { path: SecretPath },
}

impl Disclosure {
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::CredentialsIssued { .. } => "credentials_issued",
            Self::SecretRevealed { .. } => "secret_revealed",
        }
    }
}

pub struct CredentialRequestHandler {
    http: reqwest::Client,
    reader: SecretReader,
    vault_address: String,
    imds_endpoint: String,
    generate_role: String,
    read_role: String,
    cooldown: Arc<CooldownGate>,
    cooldown_ttl: Duration,
    request_timeout: Duration,
}

impl CredentialRequestHandler {
    pub fn new(options: &BrokerOptions, cooldown: Arc<CooldownGate>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout())
            .connect_timeout(options.request_timeout())
            .build()?;

        // fail at startup rather than on the first request
        IdentityDocumentSource::new(&options.imds_endpoint, options.request_timeout())?;

        let vault_address = options.vault_address();

        Ok(Self {
            reader: SecretReader::new(http.clone(), vault_address.clone()),
            http,
            vault_address,
            imds_endpoint: options.imds_endpoint.clone(),
            generate_role: options.generate_role.clone(),
            read_role: options.read_role.clone(),
            cooldown,
            cooldown_ttl: options.cooldown_ttl(),
            request_timeout: options.request_timeout(),
        })
    }

    /// Runs `command` and delivers its outcome through `messenger`.
    pub async fn handle(
        &self,
        command: Command,
        context: &RequestContext,
        messenger: &dyn Messenger,
    ) -> Result<Disclosure, BrokerError> {
        match command {
            Command::GenerateAwsKeys { environment } => {
                self.generate_credentials(environment, context, messenger)
                    .await
            }
            Command::ReadSecret { path } => self.read_secret(path, context, messenger).await,
        }
    }

    #[tracing::instrument(skip(self, messenger), fields(nick = %context.requester.nick))]
    pub async fn generate_credentials(
        &self,
        environment: Environment,
        context: &RequestContext,
        messenger: &dyn Messenger,
    ) -> Result<Disclosure, BrokerError> {
        let result = self.issue_credentials(environment, context).await;

        let text = match &result {
            Ok(credential) => format_credentials(environment, credential),
            Err(e) => {
                tracing::info!("[broker] credential request ended: {}", e);
                e.user_message()
            }
        };

        if let (true, Some(room)) = (context.is_shared(), context.room.as_deref()) {
            messenger
                .say(room, format!("@{} PM'ed the details", context.requester.nick))
                .await;
        }
        messenger.send_direct(&context.requester, text).await;

        result.map(|_| Disclosure::CredentialsIssued { environment })
    }

    async fn issue_credentials(
        &self,
        environment: Environment,
        context: &RequestContext,
    ) -> Result<TemporaryCredential, BrokerError> {
        let subject_key = CooldownGate::subject_key(&context.requester.nick, environment);
        if !self.cooldown.try_acquire(&subject_key, self.cooldown_ttl) {
            return Err(BrokerError::CooldownActive);
        }

        let token = self.session(&self.generate_role).await?;

        self.reader
            .generate_aws_keys(&token, environment)
            .await
            .ok_or(BrokerError::CredentialsUnavailable { environment })
    }

    #[tracing::instrument(skip(self, messenger), fields(nick = %context.requester.nick))]
    pub async fn read_secret(
        &self,
        path: SecretPath,
        context: &RequestContext,
        messenger: &dyn Messenger,
    ) -> Result<Disclosure, BrokerError> {
        if context.is_shared() {
            let refusal = format!(
                "@{} {}",
                context.requester.nick,
                BrokerError::ChannelDisallowed.user_message()
            );
            match context.room.as_deref() {
                Some(room) => messenger.say(room, refusal).await,
                None => messenger.send_direct(&context.requester, refusal).await,
            }
            return Err(BrokerError::ChannelDisallowed);
        }

        let result = self.reveal(&path).await;

        let text = match &result {
            Ok(value) => value.clone(),
            Err(e) => {
                tracing::info!("[broker] secret read ended: {}", e);
                e.user_message()
            }
        };
        messenger.send_direct(&context.requester, text).await;

        result.map(|_| Disclosure::SecretRevealed { path })
    }

    async fn reveal(&self, path: &SecretPath) -> Result<String, BrokerError> {
        let token = self.session(&self.read_role).await?;

        self.reader
            .read_value(&token, path.as_str())
            .await
            .ok_or_else(|| BrokerError::SecretUnavailable {
                path: path.to_string(),
            })
    }

    /// Fresh login for every request; tokens are never reused.
    async fn session(&self, role: &str) -> Result<SessionToken, BrokerError> {
        let identity = IdentityDocumentSource::new(&self.imds_endpoint, self.request_timeout)
            .map_err(|e| {
                tracing::error!("[broker] unable to build IMDS client: {}", e);
                BrokerError::AuthenticationFailed
            })?;

        AuthClient::login(&self.http, &self.vault_address, role, &identity)
            .await
            .into_token()
            .ok_or(BrokerError::AuthenticationFailed)
    }
}

fn format_credentials(environment: Environment, credential: &TemporaryCredential) -> String {
    format!(
        "Account: {}\nAccess Key: {}\nSecret Key: {}",
        environment, credential.access_key, credential.secret_key
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::messenger::{Delivery, DeliveryLog, Requester};
    use crate::testutil::{
        ACCESS_KEY, SECRET_KEY, TOKEN, mock_identity, mock_imds_token, test_options,
    };
    use mockito::{Mock, ServerGuard};

    fn alice() -> Requester {
        Requester {
            nick: "alice".to_string(),
            user_id: "1001".to_string(),
        }
    }

    fn handler(imds: &ServerGuard, vault: &ServerGuard) -> CredentialRequestHandler {
        CredentialRequestHandler::new(&test_options(imds, vault), Arc::new(CooldownGate::new()))
            .unwrap()
    }

    async fn mock_login(vault: &mut ServerGuard, status: usize, hits: usize) -> Mock {
        vault
            .mock("POST", "/v1/auth/aws/login")
            .expect(hits)
            .with_status(status)
            .with_body(format!(r#"{{"auth": {{"client_token": "{TOKEN}"}}}}"#))
            .create_async()
            .await
    }

    async fn mock_staging_creds(vault: &mut ServerGuard, hits: usize) -> Mock {
        vault
            .mock("GET", "/v1/staging/creds/staging-swe")
            .expect(hits)
            .match_header("X-Vault-Token", TOKEN)
            .with_status(200)
            .with_body(format!(
                r#"{{"data": {{"access_key": "{ACCESS_KEY}", "secret_key": "{SECRET_KEY}"}}}}"#
            ))
            .create_async()
            .await
    }

    fn direct_text(deliveries: &[Delivery]) -> &str {
        deliveries
            .iter()
            .find_map(|d| match d {
                Delivery::Direct { text, .. } => Some(text.as_str()),
                Delivery::Room { .. } => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_private_generation_then_cooldown() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let login = mock_login(&mut vault, 200, 1).await;
        let creds = mock_staging_creds(&mut vault, 1).await;

        let handler = handler(&imds, &vault);
        let context = RequestContext::private(alice());

        let log = DeliveryLog::new();
        let outcome = handler
            .generate_credentials(Environment::Staging, &context, &log)
            .await;
        assert_eq!(
            outcome,
            Ok(Disclosure::CredentialsIssued {
                environment: Environment::Staging
            })
        );

        let deliveries = log.into_deliveries();
        assert_eq!(deliveries.len(), 1);
        let text = direct_text(&deliveries);
        assert!(text.contains("Account: staging"));
        assert!(text.contains(&format!("Access Key: {ACCESS_KEY}")));
        assert!(text.contains(&format!("Secret Key: {SECRET_KEY}")));

        let log = DeliveryLog::new();
        let outcome = handler
            .generate_credentials(Environment::Staging, &context, &log)
            .await;
        assert_eq!(outcome, Err(BrokerError::CooldownActive));
        assert_eq!(
            log.into_deliveries(),
            vec![Delivery::Direct {
                recipient: "1001".to_string(),
                text: "Previously generated keys still valid, please re-use.".to_string(),
            }]
        );

        // the blocked attempt made no backend calls
        login.assert_async().await;
        creds.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_generation_still_starts_cooldown() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = mock_login(&mut vault, 200, 1).await;
        let _creds = vault
            .mock("GET", "/v1/production/creds/production-swe")
            .with_status(500)
            .create_async()
            .await;

        let handler = handler(&imds, &vault);
        let context = RequestContext::private(alice());

        let log = DeliveryLog::new();
        let outcome = handler
            .generate_credentials(Environment::Production, &context, &log)
            .await;
        assert_eq!(
            outcome,
            Err(BrokerError::CredentialsUnavailable {
                environment: Environment::Production
            })
        );
        assert_eq!(
            direct_text(&log.into_deliveries()),
            "Failed to generate production AWS credentials, please contact on-call."
        );

        let outcome = handler
            .generate_credentials(Environment::Production, &context, &DeliveryLog::new())
            .await;
        assert_eq!(outcome, Err(BrokerError::CooldownActive));
    }

    #[tokio::test]
    async fn test_cooldown_is_per_environment() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = mock_login(&mut vault, 200, 1).await;
        let _creds = mock_staging_creds(&mut vault, 1).await;
        let _prod = vault
            .mock("GET", "/v1/production/creds/production-swe")
            .with_status(200)
            .with_body(format!(
                r#"{{"data": {{"access_key": "{ACCESS_KEY}", "secret_key": "{SECRET_KEY}"}}}}"#
            ))
            .create_async()
            .await;

        let handler = handler(&imds, &vault);
        let context = RequestContext::private(alice());
        let log = DeliveryLog::new();

        assert!(
            handler
                .generate_credentials(Environment::Staging, &context, &log)
                .await
                .is_ok()
        );
        assert!(
            handler
                .generate_credentials(Environment::Production, &context, &log)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_login_rejected_skips_generation() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = mock_login(&mut vault, 403, 1).await;
        let creds = mock_staging_creds(&mut vault, 0).await;

        let handler = handler(&imds, &vault);
        let log = DeliveryLog::new();
        let outcome = handler
            .generate_credentials(Environment::Staging, &RequestContext::private(alice()), &log)
            .await;

        assert_eq!(outcome, Err(BrokerError::AuthenticationFailed));
        assert_eq!(
            direct_text(&log.into_deliveries()),
            "Failed to get Vault token, please contact on-call."
        );
        creds.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_identity_skips_login_and_generation() {
        let mut imds = mockito::Server::new_async().await;
        let _token = mock_imds_token(&mut imds).await;
        let _doc = imds
            .mock("GET", crate::constants::IMDS_IDENTITY_DOCUMENT_PATH)
            .with_status(404)
            .create_async()
            .await;
        let mut vault = mockito::Server::new_async().await;
        let login = mock_login(&mut vault, 200, 0).await;
        let creds = mock_staging_creds(&mut vault, 0).await;

        let handler = handler(&imds, &vault);
        let outcome = handler
            .generate_credentials(
                Environment::Staging,
                &RequestContext::private(alice()),
                &DeliveryLog::new(),
            )
            .await;

        assert_eq!(outcome, Err(BrokerError::AuthenticationFailed));
        login.assert_async().await;
        creds.assert_async().await;
    }

    #[tokio::test]
    async fn test_shared_room_generation_goes_private() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = mock_login(&mut vault, 200, 1).await;
        let _creds = mock_staging_creds(&mut vault, 1).await;

        let handler = handler(&imds, &vault);
        let log = DeliveryLog::new();
        let outcome = handler
            .handle(
                Command::GenerateAwsKeys {
                    environment: Environment::Staging,
                },
                &RequestContext::shared(alice(), "ops"),
                &log,
            )
            .await;
        assert!(outcome.is_ok());

        let deliveries = log.into_deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(
            deliveries[0],
            Delivery::Room {
                room: "ops".to_string(),
                text: "@alice PM'ed the details".to_string()
            }
        );
        match &deliveries[1] {
            Delivery::Direct { recipient, text } => {
                assert_eq!(recipient, "1001");
                assert!(text.contains(SECRET_KEY));
            }
            other => panic!("unexpected delivery: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_secret_read_in_shared_room_is_refused() {
        let mut imds = mockito::Server::new_async().await;
        let token = imds
            .mock("PUT", "/latest/api/token")
            .expect(0)
            .create_async()
            .await;
        let mut vault = mockito::Server::new_async().await;
        let login = mock_login(&mut vault, 200, 0).await;

        let handler = handler(&imds, &vault);
        let log = DeliveryLog::new();
        let outcome = handler
            .handle(
                Command::ReadSecret {
                    path: SecretPath::parse("secret/a/b/c/d").unwrap(),
                },
                &RequestContext::shared(alice(), "ops"),
                &log,
            )
            .await;

        assert_eq!(outcome, Err(BrokerError::ChannelDisallowed));
        assert_eq!(
            log.into_deliveries(),
            vec![Delivery::Room {
                room: "ops".to_string(),
                text: "@alice I do not share secrets in public".to_string()
            }]
        );
        token.assert_async().await;
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_private_secret_read() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = vault
            .mock("POST", "/v1/auth/aws/login")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"role": "read-only-production"}),
            ))
            .with_status(200)
            .with_body(format!(r#"{{"auth": {{"client_token": "{TOKEN}"}}}}"#))
            .create_async()
            .await;
        let _read = vault
            .mock("GET", "/v1/secret/a/b/c/d")
            .match_header("X-Vault-Token", TOKEN)
            .with_status(200)
            .with_body(r#"{"data": {"value": "hunter2"}}"#)
            .create_async()
            .await;

        let handler = handler(&imds, &vault);
        let path = SecretPath::parse("secret/a/b/c/d").unwrap();
        let context = RequestContext::private(alice());

        // reads are not rate limited
        for _ in 0..2 {
            let log = DeliveryLog::new();
            let outcome = handler.read_secret(path.clone(), &context, &log).await;
            assert_eq!(
                outcome,
                Ok(Disclosure::SecretRevealed { path: path.clone() })
            );
            assert_eq!(direct_text(&log.into_deliveries()), "hunter2");
        }
    }

    #[tokio::test]
    async fn test_private_secret_read_missing_path() {
        let mut imds = mockito::Server::new_async().await;
        let _identity = mock_identity(&mut imds).await;
        let mut vault = mockito::Server::new_async().await;
        let _login = mock_login(&mut vault, 200, 1).await;
        let _read = vault
            .mock("GET", "/v1/secret/a/b/c/missing")
            .with_status(404)
            .create_async()
            .await;

        let handler = handler(&imds, &vault);
        let log = DeliveryLog::new();
        let outcome = handler
            .read_secret(
                SecretPath::parse("secret/a/b/c/missing").unwrap(),
                &RequestContext::private(alice()),
                &log,
            )
            .await;

        assert_eq!(
            outcome,
            Err(BrokerError::SecretUnavailable {
                path: "secret/a/b/c/missing".to_string()
            })
        );
        assert_eq!(
            direct_text(&log.into_deliveries()),
            "Error reading value, does secret/a/b/c/missing exist?"
        );
    }

    #[test]
    fn test_format_credentials() {
        let credential = TemporaryCredential {
            access_key: "AK".to_string(),
            secret_key: "SK".to_string(),
        };
        assert_eq!(
            format_credentials(Environment::Staging, &credential),
            "Account: staging\nAccess Key: AK\nSecret Key: SK"
        );
    }

    #[test]
    fn test_disclosure_outcome() {
        assert_eq!(
            Disclosure::CredentialsIssued {
                environment: Environment::Staging
            }
            .outcome(),
            "credentials_issued"
        );
    }
}
