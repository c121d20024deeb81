// ABOUTME: Sign in with Apple adapter: hybrid code plus ID token flow posted back as a form
// ABOUTME: Mints an ES256 client secret per exchange and reads the profile from the verified ID token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::core::{OAuth2Provider, ProviderSpecificParams};
use super::oauth2::{OAuth2Client, OAuth2Token};
use crate::config::AppleSigningSettings;
use crate::constants::oidc::APPLE_ISSUER;
use crate::errors::{AppResult, ProviderError};
use crate::models::Profile;
use crate::oidc::IdTokenValidator;

/// Lifetime of a minted client secret
const CLIENT_SECRET_TTL_MINUTES: i64 = 5;

#[derive(Debug, Serialize)]
struct ClientSecretClaims<'a> {
    iss: &'a str,
    iat: i64,
    exp: i64,
    aud: &'a str,
    sub: &'a str,
}

/// `user` form field Apple posts on the first authorization only
#[derive(Debug, Default, Deserialize)]
struct AppleUser {
    #[serde(default)]
    name: AppleName,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppleName {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl AppleUser {
    fn from_extra(extra: &HashMap<String, String>) -> Self {
        extra
            .get("user")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.name.first_name, self.name.last_name)
            .trim()
            .to_owned()
    }
}

/// Apple provider
pub struct AppleProvider {
    client: OAuth2Client,
    team_id: String,
    key_id: String,
    signing_key: EncodingKey,
    validator: Arc<IdTokenValidator>,
}

impl AppleProvider {
    /// Build the adapter, parsing the P-256 signing key up front
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the private key is not a PKCS#8 EC PEM
    pub fn new(
        client: OAuth2Client,
        signing: &AppleSigningSettings,
        validator: Arc<IdTokenValidator>,
    ) -> AppResult<Self> {
        let signing_key = EncodingKey::from_ec_pem(signing.private_key.as_bytes())
            .map_err(|e| ProviderError::config(client.name(), format!("private key: {e}")))?;
        Ok(Self {
            client,
            team_id: signing.team_id.clone(),
            key_id: signing.key_id.clone(),
            signing_key,
            validator,
        })
    }

    /// ES256 client secret with `kid` set to the configured key id
    ///
    /// # Errors
    ///
    /// Returns a configuration error if signing fails
    pub fn client_secret(&self) -> AppResult<String> {
        let now = Utc::now();
        let claims = ClientSecretClaims {
            iss: &self.team_id,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(CLIENT_SECRET_TTL_MINUTES)).timestamp(),
            aud: APPLE_ISSUER,
            sub: &self.client.config().client_id,
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(|e| {
            ProviderError::config(self.name(), format!("client secret: {e}")).into()
        })
    }
}

impl fmt::Debug for AppleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppleProvider")
            .field("client", &self.client)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OAuth2Provider for AppleProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    fn auth_code_url(&self, state: &str, _params: &ProviderSpecificParams) -> AppResult<String> {
        self.client.auth_code_url(
            state,
            &[("response_mode", "form_post"), ("response_type", "code id_token")],
        )
    }

    async fn exchange(&self, code: &str) -> AppResult<OAuth2Token> {
        let secret = self.client_secret()?;
        self.client.exchange_with_secret(code, &secret).await
    }

    async fn get_profile(
        &self,
        _access_token: &str,
        id_token: Option<&str>,
        extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let id_token = id_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::missing_field(self.name(), "id_token"))?;

        let claims = self.validator.validate(id_token, "").await.map_err(|e| {
            debug!(provider = self.name(), error = %e, "Apple ID token rejected");
            e
        })?;
        let mut profile = claims.to_profile()?;

        let policy = self.client.descriptor().email_verification;
        profile.email_verified = policy.is_verified(&profile.email, profile.email_verified);
        if profile.name.is_empty() {
            profile.name = AppleUser::from_extra(extra).display_name();
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_field_name() {
        let mut extra = HashMap::new();
        extra.insert(
            "user".to_owned(),
            r#"{"name":{"firstName":"Jane","lastName":"Doe"},"email":"jane@privaterelay.appleid.com"}"#
                .to_owned(),
        );
        assert_eq!(AppleUser::from_extra(&extra).display_name(), "Jane Doe");
    }

    #[test]
    fn test_missing_or_invalid_user_field() {
        assert_eq!(AppleUser::from_extra(&HashMap::new()).display_name(), "");
        let mut extra = HashMap::new();
        extra.insert("user".to_owned(), "not json".to_owned());
        assert_eq!(AppleUser::from_extra(&extra).display_name(), "");
    }
}
