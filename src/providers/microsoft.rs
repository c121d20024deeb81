// ABOUTME: Microsoft identity adapters for Azure AD (v1) and Entra ID (v2) tenants
// ABOUTME: Both read the tenant-scoped OpenID userinfo document
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::core::OAuth2Provider;
use super::oauth2::OAuth2Client;
use crate::errors::{AppResult, ProviderError};
use crate::models::Profile;

const USERINFO_PATH: &str = "/openid/userinfo";

#[derive(Debug, Deserialize)]
struct UserInfo {
    oid: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    upn: Option<String>,
    preferred_username: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl UserInfo {
    fn id(&self) -> Option<String> {
        self.oid.clone().or_else(|| self.sub.clone())
    }

    fn email(&self) -> String {
        [&self.email, &self.upn, &self.preferred_username]
            .into_iter()
            .flatten()
            .find(|e| e.contains('@'))
            .cloned()
            .unwrap_or_default()
    }

    fn name(&self) -> String {
        if let Some(name) = self.name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        [&self.given_name, &self.family_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Azure AD or Entra ID provider
#[derive(Debug, Clone)]
pub struct MicrosoftProvider {
    client: OAuth2Client,
}

impl MicrosoftProvider {
    /// Azure AD v1 endpoints
    #[must_use]
    pub const fn azuread(client: OAuth2Client) -> Self {
        Self { client }
    }

    /// Entra ID v2 endpoints
    #[must_use]
    pub const fn entraid(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for MicrosoftProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let info: UserInfo = self
            .client
            .get_json(&self.client.api_url(USERINFO_PATH), access_token, HeaderMap::new())
            .await?;

        let provider_user_id = info
            .id()
            .ok_or_else(|| ProviderError::missing_field(self.name(), "oid"))?;
        let email = info.email();
        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id,
            email_verified: policy.is_verified(&email, false),
            name: info.name(),
            email,
            picture: String::new(),
        })
    }
}
