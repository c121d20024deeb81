// ABOUTME: Google OAuth2 adapter backed by the OpenID userinfo endpoint
// ABOUTME: Honors Google's explicit email_verified flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::core::OAuth2Provider;
use super::oauth2::OAuth2Client;
use crate::errors::AppResult;
use crate::models::Profile;

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// Google provider
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: OAuth2Client,
}

impl GoogleProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for GoogleProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let info: GoogleUserInfo = self
            .client
            .get_json(
                &self.client.api_url("/oauth2/v3/userinfo"),
                access_token,
                HeaderMap::new(),
            )
            .await?;

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: info.sub,
            email_verified: policy.is_verified(&info.email, info.email_verified),
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}
