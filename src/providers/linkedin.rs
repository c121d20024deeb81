// ABOUTME: LinkedIn OAuth2 adapter using the OpenID Connect userinfo endpoint
// ABOUTME: Honors the explicit email_verified flag
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
struct LinkedinUserInfo {
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

/// `LinkedIn` provider
#[derive(Debug, Clone)]
pub struct LinkedinProvider {
    client: OAuth2Client,
}

impl LinkedinProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for LinkedinProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let info: LinkedinUserInfo = self
            .client
            .get_json(&self.client.api_url("/v2/userinfo"), access_token, HeaderMap::new())
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
