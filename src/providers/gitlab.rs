// ABOUTME: GitLab OAuth2 adapter, including self-hosted instances via the API base override
// ABOUTME: Maps /api/v4/user to the normalized profile
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
struct GitlabUser {
    id: i64,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    avatar_url: String,
}

/// GitLab provider
#[derive(Debug, Clone)]
pub struct GitlabProvider {
    client: OAuth2Client,
}

impl GitlabProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for GitlabProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: GitlabUser = self
            .client
            .get_json(&self.client.api_url("/api/v4/user"), access_token, HeaderMap::new())
            .await?;

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.id.to_string(),
            email_verified: policy.is_verified(&user.email, false),
            email: user.email,
            name: user.name,
            picture: user.avatar_url,
        })
    }
}
