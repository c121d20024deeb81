// ABOUTME: Twitch OAuth2 adapter for the Helix users endpoint
// ABOUTME: Sends the Client-Id header and requires a non-empty data list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

use super::core::OAuth2Provider;
use super::oauth2::OAuth2Client;
use crate::errors::{AppResult, ProviderError};
use crate::models::Profile;

#[derive(Debug, Deserialize)]
struct TwitchUsers {
    #[serde(default)]
    data: Vec<TwitchUser>,
}

#[derive(Debug, Deserialize)]
struct TwitchUser {
    id: String,
    #[serde(default)]
    login: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    profile_image_url: String,
}

/// Twitch provider
#[derive(Debug, Clone)]
pub struct TwitchProvider {
    client: OAuth2Client,
}

impl TwitchProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for TwitchProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let mut headers = HeaderMap::new();
        let client_id = HeaderValue::from_str(&self.client.config().client_id)
            .map_err(|e| ProviderError::config(self.name(), format!("client id: {e}")))?;
        headers.insert("Client-Id", client_id);

        let users: TwitchUsers = self
            .client
            .get_json(&self.client.api_url("/helix/users"), access_token, headers)
            .await?;
        let user = users
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::missing_field(self.name(), "data"))?;

        let policy = self.client.descriptor().email_verification;
        let name = if user.display_name.is_empty() {
            user.login
        } else {
            user.display_name
        };
        Ok(Profile {
            provider_user_id: user.id,
            email_verified: policy.is_verified(&user.email, false),
            email: user.email,
            name,
            picture: user.profile_image_url,
        })
    }
}
