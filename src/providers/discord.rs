// ABOUTME: Discord OAuth2 adapter
// ABOUTME: Builds the avatar URL from the CDN and treats a returned email as verified
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

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    #[serde(default)]
    username: String,
    global_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    avatar: Option<String>,
}

/// Discord provider
#[derive(Debug, Clone)]
pub struct DiscordProvider {
    client: OAuth2Client,
}

impl DiscordProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for DiscordProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: DiscordUser = self
            .client
            .get_json(&self.client.api_url("/api/users/@me"), access_token, HeaderMap::new())
            .await?;

        let picture = user
            .avatar
            .as_deref()
            .map(|hash| format!("{AVATAR_CDN}/{}/{hash}.png", user.id))
            .unwrap_or_default();
        let email = user.email.unwrap_or_default();
        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            email_verified: policy.is_verified(&email, false),
            email,
            name: user.global_name.filter(|n| !n.is_empty()).unwrap_or(user.username),
            picture,
            provider_user_id: user.id,
        })
    }
}
