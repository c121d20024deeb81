// ABOUTME: Spotify OAuth2 adapter
// ABOUTME: Uses the first profile image as the picture
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
struct SpotifyUser {
    id: String,
    #[serde(default)]
    email: String,
    display_name: Option<String>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

/// Spotify provider
#[derive(Debug, Clone)]
pub struct SpotifyProvider {
    client: OAuth2Client,
}

impl SpotifyProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for SpotifyProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: SpotifyUser = self
            .client
            .get_json(&self.client.api_url("/v1/me"), access_token, HeaderMap::new())
            .await?;

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.id,
            email_verified: policy.is_verified(&user.email, false),
            email: user.email,
            name: user.display_name.unwrap_or_default(),
            picture: user.images.into_iter().next().map(|i| i.url).unwrap_or_default(),
        })
    }
}
