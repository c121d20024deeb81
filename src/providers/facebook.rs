// ABOUTME: Facebook OAuth2 adapter against the versioned Graph API
// ABOUTME: Requests id, name, email and picture fields explicitly
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

const PROFILE_PATH: &str = "/v3.2/me?fields=id,name,email,picture";

#[derive(Debug, Deserialize)]
struct FacebookUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    picture: Option<FacebookPicture>,
}

#[derive(Debug, Deserialize)]
struct FacebookPicture {
    data: FacebookPictureData,
}

#[derive(Debug, Deserialize)]
struct FacebookPictureData {
    #[serde(default)]
    url: String,
}

/// Facebook provider
#[derive(Debug, Clone)]
pub struct FacebookProvider {
    client: OAuth2Client,
}

impl FacebookProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for FacebookProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: FacebookUser = self
            .client
            .get_json(&self.client.api_url(PROFILE_PATH), access_token, HeaderMap::new())
            .await?;

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.id,
            email_verified: policy.is_verified(&user.email, false),
            email: user.email,
            name: user.name,
            picture: user.picture.map(|p| p.data.url).unwrap_or_default(),
        })
    }
}
