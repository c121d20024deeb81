// ABOUTME: GitHub OAuth2 adapter
// ABOUTME: Reads /user and falls back to the primary address from /user/emails
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
struct GithubUser {
    id: i64,
    #[serde(default)]
    login: String,
    name: Option<String>,
    email: Option<String>,
    #[serde(default)]
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
}

/// GitHub provider
#[derive(Debug, Clone)]
pub struct GithubProvider {
    client: OAuth2Client,
}

impl GithubProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for GithubProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: GithubUser = self
            .client
            .get_json(&self.client.api_url("/user"), access_token, HeaderMap::new())
            .await?;

        // private addresses are only listed by the emails endpoint
        let email = match user.email.filter(|e| !e.is_empty()) {
            Some(email) => email,
            None => {
                let emails: Vec<GithubEmail> = self
                    .client
                    .get_json(&self.client.api_url("/user/emails"), access_token, HeaderMap::new())
                    .await?;
                emails
                    .into_iter()
                    .find(|e| e.primary)
                    .map(|e| e.email)
                    .unwrap_or_default()
            }
        };

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.id.to_string(),
            email_verified: policy.is_verified(&email, false),
            email,
            name: user.name.filter(|n| !n.is_empty()).unwrap_or(user.login),
            picture: user.avatar_url,
        })
    }
}
