// ABOUTME: Windows Live OAuth2 adapter
// ABOUTME: Takes the account address, falling back to the preferred one
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
struct LiveUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    emails: LiveEmails,
}

#[derive(Debug, Default, Deserialize)]
struct LiveEmails {
    account: Option<String>,
    preferred: Option<String>,
}

/// Windows Live provider
#[derive(Debug, Clone)]
pub struct WindowsLiveProvider {
    client: OAuth2Client,
}

impl WindowsLiveProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for WindowsLiveProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: LiveUser = self
            .client
            .get_json(&self.client.api_url("/v5.0/me"), access_token, HeaderMap::new())
            .await?;

        let email = user
            .emails
            .account
            .filter(|e| !e.is_empty())
            .or(user.emails.preferred)
            .unwrap_or_default();
        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.id,
            email_verified: policy.is_verified(&email, false),
            email,
            name: user.name,
            picture: String::new(),
        })
    }
}
