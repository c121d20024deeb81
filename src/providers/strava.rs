// ABOUTME: Strava OAuth2 adapter
// ABOUTME: Forces re-consent on authorization and yields an unverified profile without email
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::core::{OAuth2Provider, ProviderSpecificParams};
use super::oauth2::OAuth2Client;
use crate::errors::AppResult;
use crate::models::Profile;

/// Strava athlete as returned by `/api/v3/athlete`
#[derive(Debug, Deserialize)]
struct StravaAthlete {
    id: i64,
    firstname: Option<String>,
    lastname: Option<String>,
    /// Profile picture URL
    profile: Option<String>,
}

/// Strava provider
#[derive(Debug, Clone)]
pub struct StravaProvider {
    client: OAuth2Client,
}

impl StravaProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for StravaProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    fn auth_code_url(&self, state: &str, _params: &ProviderSpecificParams) -> AppResult<String> {
        self.client
            .auth_code_url(state, &[("approval_prompt", "force")])
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let athlete: StravaAthlete = self
            .client
            .get_json(&self.client.api_url("/api/v3/athlete"), access_token, HeaderMap::new())
            .await?;

        let name = [athlete.firstname, athlete.lastname]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Profile {
            provider_user_id: athlete.id.to_string(),
            email: String::new(),
            email_verified: false,
            name,
            picture: athlete.profile.unwrap_or_default(),
        })
    }
}
