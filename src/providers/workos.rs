// ABOUTME: WorkOS SSO adapter
// ABOUTME: Adds organization, connection and domain selectors, falling back to configured defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::core::{OAuth2Provider, ProviderSpecificParams};
use super::oauth2::OAuth2Client;
use crate::config::WorkosDefaults;
use crate::errors::AppResult;
use crate::models::Profile;

#[derive(Debug, Deserialize)]
struct WorkosProfile {
    id: String,
    #[serde(default)]
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

/// `WorkOS` provider
#[derive(Debug, Clone)]
pub struct WorkosProvider {
    client: OAuth2Client,
    defaults: WorkosDefaults,
}

impl WorkosProvider {
    /// Wrap a configured client with its selector defaults
    #[must_use]
    pub const fn new(client: OAuth2Client, defaults: WorkosDefaults) -> Self {
        Self { client, defaults }
    }
}

#[async_trait]
impl OAuth2Provider for WorkosProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    fn auth_code_url(&self, state: &str, params: &ProviderSpecificParams) -> AppResult<String> {
        let pick = |requested: &Option<String>, default: &Option<String>| {
            requested
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| default.clone())
        };
        let selectors = [
            ("organization", pick(&params.organization, &self.defaults.organization)),
            ("connection", pick(&params.connection, &self.defaults.connection)),
            ("domain", pick(&params.domain, &self.defaults.domain)),
        ];
        let extra: Vec<(&str, &str)> = selectors
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
            .collect();
        self.client.auth_code_url(state, &extra)
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let profile: WorkosProfile = self
            .client
            .get_json(&self.client.api_url("/sso/profile"), access_token, HeaderMap::new())
            .await?;

        let name = [profile.first_name, profile.last_name]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: profile.id,
            email_verified: policy.is_verified(&profile.email, false),
            email: profile.email,
            name,
            picture: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::constants::providers;
    use crate::providers::spi::descriptor;

    fn provider() -> WorkosProvider {
        let client = OAuth2Client::new(
            descriptor(providers::WORKOS).unwrap(),
            &ProviderSettings::enabled("client_01", "sk_test"),
            "https://auth.myapp.local/signin/provider/workos/callback",
        );
        WorkosProvider::new(
            client,
            WorkosDefaults {
                organization: Some("org_default".to_owned()),
                connection: None,
                domain: Some("myapp.local".to_owned()),
            },
        )
    }

    #[test]
    fn test_request_params_override_defaults() {
        let params = ProviderSpecificParams {
            organization: Some("org_requested".to_owned()),
            connection: Some("conn_1".to_owned()),
            domain: None,
        };
        let url = provider().auth_code_url("s", &params).unwrap();
        assert!(url.contains("organization=org_requested"));
        assert!(url.contains("connection=conn_1"));
        assert!(url.contains("domain=myapp.local"));
    }

    #[test]
    fn test_defaults_apply_when_request_is_empty() {
        let url = provider()
            .auth_code_url("s", &ProviderSpecificParams::default())
            .unwrap();
        assert!(url.contains("organization=org_default"));
        assert!(!url.contains("connection="));
    }
}
