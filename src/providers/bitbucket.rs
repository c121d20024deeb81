// ABOUTME: Bitbucket OAuth2 adapter
// ABOUTME: Fetches the account and then its email list, preferring a confirmed address
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use super::core::OAuth2Provider;
use super::oauth2::OAuth2Client;
use crate::errors::{AppResult, ProviderError};
use crate::models::Profile;

#[derive(Debug, Deserialize)]
struct BitbucketUser {
    uuid: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    links: BitbucketLinks,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketLinks {
    avatar: Option<BitbucketLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketLink {
    href: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketEmails {
    #[serde(default)]
    values: Vec<BitbucketEmail>,
}

#[derive(Debug, Clone, Deserialize)]
struct BitbucketEmail {
    email: String,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    is_confirmed: bool,
}

/// Confirmed primary, then any confirmed, then the first unconfirmed address
fn select_email(emails: &[BitbucketEmail]) -> Option<&BitbucketEmail> {
    emails
        .iter()
        .find(|e| e.is_confirmed && e.is_primary)
        .or_else(|| emails.iter().find(|e| e.is_confirmed))
        .or_else(|| emails.first())
}

/// Bitbucket provider
#[derive(Debug, Clone)]
pub struct BitbucketProvider {
    client: OAuth2Client,
}

impl BitbucketProvider {
    /// Wrap a configured client
    #[must_use]
    pub const fn new(client: OAuth2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuth2Provider for BitbucketProvider {
    fn client(&self) -> &OAuth2Client {
        &self.client
    }

    async fn get_profile(
        &self,
        access_token: &str,
        _id_token: Option<&str>,
        _extra: &HashMap<String, String>,
    ) -> AppResult<Profile> {
        let user: BitbucketUser = self
            .client
            .get_json(&self.client.api_url("/2.0/user"), access_token, HeaderMap::new())
            .await?;
        let emails: BitbucketEmails = self
            .client
            .get_json(&self.client.api_url("/2.0/user/emails"), access_token, HeaderMap::new())
            .await?;

        let email = select_email(&emails.values)
            .cloned()
            .ok_or_else(|| ProviderError::missing_field(self.name(), "email"))?;

        let policy = self.client.descriptor().email_verification;
        Ok(Profile {
            provider_user_id: user.uuid,
            email_verified: policy.is_verified(&email.email, email.is_confirmed),
            email: email.email,
            name: user.display_name,
            picture: user.links.avatar.map(|a| a.href).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(address: &str, is_primary: bool, is_confirmed: bool) -> BitbucketEmail {
        BitbucketEmail {
            email: address.to_owned(),
            is_primary,
            is_confirmed,
        }
    }

    #[test]
    fn test_confirmed_beats_unconfirmed_primary() {
        let emails = [
            email("primary@myapp.local", true, false),
            email("work@myapp.local", false, true),
        ];
        assert_eq!(select_email(&emails).unwrap().email, "work@myapp.local");
    }

    #[test]
    fn test_unconfirmed_fallback_and_empty() {
        let emails = [email("only@myapp.local", false, false)];
        let selected = select_email(&emails).unwrap();
        assert!(!selected.is_confirmed);
        assert!(select_email(&[]).is_none());
    }
}
