// ABOUTME: Twitter OAuth1 adapter: request token, verifier exchange and signed profile call
// ABOUTME: Every call carries an HMAC-SHA1 Authorization header built by the OAuth1 signer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::core::{OAuth1Provider, OAuth1Token};
use super::oauth1::{OAuth1Signer, SigningContext, TokenCredentials};
use super::spi::{EmailVerification, ProviderDescriptor};
use crate::config::ProviderSettings;
use crate::errors::{AppResult, ProviderError, ProviderStage};
use crate::models::Profile;
use crate::utils::http_client::provider_client;

const VERIFY_CREDENTIALS_PATH: &str = "/1.1/account/verify_credentials.json";

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id_str: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    profile_image_url_https: String,
}

/// Twitter provider
#[derive(Debug, Clone)]
pub struct TwitterProvider {
    name: &'static str,
    signer: OAuth1Signer,
    callback_url: String,
    request_token_url: String,
    authorize_url: String,
    access_token_url: String,
    api_base_url: String,
    email_verification: EmailVerification,
    client: Client,
}

impl TwitterProvider {
    /// Build the adapter from its descriptor and consumer credentials
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the descriptor lacks a request-token endpoint
    pub fn new(
        descriptor: &'static ProviderDescriptor,
        settings: &ProviderSettings,
        callback_url: impl Into<String>,
    ) -> AppResult<Self> {
        let endpoints = descriptor.endpoints(settings);
        let request_token_url = endpoints
            .request_token_url
            .ok_or_else(|| ProviderError::config(descriptor.name, "missing request token URL"))?;
        Ok(Self {
            name: descriptor.name,
            signer: OAuth1Signer::new(&settings.client_id, &settings.client_secret),
            callback_url: callback_url.into(),
            request_token_url,
            authorize_url: endpoints.auth_url,
            access_token_url: endpoints.token_url,
            api_base_url: endpoints.api_base_url,
            email_verification: descriptor.email_verification,
            client: provider_client().clone(),
        })
    }

    /// Signed form POST returning the decoded form body
    async fn post_signed(
        &self,
        url: &str,
        oauth_params: &[(&str, &str)],
        token: Option<TokenCredentials<'_>>,
    ) -> AppResult<HashMap<String, String>> {
        let header = self.signer.authorization_header(
            "POST",
            url,
            &[],
            oauth_params,
            token,
            &SigningContext::now(),
        )?;
        let body = self
            .client
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(provider = self.name, url, error = %e, "OAuth1 token request failed");
                ProviderError::from_reqwest(self.name, ProviderStage::Exchange, &e)
            })?
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.name, ProviderStage::Exchange, &e))?;

        Ok(url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect())
    }

    fn required(&self, form: &mut HashMap<String, String>, field: &str) -> AppResult<String> {
        form.remove(field)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::missing_field(self.name, field).into())
    }
}

#[async_trait]
impl OAuth1Provider for TwitterProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn auth_code_url(&self, state: &str) -> AppResult<String> {
        let mut callback = Url::parse(&self.callback_url)
            .map_err(|e| ProviderError::config(self.name, format!("invalid callback URL: {e}")))?;
        callback.query_pairs_mut().append_pair("state", state);

        let mut form = self
            .post_signed(
                &self.request_token_url,
                &[("oauth_callback", callback.as_str())],
                None,
            )
            .await?;
        if form.get("oauth_callback_confirmed").map(String::as_str) != Some("true") {
            return Err(ProviderError::exchange(self.name, "callback not confirmed").into());
        }
        let request_token = self.required(&mut form, "oauth_token")?;
        debug!(provider = self.name, "Obtained request token");

        let mut authorize = Url::parse(&self.authorize_url)
            .map_err(|e| ProviderError::config(self.name, format!("invalid authorize URL: {e}")))?;
        authorize
            .query_pairs_mut()
            .append_pair("oauth_token", &request_token);
        Ok(authorize.into())
    }

    async fn access_token(&self, request_token: &str, verifier: &str) -> AppResult<OAuth1Token> {
        let mut form = self
            .post_signed(
                &self.access_token_url,
                &[("oauth_verifier", verifier)],
                Some(TokenCredentials {
                    token: request_token,
                    secret: "",
                }),
            )
            .await?;
        Ok(OAuth1Token {
            token: self.required(&mut form, "oauth_token")?,
            token_secret: self.required(&mut form, "oauth_token_secret")?,
        })
    }

    async fn get_profile(&self, token: &str, token_secret: &str) -> AppResult<Profile> {
        let url = format!("{}{VERIFY_CREDENTIALS_PATH}", self.api_base_url);
        let query = [("include_email", "true"), ("skip_status", "true")];
        let header = self.signer.authorization_header(
            "GET",
            &url,
            &query,
            &[],
            Some(TokenCredentials {
                token,
                secret: token_secret,
            }),
            &SigningContext::now(),
        )?;

        let user: TwitterUser = self
            .client
            .get(&url)
            .query(&query)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(provider = self.name, error = %e, "Profile request failed");
                ProviderError::from_reqwest(self.name, ProviderStage::Profile, &e)
            })?
            .json()
            .await
            .map_err(|e| ProviderError::profile(self.name, format!("invalid profile response: {e}")))?;

        Ok(Profile {
            provider_user_id: user.id_str,
            email_verified: self.email_verification.is_verified(&user.email, false),
            email: user.email,
            name: user.name,
            picture: user.profile_image_url_https,
        })
    }
}
