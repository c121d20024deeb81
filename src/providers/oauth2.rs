// ABOUTME: Generic OAuth2 authorization-code client shared by every OAuth2 provider adapter
// ABOUTME: Builds authorization URLs, exchanges codes for tokens and makes bearer-authenticated calls
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::spi::ProviderDescriptor;
use crate::config::ProviderSettings;
use crate::errors::{AppResult, ProviderError, ProviderStage};
use crate::utils::http_client::provider_client;

/// OAuth 2.0 client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// OAuth client ID from provider
    pub client_id: String,
    /// OAuth client secret from provider
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
    /// Redirect URI for OAuth callbacks
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

/// Token set returned by the token endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    /// Bearer access token
    pub access_token: String,
    /// Token type, usually `Bearer`
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token, when offline access was granted
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// ID token, for OpenID Connect providers
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Raw token response; some providers answer errors with a 200
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// `OAuth2` client bound to one provider
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    descriptor: &'static ProviderDescriptor,
    config: OAuth2Config,
    api_base_url: String,
    client: Client,
}

impl OAuth2Client {
    /// Create a client for `descriptor` with the configured credentials
    #[must_use]
    pub fn new(
        descriptor: &'static ProviderDescriptor,
        settings: &ProviderSettings,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let endpoints = descriptor.endpoints(settings);
        Self {
            descriptor,
            config: OAuth2Config {
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
                auth_url: endpoints.auth_url,
                token_url: endpoints.token_url,
                redirect_uri: redirect_uri.into(),
                scopes: descriptor.scopes(settings),
            },
            api_base_url: endpoints.api_base_url,
            client: provider_client().clone(),
        }
    }

    /// Provider name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Static provider description
    #[must_use]
    pub const fn descriptor(&self) -> &'static ProviderDescriptor {
        self.descriptor
    }

    /// Get the `OAuth2` configuration
    #[must_use]
    pub const fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Absolute URL for a profile API path
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base_url)
    }

    /// Get authorization URL
    ///
    /// `extra` parameters replace standard parameters of the same name, which
    /// lets a provider change `response_type`, and are appended otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the authorization endpoint is not a valid URL
    pub fn auth_code_url(&self, state: &str, extra: &[(&str, &str)]) -> AppResult<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| ProviderError::config(self.name(), format!("invalid auth URL: {e}")))?;

        let scope = self.config.scopes.join(" ");
        let mut params: Vec<(&str, &str)> = vec![
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        for &(key, value) in extra {
            match params.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => params.push((key, value)),
            }
        }

        url.query_pairs_mut().extend_pairs(params);
        Ok(url.to_string())
    }

    /// Exchange authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an exchange error on transport failure, non-2xx status, an
    /// undecodable body, or an error payload from the provider
    pub async fn exchange(&self, code: &str) -> AppResult<OAuth2Token> {
        self.exchange_with_secret(code, &self.config.client_secret)
            .await
    }

    /// Exchange a code using a client secret minted per request
    ///
    /// # Errors
    ///
    /// Same as [`Self::exchange`]
    pub async fn exchange_with_secret(
        &self,
        code: &str,
        client_secret: &str,
    ) -> AppResult<OAuth2Token> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        debug!(provider = self.name(), "Exchanging authorization code");
        let response = self
            .client
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(provider = self.name(), error = %e, "Token exchange failed");
                ProviderError::from_reqwest(self.name(), ProviderStage::Exchange, &e)
            })?;

        let body: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::exchange(self.name(), format!("invalid token response: {e}"))
        })?;

        Self::token_from_response(self.name(), body)
    }

    fn token_from_response(provider: &str, response: TokenResponse) -> AppResult<OAuth2Token> {
        if let Some(error) = response.error {
            let details = response
                .error_description
                .map_or_else(|| error.clone(), |d| format!("{error}: {d}"));
            warn!(provider, error = %details, "Provider rejected the authorization code");
            return Err(ProviderError::exchange(provider, details).into());
        }
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::missing_field(provider, "access_token"))?;

        Ok(OAuth2Token {
            access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            scope: response.scope,
            id_token: response.id_token,
        })
    }

    /// Bearer-authenticated GET decoded as JSON
    ///
    /// # Errors
    ///
    /// Returns a profile error on transport failure, non-2xx status or an undecodable body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        headers: HeaderMap,
    ) -> AppResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .headers(headers)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(provider = self.name(), url, error = %e, "Profile request failed");
                ProviderError::from_reqwest(self.name(), ProviderStage::Profile, &e)
            })?;

        response.json().await.map_err(|e| {
            ProviderError::profile(self.name(), format!("invalid profile response: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::providers;
    use crate::providers::spi::descriptor;

    fn client(name: &str) -> OAuth2Client {
        OAuth2Client::new(
            descriptor(name).unwrap(),
            &ProviderSettings::enabled("my-client", "my-secret"),
            "https://auth.myapp.local/signin/provider/github/callback",
        )
    }

    #[test]
    fn test_auth_code_url_standard_params() {
        let url = client(providers::GITHUB).auth_code_url("st4te", &[]).unwrap();
        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [
                ("client_id".to_owned(), "my-client".to_owned()),
                (
                    "redirect_uri".to_owned(),
                    "https://auth.myapp.local/signin/provider/github/callback".to_owned()
                ),
                ("response_type".to_owned(), "code".to_owned()),
                ("scope".to_owned(), "user:email".to_owned()),
                ("state".to_owned(), "st4te".to_owned()),
            ]
        );
    }

    #[test]
    fn test_extra_params_replace_then_append() {
        let url = client(providers::APPLE)
            .auth_code_url(
                "s",
                &[("response_type", "code id_token"), ("response_mode", "form_post")],
            )
            .unwrap();
        let parsed = Url::parse(&url).unwrap();
        let response_types: Vec<_> = parsed
            .query_pairs()
            .filter(|(k, _)| k == "response_type")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(response_types, ["code id_token"]);
        assert!(parsed
            .query_pairs()
            .any(|(k, v)| k == "response_mode" && v == "form_post"));
    }

    #[test]
    fn test_error_payload_with_ok_status_is_an_exchange_error() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#,
        )
        .unwrap();
        let err = OAuth2Client::token_from_response("github", response).unwrap_err();
        assert_eq!(err.context.provider.as_deref(), Some("github"));
        assert!(err.message.contains("bad_verification_code"));
    }

    #[test]
    fn test_token_response_keeps_id_token() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"id_token":"eyJ"}"#,
        )
        .unwrap();
        let token = OAuth2Client::token_from_response("google", response).unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.id_token.as_deref(), Some("eyJ"));
    }
}
