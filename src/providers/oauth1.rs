// ABOUTME: OAuth 1.0a request signing with HMAC-SHA1 over the canonical parameter string
// ABOUTME: Produces the Authorization header for request-token, access-token and API calls
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! `OAuth1` signer
//!
//! Signature base string:
//! `METHOD&enc(base_url)&enc(k1=v1&k2=v2...)`, where every key and value is
//! percent-encoded (RFC 3986 unreserved set) and the pairs are sorted by
//! encoded key, then encoded value. The signing key is
//! `enc(consumer_secret)&enc(token_secret)`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::distributions::Alphanumeric;
use rand::Rng;
use ring::hmac;
use url::Url;

use crate::errors::{AppError, AppResult};

const NONCE_LENGTH: usize = 32;

/// Consumer credentials plus the per-request signing routine
#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
}

/// Per-request values that are random or time dependent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// `oauth_nonce`
    pub nonce: String,
    /// `oauth_timestamp`, seconds since the epoch
    pub timestamp: i64,
}

impl SigningContext {
    /// Fresh random nonce and the current time
    #[must_use]
    pub fn now() -> Self {
        Self {
            nonce: rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(NONCE_LENGTH)
                .map(char::from)
                .collect(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Token a request is signed on behalf of
#[derive(Debug, Clone, Copy)]
pub struct TokenCredentials<'a> {
    /// `oauth_token`
    pub token: &'a str,
    /// Secret paired with the token, possibly empty
    pub secret: &'a str,
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl OAuth1Signer {
    /// Create a signer for a consumer key and secret
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// `Authorization` header for a request
    ///
    /// `params` are the non-`oauth_` request parameters (form body or
    /// query) and `oauth_params` extra protocol parameters such as
    /// `oauth_callback` or `oauth_verifier`. Query parameters already in
    /// `url` are included in the signature.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `url` does not parse
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
        token: Option<TokenCredentials<'_>>,
        context: &SigningContext,
    ) -> AppResult<String> {
        let timestamp = context.timestamp.to_string();
        let mut protocol: Vec<(String, String)> = vec![
            ("oauth_consumer_key".to_owned(), self.consumer_key.clone()),
            ("oauth_nonce".to_owned(), context.nonce.clone()),
            ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
            ("oauth_timestamp".to_owned(), timestamp),
            ("oauth_version".to_owned(), "1.0".to_owned()),
        ];
        if let Some(token) = token {
            protocol.push(("oauth_token".to_owned(), token.token.to_owned()));
        }
        protocol.extend(
            oauth_params
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        );

        let signature = self.signature(method, url, params, &protocol, token)?;
        protocol.push(("oauth_signature".to_owned(), signature));
        protocol.sort();

        let fields: Vec<String> = protocol
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        protocol: &[(String, String)],
        token: Option<TokenCredentials<'_>>,
    ) -> AppResult<String> {
        let base = signature_base_string(method, url, params, protocol)?;
        let signing_key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(token.map_or("", |t| t.secret))
        );
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
        Ok(STANDARD.encode(hmac::sign(&key, base.as_bytes()).as_ref()))
    }
}

/// Canonical signature base string for a request
///
/// # Errors
///
/// Returns an internal error if `url` does not parse
pub fn signature_base_string(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    protocol: &[(String, String)],
) -> AppResult<String> {
    let parsed =
        Url::parse(url).map_err(|e| AppError::internal(format!("invalid OAuth1 URL: {e}")))?;

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .chain(protocol.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect();
    pairs.sort();
    let normalized: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();

    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();
    let base_url = format!(
        "{}://{}{}{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default(),
        port,
        parsed.path()
    );

    Ok(format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(&base_url),
        encode(&normalized.join("&"))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_unreserved_set() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b._~"), "a-b._~");
        assert_eq!(encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_base_string_includes_query_and_drops_default_port() {
        let base = signature_base_string(
            "get",
            "https://api.twitter.com:443/1.1/account/verify_credentials.json?include_email=true",
            &[],
            &[("oauth_token".to_owned(), "t".to_owned())],
        )
        .unwrap();
        assert_eq!(
            base,
            "GET&https%3A%2F%2Fapi.twitter.com%2F1.1%2Faccount%2Fverify_credentials.json&include_email%3Dtrue%26oauth_token%3Dt"
        );
    }

    #[test]
    fn test_header_lists_sorted_protocol_params() {
        let signer = OAuth1Signer::new("ck", "cs");
        let context = SigningContext {
            nonce: "n".to_owned(),
            timestamp: 1,
        };
        let header = signer
            .authorization_header(
                "POST",
                "https://api.twitter.com/oauth/request_token",
                &[],
                &[("oauth_callback", "https://auth.myapp.local/cb?state=x")],
                None,
                &context,
            )
            .unwrap();
        assert!(header.starts_with(
            "OAuth oauth_callback=\"https%3A%2F%2Fauth.myapp.local%2Fcb%3Fstate%3Dx\", oauth_consumer_key=\"ck\""
        ));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("oauth_token="));
    }
}
