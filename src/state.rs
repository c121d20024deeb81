// ABOUTME: Signed, short-lived flow state carried through the provider redirect round trip
// ABOUTME: Encodes linking intent and signup options as claims of a service-signed token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::jwt::STATE_TTL_SECS;
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtGetter;
use crate::models::SignUpOptions;

/// State round-tripped through the identity provider
///
/// The provider echoes the encoded value unmodified; the callback must
/// re-validate signature and expiry before trusting any field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedState {
    /// Access token of an existing user who is linking this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<String>,
    /// Options for an account created by this sign-in
    #[serde(default)]
    pub options: SignUpOptions,
}

impl SignedState {
    /// State for a plain sign-in
    #[must_use]
    pub fn new(options: SignUpOptions) -> Self {
        Self {
            connect: None,
            options,
        }
    }

    /// State for linking a provider to the user owning `access_token`
    #[must_use]
    pub fn connect(access_token: impl Into<String>, options: SignUpOptions) -> Self {
        Self {
            connect: Some(access_token.into()),
            options,
        }
    }

    /// Sign the state with a five minute validity window
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails
    pub fn encode(&self, jwt: &JwtGetter) -> AppResult<String> {
        let claims = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => return Err(AppError::serialization("state must serialize to an object")),
        };
        jwt.sign_with_claims(claims, Utc::now() + Duration::seconds(STATE_TTL_SECS))
    }

    /// Verify and decode a state value
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for a bad signature or unreadable claims, `AuthExpired` past the window
    pub fn decode(jwt: &JwtGetter, state: &str) -> AppResult<Self> {
        let claims = jwt.validate(state).map_err(|e| {
            debug!(error = %e, "Invalid state token");
            e
        })?;
        Self::from_claims(claims.as_map())
    }

    fn from_claims(claims: &Map<String, Value>) -> AppResult<Self> {
        let connect = match claims.get("connect") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(AppError::auth_invalid("invalid state: connect")),
        };
        let options = match claims.get("options") {
            None | Some(Value::Null) => SignUpOptions::default(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| AppError::auth_invalid(format!("invalid state: options: {e}")))?,
        };
        Ok(Self { connect, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_claims_rejects_wrong_types() {
        let map: Map<String, Value> = serde_json::from_str(r#"{"connect": 5}"#).unwrap();
        assert!(SignedState::from_claims(&map).is_err());
    }

    #[test]
    fn test_from_claims_defaults() {
        let state = SignedState::from_claims(&Map::new()).unwrap();
        assert_eq!(state, SignedState::default());
    }

    #[test]
    fn test_serializes_camel_case_options() {
        let state = SignedState::new(SignUpOptions {
            redirect_to: Some("https://myapp.local/welcome".to_owned()),
            ..SignUpOptions::default()
        });
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["options"]["redirectTo"], json!("https://myapp.local/welcome"));
        assert!(value.get("connect").is_none());
    }
}
