// ABOUTME: Normalized identity returned by every identity provider adapter
// ABOUTME: Also holds the signup options that travel with a sign-in attempt
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity asserted by an external provider, normalized across providers.
///
/// Created per authentication attempt and discarded once the user record has
/// been looked up or linked.
///
/// # Examples
///
/// ```rust
/// use federated_auth_core::models::Profile;
///
/// let profile = Profile {
///     provider_user_id: "106964149809169421082".into(),
///     email: "jane@myapp.local".into(),
///     email_verified: true,
///     name: "Jane".into(),
///     picture: String::new(),
/// };
/// assert!(profile.has_email());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Stable subject identifier at the provider
    #[serde(rename = "providerUserID")]
    pub provider_user_id: String,
    /// Email address, empty when the provider exposes none
    pub email: String,
    /// Whether the email counts as verified under the provider's policy
    pub email_verified: bool,
    /// Display name
    pub name: String,
    /// Avatar URL
    pub picture: String,
}

impl Profile {
    /// Whether the provider returned an email address
    #[must_use]
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// Options supplied when a sign-in may create a new account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOptions {
    /// Roles the new user may assume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_roles: Option<Vec<String>>,
    /// Role the new user assumes by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
    /// Display name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Preferred locale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Free-form user metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Where the client wants to land after the flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}
