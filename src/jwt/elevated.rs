// ABOUTME: Elevated-claim policy guarding sensitive account actions
// ABOUTME: Decides whether a verified session must carry a recent step-up proof
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::TokenClaims;
use crate::config::ElevatedClaimMode;
use crate::constants::{jwt, paths};
use crate::errors::{AppError, AppResult, JwtError};
use crate::users::UsersStore;

/// Elevated-claim enforcement
///
/// | mode | security keys | enrollment path | outcome |
/// |---|---|---|---|
/// | `disabled` | any | any | allowed |
/// | `recommended` | none | any | allowed |
/// | `required` | none | yes | allowed |
/// | otherwise | | | claim must equal the subject |
#[derive(Clone)]
pub struct ElevatedClaimPolicy {
    mode: ElevatedClaimMode,
    users: Arc<dyn UsersStore>,
}

impl ElevatedClaimPolicy {
    /// Create the policy
    #[must_use]
    pub fn new(mode: ElevatedClaimMode, users: Arc<dyn UsersStore>) -> Self {
        Self { mode, users }
    }

    /// Configured mode
    #[must_use]
    pub const fn mode(&self) -> ElevatedClaimMode {
        self.mode
    }

    /// Whether a freshly elevated session for `user_id` gets the claim
    ///
    /// `required` always embeds it; `recommended` only once the user has a
    /// security key to step up with.
    ///
    /// # Errors
    ///
    /// Returns any store error from counting security keys
    pub async fn embeds_claim(&self, user_id: Uuid) -> AppResult<bool> {
        match self.mode {
            ElevatedClaimMode::Disabled => Ok(false),
            ElevatedClaimMode::Required => Ok(true),
            ElevatedClaimMode::Recommended => {
                Ok(self.users.count_security_keys(user_id).await? > 0)
            }
        }
    }

    fn is_optional(&self, request_path: &str) -> bool {
        self.mode == ElevatedClaimMode::Recommended
            || request_path == paths::WEBAUTHN_ADD
            || request_path == paths::WEBAUTHN_VERIFY
    }

    /// Check a verified session against the policy
    ///
    /// # Errors
    ///
    /// Returns `ElevatedClaimRequired` when the session lacks the proof, or
    /// `AuthInvalid` when the token carries no usable subject
    pub async fn check(&self, claims: &TokenClaims, request_path: &str) -> AppResult<()> {
        if self.mode == ElevatedClaimMode::Disabled {
            return Ok(());
        }

        let subject = claims
            .subject()
            .ok_or_else(|| AppError::auth_invalid("token has no subject"))?;

        if self.is_optional(request_path) {
            let user_id = Uuid::parse_str(subject)
                .map_err(|e| AppError::auth_invalid(format!("error parsing user id: {e}")))?;
            if self.users.count_security_keys(user_id).await? == 0 {
                return Ok(());
            }
        }

        if claims.custom_claim(jwt::ELEVATED) == Some(subject) {
            Ok(())
        } else {
            debug!(user_id = %subject, path = %request_path, "Elevated claim missing");
            Err(JwtError::ElevatedClaimRequired.into())
        }
    }
}
