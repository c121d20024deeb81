// ABOUTME: Minimal user record consumed by the token issuer
// ABOUTME: Carries id, roles and anonymity as stored by the persistence layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User as seen by token issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Primary key
    pub id: Uuid,
    /// Roles granted to the user
    pub allowed_roles: Vec<String>,
    /// Role assumed when a request names none
    pub default_role: String,
    /// Whether this is an anonymous account
    pub is_anonymous: bool,
}

impl User {
    /// Create a non-anonymous user with a single role
    #[must_use]
    pub fn new(id: Uuid, role: impl Into<String>) -> Self {
        let role = role.into();
        Self {
            id,
            allowed_roles: vec![role.clone()],
            default_role: role,
            is_anonymous: false,
        }
    }
}
