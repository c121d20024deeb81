// ABOUTME: Service token issuance and verification module
// ABOUTME: Secret parsing, issuer, custom claims and the elevated-claim policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Custom claims resolution
pub mod custom_claims;
/// Elevated-claim policy
pub mod elevated;
/// Token issuer and verifier
pub mod issuer;
/// JWT secret parsing and key publication
pub mod secret;

pub use custom_claims::{pg_encode, CustomClaimer, GraphqlCustomClaims};
pub use elevated::ElevatedClaimPolicy;
pub use issuer::{IssuedToken, JwtGetter, SessionContext, TokenClaims};
pub use secret::{JsonWebKey, JsonWebKeySet, JwtSecret, SigningKeys};
