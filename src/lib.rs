// ABOUTME: Main library entry point for the federated sign-in core
// ABOUTME: Provider adapters, ID-token validation, token issuance and request throttling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Federated Auth
//!
//! The machinery an authentication backend uses to talk to external
//! identity providers, check tokens they issue, mint its own session
//! tokens and throttle abuse-prone endpoints.
//!
//! ## Architecture
//!
//! - **Providers**: `OAuth1` and `OAuth2` adapters behind capability traits,
//!   built once into a read-only registry
//! - **OIDC**: ID token validator with a shared JWKS cache
//! - **JWT**: session token issuer with custom claims and the elevated-claim policy
//! - **Rate limiting**: window counters over a memory or Redis store, applied
//!   by path classification as axum middleware
//! - **Sign-in**: the callback flow tying the pieces together
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use federated_auth::config::ServerConfig;
//! use federated_auth::errors::AppResult;
//! use federated_auth::jwt::JwtGetter;
//! use federated_auth::signin::SignInFlow;
//! use federated_auth::users::MemoryUsersStore;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let users = Arc::new(MemoryUsersStore::new());
//!     let jwt = JwtGetter::from_config(&config, None, users)?;
//!     let flow = SignInFlow::from_config(&config, jwt)?;
//!     println!("providers: {:?}", flow.registry().names());
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Constants shared with the foundation crate
pub mod constants;

/// Symmetric encryption of provider tokens at rest
pub mod crypto;

/// Unified error handling
pub mod errors;

/// Service token issuance, custom claims and elevated claims
pub mod jwt;

/// Structured logging setup and auth event helpers
pub mod logging;

/// Provider-agnostic identity types
pub use federated_auth_core::models;

/// ID token verification
pub mod oidc;

/// Identity provider adapters and registry
pub mod providers;

/// Request throttling
pub mod rate_limiting;

/// Provider sign-in orchestration
pub mod signin;

/// Signed flow state
pub mod state;

/// User persistence capability
pub mod users;

/// Shared helpers
pub mod utils;
