// ABOUTME: Core identity data models shared across the federated authentication service
// ABOUTME: Re-exports Profile, SignUpOptions, and User
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Provider-agnostic identity types. Every provider adapter produces a [`Profile`];
//! the JWT issuer consumes a [`User`].

mod profile;
mod user;

pub use profile::{Profile, SignUpOptions};
pub use user::User;
