// ABOUTME: Core types and constants for the federated authentication service
// ABOUTME: Foundation crate with error handling, identity models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Federated Auth Core
//!
//! Foundation crate providing shared types and constants. It is designed to
//! change infrequently, enabling incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and domain-specific errors
//! - **constants**: Application-wide constants organized by domain
//! - **models**: Provider-agnostic identity types

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants and configuration values organized by domain
pub mod constants;

/// Identity data models (`Profile`, `SignUpOptions`, `User`)
pub mod models;
