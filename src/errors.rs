// ABOUTME: Unified error types re-exported from the core crate
// ABOUTME: Gives the main crate a stable `crate::errors` path for AppError and friends
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use federated_auth_core::errors::*;
