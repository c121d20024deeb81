// ABOUTME: Application constants re-exported from the core crate
// ABOUTME: Provider names, token defaults, throttling defaults and network timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub use federated_auth_core::constants::*;
