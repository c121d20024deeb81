// ABOUTME: Command modules for federated-auth-cli
// ABOUTME: Provider inspection and secret encryption commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod crypto;
pub mod providers;
