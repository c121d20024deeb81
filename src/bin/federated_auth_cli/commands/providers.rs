// ABOUTME: Provider commands for federated-auth-cli
// ABOUTME: Registry listing, authorization URL generation and ID token verification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use anyhow::{Context, Result};
use federated_auth::config::ServerConfig;
use federated_auth::jwt::JwtGetter;
use federated_auth::models::SignUpOptions;
use federated_auth::oidc::IdTokenValidators;
use federated_auth::providers::{ProviderRegistry, ProviderSpecificParams};
use federated_auth::signin::SignInFlow;
use federated_auth::state::SignedState;
use federated_auth::users::MemoryUsersStore;
use tracing::info;

fn load_config() -> Result<ServerConfig> {
    ServerConfig::from_env().context("failed to load configuration from the environment")
}

fn sign_in_flow(config: &ServerConfig) -> Result<SignInFlow> {
    let jwt = JwtGetter::from_config(config, None, Arc::new(MemoryUsersStore::new()))?;
    Ok(SignInFlow::from_config(config, jwt)?)
}

/// Print every enabled provider
pub fn list() -> Result<()> {
    let config = load_config()?;
    let validators = IdTokenValidators::from_config(&config.providers);
    let registry = ProviderRegistry::from_config(&config, &validators)?;

    if registry.is_empty() {
        println!("No providers enabled");
        return Ok(());
    }
    println!("{:<14} PROTOCOL", "PROVIDER");
    for provider in registry.iter() {
        let protocol = if provider.is_oauth1() { "oauth1" } else { "oauth2" };
        println!("{:<14} {protocol}", provider.name());
    }
    Ok(())
}

/// Print the redirect URL that starts a sign-in
pub async fn authorize_url(
    provider: &str,
    redirect_to: Option<String>,
    connection: Option<String>,
    organization: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let flow = sign_in_flow(&config)?;

    let state = SignedState::new(SignUpOptions {
        redirect_to,
        ..SignUpOptions::default()
    });
    let params = ProviderSpecificParams {
        connection,
        organization,
        domain: None,
    };
    let url = flow
        .start(provider, &state, &params)
        .await
        .with_context(|| format!("failed to build authorization URL for {provider}"))?;
    info!(provider, "Authorization URL generated");
    println!("{url}");
    Ok(())
}

/// Verify an ID token and print the normalized profile as JSON
pub async fn verify_id_token(provider: &str, token: &str, nonce: &str) -> Result<()> {
    let config = load_config()?;
    let flow = sign_in_flow(&config)?;

    let profile = flow
        .sign_in_id_token(provider, token, nonce)
        .await
        .context("ID token rejected")?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
