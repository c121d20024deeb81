// ABOUTME: federated-auth-cli - operations tool for the federated sign-in core
// ABOUTME: Lists providers, builds authorization URLs, verifies ID tokens and handles secrets at rest
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # List enabled providers and their protocol
//! federated-auth-cli providers
//!
//! # Print the redirect URL that starts a GitHub sign-in
//! federated-auth-cli authorize-url github --redirect-to https://myapp.local/welcome
//!
//! # Verify a native Apple ID token
//! federated-auth-cli verify-id-token --provider apple --token eyJ... --nonce n0nce
//!
//! # Encrypt and decrypt with AUTH_ENCRYPTION_KEY
//! federated-auth-cli encrypt "refresh-token"
//! federated-auth-cli decrypt 5f1c...
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "federated-auth-cli",
    about = "Federated sign-in operations CLI",
    long_about = "Inspect provider configuration, exercise sign-in flows and manage encrypted secrets."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Encryption key override (hex encoded, 32 bytes)
    #[arg(long, global = true)]
    encryption_key: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// List enabled providers with their protocol
    Providers,

    /// Print the authorization redirect URL for a fresh signed state
    AuthorizeUrl {
        /// Provider name
        provider: String,

        /// Client URL to land on after sign-in
        #[arg(long)]
        redirect_to: Option<String>,

        /// `WorkOS` connection
        #[arg(long)]
        connection: Option<String>,

        /// `WorkOS` organization
        #[arg(long)]
        organization: Option<String>,
    },

    /// Verify a provider-issued ID token and print the profile
    VerifyIdToken {
        /// Provider name (apple, google, fake)
        #[arg(long)]
        provider: String,

        /// Raw ID token
        #[arg(long)]
        token: String,

        /// Nonce presented with the token
        #[arg(long, default_value = "")]
        nonce: String,
    },

    /// Encrypt a value and print it hex encoded
    Encrypt {
        /// Plaintext
        plaintext: String,
    },

    /// Decrypt a hex-encoded value
    Decrypt {
        /// Hex ciphertext
        ciphertext: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();
    debug!("federated-auth-cli starting");

    match cli.command {
        Command::Providers => commands::providers::list()?,
        Command::AuthorizeUrl {
            provider,
            redirect_to,
            connection,
            organization,
        } => {
            commands::providers::authorize_url(&provider, redirect_to, connection, organization)
                .await?;
        }
        Command::VerifyIdToken {
            provider,
            token,
            nonce,
        } => commands::providers::verify_id_token(&provider, &token, &nonce).await?,
        Command::Encrypt { plaintext } => {
            commands::crypto::encrypt(cli.encryption_key.as_deref(), &plaintext)?;
        }
        Command::Decrypt { ciphertext } => {
            commands::crypto::decrypt(cli.encryption_key.as_deref(), &ciphertext)?;
        }
    }

    Ok(())
}
