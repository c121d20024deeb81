// ABOUTME: Maps request paths to the limiter classes that apply to them
// ABOUTME: Which paths send email depends on whether email verification is required
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use bitflags::bitflags;

bitflags! {
    /// Limiter classes a path belongs to, besides the global limiter
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PathClass: u8 {
        /// Sends an email
        const EMAIL = 0b0000_0001;
        /// Sends an SMS
        const SMS = 0b0000_0010;
        /// Guesses a secret: sign-in, verification, OTP
        const BRUTE_FORCE = 0b0000_0100;
        /// Creates an account
        const SIGNUP = 0b0000_1000;
        /// Server-to-server `OAuth2` calls
        const OAUTH2_SERVER = 0b0001_0000;
    }
}

const EMAIL_PATHS: &[&str] = &[
    "/signin/passwordless/email",
    "/signin/otp/email",
    "/user/email/change",
    "/user/email/send-verification-email",
    "/user/password/reset",
];

/// Send mail only when new addresses must be verified
const EMAIL_PATHS_WHEN_VERIFYING: &[&str] = &["/signup/email-password", "/user/deanonymize"];

const SMS_PATHS: &[&str] = &["/signin/passwordless/sms", "/signin/passwordless/sms/otp"];

const OAUTH2_PROVIDER_PATHS: &[&str] = &["/oauth2/login", "/oauth2/authorize"];

const OAUTH2_SERVER_PATHS: &[&str] = &["/oauth2/token", "/oauth2/introspect"];

/// Classifies request paths relative to the API prefix
#[derive(Debug, Clone)]
pub struct PathClassifier {
    api_prefix: String,
    email_verification_required: bool,
}

impl PathClassifier {
    /// Create a classifier; `api_prefix` is stripped before matching
    #[must_use]
    pub fn new(api_prefix: &str, email_verification_required: bool) -> Self {
        Self {
            api_prefix: api_prefix.trim_end_matches('/').to_owned(),
            email_verification_required,
        }
    }

    /// Classes of `path`; empty when only the global limiter applies
    #[must_use]
    pub fn classify(&self, path: &str) -> PathClass {
        let path = self.strip_prefix(path);
        let mut class = PathClass::empty();

        if EMAIL_PATHS.contains(&path)
            || (self.email_verification_required && EMAIL_PATHS_WHEN_VERIFYING.contains(&path))
        {
            class |= PathClass::EMAIL;
        }
        if SMS_PATHS.contains(&path) {
            class |= PathClass::SMS;
        }
        if path.starts_with("/signin/")
            || path.ends_with("/verify")
            || OAUTH2_PROVIDER_PATHS.contains(&path)
        {
            class |= PathClass::BRUTE_FORCE;
        }
        if path.starts_with("/signup/") {
            class |= PathClass::SIGNUP;
        }
        if OAUTH2_SERVER_PATHS.contains(&path) {
            class |= PathClass::OAUTH2_SERVER;
        }
        class
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        if self.api_prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(self.api_prefix.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    }
}
