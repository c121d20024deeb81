// ABOUTME: End-to-end tests of provider sign-in against mocked provider endpoints
// ABOUTME: Redirect, callback, provider errors, account linking and native ID token sign-in
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use federated_auth::config::{
    ElevatedClaimMode, EndpointOverrides, FakeProviderSettings, ProviderSettings,
};
use federated_auth::constants::oidc;
use federated_auth::errors::{ErrorCode, ProviderError};
use federated_auth::jwt::{JwtGetter, SessionContext};
use federated_auth::models::{Profile, SignUpOptions, User};
use federated_auth::oidc::{fake_validator, IdTokenValidators};
use federated_auth::providers::github::GithubProvider;
use federated_auth::providers::{
    descriptor, OAuth2Client, Provider, ProviderRegistry, ProviderSpecificParams,
};
use federated_auth::signin::{CallbackOutcome, CallbackParams, SignInFlow, SignInResult};
use federated_auth::state::SignedState;
use federated_auth::users::{MemoryUsersStore, UsersStore};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT_URL: &str = "https://myapp.local";
const FAKE_SIGNING_KEY: &str = "fake-provider-signing-key-0123456789";

struct Harness {
    flow: SignInFlow,
    jwt: JwtGetter,
    users: Arc<MemoryUsersStore>,
}

fn harness(server: &MockServer) -> Harness {
    let settings = ProviderSettings {
        endpoints: EndpointOverrides {
            token_url: Some(format!("{}/login/oauth/access_token", server.uri())),
            api_base_url: Some(server.uri()),
            ..EndpointOverrides::default()
        },
        ..ProviderSettings::enabled("client-123", "secret-456")
    };
    let client = OAuth2Client::new(
        descriptor("github").unwrap(),
        &settings,
        "https://auth.myapp.local/signin/provider/github/callback",
    );
    let registry =
        ProviderRegistry::from_providers([Provider::OAuth2(Box::new(GithubProvider::new(client)))]);

    let validators = IdTokenValidators {
        fake: Some(Arc::new(fake_validator(&FakeProviderSettings {
            enabled: true,
            signing_key: FAKE_SIGNING_KEY.to_owned(),
            audience: oidc::FAKE_AUDIENCE.to_owned(),
        }))),
        ..IdTokenValidators::default()
    };

    let (jwt, users) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    Harness {
        flow: SignInFlow::new(registry, validators, jwt.clone(), CLIENT_URL),
        jwt,
        users,
    }
}

async fn mount_github(server: &MockServer, email: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_token",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "email": email,
            "avatar_url": "https://avatars.githubusercontent.com/u/583231"
        })))
        .mount(server)
        .await;
}

fn signed_in(outcome: CallbackOutcome) -> SignInResult {
    match outcome {
        CallbackOutcome::SignedIn(result) => result,
        CallbackOutcome::ProviderRejected(rejected) => {
            panic!("unexpected provider rejection: {:?}", rejected.error)
        }
    }
}

fn callback_params(state: String) -> CallbackParams {
    CallbackParams {
        state,
        code: Some("auth-code".to_owned()),
        ..CallbackParams::default()
    }
}

#[tokio::test]
async fn test_start_redirects_with_verifiable_state() {
    common::init_test_logging();
    let server = MockServer::start().await;
    let h = harness(&server);

    let state = SignedState::new(SignUpOptions {
        redirect_to: Some("https://myapp.local/welcome".to_owned()),
        ..SignUpOptions::default()
    });
    let url = h
        .flow
        .start("github", &state, &ProviderSpecificParams::default())
        .await
        .unwrap();

    let parsed = Url::parse(&url).unwrap();
    assert_eq!(parsed.host_str(), Some("github.com"));
    let query: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
    assert_eq!(query["client_id"], "client-123");
    assert_eq!(
        query["redirect_uri"],
        "https://auth.myapp.local/signin/provider/github/callback"
    );
    let decoded = SignedState::decode(&h.jwt, &query["state"]).unwrap();
    assert_eq!(decoded, state);
}

#[tokio::test]
async fn test_start_unknown_provider() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let err = h
        .flow
        .start("myspace", &SignedState::default(), &ProviderSpecificParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedProvider);
}

#[tokio::test]
async fn test_callback_creates_then_finds_user() {
    let server = MockServer::start().await;
    mount_github(&server, Some("octocat@github.com")).await;
    let h = harness(&server);

    let state = SignedState::default().encode(&h.jwt).unwrap();
    let result = signed_in(h.flow.callback("github", callback_params(state.clone())).await.unwrap());
    assert_eq!(result.redirect_to, CLIENT_URL);
    assert_eq!(result.connect_user, None);
    assert_eq!(result.profile.provider_user_id, "583231");
    assert_eq!(result.profile.email, "octocat@github.com");
    assert!(result.profile.email_verified);
    assert_eq!(result.profile.name, "The Octocat");

    let created = h.flow.resolve_user(h.users.as_ref(), &result).await.unwrap();
    assert_eq!(created.default_role, "user");
    assert_eq!(h.users.len(), 1);

    let again = signed_in(h.flow.callback("github", callback_params(state)).await.unwrap());
    let found = h.flow.resolve_user(h.users.as_ref(), &again).await.unwrap();
    assert_eq!(found, created);
    assert_eq!(h.users.len(), 1);
}

#[tokio::test]
async fn test_provider_error_redirects_without_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let h = harness(&server);

    let state = SignedState::new(SignUpOptions {
        redirect_to: Some("https://myapp.local/welcome".to_owned()),
        ..SignUpOptions::default()
    })
    .encode(&h.jwt)
    .unwrap();
    let params = CallbackParams {
        state,
        error: Some("access_denied".to_owned()),
        error_description: Some("The user has denied your application access.".to_owned()),
        error_uri: Some("https://docs.github.com/apps".to_owned()),
        ..CallbackParams::default()
    };

    let outcome = h.flow.callback("github", params).await.unwrap();
    let CallbackOutcome::ProviderRejected(rejected) = outcome else {
        panic!("expected a provider rejection");
    };
    assert!(matches!(
        rejected.error,
        ProviderError::Callback { ref provider, ref error } if provider == "github" && error == "access_denied"
    ));
    let redirect = Url::parse(&rejected.redirect_to).unwrap();
    assert_eq!(redirect.path(), "/welcome");
    let query: HashMap<_, _> = redirect.query_pairs().into_owned().collect();
    assert_eq!(query["provider_error"], "access_denied");
    assert_eq!(
        query["provider_error_description"],
        "The user has denied your application access."
    );
    assert_eq!(query["provider_error_url"], "https://docs.github.com/apps");
}

#[tokio::test]
async fn test_callback_rejects_bad_state_and_missing_code() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let err = h
        .flow
        .callback("github", callback_params("forged".to_owned()))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);

    let params = CallbackParams {
        state: SignedState::default().encode(&h.jwt).unwrap(),
        ..CallbackParams::default()
    };
    let err = h.flow.callback("github", params).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_connect_links_provider_to_session_user() {
    let server = MockServer::start().await;
    mount_github(&server, Some("octocat@github.com")).await;
    let h = harness(&server);

    let existing = User::new(Uuid::new_v4(), "user");
    h.users.add_user(existing.clone(), "someone-else@myapp.local");
    let session = h
        .jwt
        .issue(&existing, &SessionContext::default())
        .await
        .unwrap();

    let state = SignedState::connect(session.access_token, SignUpOptions::default())
        .encode(&h.jwt)
        .unwrap();
    let result = signed_in(h.flow.callback("github", callback_params(state)).await.unwrap());
    assert_eq!(result.connect_user, Some(existing.id));

    let linked = h.flow.resolve_user(h.users.as_ref(), &result).await.unwrap();
    assert_eq!(linked.id, existing.id);
    assert_eq!(
        h.users.find_by_provider("github", "583231").await.unwrap(),
        Some(existing)
    );
    assert_eq!(h.users.len(), 1);
}

fn result_with(profile: Profile) -> SignInResult {
    SignInResult {
        provider: "github".to_owned(),
        profile,
        state: SignedState::default(),
        connect_user: None,
        redirect_to: CLIENT_URL.to_owned(),
    }
}

#[tokio::test]
async fn test_links_by_verified_email_only() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let existing = User::new(Uuid::new_v4(), "user");
    h.users.add_user(existing.clone(), "jane@myapp.local");

    let unverified = result_with(Profile {
        provider_user_id: "1".to_owned(),
        email: "jane@myapp.local".to_owned(),
        email_verified: false,
        ..Profile::default()
    });
    let created = h.flow.resolve_user(h.users.as_ref(), &unverified).await.unwrap();
    assert_ne!(created.id, existing.id);

    let verified = result_with(Profile {
        provider_user_id: "2".to_owned(),
        email: "JANE@myapp.local".to_owned(),
        email_verified: true,
        ..Profile::default()
    });
    let linked = h.flow.resolve_user(h.users.as_ref(), &verified).await.unwrap();
    assert_eq!(linked.id, existing.id);
}

fn fake_id_token(claims: &serde_json::Value) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(FAKE_SIGNING_KEY.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_native_id_token_sign_in() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let now = common::now();

    let token = fake_id_token(&json!({
        "iss": oidc::FAKE_ISSUER,
        "aud": oidc::FAKE_AUDIENCE,
        "sub": "fake-user-1",
        "email": "fake@myapp.local",
        "email_verified": true,
        "iat": now - 10,
        "exp": now + 300,
    }));
    let profile = h.flow.sign_in_id_token("fake", &token, "").await.unwrap();
    assert_eq!(profile.provider_user_id, "fake-user-1");
    assert!(profile.email_verified);

    let err = h
        .flow
        .sign_in_id_token("fake", &token, "unexpected-nonce")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::IdTokenNonceMismatch);

    let err = h.flow.sign_in_id_token("github", &token, "").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedProvider);
}

#[tokio::test]
async fn test_native_id_token_without_subject() {
    let server = MockServer::start().await;
    let h = harness(&server);
    let now = common::now();

    let token = fake_id_token(&json!({
        "iss": oidc::FAKE_ISSUER,
        "aud": oidc::FAKE_AUDIENCE,
        "iat": now,
        "exp": now + 300,
    }));
    let err = h.flow.sign_in_id_token("fake", &token, "").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);
    assert_eq!(err.context.provider.as_deref(), Some("fake"));
}
