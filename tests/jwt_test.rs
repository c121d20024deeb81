// ABOUTME: Integration tests for service token issuance, verification and signed state
// ABOUTME: Covers HMAC and RSA secrets, custom claims over GraphQL and the elevated-claim policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use federated_auth::config::{CustomClaimsConfig, ElevatedClaimMode};
use federated_auth::constants::jwt;
use federated_auth::errors::ErrorCode;
use federated_auth::jwt::{CustomClaimer, GraphqlCustomClaims, JwtGetter, SessionContext};
use federated_auth::models::{SignUpOptions, User};
use federated_auth::state::SignedState;
use federated_auth::users::{MemoryUsersStore, UsersStore};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Map, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user() -> User {
    User {
        id: Uuid::new_v4(),
        allowed_roles: vec!["user".to_owned(), "me".to_owned()],
        default_role: "user".to_owned(),
        is_anonymous: false,
    }
}

fn namespace(getter: &JwtGetter, token: &str) -> Map<String, Value> {
    let claims = getter.validate(token).unwrap();
    claims
        .get(jwt::DEFAULT_CLAIMS_NAMESPACE)
        .and_then(Value::as_object)
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_issue_and_validate_hs256() {
    common::init_test_logging();
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    let user = user();

    let issued = getter.issue(&user, &SessionContext::default()).await.unwrap();
    assert_eq!(issued.expires_in, 900);

    let claims = getter.validate(&issued.access_token).unwrap();
    assert_eq!(claims.subject(), Some(user.id.to_string().as_str()));
    assert_eq!(claims.user_id().unwrap(), user.id);
    assert!(!claims.is_anonymous());
    assert_eq!(claims.get("iss"), Some(&json!(jwt::DEFAULT_ISSUER)));

    let ns = namespace(&getter, &issued.access_token);
    assert_eq!(ns[jwt::ALLOWED_ROLES], json!(["user", "me"]));
    assert_eq!(ns[jwt::DEFAULT_ROLE], json!("user"));
    assert_eq!(ns[jwt::USER_IS_ANONYMOUS], json!("false"));
    assert!(!ns.contains_key(jwt::ELEVATED));
}

#[tokio::test]
async fn test_rs256_tokens_verify_with_published_key() {
    let users: Arc<dyn UsersStore> = Arc::new(MemoryUsersStore::new());
    let getter = JwtGetter::new(
        &common::rs256_secret(),
        Duration::from_secs(60),
        None,
        ElevatedClaimMode::Disabled,
        users,
    )
    .unwrap();
    assert!(getter.is_asymmetric());
    assert_eq!(getter.jwks().keys.len(), 1);
    assert_eq!(getter.jwks().keys[0].kid, common::FIXTURE_KID);

    let issued = getter.issue(&user(), &SessionContext::default()).await.unwrap();
    let header = jsonwebtoken::decode_header(&issued.access_token).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some(common::FIXTURE_KID));

    let jwk = &getter.jwks().keys[0];
    let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_aud = false;
    decode::<Value>(&issued.access_token, &key, &validation).unwrap();
}

#[test]
fn test_validate_rejects_expired_and_tampered_tokens() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);

    let mut claims = Map::new();
    claims.insert("sub".to_owned(), json!("someone"));
    let expired = getter
        .sign_with_claims(claims.clone(), Utc::now() - chrono::Duration::seconds(30))
        .unwrap();
    assert_eq!(getter.validate(&expired).unwrap_err().code, ErrorCode::AuthExpired);

    let valid = getter
        .sign_with_claims(claims, Utc::now() + chrono::Duration::seconds(30))
        .unwrap();
    let mut parts: Vec<&str> = valid.split('.').collect();
    let forged_payload = base64_url(&json!({"sub": "admin", "iss": jwt::DEFAULT_ISSUER, "exp": common::now() + 30}));
    parts[1] = &forged_payload;
    let tampered = parts.join(".");
    assert_eq!(getter.validate(&tampered).unwrap_err().code, ErrorCode::AuthInvalid);
    assert_eq!(getter.validate("not-a-token").unwrap_err().code, ErrorCode::AuthInvalid);
}

fn base64_url(value: &Value) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value.to_string())
}

#[test]
fn test_validate_rejects_foreign_issuer() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    let users: Arc<dyn UsersStore> = Arc::new(MemoryUsersStore::new());
    let other = JwtGetter::new(
        &json!({"type": "HS256", "key": common::TEST_HS256_KEY, "issuer": "someone-else"}).to_string(),
        Duration::from_secs(60),
        None,
        ElevatedClaimMode::Disabled,
        users,
    )
    .unwrap();

    let token = other
        .sign_with_claims(Map::new(), Utc::now() + chrono::Duration::seconds(30))
        .unwrap();
    assert_eq!(getter.validate(&token).unwrap_err().code, ErrorCode::AuthInvalid);
}

#[tokio::test]
async fn test_session_extra_claims_overwrite_defaults() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    let mut extra = Map::new();
    extra.insert("default-role".to_owned(), json!("me"));
    extra.insert("Org".to_owned(), json!("acme"));
    let session = SessionContext {
        elevated: false,
        extra_claims: extra,
    };
    let issued = getter.issue(&user(), &session).await.unwrap();
    let ns = namespace(&getter, &issued.access_token);
    assert_eq!(ns[jwt::DEFAULT_ROLE], json!("me"));
    assert_eq!(ns["x-hasura-org"], json!("acme"));
}

#[test]
fn test_state_round_trip() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    let state = SignedState::connect(
        "session-token",
        SignUpOptions {
            default_role: Some("user".to_owned()),
            redirect_to: Some("https://myapp.local/welcome".to_owned()),
            metadata: Some(json!({"plan": "pro"})),
            ..SignUpOptions::default()
        },
    );

    let encoded = state.encode(&getter).unwrap();
    let decoded = SignedState::decode(&getter, &encoded).unwrap();
    assert_eq!(decoded, state);
}

#[test]
fn test_state_rejects_expired_and_foreign_tokens() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);

    let mut claims = Map::new();
    claims.insert("options".to_owned(), json!({}));
    let expired = getter
        .sign_with_claims(claims, Utc::now() - chrono::Duration::seconds(1))
        .unwrap();
    assert_eq!(
        SignedState::decode(&getter, &expired).unwrap_err().code,
        ErrorCode::AuthExpired
    );

    let users: Arc<dyn UsersStore> = Arc::new(MemoryUsersStore::new());
    let other = JwtGetter::new(
        &json!({"type": "HS256", "key": "another-key-another-key-another-key!"}).to_string(),
        Duration::from_secs(60),
        None,
        ElevatedClaimMode::Disabled,
        users,
    )
    .unwrap();
    let foreign = SignedState::default().encode(&other).unwrap();
    assert_eq!(
        SignedState::decode(&getter, &foreign).unwrap_err().code,
        ErrorCode::AuthInvalid
    );
}

#[tokio::test]
async fn test_elevated_claim_disabled_allows_everything() {
    let (getter, _) = common::test_jwt_getter(ElevatedClaimMode::Disabled);
    let issued = getter.issue(&user(), &SessionContext::elevated()).await.unwrap();
    let claims = getter.validate(&issued.access_token).unwrap();
    assert!(claims.custom_claim(jwt::ELEVATED).is_none());
    getter
        .require_elevated_claim(&claims, "/user/email/change")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_elevated_claim_recommended_only_with_security_keys() {
    let (getter, users) = common::test_jwt_getter(ElevatedClaimMode::Recommended);
    let user = user();
    users.add_user(user.clone(), "jane@myapp.local");

    let plain = getter.issue(&user, &SessionContext::default()).await.unwrap();
    let claims = getter.validate(&plain.access_token).unwrap();
    getter
        .require_elevated_claim(&claims, "/user/email/change")
        .await
        .unwrap();

    let keyless = getter.issue(&user, &SessionContext::elevated()).await.unwrap();
    let keyless = getter.validate(&keyless.access_token).unwrap();
    assert!(keyless.custom_claim(jwt::ELEVATED).is_none());

    users.add_security_key(user.id).unwrap();
    let err = getter
        .require_elevated_claim(&claims, "/user/email/change")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ElevatedClaimRequired);

    let elevated = getter.issue(&user, &SessionContext::elevated()).await.unwrap();
    let claims = getter.validate(&elevated.access_token).unwrap();
    assert_eq!(
        claims.custom_claim(jwt::ELEVATED),
        Some(user.id.to_string().as_str())
    );
    getter
        .require_elevated_claim(&claims, "/user/email/change")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_elevated_claim_required_exempts_first_security_key() {
    let (getter, users) = common::test_jwt_getter(ElevatedClaimMode::Required);
    let user = user();
    users.add_user(user.clone(), "jane@myapp.local");

    let plain = getter.issue(&user, &SessionContext::default()).await.unwrap();
    let claims = getter.validate(&plain.access_token).unwrap();

    getter
        .require_elevated_claim(&claims, "/user/webauthn/add")
        .await
        .unwrap();
    getter
        .require_elevated_claim(&claims, "/user/webauthn/verify")
        .await
        .unwrap();
    let err = getter
        .require_elevated_claim(&claims, "/user/password")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ElevatedClaimRequired);

    let elevated = getter.issue(&user, &SessionContext::elevated()).await.unwrap();
    let elevated = getter.validate(&elevated.access_token).unwrap();
    assert_eq!(
        elevated.custom_claim(jwt::ELEVATED),
        Some(user.id.to_string().as_str())
    );

    users.add_security_key(user.id).unwrap();
    let err = getter
        .require_elevated_claim(&claims, "/user/webauthn/add")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ElevatedClaimRequired);
}

fn claims_config(graphql_url: String) -> CustomClaimsConfig {
    CustomClaimsConfig {
        graphql_url,
        admin_secret: "admin-secret".to_owned(),
        claims: HashMap::from([
            ("organisation-id".to_owned(), "profile.organisation.id".to_owned()),
            ("project-ids".to_owned(), "profile.projects[].id".to_owned()),
        ]),
        defaults: HashMap::from([("organisation-id".to_owned(), json!("none"))]),
    }
}

#[tokio::test]
async fn test_custom_claims_from_graphql() {
    let server = MockServer::start().await;
    let user = user();
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(header("x-hasura-admin-secret", "admin-secret"))
        .and(body_partial_json(json!({"variables": {"id": user.id.to_string()}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user": {"profile": {
                "organisation": null,
                "projects": [{"id": "p1"}, {"id": "p2"}]
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let claimer: Arc<dyn CustomClaimer> = Arc::new(GraphqlCustomClaims::with_client(
        &claims_config(format!("{}/v1/graphql", server.uri())),
        reqwest::Client::new(),
    ));
    let users: Arc<dyn UsersStore> = Arc::new(MemoryUsersStore::new());
    let getter = JwtGetter::new(
        &common::hs256_secret(),
        Duration::from_secs(900),
        Some(claimer),
        ElevatedClaimMode::Disabled,
        users,
    )
    .unwrap();

    let issued = getter.issue(&user, &SessionContext::default()).await.unwrap();
    let ns = namespace(&getter, &issued.access_token);
    assert_eq!(ns["x-hasura-organisation-id"], json!("none"));
    assert_eq!(ns["x-hasura-project-ids"], json!(r#"{"p1","p2"}"#));
    assert_eq!(
        ns[jwt::CUSTOM_CLAIMS_DEFAULTS],
        json!({"x-hasura-organisation-id": "none"})
    );
    assert_eq!(ns[jwt::USER_ID], json!(user.id.to_string()));
}

#[tokio::test]
async fn test_custom_claims_failure_fails_issuance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "field 'user' not found"}]
        })))
        .mount(&server)
        .await;

    let claimer: Arc<dyn CustomClaimer> = Arc::new(GraphqlCustomClaims::with_client(
        &claims_config(format!("{}/v1/graphql", server.uri())),
        reqwest::Client::new(),
    ));
    let users: Arc<dyn UsersStore> = Arc::new(MemoryUsersStore::new());
    let getter = JwtGetter::new(
        &common::hs256_secret(),
        Duration::from_secs(900),
        Some(claimer),
        ElevatedClaimMode::Disabled,
        users,
    )
    .unwrap();

    let err = getter
        .issue(&user(), &SessionContext::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalServiceError);
    assert_eq!(err.context.claim.as_deref(), Some("custom_claims"));
}
