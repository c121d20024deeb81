// ABOUTME: Resolves per-user custom claims from a GraphQL data API at token issuance
// ABOUTME: Builds one query from configured claim paths and falls back to configured defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Custom claims
//!
//! Each configured claim maps a name to a dot-separated path into the user
//! object, where `[]` marks an array hop (`roles[].role`). All paths are
//! fetched with a single query:
//!
//! ```text
//! query GetClaims($id: uuid!) { user(id:$id) {profile{org } roles{role } } }
//! ```

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::CustomClaimsConfig;
use crate::errors::{AppError, AppResult};
use crate::utils::http_client::claims_client;

/// Source of user-specific claims
#[async_trait]
pub trait CustomClaimer: Send + Sync {
    /// Claim name to resolved value, defaults applied
    async fn get_claims(&self, user_id: Uuid) -> AppResult<Map<String, Value>>;

    /// Configured defaults, claim name to value
    fn defaults(&self) -> &HashMap<String, Value>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    name: String,
    array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldNode {
    Leaf,
    Branch(BTreeMap<String, FieldNode>),
}

fn parse_path(path: &str) -> Vec<Segment> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_suffix("[]") {
            Some(name) => Segment {
                name: name.to_owned(),
                array: true,
            },
            None => Segment {
                name: s.to_owned(),
                array: false,
            },
        })
        .collect()
}

fn insert_path(tree: &mut BTreeMap<String, FieldNode>, segments: &[Segment]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    // jsonb columns are selected whole
    if rest.is_empty() || first.name == "metadata" {
        tree.entry(first.name.clone()).or_insert(FieldNode::Leaf);
        return;
    }
    let node = tree
        .entry(first.name.clone())
        .or_insert_with(|| FieldNode::Branch(BTreeMap::new()));
    if let FieldNode::Leaf = node {
        *node = FieldNode::Branch(BTreeMap::new());
    }
    if let FieldNode::Branch(children) = node {
        insert_path(children, rest);
    }
}

fn render_selection(tree: &BTreeMap<String, FieldNode>) -> String {
    let mut out = String::from("{");
    for (name, node) in tree {
        match node {
            FieldNode::Leaf => {
                out.push_str(name);
                out.push(' ');
            }
            FieldNode::Branch(children) => {
                out.push_str(name);
                out.push_str(&render_selection(children));
                out.push(' ');
            }
        }
    }
    out.push('}');
    out
}

fn extract(data: &Value, segments: &[Segment]) -> Value {
    let Some((first, rest)) = segments.split_first() else {
        return data.clone();
    };
    match data.get(&first.name) {
        None | Some(Value::Null) => Value::Null,
        Some(Value::Array(items)) if first.array => {
            Value::Array(items.iter().map(|item| extract(item, rest)).collect())
        }
        Some(value) => extract(value, rest),
    }
}

/// Encode a claim value the way Postgres reads session variables
///
/// Arrays become `{...}` literals, strings stay raw, everything else is JSON text.
#[must_use]
pub fn pg_encode(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) => {
            let text = value.to_string();
            format!("{{{}}}", &text[1..text.len() - 1])
        }
        other => other.to_string(),
    }
}

/// [`CustomClaimer`] backed by a GraphQL endpoint with admin access
pub struct GraphqlCustomClaims {
    query: String,
    paths: BTreeMap<String, Vec<Segment>>,
    client: Client,
    graphql_url: String,
    admin_secret: String,
    defaults: HashMap<String, Value>,
}

impl GraphqlCustomClaims {
    /// Build the claimer and its query from configuration
    #[must_use]
    pub fn new(config: &CustomClaimsConfig) -> Self {
        Self::with_client(config, claims_client())
    }

    /// Build the claimer with a specific HTTP client
    #[must_use]
    pub fn with_client(config: &CustomClaimsConfig, client: Client) -> Self {
        let mut tree = BTreeMap::new();
        let mut paths = BTreeMap::new();
        for (name, path) in &config.claims {
            let segments = parse_path(path);
            insert_path(&mut tree, &segments);
            paths.insert(name.clone(), segments);
        }
        let query = format!(
            "query GetClaims($id: uuid!) {{ user(id:$id) {} }}",
            render_selection(&tree)
        );
        debug!(query = %query, "Built custom claims query");

        Self {
            query,
            paths,
            client,
            graphql_url: config.graphql_url.clone(),
            admin_secret: config.admin_secret.clone(),
            defaults: config.defaults.clone(),
        }
    }

    /// The GraphQL query sent for every issuance
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Resolve every configured claim from a `user` object
    #[must_use]
    pub fn extract_claims(&self, user: &Value) -> Map<String, Value> {
        self.paths
            .iter()
            .map(|(name, segments)| {
                let value = match extract(user, segments) {
                    Value::Null => self.defaults.get(name).cloned().unwrap_or(Value::Null),
                    found => found,
                };
                (name.clone(), value)
            })
            .collect()
    }

    async fn fetch_user(&self, user_id: Uuid) -> AppResult<Value> {
        let response = self
            .client
            .post(&self.graphql_url)
            .header("x-hasura-admin-secret", &self.admin_secret)
            .json(&json!({
                "query": self.query,
                "variables": { "id": user_id.to_string() },
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service("custom claims", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "custom claims",
                format!("unexpected status code ({status}): {body}"),
            ));
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| AppError::external_service("custom claims", e.to_string()))?;

        if let Some(errors) = body.get("errors") {
            return Err(AppError::external_service(
                "custom claims",
                format!("query failed: {errors}"),
            ));
        }

        match body.pointer_mut("/data/user").map(Value::take) {
            Some(user @ Value::Object(_)) => Ok(user),
            _ => Err(AppError::external_service(
                "custom claims",
                "failed to extract user data from response",
            )),
        }
    }
}

#[async_trait]
impl CustomClaimer for GraphqlCustomClaims {
    async fn get_claims(&self, user_id: Uuid) -> AppResult<Map<String, Value>> {
        let user = self.fetch_user(user_id).await.map_err(|e| {
            warn!(user_id = %user_id, error = %e, "Failed to fetch custom claims");
            e
        })?;
        Ok(self.extract_claims(&user))
    }

    fn defaults(&self) -> &HashMap<String, Value> {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(claims: &[(&str, &str)]) -> CustomClaimsConfig {
        CustomClaimsConfig {
            graphql_url: "http://localhost:8080/v1/graphql".to_owned(),
            admin_secret: "secret".to_owned(),
            claims: claims
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            defaults: HashMap::from([("org".to_owned(), json!("none"))]),
        }
    }

    #[test]
    fn test_query_merges_paths() {
        let claimer = GraphqlCustomClaims::new(&config(&[
            ("org", "profile.organization.id"),
            ("plan", "profile.plan"),
            ("roles", "roles[].role"),
            ("meta", "metadata.tier"),
        ]));
        assert_eq!(
            claimer.query(),
            "query GetClaims($id: uuid!) { user(id:$id) {metadata profile{organization{id } plan } roles{role } } }"
        );
    }

    #[test]
    fn test_extract_claims_with_arrays_and_defaults() {
        let claimer = GraphqlCustomClaims::new(&config(&[
            ("org", "profile.organization.id"),
            ("roles", "roles[].role"),
            ("meta", "metadata.tier"),
        ]));
        let user = json!({
            "profile": { "organization": null },
            "roles": [{ "role": "admin" }, { "role": "editor" }],
            "metadata": { "tier": 3 }
        });
        let claims = claimer.extract_claims(&user);
        assert_eq!(claims["org"], json!("none"));
        assert_eq!(claims["roles"], json!(["admin", "editor"]));
        assert_eq!(claims["meta"], json!(3));
    }

    #[test]
    fn test_pg_encode() {
        assert_eq!(pg_encode(&json!(["a", "b"])), r#"{"a","b"}"#);
        assert_eq!(pg_encode(&json!([])), "{}");
        assert_eq!(pg_encode(&json!("raw")), "raw");
        assert_eq!(pg_encode(&json!(42)), "42");
        assert_eq!(pg_encode(&json!(true)), "true");
        assert_eq!(pg_encode(&Value::Null), "null");
        assert_eq!(pg_encode(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
