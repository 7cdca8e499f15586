//! Destination-store collaborator: full-replace single-document writes plus
//! chunked batch writes against the Firestore REST v1 API. The client is
//! constructed explicitly at startup and passed down by parameter; the
//! one-shot credential exchange happens in `connect` (no refresh loop).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::SyncConfig;

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";
const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_TTL_SECS: i64 = 3600;

/// The provider-side write batch cap: chunks are committed at this size,
/// with the final partial chunk committed separately.
pub const WRITE_BATCH_LIMIT: usize = 500;

/// Persistence contract the assembler depends on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Full replace of one document.
    async fn replace(&self, collection: &str, key: &str, payload: &Value) -> Result<()>;

    /// Batched upsert of many documents, committed in chunks of at most
    /// [`WRITE_BATCH_LIMIT`] operations.
    async fn set_many(&self, collection: &str, docs: &[(String, Value)]) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct FirestoreStore {
    http: Client,
    project_id: String,
    access_token: String,
}

impl FirestoreStore {
    /// Parse the credentials payload and exchange a signed assertion for a
    /// bearer token. Bad credentials surface here, before any sync work.
    pub async fn connect(cfg: &SyncConfig) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(&cfg.firestore_credentials_json)
            .context("parsing FIREBASE_CREDENTIALS_JSON")?;
        let http = Client::builder()
            .user_agent("homepage-sync/0.1")
            .build()
            .context("failed to construct Firestore HTTP client")?;
        let access_token = mint_access_token(&http, &key).await?;
        info!(
            target = "firestore",
            project = %cfg.firestore_project_id,
            "destination store connected"
        );
        Ok(Self {
            http,
            project_id: cfg.firestore_project_id.clone(),
            access_token,
        })
    }

    fn document_name(&self, collection: &str, key: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, collection, key
        )
    }

    /// One `:commit` request body per chunk of at most [`WRITE_BATCH_LIMIT`]
    /// writes; the final chunk carries the remainder.
    fn commit_bodies(&self, collection: &str, docs: &[(String, Value)]) -> Result<Vec<Value>> {
        docs.chunks(WRITE_BATCH_LIMIT)
            .map(|chunk| {
                let writes = chunk
                    .iter()
                    .map(|(key, payload)| {
                        Ok(json!({
                            "update": {
                                "name": self.document_name(collection, key),
                                "fields": to_firestore_fields(payload)?,
                            }
                        }))
                    })
                    .collect::<Result<Vec<Value>>>()?;
                Ok(json!({ "writes": writes }))
            })
            .collect()
    }
}

async fn mint_access_token(http: &Client, key: &ServiceAccountKey) -> Result<String> {
    let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        iss: &key.client_email,
        scope: FIRESTORE_SCOPE,
        aud: token_uri,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("service account private key is not valid RSA PEM")?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .context("signing token assertion")?;

    let response = http
        .post(token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await
        .context("requesting access token")?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed (status={status}): {text}"));
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn replace(&self, collection: &str, key: &str, payload: &Value) -> Result<()> {
        let url = format!(
            "{}/{}",
            FIRESTORE_API_BASE,
            self.document_name(collection, key)
        );
        let body = json!({ "fields": to_firestore_fields(payload)? });
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("replacing document {collection}/{key}"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "document replace failed (doc={collection}/{key}, status={status}): {text}"
            ));
        }
        info!(target = "firestore", collection, key, "document replaced");
        Ok(())
    }

    async fn set_many(&self, collection: &str, docs: &[(String, Value)]) -> Result<()> {
        let url = format!(
            "{}/projects/{}/databases/(default)/documents:commit",
            FIRESTORE_API_BASE, self.project_id
        );
        for body in self.commit_bodies(collection, docs)? {
            let batch = body["writes"].as_array().map(Vec::len).unwrap_or(0);
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .context("committing write batch")?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(anyhow!("batch commit failed (status={status}): {text}"));
            }
            info!(
                target = "firestore",
                collection, batch, "write batch committed"
            );
        }
        Ok(())
    }
}

/// Top-level payloads must be JSON objects; Firestore documents have no
/// scalar root.
pub fn to_firestore_fields(payload: &Value) -> Result<Value> {
    let obj = payload
        .as_object()
        .ok_or_else(|| anyhow!("document payload must be a JSON object"))?;
    let mut fields = Map::with_capacity(obj.len());
    for (k, v) in obj {
        fields.insert(k.clone(), to_firestore_value(v));
    }
    Ok(Value::Object(fields))
}

/// JSON -> Firestore typed-value mapping.
pub fn to_firestore_value(v: &Value) -> Value {
    match v {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore integerValue is a stringified int64.
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let mut fields = Map::with_capacity(map.len());
            for (k, v) in map {
                fields.insert(k.clone(), to_firestore_value(v));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_scalars_to_typed_values() {
        assert_eq!(
            to_firestore_value(&json!("hello")),
            json!({ "stringValue": "hello" })
        );
        assert_eq!(
            to_firestore_value(&json!(42)),
            json!({ "integerValue": "42" })
        );
        assert_eq!(
            to_firestore_value(&json!(2.5)),
            json!({ "doubleValue": 2.5 })
        );
        assert_eq!(
            to_firestore_value(&json!(true)),
            json!({ "booleanValue": true })
        );
        assert_eq!(to_firestore_value(&json!(null)), json!({ "nullValue": null }));
    }

    #[test]
    fn maps_nested_arrays_and_objects() {
        let mapped = to_firestore_value(&json!({ "tags": ["a", "b"] }));
        assert_eq!(
            mapped,
            json!({
                "mapValue": {
                    "fields": {
                        "tags": {
                            "arrayValue": {
                                "values": [
                                    { "stringValue": "a" },
                                    { "stringValue": "b" }
                                ]
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn rejects_scalar_document_roots() {
        assert!(to_firestore_fields(&json!(123)).is_err());
        assert!(to_firestore_fields(&json!({ "ok": true })).is_ok());
    }

    fn test_store() -> FirestoreStore {
        FirestoreStore {
            http: Client::new(),
            project_id: "demo".to_string(),
            access_token: "test-token".to_string(),
        }
    }

    #[test]
    fn commits_are_planned_at_the_batch_limit() {
        // 1201 docs -> commit bodies of 500 + 500 + 201 writes.
        let store = test_store();
        let docs: Vec<(String, Value)> = (0..1201)
            .map(|i| (format!("g{i}"), json!({ "i": i })))
            .collect();
        let bodies = store.commit_bodies("games", &docs).unwrap();
        let sizes: Vec<usize> = bodies
            .iter()
            .map(|b| b["writes"].as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![500, 500, 201]);
    }

    #[test]
    fn commit_writes_carry_full_document_names_and_typed_fields() {
        let store = test_store();
        let docs = vec![("g0".to_string(), json!({ "i": 7 }))];
        let bodies = store.commit_bodies("games", &docs).unwrap();
        assert_eq!(bodies.len(), 1);
        let update = &bodies[0]["writes"][0]["update"];
        assert_eq!(
            update["name"],
            json!("projects/demo/databases/(default)/documents/games/g0")
        );
        assert_eq!(update["fields"]["i"], json!({ "integerValue": "7" }));
    }

    #[test]
    fn scalar_payloads_fail_batch_planning() {
        let store = test_store();
        let docs = vec![("bad".to_string(), json!(5))];
        assert!(store.commit_bodies("games", &docs).is_err());
    }
}
