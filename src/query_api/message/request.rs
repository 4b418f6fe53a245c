//! Request codecs for the four query operations.
//!
//! Each codec knows its headers and lazily builds (then caches) its JSON body.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as Json};

use crate::driver::config::AuthToken;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::query::{Query, QueryConfig};
use crate::query_api::codec::encode;

/// Content type of query requests and responses.
pub const QUERY_CONTENT_TYPE: &str = "application/vnd.neo4j.query";

/// Accept header sent with every query call.
pub const QUERY_ACCEPT: &str = "application/vnd.neo4j.query, application/json";

/// `Authorization` header value for a token.
///
/// Only `basic` and `bearer` are understood by the Query API.
pub fn authorization_header(auth: &AuthToken) -> DriverResult<String> {
    match auth {
        AuthToken::Basic { username, password, .. } => Ok(format!(
            "Basic {}",
            BASE64.encode(format!("{}:{}", username, password))
        )),
        AuthToken::Bearer { token } => Ok(format!("Bearer {}", BASE64.encode(token))),
        other => Err(DriverError::authentication(format!(
            "Unsupported authentication scheme: {}",
            other.scheme()
        ))),
    }
}

/// Shared shape of a request codec.
pub trait RequestCodec: Send + Sync {
    fn content_type(&self) -> &'static str {
        QUERY_CONTENT_TYPE
    }

    fn accept(&self) -> &'static str {
        QUERY_ACCEPT
    }

    /// The `Authorization` header value; fails for unsupported schemes.
    fn authorization(&self) -> DriverResult<String>;

    /// The serialized body, `None` when the request has none.
    fn body(&self) -> DriverResult<Option<&str>>;
}

fn cached(cell: &OnceLock<DriverResult<String>>, build: impl FnOnce() -> DriverResult<String>) -> DriverResult<Option<&str>> {
    match cell.get_or_init(build) {
        Ok(body) => Ok(Some(body.as_str())),
        Err(e) => Err(e.clone()),
    }
}

fn to_body<T: Serialize>(body: &T) -> DriverResult<String> {
    serde_json::to_string(body).map_err(|e| DriverError::internal(format!("Failed to serialize request: {}", e)))
}

/// Conditional fields shared by run and begin.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct TransactionFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    bookmarks: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_execution_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    impersonated_user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_mode: Option<&'static str>,
}

impl<'a> TransactionFields<'a> {
    fn from_config(config: &'a QueryConfig) -> Self {
        Self {
            bookmarks: (!config.bookmarks.is_empty())
                .then(|| config.bookmarks.iter().map(|b| b.value()).collect()),
            max_execution_time: config.timeout.map(|t| t.as_millis() as u64),
            impersonated_user: config.impersonated_user.as_deref(),
            access_mode: config.access_mode.map(|mode| mode.as_str()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunBody<'a> {
    statement: &'a str,
    include_counters: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<JsonMap<String, Json>>,
    #[serde(flatten)]
    transaction: TransactionFields<'a>,
}

// ============================================================================
// Run
// ============================================================================

/// Run a statement, auto-commit or inside a transaction.
pub struct RunRequestCodec {
    auth: AuthToken,
    query: Query,
    config: QueryConfig,
    body: OnceLock<DriverResult<String>>,
}

impl RunRequestCodec {
    pub fn new(auth: AuthToken, query: Query, config: QueryConfig) -> Self {
        Self {
            auth,
            query,
            config,
            body: OnceLock::new(),
        }
    }

    fn build_body(&self) -> DriverResult<String> {
        let parameters = if self.query.parameters.is_empty() {
            None
        } else {
            let mut names: Vec<&String> = self.query.parameters.keys().collect();
            names.sort();
            let mut encoded = JsonMap::new();
            for name in names {
                encoded.insert(name.clone(), encode(&self.query.parameters[name])?.to_json());
            }
            Some(encoded)
        };

        to_body(&RunBody {
            statement: &self.query.text,
            include_counters: true,
            parameters,
            transaction: TransactionFields::from_config(&self.config),
        })
    }
}

impl RequestCodec for RunRequestCodec {
    fn authorization(&self) -> DriverResult<String> {
        authorization_header(&self.auth)
    }

    fn body(&self) -> DriverResult<Option<&str>> {
        cached(&self.body, || self.build_body())
    }
}

// ============================================================================
// Begin
// ============================================================================

/// Open an explicit transaction.
pub struct BeginRequestCodec {
    auth: AuthToken,
    config: QueryConfig,
    body: OnceLock<DriverResult<String>>,
}

impl BeginRequestCodec {
    pub fn new(auth: AuthToken, config: QueryConfig) -> Self {
        Self {
            auth,
            config,
            body: OnceLock::new(),
        }
    }
}

impl RequestCodec for BeginRequestCodec {
    fn authorization(&self) -> DriverResult<String> {
        authorization_header(&self.auth)
    }

    fn body(&self) -> DriverResult<Option<&str>> {
        cached(&self.body, || to_body(&TransactionFields::from_config(&self.config)))
    }
}

// ============================================================================
// Commit / Rollback
// ============================================================================

/// Commit the current transaction. The body is an empty object.
pub struct CommitRequestCodec {
    auth: AuthToken,
}

impl CommitRequestCodec {
    pub fn new(auth: AuthToken) -> Self {
        Self { auth }
    }
}

impl RequestCodec for CommitRequestCodec {
    fn authorization(&self) -> DriverResult<String> {
        authorization_header(&self.auth)
    }

    fn body(&self) -> DriverResult<Option<&str>> {
        Ok(Some("{}"))
    }
}

/// Roll back the current transaction. No body.
pub struct RollbackRequestCodec {
    auth: AuthToken,
}

impl RollbackRequestCodec {
    pub fn new(auth: AuthToken) -> Self {
        Self { auth }
    }
}

impl RequestCodec for RollbackRequestCodec {
    fn authorization(&self) -> DriverResult<String> {
        authorization_header(&self.auth)
    }

    fn body(&self) -> DriverResult<Option<&str>> {
        Ok(None)
    }
}
