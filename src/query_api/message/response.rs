//! Response codecs for the four query operations.
//!
//! A codec classifies a raw response once. A failed codec holds a single
//! error and every accessor returns that same error, so callers have one
//! error path no matter which field they read first.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value as Json;

use super::request::QUERY_CONTENT_TYPE;
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::query::Bookmark;
use crate::driver::summary::{Counters, Notification};
use crate::query_api::http::HttpResponse;
use crate::query_api::wire::WireValue;

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Parse the body and turn failure-shaped responses into an error.
fn classify(response: &HttpResponse, check_content_type: bool) -> DriverResult<Json> {
    let json: Json = if response.body.is_empty() {
        Json::Null
    } else {
        match serde_json::from_slice(&response.body) {
            Ok(json) => json,
            Err(e) if response.is_success() => {
                return Err(DriverError::protocol(format!("Invalid response body: {}", e)))
            }
            Err(_) => return Err(status_error(response.status)),
        }
    };

    if let Some(errors) = json.get("errors") {
        let entries: Vec<ErrorEntry> = serde_json::from_value(errors.clone())
            .map_err(|e| DriverError::protocol(format!("Malformed error list: {}", e)))?;
        return Err(match entries.into_iter().next() {
            Some(first) => DriverError::server(first.code, first.message),
            None => DriverError::protocol("Server reported a failure with an empty error list"),
        });
    }

    if !response.is_success() {
        return Err(status_error(response.status));
    }

    if check_content_type {
        let content_type = response.content_type().unwrap_or("");
        if !content_type.starts_with(QUERY_CONTENT_TYPE) {
            return Err(DriverError::protocol(format!(
                "Wrong content-type: expected {}, got '{}'",
                QUERY_CONTENT_TYPE, content_type
            )));
        }
    }

    Ok(json)
}

/// Failure status without an error list.
fn status_error(status: u16) -> DriverError {
    match status {
        401 => DriverError::server("Neo.ClientError.Security.Unauthorized", "HTTP 401 Unauthorized"),
        403 => DriverError::server("Neo.ClientError.Security.Forbidden", "HTTP 403 Forbidden"),
        500..=599 => DriverError::service_unavailable(format!("HTTP {}", status)),
        _ => DriverError::protocol(format!("Unexpected HTTP status {}", status)),
    }
}

fn envelope<T: for<'de> Deserialize<'de>>(json: Json, what: &str) -> DriverResult<T> {
    serde_json::from_value(json).map_err(|e| DriverError::protocol(format!("Malformed {} response: {}", what, e)))
}

fn to_bookmarks(values: Vec<String>) -> Vec<Bookmark> {
    values.into_iter().map(Bookmark::new).collect()
}

// ============================================================================
// Run
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunEnvelope {
    data: RunData,
    #[serde(default)]
    counters: Counters,
    #[serde(default)]
    bookmarks: Vec<String>,
    #[serde(default)]
    profiled_query_plan: Option<Json>,
    #[serde(default)]
    notifications: Vec<Notification>,
}

#[derive(Deserialize)]
struct RunData {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Json>>,
}

#[derive(Debug)]
struct RunSuccess {
    keys: Vec<String>,
    rows: Vec<Vec<WireValue>>,
    counters: Counters,
    bookmarks: Vec<Bookmark>,
    profiled_plan: Option<Json>,
    notifications: Vec<Notification>,
}

/// Result of a run request.
#[derive(Debug)]
pub struct RunResponseCodec {
    result: Result<RunSuccess, DriverError>,
}

impl RunResponseCodec {
    pub fn of(response: &HttpResponse) -> Self {
        Self {
            result: Self::parse(response),
        }
    }

    fn parse(response: &HttpResponse) -> DriverResult<RunSuccess> {
        let envelope: RunEnvelope = envelope(classify(response, true)?, "run")?;
        let rows = envelope
            .data
            .values
            .iter()
            .map(|row| row.iter().map(WireValue::from_json).collect())
            .collect::<DriverResult<Vec<Vec<WireValue>>>>()?;

        Ok(RunSuccess {
            keys: envelope.data.fields,
            rows,
            counters: envelope.counters,
            bookmarks: to_bookmarks(envelope.bookmarks),
            profiled_plan: envelope.profiled_query_plan,
            notifications: envelope.notifications,
        })
    }

    fn success(&self) -> DriverResult<&RunSuccess> {
        self.result.as_ref().map_err(Clone::clone)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&DriverError> {
        self.result.as_ref().err()
    }

    pub fn keys(&self) -> DriverResult<&[String]> {
        Ok(&self.success()?.keys)
    }

    pub fn rows(&self) -> DriverResult<&[Vec<WireValue>]> {
        Ok(&self.success()?.rows)
    }

    pub fn counters(&self) -> DriverResult<&Counters> {
        Ok(&self.success()?.counters)
    }

    pub fn bookmarks(&self) -> DriverResult<&[Bookmark]> {
        Ok(&self.success()?.bookmarks)
    }

    pub fn profiled_plan(&self) -> DriverResult<Option<&Json>> {
        Ok(self.success()?.profiled_plan.as_ref())
    }

    pub fn notifications(&self) -> DriverResult<&[Notification]> {
        Ok(&self.success()?.notifications)
    }
}

// ============================================================================
// Begin
// ============================================================================

#[derive(Deserialize)]
struct BeginEnvelope {
    transaction: TransactionBody,
}

#[derive(Deserialize)]
struct TransactionBody {
    id: String,
    #[serde(default)]
    expires: Option<String>,
    #[serde(default)]
    tx_host: Option<String>,
}

#[derive(Debug)]
struct BeginSuccess {
    id: String,
    expires: Option<DateTime<FixedOffset>>,
    affinity: Option<String>,
}

/// Result of a begin request.
#[derive(Debug)]
pub struct BeginResponseCodec {
    result: Result<BeginSuccess, DriverError>,
}

impl BeginResponseCodec {
    /// Classify a begin response. The affinity token comes from
    /// `affinity_header`, falling back to the body's `tx_host`.
    pub fn of(response: &HttpResponse, affinity_header: &str) -> Self {
        let result = classify(response, true)
            .and_then(|json| envelope::<BeginEnvelope>(json, "begin"))
            .map(|envelope| {
                let transaction = envelope.transaction;
                BeginSuccess {
                    id: transaction.id,
                    expires: transaction
                        .expires
                        .as_deref()
                        .and_then(|e| DateTime::parse_from_rfc3339(e).ok()),
                    affinity: response
                        .header(affinity_header)
                        .map(str::to_string)
                        .or(transaction.tx_host),
                }
            });
        Self { result }
    }

    fn success(&self) -> DriverResult<&BeginSuccess> {
        self.result.as_ref().map_err(Clone::clone)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&DriverError> {
        self.result.as_ref().err()
    }

    pub fn transaction_id(&self) -> DriverResult<&str> {
        Ok(&self.success()?.id)
    }

    pub fn expires(&self) -> DriverResult<Option<DateTime<FixedOffset>>> {
        Ok(self.success()?.expires)
    }

    pub fn affinity(&self) -> DriverResult<Option<&str>> {
        Ok(self.success()?.affinity.as_deref())
    }
}

// ============================================================================
// Commit
// ============================================================================

#[derive(Deserialize)]
struct CommitEnvelope {
    #[serde(default)]
    bookmarks: Vec<String>,
}

/// Result of a commit request.
#[derive(Debug)]
pub struct CommitResponseCodec {
    result: Result<Vec<Bookmark>, DriverError>,
}

impl CommitResponseCodec {
    pub fn of(response: &HttpResponse) -> Self {
        let result = classify(response, true)
            .and_then(|json| match json {
                Json::Null => Ok(CommitEnvelope { bookmarks: Vec::new() }),
                json => envelope::<CommitEnvelope>(json, "commit"),
            })
            .map(|envelope| to_bookmarks(envelope.bookmarks));
        Self { result }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&DriverError> {
        self.result.as_ref().err()
    }

    pub fn bookmarks(&self) -> DriverResult<&[Bookmark]> {
        self.result.as_deref().map_err(Clone::clone)
    }
}

// ============================================================================
// Rollback
// ============================================================================

/// Result of a rollback request. The body is only checked for errors.
#[derive(Debug)]
pub struct RollbackResponseCodec {
    result: Result<(), DriverError>,
}

impl RollbackResponseCodec {
    pub fn of(response: &HttpResponse) -> Self {
        Self {
            result: classify(response, false).map(|_| ()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&DriverError> {
        self.result.as_ref().err()
    }

    /// `Ok(())` on success, otherwise the stored error.
    pub fn check(&self) -> DriverResult<()> {
        self.result.clone()
    }
}
