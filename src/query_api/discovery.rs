//! Endpoint discovery.
//!
//! An unauthenticated `GET` on the server root returns the query URL template
//! (with a `{databaseName}` placeholder) and version information.

use serde::Deserialize;

use super::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::driver::error::{DriverError, DriverResult};

/// Placeholder in the query URL template.
pub const DATABASE_PLACEHOLDER: &str = "{databaseName}";

/// What the server root advertises.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveryInfo {
    /// Query URL template, e.g. `http://localhost:7474/db/{databaseName}/query/v2`.
    pub query: String,
    #[serde(default)]
    pub neo4j_version: Option<String>,
    #[serde(default)]
    pub neo4j_edition: Option<String>,
}

impl DiscoveryInfo {
    /// Query URL for one database.
    pub fn query_url(&self, database: &str) -> String {
        query_url(&self.query, database)
    }
}

/// Fill the database name into a query URL template.
pub fn query_url(template: &str, database: &str) -> String {
    template.replace(DATABASE_PLACEHOLDER, database)
}

/// The discovery request for a server root URL.
pub fn discovery_request(base_url: &str) -> HttpRequest {
    HttpRequest::new(HttpMethod::Get, base_url).header("Accept", "application/json")
}

/// Parse a discovery response.
pub fn parse_discovery(response: &HttpResponse) -> DriverResult<DiscoveryInfo> {
    if !response.is_success() {
        return Err(DriverError::service_unavailable(format!(
            "Discovery failed with HTTP {}",
            response.status
        )));
    }
    let json: serde_json::Value = serde_json::from_slice(&response.body)
        .map_err(|e| DriverError::protocol(format!("Invalid discovery response: {}", e)))?;
    if json.get("query").and_then(|q| q.as_str()).is_none() {
        return Err(DriverError::protocol("Discovery response has no query endpoint"));
    }
    serde_json::from_value(json).map_err(|e| DriverError::protocol(format!("Invalid discovery response: {}", e)))
}
