//! # Zeta4G Query Driver
//!
//! A Rust driver for graph databases that speak the Neo4j-compatible HTTP
//! Query API.
//!
//! ## Features
//!
//! - **Typed JSON values** - integers, temporals, points and bytes round-trip without loss
//! - **Async/Await** - built on Tokio; every operation hands back a result stream immediately
//! - **Connection Pooling** - bounded pool with memoized endpoint discovery
//! - **Transactions** - explicit begin/commit/rollback with server affinity
//! - **Backpressure** - result streams pause when nobody is consuming rows
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use zeta4g_query_driver::{AuthToken, ConnectionProvider, DriverConfig, Query, QueryConfig, ReactiveRecordStream};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DriverConfig::new("http://localhost:7474", AuthToken::basic("neo4j", "password"))?;
//!     let provider = ConnectionProvider::new(config)?;
//!
//!     let conn = provider.acquire().await?;
//!     let observer = conn.run(
//!         Query::new("CREATE (n:Person {name: $name}) RETURN n").with_param("name", "Alice"),
//!         QueryConfig::default(),
//!     );
//!     for record in ReactiveRecordStream::from_observer(&observer).try_collect().await? {
//!         println!("{}", record);
//!     }
//!
//!     provider.release(conn).await;
//!     provider.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! # use zeta4g_query_driver::{ConnectionProvider, Query, QueryConfig};
//! # async fn example(provider: ConnectionProvider) -> Result<(), Box<dyn std::error::Error>> {
//! let conn = provider.acquire().await?;
//!
//! conn.begin_transaction(QueryConfig::default()).summary().await?;
//! conn.run(Query::new("CREATE (n:Node {id: 1})"), QueryConfig::default()).summary().await?;
//! conn.run(Query::new("CREATE (n:Node {id: 2})"), QueryConfig::default()).summary().await?;
//! let summary = conn.commit().summary().await?;
//!
//! println!("bookmarks: {:?}", summary.bookmarks);
//! provider.release(conn).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Authentication
//!
//! The Query API understands basic and bearer tokens:
//!
//! ```rust
//! use zeta4g_query_driver::AuthToken;
//!
//! let auth = AuthToken::basic("username", "password");
//! let auth = AuthToken::bearer("my-token");
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use zeta4g_query_driver::{AuthToken, DriverConfig};
//! use std::time::Duration;
//!
//! let config = DriverConfig::builder("http://localhost:7474", AuthToken::basic("u", "p"))
//!     .unwrap()
//!     .with_max_connection_pool_size(50)
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_fetch_size(500)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.fetch_size, 500);
//! ```
//!
//! ## Modules
//!
//! - [`driver`] - connections, pooling, result streams and value types
//! - [`query_api`] - low-level Query API wire format and message codecs

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod driver;
pub mod query_api;

// Re-exports for convenience
pub use driver::{
    AccessMode, AuthToken, Bookmark, ConnectionProvider, DriverConfig, DriverConfigBuilder, DriverError,
    DriverResult, HttpConnection, Query, QueryConfig, ReactiveRecordStream, Record, ResultStreamObserver,
    ResultSummary, ServerAddress, Value,
};

pub use query_api::{IntegerMode, WireValue};

/// Config alias for convenience
pub type Config = DriverConfig;
