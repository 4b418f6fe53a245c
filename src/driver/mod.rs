//! Driver Module
//!
//! HTTP Query API 클라이언트 런타임
//!
//! # 구성
//!
//! - 설정: [`DriverConfig`], [`AuthToken`], [`ServerAddress`]
//! - 연결: [`ConnectionProvider`] → [`PooledConnection`] → [`HttpConnection`]
//! - 결과: [`ResultStreamObserver`] (상태 기계), [`ReactiveRecordStream`] (비동기 스트림)
//! - 값: [`Value`], [`Record`], [`ResultSummary`]
//!
//! # Example
//!
//! ```ignore
//! use zeta4g_query_driver::driver::{
//!     AuthToken, ConnectionProvider, DriverConfig, Query, QueryConfig, ReactiveRecordStream,
//! };
//!
//! let config = DriverConfig::new("http://localhost:7474", AuthToken::basic("neo4j", "password"))?;
//! let provider = ConnectionProvider::new(config)?;
//! let conn = provider.acquire().await?;
//!
//! // 자동 커밋 쿼리
//! let observer = conn.run(
//!     Query::new("MATCH (n:Person) WHERE n.age > $age RETURN n.name AS name").with_param("age", 30i64),
//!     QueryConfig::default(),
//! );
//! for record in ReactiveRecordStream::from_observer(&observer).try_collect().await? {
//!     println!("{}", record.get_string("name")?);
//! }
//!
//! // 명시적 트랜잭션
//! conn.begin_transaction(QueryConfig::default()).summary().await?;
//! conn.run(Query::new("CREATE (n:Person {name: $name})").with_param("name", "Alice"), QueryConfig::default())
//!     .summary()
//!     .await?;
//! let summary = conn.commit().summary().await?;
//! println!("bookmarks: {:?}", summary.bookmarks);
//!
//! provider.release(conn).await;
//! provider.close().await;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod observer;
pub mod pipeline;
pub mod pool;
pub mod provider;
pub mod query;
pub mod reactive;
pub mod record;
pub mod summary;
pub mod transaction;
pub mod types;

// Re-exports
pub use auth::{AuthTokenManager, ExpirationBasedAuthTokenManager, StaticAuthTokenManager};
pub use config::{AuthToken, DriverConfig, DriverConfigBuilder, ServerAddress};
pub use error::{DriverError, DriverResult, ServerError};
pub use http::{HttpConnection, HttpTransport, ReqwestTransport};
pub use observer::{RecordObserver, ResultStreamObserver, StreamConfig, StreamState};
pub use pipeline::WorkPipeline;
pub use pool::{ConnectionPool, PoolConfig, PoolMetrics, PooledConnection};
pub use provider::ConnectionProvider;
pub use query::{AccessMode, Bookmark, Query, QueryConfig};
pub use reactive::ReactiveRecordStream;
pub use record::{Record, RecordKeys};
pub use summary::{Counters, InputPosition, Notification, ResultSummary, StreamSummary};
pub use transaction::TransactionHandle;
pub use types::{Duration, Node, OffsetTime, Path, PathSegment, Point, Relationship, Value, ZonedDateTime};

/// 파라미터 맵 생성 매크로
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert($key.into(), $crate::driver::Value::from($value));
        )+
        map
    }};
}
