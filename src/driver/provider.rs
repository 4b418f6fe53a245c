//! Connection Provider
//!
//! 엔드포인트 디스커버리, 인증 토큰, 연결 풀을 묶어 연결을 빌려준다.
//!
//! # Example
//!
//! ```rust,ignore
//! use zeta4g_query_driver::driver::{AuthToken, ConnectionProvider, DriverConfig, Query, QueryConfig};
//!
//! let config = DriverConfig::new("http://localhost:7474", AuthToken::basic("neo4j", "password"))?;
//! let provider = ConnectionProvider::new(config)?;
//!
//! let conn = provider.acquire().await?;
//! let summary = conn.run(Query::new("CREATE (n:Person)"), QueryConfig::default()).summary().await?;
//! provider.release(conn).await;
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::auth::{AuthTokenManager, StaticAuthTokenManager};
use super::config::{AuthToken, DriverConfig};
use super::error::{DriverError, DriverResult};
use super::http::{ErrorHandler, HttpConnection, HttpTransport, ReqwestTransport};
use super::pool::{ConnectionIdGenerator, ConnectionPool, PoolConfig, PoolMetrics, PooledConnection};
use crate::query_api::discovery::{discovery_request, parse_discovery, DiscoveryInfo};

// ============================================================================
// ConnectionProvider - 연결 프로바이더
// ============================================================================

/// 연결 프로바이더
///
/// 복제본은 같은 풀을 공유한다.
#[derive(Clone)]
pub struct ConnectionProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    config: Arc<DriverConfig>,
    transport: Arc<dyn HttpTransport>,
    auth_manager: Arc<dyn AuthTokenManager>,
    pool: ConnectionPool,
    ids: ConnectionIdGenerator,
    /// 캐시된 디스커버리 결과
    discovery: Mutex<Option<DiscoveryInfo>>,
    /// 디스커버리 요청 직렬화
    discovery_lock: tokio::sync::Mutex<()>,
}

impl ConnectionProvider {
    /// reqwest 트랜스포트와 고정 토큰으로 생성
    pub fn new(config: DriverConfig) -> DriverResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout, &config.user_agent)?;
        let auth_manager = StaticAuthTokenManager::new(config.auth.clone());
        Self::with_transport(config, Arc::new(transport), Arc::new(auth_manager))
    }

    /// 트랜스포트와 토큰 매니저 지정
    pub fn with_transport(
        config: DriverConfig,
        transport: Arc<dyn HttpTransport>,
        auth_manager: Arc<dyn AuthTokenManager>,
    ) -> DriverResult<Self> {
        config.validate()?;
        let pool = ConnectionPool::new(PoolConfig::from(&config));

        Ok(Self {
            inner: Arc::new(ProviderInner {
                config: Arc::new(config),
                transport,
                auth_manager,
                pool,
                ids: ConnectionIdGenerator::new(),
                discovery: Mutex::new(None),
                discovery_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// 설정
    pub fn config(&self) -> &DriverConfig {
        &self.inner.config
    }

    /// 연결 획득 (토큰 매니저의 토큰 사용)
    pub async fn acquire(&self) -> DriverResult<PooledConnection> {
        self.acquire_with_token(None).await
    }

    /// 연결 획득
    ///
    /// `token`이 주어지면 토큰 매니저 대신 그 토큰을 쓴다.
    pub async fn acquire_with_token(&self, token: Option<AuthToken>) -> DriverResult<PooledConnection> {
        let info = self.discovery().await?;
        let token = match token {
            Some(token) => token,
            None => self.inner.auth_manager.get_token().await?,
        };
        let template = info.query;

        let validate_template = template.clone();
        let validate_token = token.clone();
        let validate = move |conn: &PooledConnection| {
            if !conn.is_open() {
                return false;
            }
            conn.refresh(validate_template.clone(), validate_token.clone());
            true
        };

        let inner = self.inner.clone();
        let create = move || {
            let id = inner.ids.next_id();
            let connection = HttpConnection::new(id, inner.transport.clone(), inner.config.clone(), template, token);
            connection.set_error_handler(classifier(Arc::downgrade(&inner)));
            connection
        };

        self.inner.pool.acquire(validate, create).await
    }

    /// 연결 반환
    pub async fn release(&self, conn: PooledConnection) {
        self.inner.pool.release(conn).await;
    }

    /// 연결 폐기
    pub async fn destroy(&self, conn: PooledConnection) {
        self.inner.pool.destroy(conn).await;
    }

    /// 쿼리 엔드포인트 (한 번만 조회하고 캐시)
    pub async fn discovery(&self) -> DriverResult<DiscoveryInfo> {
        if let Some(info) = self.cached_discovery() {
            return Ok(info);
        }

        let _guard = self.inner.discovery_lock.lock().await;
        if let Some(info) = self.cached_discovery() {
            return Ok(info);
        }

        let request = discovery_request(&self.inner.config.address.base_url());
        debug!(url = %request.url, "discovering query endpoint");
        let response = self.inner.transport.send(request).await?;
        let info = parse_discovery(&response)?;
        debug!(
            query = %info.query,
            version = info.neo4j_version.as_deref().unwrap_or("unknown"),
            "query endpoint discovered"
        );

        *self.inner.discovery.lock() = Some(info.clone());
        Ok(info)
    }

    fn cached_discovery(&self) -> Option<DiscoveryInfo> {
        self.inner.discovery.lock().clone()
    }

    /// 캐시된 엔드포인트 무효화
    pub fn invalidate_endpoint(&self) {
        self.inner.invalidate_endpoint();
    }

    /// 연결 확인 (디스커버리 후 연결 하나를 빌렸다가 반환)
    pub async fn verify_connectivity(&self) -> DriverResult<DiscoveryInfo> {
        let conn = self.acquire().await?;
        self.release(conn).await;
        self.discovery().await
    }

    /// 풀 메트릭
    pub fn metrics(&self) -> PoolMetrics {
        self.inner.pool.metrics()
    }

    /// 프로바이더 닫기
    pub async fn close(&self) {
        self.inner.pool.close().await;
        debug!("connection provider closed");
    }
}

impl std::fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("address", &self.inner.config.address)
            .field("pool", &self.inner.pool)
            .finish()
    }
}

impl ProviderInner {
    fn invalidate_endpoint(&self) {
        if self.discovery.lock().take().is_some() {
            debug!("query endpoint invalidated");
        }
    }
}

/// 연결별 에러 분류 훅
///
/// 보안 에러의 재시도 여부는 토큰 매니저가 정한다. 서비스 불가 에러는 캐시된
/// 엔드포인트를 무효화한다. 그 밖의 에러는 그대로 통과한다.
fn classifier(provider: Weak<ProviderInner>) -> ErrorHandler {
    Arc::new(move |error: DriverError, token: &AuthToken| {
        let provider = match provider.upgrade() {
            Some(provider) => provider,
            None => return error,
        };

        if error.is_security_error() {
            let retriable = provider.auth_manager.handle_security_exception(token, error.code());
            debug!(code = error.code(), retriable, "security error classified");
            return error.with_retriable(retriable);
        }
        if matches!(error, DriverError::ServiceUnavailable(_)) {
            provider.invalidate_endpoint();
        }
        error
    })
}

// ============================================================================
// Tests
// ============================================================================
