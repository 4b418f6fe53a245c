//! Connection Pool
//!
//! HTTP 연결 풀링

use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::config::DriverConfig;
use super::error::{DriverError, DriverResult};
use super::http::HttpConnection;

// ============================================================================
// PoolConfig - 풀 설정
// ============================================================================

/// 연결 풀 설정
///
/// | 필드 | 기본값 | 설명 |
/// |------|--------|------|
/// | `max_size` | 100 | 최대 연결 수 |
/// | `max_lifetime` | 1시간 | 연결 최대 수명 |
/// | `acquisition_timeout` | 60초 | 연결 획득 타임아웃 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// 최대 연결 수
    pub max_size: usize,
    /// 연결 최대 수명
    pub max_lifetime: Duration,
    /// 연결 획득 타임아웃
    pub acquisition_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from(&DriverConfig::default())
    }
}

impl From<&DriverConfig> for PoolConfig {
    fn from(config: &DriverConfig) -> Self {
        Self {
            max_size: config.max_connection_pool_size,
            max_lifetime: config.max_connection_lifetime,
            acquisition_timeout: config.connection_acquisition_timeout,
        }
    }
}

// ============================================================================
// ConnectionIdGenerator - 연결 ID
// ============================================================================

/// 연결 ID 생성기 (프로바이더마다 하나)
#[derive(Debug)]
pub struct ConnectionIdGenerator {
    next: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// 다음 ID
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PooledConnection - 풀링된 연결
// ============================================================================

/// 풀링된 연결
///
/// 살아 있는 동안 풀의 슬롯 하나를 차지한다. 반환이나 폐기 없이 버려지면
/// 레지스트리에서 빠지고 연결이 중단된다.
pub struct PooledConnection {
    connection: HttpConnection,
    created_at: Instant,
    last_used: Instant,
    registry: Weak<Registry>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(connection: HttpConnection, registry: Weak<Registry>, permit: OwnedSemaphorePermit) -> Self {
        let now = Instant::now();
        Self {
            connection,
            created_at: now,
            last_used: now,
            registry,
            _permit: permit,
        }
    }

    /// 연결
    pub fn connection(&self) -> &HttpConnection {
        &self.connection
    }

    /// 생성 시간
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// 마지막 사용 시간
    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    /// 최대 수명 초과 여부
    pub fn is_expired(&self, max_lifetime: Duration) -> bool {
        self.created_at.elapsed() > max_lifetime
    }

    fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

impl Deref for PooledConnection {
    type Target = HttpConnection;

    fn deref(&self) -> &HttpConnection {
        &self.connection
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        // 레지스트리에 남아 있으면 release/destroy를 거치지 않은 연결
        let leaked = self
            .registry
            .upgrade()
            .map_or(false, |registry| registry.lock().remove(&self.connection.id()).is_some());
        if leaked {
            warn!(connection = self.connection.id(), "pooled connection dropped without release");
            self.connection.abort();
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.connection.id())
            .field("open", &self.connection.is_open())
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}

// ============================================================================
// PoolMetrics - 풀 메트릭
// ============================================================================

/// 풀 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// 현재 크기
    pub size: usize,
    /// 유휴 연결 수
    pub idle: usize,
    /// 사용 중인 연결 수
    pub in_use: usize,
    /// 총 획득 횟수
    pub total_acquisitions: u64,
    /// 총 생성 횟수
    pub total_created: u64,
    /// 총 닫힌 연결 수
    pub total_closed: u64,
    /// 총 타임아웃 횟수
    pub total_timeouts: u64,
}

// ============================================================================
// ConnectionPool - 연결 풀
// ============================================================================

/// 열린 연결 레지스트리
type Registry = Mutex<HashMap<u64, HttpConnection>>;

/// 연결 풀
pub struct ConnectionPool {
    config: PoolConfig,
    idle: Mutex<VecDeque<PooledConnection>>,
    /// 열린 연결 레지스트리 (풀링된 연결은 약한 참조를 가진다)
    registry: Arc<Registry>,
    semaphore: Arc<Semaphore>,
    /// 유휴 연결 반환 알림
    returned: Notify,
    total_acquisitions: AtomicU64,
    total_created: AtomicU64,
    total_closed: AtomicU64,
    total_timeouts: AtomicU64,
    open: AtomicBool,
}

impl ConnectionPool {
    /// 새 연결 풀 생성
    pub fn new(config: PoolConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_size));
        Self {
            config,
            idle: Mutex::new(VecDeque::new()),
            registry: Arc::new(Mutex::new(HashMap::new())),
            semaphore,
            returned: Notify::new(),
            total_acquisitions: AtomicU64::new(0),
            total_created: AtomicU64::new(0),
            total_closed: AtomicU64::new(0),
            total_timeouts: AtomicU64::new(0),
            open: AtomicBool::new(true),
        }
    }

    /// 풀 설정
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// 연결 획득
    ///
    /// 유휴 연결은 `validate`를 통과해야 재사용된다. 통과하지 못하면 폐기된다.
    /// 유휴 연결이 없으면 슬롯을 기다린 뒤 `create`로 새 연결을 만든다.
    pub async fn acquire<V, C>(&self, mut validate: V, create: C) -> DriverResult<PooledConnection>
    where
        V: FnMut(&PooledConnection) -> bool + Send,
        C: FnOnce() -> HttpConnection + Send,
    {
        if !self.is_open() {
            return Err(DriverError::pool("Pool is closed"));
        }

        let deadline = tokio::time::Instant::now() + self.config.acquisition_timeout;
        let permit = loop {
            if let Some(conn) = self.checkout_idle(&mut validate).await {
                return Ok(conn);
            }

            // 슬롯이 비거나 유휴 연결이 반환될 때까지 대기
            tokio::select! {
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => break permit,
                    Err(_) => return Err(DriverError::pool("Pool is closed")),
                },
                _ = self.returned.notified() => continue,
                _ = tokio::time::sleep_until(deadline) => {
                    self.total_timeouts.fetch_add(1, Ordering::Relaxed);
                    return Err(DriverError::timeout(format!(
                        "Connection acquisition timed out after {:?}",
                        self.config.acquisition_timeout
                    )));
                }
            }
        };

        let connection = create();
        debug!(connection = connection.id(), "connection created");
        self.registry.lock().insert(connection.id(), connection.clone());
        self.total_created.fetch_add(1, Ordering::Relaxed);
        self.total_acquisitions.fetch_add(1, Ordering::Relaxed);

        Ok(PooledConnection::new(connection, Arc::downgrade(&self.registry), permit))
    }

    /// 유휴 연결 꺼내기 (만료/무효 연결은 폐기)
    async fn checkout_idle<V>(&self, validate: &mut V) -> Option<PooledConnection>
    where
        V: FnMut(&PooledConnection) -> bool + Send,
    {
        loop {
            let candidate = self.idle.lock().pop_front();
            let mut conn = candidate?;

            if conn.is_expired(self.config.max_lifetime) {
                debug!(connection = conn.id(), "connection exceeded max lifetime");
                self.destroy(conn).await;
                continue;
            }
            if !validate(&conn) {
                warn!(connection = conn.id(), "discarding connection that failed validation");
                self.destroy(conn).await;
                continue;
            }

            conn.touch();
            self.total_acquisitions.fetch_add(1, Ordering::Relaxed);
            return Some(conn);
        }
    }

    /// 연결 반환
    ///
    /// 연결을 리셋한 뒤 유휴 큐에 넣는다. 풀이 닫혔거나 수명이 다했으면 폐기한다.
    pub async fn release(&self, mut conn: PooledConnection) {
        conn.reset().await;

        if !self.is_open() || conn.is_expired(self.config.max_lifetime) {
            self.destroy(conn).await;
            return;
        }

        conn.touch();
        self.idle.lock().push_back(conn);
        self.returned.notify_one();
    }

    /// 연결 폐기
    pub async fn destroy(&self, conn: PooledConnection) {
        self.registry.lock().remove(&conn.id());
        conn.close().await;
        self.total_closed.fetch_add(1, Ordering::Relaxed);
        debug!(connection = conn.id(), "connection destroyed");
    }

    /// 풀 닫기
    ///
    /// 유휴 연결을 모두 폐기하고 이후 획득을 거부한다.
    pub async fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.semaphore.close();

        let idle: Vec<PooledConnection> = self.idle.lock().drain(..).collect();
        for conn in idle {
            self.destroy(conn).await;
        }
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> PoolMetrics {
        let size = self.size();
        let idle = self.idle_count();

        PoolMetrics {
            size,
            idle,
            in_use: size.saturating_sub(idle),
            total_acquisitions: self.total_acquisitions.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_closed: self.total_closed.load(Ordering::Relaxed),
            total_timeouts: self.total_timeouts.load(Ordering::Relaxed),
        }
    }

    /// 풀 크기 (유휴 + 사용 중)
    pub fn size(&self) -> usize {
        self.registry.lock().len()
    }

    /// 유휴 연결 수
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// 사용 중인 연결 수
    pub fn in_use_count(&self) -> usize {
        self.size().saturating_sub(self.idle_count())
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("size", &self.size())
            .field("idle", &self.idle_count())
            .field("in_use", &self.in_use_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::config::AuthToken;
    use crate::driver::http::testing::ScriptedTransport;
    use crate::driver::http::HttpTransport;
    use crate::query_api::http::HttpResponse;

    const TEMPLATE: &str = "http://localhost:7474/db/{databaseName}/query/v2";

    fn factory(ids: &ConnectionIdGenerator) -> impl FnOnce() -> HttpConnection + Send {
        let id = ids.next_id();
        move || {
            let transport: Arc<dyn HttpTransport> = ScriptedTransport::new(|_| Ok(HttpResponse::new(200, "")));
            HttpConnection::new(
                id,
                transport,
                Arc::new(DriverConfig::default()),
                TEMPLATE,
                AuthToken::none(),
            )
        }
    }

    fn create_test_pool(max_size: usize) -> ConnectionPool {
        ConnectionPool::new(PoolConfig {
            max_size,
            acquisition_timeout: Duration::from_millis(50),
            ..Default::default()
        })
    }

    #[test]
    fn test_pool_config_from_driver_config() {
        let driver_config = DriverConfig::builder("http://localhost:7474", AuthToken::none())
            .unwrap()
            .with_max_connection_pool_size(5)
            .with_connection_acquisition_timeout(Duration::from_secs(3))
            .build()
            .unwrap();
        let config = PoolConfig::from(&driver_config);

        assert_eq!(config.max_size, 5);
        assert_eq!(config.acquisition_timeout, Duration::from_secs(3));
        assert_eq!(PoolConfig::default().max_size, 100);
    }

    #[test]
    fn test_id_generator() {
        let ids = ConnectionIdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[tokio::test]
    async fn test_release_and_reuse() {
        let pool = create_test_pool(10);
        let ids = ConnectionIdGenerator::new();

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        let id = conn.id();
        assert_eq!(pool.metrics().in_use, 1);

        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        let again = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        assert_eq!(again.id(), id);

        let metrics = pool.metrics();
        assert_eq!(metrics.size, 1);
        assert_eq!(metrics.total_created, 1);
        assert_eq!(metrics.total_acquisitions, 2);
    }

    #[tokio::test]
    async fn test_dropped_connection_leaves_registry() {
        let pool = create_test_pool(2);
        let ids = ConnectionIdGenerator::new();

        for _ in 0..5 {
            let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
            let handle = conn.connection().clone();
            drop(conn);
            assert!(!handle.is_open());
        }

        let metrics = pool.metrics();
        assert_eq!(metrics.size, 0);
        assert_eq!(metrics.in_use, 0);
        assert_eq!(metrics.idle, 0);
    }

    #[tokio::test]
    async fn test_destroyed_connection_is_counted_once() {
        let pool = create_test_pool(2);
        let ids = ConnectionIdGenerator::new();

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        let handle = conn.connection().clone();
        pool.release(conn).await;
        pool.destroy(pool.acquire(|_| true, factory(&ids)).await.unwrap()).await;

        assert_eq!(pool.size(), 0);
        assert_eq!(pool.metrics().total_closed, 1);
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_failed_validation_destroys_connection() {
        let pool = create_test_pool(10);
        let ids = ConnectionIdGenerator::new();

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        let stale = conn.connection().clone();
        pool.release(conn).await;

        let fresh = pool.acquire(|_| false, factory(&ids)).await.unwrap();
        assert_ne!(fresh.id(), stale.id());
        assert!(!stale.is_open());
        assert_eq!(pool.metrics().total_closed, 1);
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_expired_connection_is_not_reused() {
        let pool = ConnectionPool::new(PoolConfig {
            max_size: 2,
            max_lifetime: Duration::ZERO,
            ..Default::default()
        });
        let ids = ConnectionIdGenerator::new();

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        pool.release(conn).await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.metrics().total_closed, 1);
    }

    #[tokio::test]
    async fn test_acquire_timeout() {
        let pool = create_test_pool(1);
        let ids = ConnectionIdGenerator::new();

        let _held = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        let result = pool.acquire(|_| true, factory(&ids)).await;

        assert!(matches!(result, Err(DriverError::Timeout(_))));
        assert_eq!(pool.metrics().total_timeouts, 1);
    }

    #[tokio::test]
    async fn test_waiter_gets_released_connection() {
        let pool = Arc::new(create_test_pool(1));
        let ids = ConnectionIdGenerator::new();

        let held = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        let id = held.id();

        let releaser = {
            let pool = pool.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                pool.release(held).await;
            })
        };

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        releaser.await.unwrap();
        assert_eq!(conn.id(), id);
    }

    #[tokio::test]
    async fn test_close_pool() {
        let pool = create_test_pool(10);
        let ids = ConnectionIdGenerator::new();

        let conn = pool.acquire(|_| true, factory(&ids)).await.unwrap();
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        pool.close().await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.size(), 0);
        assert!(matches!(
            pool.acquire(|_| true, factory(&ids)).await,
            Err(DriverError::Pool(_))
        ));
    }
}
