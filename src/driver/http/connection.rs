//! HTTP Connection
//!
//! Query API 위의 논리 연결
//!
//! run/begin/commit/rollback은 결과 스트림을 즉시 돌려주고, 실제 HTTP 교환은
//! 연결의 [`WorkPipeline`]에 올린 작업에서 순서대로 수행된다.
//!
//! | 작업 | 요청 |
//! |------|------|
//! | run (자동 커밋) | `POST Q` |
//! | begin | `POST Q/tx` |
//! | run (트랜잭션 안) | `POST Q/tx/<id>` |
//! | commit | `POST Q/tx/<id>/commit` |
//! | rollback | `DELETE Q/tx/<id>` |

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::transport::HttpTransport;
use crate::driver::config::{AuthToken, DriverConfig};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::observer::{ResultStreamObserver, StreamConfig};
use crate::driver::pipeline::WorkPipeline;
use crate::driver::query::{Query, QueryConfig};
use crate::driver::summary::ResultSummary;
use crate::driver::transaction::TransactionHandle;
use crate::query_api::codec::Decoder;
use crate::query_api::discovery;
use crate::query_api::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query_api::message::{
    BeginRequestCodec, BeginResponseCodec, CommitRequestCodec, CommitResponseCodec, RequestCodec,
    RollbackRequestCodec, RollbackResponseCodec, RunRequestCodec, RunResponseCodec,
};

/// 에러 분류 훅 (에러와 현재 인증 토큰을 받아 최종 에러를 돌려준다)
pub type ErrorHandler = Arc<dyn Fn(DriverError, &AuthToken) -> DriverError + Send + Sync>;

// ============================================================================
// HttpConnection - 연결
// ============================================================================

/// Query API 연결
///
/// 복제본은 같은 연결을 가리킨다. 작업 제출은 Tokio 런타임 안에서 해야 한다.
#[derive(Clone)]
pub struct HttpConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    id: u64,
    transport: Arc<dyn HttpTransport>,
    config: Arc<DriverConfig>,
    auth: RwLock<AuthToken>,
    query_template: RwLock<String>,
    transaction: Mutex<Option<TransactionHandle>>,
    pipeline: WorkPipeline,
    open: AtomicBool,
    in_flight: Mutex<HashMap<u64, CancellationToken>>,
    next_unit: AtomicU64,
    error_handler: RwLock<Option<ErrorHandler>>,
}

impl HttpConnection {
    /// 새 연결 생성
    ///
    /// `query_template`은 디스커버리로 받은 `{databaseName}` 포함 URL이다.
    pub fn new(
        id: u64,
        transport: Arc<dyn HttpTransport>,
        config: Arc<DriverConfig>,
        query_template: impl Into<String>,
        auth: AuthToken,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                transport,
                config,
                auth: RwLock::new(auth),
                query_template: RwLock::new(query_template.into()),
                transaction: Mutex::new(None),
                pipeline: WorkPipeline::new(),
                open: AtomicBool::new(true),
                in_flight: Mutex::new(HashMap::new()),
                next_unit: AtomicU64::new(1),
                error_handler: RwLock::new(None),
            }),
        }
    }

    /// 연결 ID
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// 열림 여부
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// 현재 트랜잭션
    pub fn transaction(&self) -> Option<TransactionHandle> {
        self.inner.transaction.lock().clone()
    }

    /// 현재 인증 토큰
    pub fn auth_token(&self) -> AuthToken {
        self.inner.auth.read().clone()
    }

    /// 인증 토큰 교체
    pub fn set_auth_token(&self, auth: AuthToken) {
        *self.inner.auth.write() = auth;
    }

    /// 쿼리 URL 템플릿
    pub fn query_template(&self) -> String {
        self.inner.query_template.read().clone()
    }

    /// 엔드포인트와 인증 토큰 갱신
    pub fn refresh(&self, query_template: impl Into<String>, auth: AuthToken) {
        *self.inner.query_template.write() = query_template.into();
        self.set_auth_token(auth);
    }

    /// 에러 분류 훅 설치
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.inner.error_handler.write() = Some(handler);
    }

    /// 쿼리 실행
    ///
    /// 트랜잭션이 열려 있으면 그 트랜잭션 안에서 실행되고 `config`는 무시된다.
    pub fn run(&self, query: Query, config: QueryConfig) -> Arc<ResultStreamObserver> {
        self.submit(move |inner, observer| async move { inner.execute_run(query, config, observer).await })
    }

    /// 트랜잭션 시작
    pub fn begin_transaction(&self, config: QueryConfig) -> Arc<ResultStreamObserver> {
        self.submit(move |inner, observer| async move {
            let summary = inner.execute_begin(config).await?;
            observer.on_keys(Vec::new());
            observer.on_completed(summary);
            Ok(())
        })
    }

    /// 트랜잭션 커밋
    pub fn commit(&self) -> Arc<ResultStreamObserver> {
        self.submit(|inner, observer| async move {
            let summary = inner.execute_commit().await?;
            observer.on_keys(Vec::new());
            observer.on_completed(summary);
            Ok(())
        })
    }

    /// 트랜잭션 롤백
    pub fn rollback(&self) -> Arc<ResultStreamObserver> {
        self.submit(|inner, observer| async move {
            let summary = inner.execute_rollback().await?;
            observer.on_keys(Vec::new());
            observer.on_completed(summary);
            Ok(())
        })
    }

    /// 연결 리셋
    ///
    /// 진행 중인 교환을 모두 취소하고 트랜잭션을 버린 뒤 파이프라인을 복구한다.
    pub async fn reset(&self) {
        self.inner.cancel_all();
        self.inner.clear_transaction();
        self.inner.barrier().await;
        self.inner.clear_transaction();
        self.inner.pipeline.recover();
        debug!(connection = self.inner.id, "connection reset");
    }

    /// 연결 닫기
    pub async fn close(&self) {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            debug!(connection = self.inner.id, "connection closed");
        }
        self.inner.cancel_all();
        self.inner.clear_transaction();
        self.inner.barrier().await;
    }

    /// 연결 즉시 중단
    ///
    /// 앞선 작업을 기다리지 않고 닫힘으로 표시한 뒤 진행 중인 교환을 취소한다.
    pub fn abort(&self) {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            debug!(connection = self.inner.id, "connection aborted");
        }
        self.inner.cancel_all();
        self.inner.clear_transaction();
    }

    fn submit<F, Fut>(&self, work: F) -> Arc<ResultStreamObserver>
    where
        F: FnOnce(Arc<ConnectionInner>, Arc<ResultStreamObserver>) -> Fut,
        Fut: Future<Output = DriverResult<()>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let observer = ResultStreamObserver::new(
            StreamConfig {
                high_watermark: inner.config.high_watermark,
                low_watermark: inner.config.low_watermark,
            },
            Some(inner.config.address.clone()),
        );

        if !self.is_open() {
            observer.on_error(DriverError::connection("Connection is closed"));
            return observer;
        }

        let work = work(inner.clone(), observer.clone());
        let normalizer = inner.clone();
        let unit = inner
            .pipeline
            .submit(async move { work.await.map_err(|e| normalizer.normalize(e)) });

        let token = CancellationToken::new();
        let unit_id = inner.register(token.clone());
        let stream = observer.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                result = unit => result,
                _ = token.cancelled() => Err(DriverError::service_unavailable("Request cancelled by connection reset")),
            };
            inner.unregister(unit_id);
            if let Err(error) = result {
                stream.on_error(error);
            }
        });

        observer
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("id", &self.inner.id)
            .field("open", &self.is_open())
            .field("transaction", &self.transaction().map(|t| t.id))
            .finish()
    }
}

// ============================================================================
// ConnectionInner - 작업 실행
// ============================================================================

impl ConnectionInner {
    fn query_url(&self, database: &str) -> String {
        discovery::query_url(&self.query_template.read(), database)
    }

    fn active_transaction(&self) -> DriverResult<TransactionHandle> {
        self.transaction
            .lock()
            .clone()
            .ok_or_else(|| DriverError::transaction("No active transaction on this connection"))
    }

    fn clear_transaction(&self) {
        if let Some(tx) = self.transaction.lock().take() {
            debug!(connection = self.id, transaction = %tx.id, "transaction cleared");
        }
    }

    /// 에러 정규화: 트랜잭션을 버리고 분류 훅을 거친다
    fn normalize(&self, error: DriverError) -> DriverError {
        self.clear_transaction();
        let handler = self.error_handler.read().clone();
        match handler {
            Some(handler) => {
                let auth = self.auth.read().clone();
                handler(error, &auth)
            }
            None => error,
        }
    }

    fn register(&self, token: CancellationToken) -> u64 {
        let unit_id = self.next_unit.fetch_add(1, Ordering::Relaxed);
        self.in_flight.lock().insert(unit_id, token);
        unit_id
    }

    fn unregister(&self, unit_id: u64) {
        self.in_flight.lock().remove(&unit_id);
    }

    fn cancel_all(&self) {
        let tokens: Vec<CancellationToken> = self.in_flight.lock().drain().map(|(_, t)| t).collect();
        if !tokens.is_empty() {
            debug!(connection = self.id, cancelled = tokens.len(), "cancelling in-flight requests");
        }
        for token in tokens {
            token.cancel();
        }
    }

    /// 앞선 작업이 모두 끝날 때까지 대기
    async fn barrier(&self) {
        let _ = self.pipeline.submit(async { Ok(()) }).await;
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        url: String,
        codec: &dyn RequestCodec,
        affinity: Option<&str>,
    ) -> DriverResult<HttpResponse> {
        let mut request = HttpRequest::new(method, url)
            .header("Content-Type", codec.content_type())
            .header("Accept", codec.accept())
            .header("Authorization", codec.authorization()?);
        if let Some(affinity) = affinity {
            request = request.header(self.config.affinity_header.as_str(), affinity);
        }
        let request = request.body(codec.body()?.map(str::to_string));

        debug!(connection = self.id, method = %method, url = %request.url, "query api request");
        let response = self.transport.send(request).await?;
        debug!(connection = self.id, status = response.status, "query api response");
        Ok(response)
    }

    async fn execute_run(
        &self,
        query: Query,
        config: QueryConfig,
        observer: Arc<ResultStreamObserver>,
    ) -> DriverResult<()> {
        let transaction = self.transaction.lock().clone();
        let (url, database, codec_config) = match &transaction {
            Some(tx) => (
                format!("{}/tx/{}", self.query_url(&tx.database), tx.id),
                tx.database.clone(),
                QueryConfig::default(),
            ),
            None => {
                let database = config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.config.default_database.clone());
                (self.query_url(&database), database, config)
            }
        };

        let auth = self.auth.read().clone();
        let codec = RunRequestCodec::new(auth, query, codec_config);
        let affinity = transaction.as_ref().and_then(|tx| tx.affinity.as_deref());
        let response = self.exchange(HttpMethod::Post, url, &codec, affinity).await?;

        let result = RunResponseCodec::of(&response);
        let keys = result.keys()?.to_vec();
        let decoder = Decoder::new(self.config.integer_mode);
        let rows = result
            .rows()?
            .iter()
            .map(|row| decoder.decode_row(row))
            .collect::<DriverResult<Vec<_>>>()?;
        let summary = ResultSummary {
            counters: result.counters()?.clone(),
            bookmarks: result.bookmarks()?.to_vec(),
            notifications: result.notifications()?.to_vec(),
            profiled_plan: result.profiled_plan()?.cloned(),
            database: Some(database),
            ..Default::default()
        };

        observer.on_keys(keys);

        let fetch_size = self.config.fetch_size.max(1);
        let mut rows = rows.into_iter().peekable();
        loop {
            for values in rows.by_ref().take(fetch_size) {
                observer.on_next(values);
            }
            if rows.peek().is_none() || observer.is_terminal() {
                break;
            }
            self.wait_while_paused(&observer).await;
            tokio::task::yield_now().await;
        }

        observer.on_completed(summary);
        Ok(())
    }

    /// 관찰자가 일시정지된 동안 제한된 횟수만큼 대기
    async fn wait_while_paused(&self, observer: &ResultStreamObserver) {
        let mut polls = 0;
        while observer.is_paused() && !observer.is_terminal() {
            if polls >= self.config.max_pause_polls {
                warn!(
                    connection = self.id,
                    buffered = observer.buffered(),
                    "result stream still paused; continuing and buffering rows"
                );
                return;
            }
            tokio::time::sleep(self.config.pause_poll_interval).await;
            polls += 1;
        }
    }

    async fn execute_begin(&self, config: QueryConfig) -> DriverResult<ResultSummary> {
        if let Some(tx) = self.transaction.lock().as_ref() {
            return Err(DriverError::transaction(format!(
                "Transaction {} is already active on this connection",
                tx.id
            )));
        }

        let database = config
            .database
            .clone()
            .unwrap_or_else(|| self.config.default_database.clone());
        let url = format!("{}/tx", self.query_url(&database));
        let auth = self.auth.read().clone();
        let codec = BeginRequestCodec::new(auth, config);
        let response = self.exchange(HttpMethod::Post, url, &codec, None).await?;

        let result = BeginResponseCodec::of(&response, &self.config.affinity_header);
        let handle = TransactionHandle::new(result.transaction_id()?, database.clone())
            .with_expires(result.expires()?)
            .with_affinity(result.affinity()?.map(str::to_string));

        debug!(connection = self.id, transaction = %handle.id, "transaction started");
        *self.transaction.lock() = Some(handle);

        Ok(ResultSummary {
            database: Some(database),
            ..Default::default()
        })
    }

    async fn execute_commit(&self) -> DriverResult<ResultSummary> {
        let tx = self.active_transaction()?;
        let url = format!("{}/tx/{}/commit", self.query_url(&tx.database), tx.id);
        let codec = CommitRequestCodec::new(self.auth.read().clone());
        let response = self
            .exchange(HttpMethod::Post, url, &codec, tx.affinity.as_deref())
            .await?;

        let bookmarks = CommitResponseCodec::of(&response).bookmarks()?.to_vec();
        self.clear_transaction();

        Ok(ResultSummary {
            bookmarks,
            database: Some(tx.database),
            ..Default::default()
        })
    }

    async fn execute_rollback(&self) -> DriverResult<ResultSummary> {
        let tx = self.active_transaction()?;
        let url = format!("{}/tx/{}", self.query_url(&tx.database), tx.id);
        let codec = RollbackRequestCodec::new(self.auth.read().clone());
        let response = self
            .exchange(HttpMethod::Delete, url, &codec, tx.affinity.as_deref())
            .await?;

        RollbackResponseCodec::of(&response).check()?;
        self.clear_transaction();

        Ok(ResultSummary {
            database: Some(tx.database),
            ..Default::default()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::driver::http::testing::{query_response, ScriptedTransport};
    use crate::driver::observer::RecordObserver;
    use crate::driver::record::Record;

    const TEMPLATE: &str = "http://localhost:7474/db/{databaseName}/query/v2";
    const Q: &str = "http://localhost:7474/db/neo4j/query/v2";

    fn config() -> Arc<DriverConfig> {
        Arc::new(
            DriverConfig::builder("http://localhost:7474", AuthToken::basic("neo4j", "password"))
                .unwrap()
                .with_fetch_size(2)
                .build()
                .unwrap(),
        )
    }

    fn int(n: i64) -> serde_json::Value {
        json!({"$type": "Integer", "_value": n.to_string()})
    }

    fn server() -> Arc<ScriptedTransport> {
        ScriptedTransport::new(|request| {
            let url = request.url.as_str();
            Ok(match request.method {
                HttpMethod::Delete => HttpResponse::new(200, ""),
                _ if url.ends_with("/query/v2/tx") => query_response(
                    202,
                    json!({"transaction": {"id": "abc", "expires": "2999-01-01T00:00:00Z"}}),
                )
                .with_header("neo4j-cluster-affinity", "server-1"),
                _ if url.ends_with("/commit") => query_response(200, json!({"bookmarks": ["bm:1"]})),
                _ => query_response(
                    200,
                    json!({
                        "data": {"fields": ["n"], "values": [[int(1)], [int(2)], [int(3)], [int(4)], [int(5)]]},
                        "counters": {"nodesCreated": 1},
                        "bookmarks": ["bm:0"]
                    }),
                ),
            })
        })
    }

    fn connection(transport: Arc<dyn HttpTransport>) -> HttpConnection {
        HttpConnection::new(7, transport, config(), TEMPLATE, AuthToken::basic("neo4j", "password"))
    }

    #[derive(Default)]
    struct Rows(Mutex<Vec<Record>>);

    impl RecordObserver for Rows {
        fn on_next(&self, record: Record) {
            self.0.lock().push(record);
        }
    }

    /// 종료까지 기다린 뒤 버퍼된 행을 받는다
    async fn collect(observer: Arc<ResultStreamObserver>) -> DriverResult<(Vec<Record>, ResultSummary)> {
        let summary = observer.summary().await?;
        let rows = Arc::new(Rows::default());
        observer.subscribe(rows.clone());
        let records = rows.0.lock().clone();
        Ok((records, summary))
    }

    #[tokio::test]
    async fn test_auto_commit_run() {
        let transport = server();
        let conn = connection(transport.clone());

        let (records, summary) = collect(conn.run(Query::new("RETURN 1"), QueryConfig::default()))
            .await
            .unwrap();

        let values: Vec<i64> = records.iter().map(|r| r.get_int("n").unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.counters.nodes_created, 1);
        assert_eq!(summary.bookmarks[0].value(), "bm:0");
        assert_eq!(summary.database.as_deref(), Some("neo4j"));
        assert!(summary.stream.have_records_streamed);

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, Q);
        assert_eq!(request.header_value("authorization"), Some("Basic bmVvNGo6cGFzc3dvcmQ="));
        assert_eq!(request.header_value("content-type"), Some("application/vnd.neo4j.query"));
        assert_eq!(request.header_value("neo4j-cluster-affinity"), None);
    }

    #[tokio::test]
    async fn test_run_uses_requested_database() {
        let transport = server();
        let conn = connection(transport.clone());

        collect(conn.run(Query::new("RETURN 1"), QueryConfig::default().with_database("movies")))
            .await
            .unwrap();
        assert_eq!(transport.requests()[0].url, "http://localhost:7474/db/movies/query/v2");
    }

    #[tokio::test]
    async fn test_transaction_flow_carries_affinity() {
        let transport = server();
        let conn = connection(transport.clone());

        conn.begin_transaction(QueryConfig::default()).summary().await.unwrap();
        let tx = conn.transaction().unwrap();
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.affinity.as_deref(), Some("server-1"));

        collect(conn.run(Query::new("CREATE (n)"), QueryConfig::default())).await.unwrap();
        let summary = conn.commit().summary().await.unwrap();
        assert_eq!(summary.bookmarks[0].value(), "bm:1");
        assert!(conn.transaction().is_none());

        collect(conn.run(Query::new("RETURN 1"), QueryConfig::default())).await.unwrap();

        let requests = transport.requests();
        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                format!("{}/tx", Q),
                format!("{}/tx/abc", Q),
                format!("{}/tx/abc/commit", Q),
                Q.to_string(),
            ]
        );
        let affinity: Vec<Option<&str>> = requests
            .iter()
            .map(|r| r.header_value("neo4j-cluster-affinity"))
            .collect();
        assert_eq!(affinity, vec![None, Some("server-1"), Some("server-1"), None]);
    }

    #[tokio::test]
    async fn test_rollback_uses_delete() {
        let transport = server();
        let conn = connection(transport.clone());

        conn.begin_transaction(QueryConfig::default()).summary().await.unwrap();
        conn.rollback().summary().await.unwrap();

        let last = transport.requests().pop().unwrap();
        assert_eq!(last.method, HttpMethod::Delete);
        assert_eq!(last.url, format!("{}/tx/abc", Q));
        assert!(conn.transaction().is_none());
    }

    #[tokio::test]
    async fn test_commit_without_transaction_fails() {
        let conn = connection(server());

        let result = conn.commit().summary().await;
        assert!(matches!(result, Err(DriverError::Transaction(_))));
    }

    #[tokio::test]
    async fn test_server_error_clears_transaction_and_blocks_pipeline() {
        let transport = ScriptedTransport::new(|request| {
            Ok(if request.url.ends_with("/tx") {
                query_response(202, json!({"transaction": {"id": "abc"}}))
            } else {
                query_response(
                    400,
                    json!({"errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]}),
                )
            })
        });
        let conn = connection(transport.clone());

        conn.begin_transaction(QueryConfig::default()).summary().await.unwrap();
        let failed = conn.run(Query::new("RETURN"), QueryConfig::default()).summary().await;
        assert_eq!(failed.unwrap_err().code(), "Neo.ClientError.Statement.SyntaxError");
        assert!(conn.transaction().is_none());

        let skipped = conn.begin_transaction(QueryConfig::default()).summary().await;
        assert_eq!(skipped.unwrap_err().code(), "Neo.ClientError.Statement.SyntaxError");
        assert_eq!(transport.requests().len(), 2);

        conn.reset().await;
        conn.begin_transaction(QueryConfig::default()).summary().await.unwrap();
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_error_handler_sees_error_and_token() {
        let transport = ScriptedTransport::new(|_| Ok(query_response(401, json!({}))));
        let conn = connection(transport);
        let seen = Arc::new(Mutex::new(None));

        let captured = seen.clone();
        conn.set_error_handler(Arc::new(move |error, token| {
            *captured.lock() = Some(token.clone());
            error.with_retriable(true)
        }));

        let error = conn
            .run(Query::new("RETURN 1"), QueryConfig::default())
            .summary()
            .await
            .unwrap_err();
        assert!(error.is_security_error());
        assert!(error.is_retryable());
        assert_eq!(*seen.lock(), Some(AuthToken::basic("neo4j", "password")));
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_protocol_error() {
        let transport = ScriptedTransport::new(|_| {
            Ok(HttpResponse::new(200, json!({"data": {"fields": [], "values": []}}).to_string())
                .with_header("Content-Type", "text/html"))
        });
        let conn = connection(transport);

        let error = conn.run(Query::new("RETURN 1"), QueryConfig::default()).summary().await;
        assert!(matches!(error, Err(DriverError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_paused_stream_is_drained_after_bounded_wait() {
        let config = Arc::new(
            DriverConfig::builder("http://localhost:7474", AuthToken::bearer("t"))
                .unwrap()
                .with_fetch_size(1)
                .with_watermarks(2, 1)
                .with_pause_polling(Duration::from_millis(1), 3)
                .build()
                .unwrap(),
        );
        let conn = HttpConnection::new(1, server(), config, TEMPLATE, AuthToken::bearer("t"));

        let observer = conn.run(Query::new("RETURN 1"), QueryConfig::default());
        let summary = observer.summary().await.unwrap();

        assert_eq!(observer.buffered(), 5);
        assert!(summary.stream.have_records_streamed);
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_work() {
        let transport = server();
        let conn = connection(transport.clone());
        conn.close().await;

        let result = conn.run(Query::new("RETURN 1"), QueryConfig::default()).summary().await;
        assert!(matches!(result, Err(DriverError::Connection(_))));
        assert!(!conn.is_open());
        assert!(transport.requests().is_empty());
    }

    /// 응답하지 않는 트랜스포트
    struct Hanging;

    impl HttpTransport for Hanging {
        fn send(&self, _request: HttpRequest) -> BoxFuture<'static, DriverResult<HttpResponse>> {
            Box::pin(futures::future::pending())
        }
    }

    #[tokio::test]
    async fn test_reset_cancels_in_flight_request() {
        let conn = connection(Arc::new(Hanging));
        let observer = conn.run(Query::new("RETURN 1"), QueryConfig::default());
        tokio::task::yield_now().await;

        conn.reset().await;

        let result = observer.summary().await;
        assert!(matches!(result, Err(DriverError::ServiceUnavailable(_))));
        assert!(conn.transaction().is_none());
    }

    #[tokio::test]
    async fn test_refresh_changes_endpoint_and_token() {
        let transport = server();
        let conn = connection(transport.clone());
        conn.refresh("http://other:7474/db/{databaseName}/query/v2", AuthToken::bearer("abc"));

        collect(conn.run(Query::new("RETURN 1"), QueryConfig::default())).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://other:7474/db/neo4j/query/v2");
        assert_eq!(request.header_value("authorization"), Some("Bearer YWJj"));
        assert_eq!(conn.auth_token(), AuthToken::bearer("abc"));
    }
}
