//! Reactive Streams
//!
//! 결과 스트림을 tokio-stream 기반 비동기 스트림으로 변환
//!
//! # Example
//!
//! ```ignore
//! use zeta4g_query_driver::driver::ReactiveRecordStream;
//!
//! let observer = conn.run(Query::new("MATCH (n:Person) RETURN n.name AS name"), QueryConfig::default());
//! let records = ReactiveRecordStream::from_observer(&observer).try_collect().await?;
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use super::error::{DriverError, DriverResult};
use super::observer::{RecordObserver, ResultStreamObserver};
use super::record::Record;
use super::summary::ResultSummary;

// ============================================================================
// ReactiveRecordStream - 비동기 레코드 스트림
// ============================================================================

/// 키와 요약 (관찰자와 스트림이 공유)
#[derive(Default)]
struct StreamShared {
    keys: Mutex<Option<Vec<String>>>,
    summary: Mutex<Option<ResultSummary>>,
}

/// 비동기 레코드 스트림
///
/// 성공하면 레코드 뒤에 스트림이 끝나고, 실패하면 `Err` 하나로 끝난다.
pub struct ReactiveRecordStream {
    inner: Pin<Box<dyn Stream<Item = DriverResult<Record>> + Send>>,
    shared: Arc<StreamShared>,
}

impl std::fmt::Debug for ReactiveRecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveRecordStream")
            .field("keys", &self.keys())
            .finish()
    }
}

impl ReactiveRecordStream {
    /// 결과 스트림 구독
    ///
    /// 채널은 제한이 없으므로 관찰자는 일시정지되지 않는다.
    pub fn from_observer(observer: &ResultStreamObserver) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(StreamShared::default());

        observer.subscribe(Arc::new(ChannelObserver {
            sender: Mutex::new(Some(tx)),
            shared: shared.clone(),
        }));

        Self {
            inner: Box::pin(UnboundedReceiverStream::new(rx)),
            shared,
        }
    }

    /// 레코드 벡터에서 생성
    pub fn from_records(records: Vec<Record>) -> Self {
        let shared = StreamShared::default();
        *shared.keys.lock() = records.first().map(|r| r.keys().to_vec());
        Self {
            inner: Box::pin(tokio_stream::iter(records.into_iter().map(Ok))),
            shared: Arc::new(shared),
        }
    }

    /// 빈 스트림 생성
    pub fn empty() -> Self {
        Self {
            inner: Box::pin(tokio_stream::empty()),
            shared: Arc::new(StreamShared::default()),
        }
    }

    /// 에러 스트림 생성
    pub fn error(err: DriverError) -> Self {
        Self {
            inner: Box::pin(tokio_stream::once(Err(err))),
            shared: Arc::new(StreamShared::default()),
        }
    }

    /// 키 목록 (키 이벤트를 받은 뒤부터)
    pub fn keys(&self) -> Option<Vec<String>> {
        self.shared.keys.lock().clone()
    }

    /// 결과 요약 (성공 종료 후)
    pub fn summary(&self) -> Option<ResultSummary> {
        self.shared.summary.lock().clone()
    }

    /// 모든 레코드 수집 (성공한 것만)
    pub async fn collect(self) -> Vec<Record> {
        self.inner.filter_map(|r| r.ok()).collect().await
    }

    /// 모든 레코드 수집 (에러 포함)
    pub async fn try_collect(self) -> DriverResult<Vec<Record>> {
        let mut results = Vec::new();
        let mut stream = self.inner;

        while let Some(result) = stream.next().await {
            results.push(result?);
        }

        Ok(results)
    }

    /// 첫 번째 레코드
    pub async fn first(self) -> DriverResult<Option<Record>> {
        let mut stream = self.inner;
        stream.next().await.transpose()
    }

    /// 단일 레코드 (정확히 1개)
    pub async fn single(self) -> DriverResult<Record> {
        let mut records = self.try_collect().await?;

        if records.len() != 1 {
            return Err(DriverError::type_conversion(format!(
                "Expected single record, got {}",
                records.len()
            )));
        }

        records
            .pop()
            .ok_or_else(|| DriverError::internal("Record vanished from single-record result"))
    }

    /// for_each 실행 (첫 에러에서 중단)
    pub async fn for_each<F, Fut>(self, mut f: F) -> DriverResult<()>
    where
        F: FnMut(Record) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut stream = self.inner;
        while let Some(result) = stream.next().await {
            f(result?).await;
        }
        Ok(())
    }

    /// 레코드 수 카운트
    pub async fn count(self) -> usize {
        let mut count = 0usize;
        let mut stream = self.inner;
        while let Some(result) = stream.next().await {
            if result.is_ok() {
                count += 1;
            }
        }
        count
    }
}

impl Stream for ReactiveRecordStream {
    type Item = DriverResult<Record>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

// ============================================================================
// ChannelObserver - 채널 관찰자
// ============================================================================

/// 이벤트를 채널로 넘기는 관찰자 (종료 시 송신측을 닫는다)
struct ChannelObserver {
    sender: Mutex<Option<mpsc::UnboundedSender<DriverResult<Record>>>>,
    shared: Arc<StreamShared>,
}

impl RecordObserver for ChannelObserver {
    fn on_keys(&self, keys: &[String]) {
        *self.shared.keys.lock() = Some(keys.to_vec());
    }

    fn on_next(&self, record: Record) {
        if let Some(tx) = self.sender.lock().as_ref() {
            let _ = tx.send(Ok(record));
        }
    }

    fn on_completed(&self, summary: &ResultSummary) {
        *self.shared.summary.lock() = Some(summary.clone());
        self.sender.lock().take();
    }

    fn on_error(&self, error: &DriverError) {
        if let Some(tx) = self.sender.lock().take() {
            let _ = tx.send(Err(error.clone()));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::observer::StreamConfig;
    use crate::driver::types::Value;

    fn create_test_records(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                Record::new(
                    vec!["id".into(), "name".into()],
                    vec![Value::Integer(i as i64), Value::String(format!("Item{}", i))],
                )
            })
            .collect()
    }

    fn observer() -> Arc<ResultStreamObserver> {
        ResultStreamObserver::new(StreamConfig::default(), None)
    }

    fn push_rows(observer: &ResultStreamObserver, count: i64) {
        observer.on_keys(vec!["id".into()]);
        for i in 0..count {
            observer.on_next(vec![Value::Integer(i)]);
        }
    }

    #[tokio::test]
    async fn test_from_observer_success() {
        let observer = observer();
        let stream = ReactiveRecordStream::from_observer(&observer);

        push_rows(&observer, 3);
        observer.on_completed(ResultSummary::default());

        assert_eq!(stream.keys(), Some(vec!["id".to_string()]));
        let ids: Vec<i64> = stream
            .try_collect()
            .await
            .unwrap()
            .iter()
            .map(|r| r.get_int("id").unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_from_observer_error_ends_stream() {
        let observer = observer();
        let mut stream = ReactiveRecordStream::from_observer(&observer);

        push_rows(&observer, 1);
        observer.on_error(DriverError::service_unavailable("down"));

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await,
            Some(Err(DriverError::ServiceUnavailable(_)))
        ));
        assert!(stream.next().await.is_none());
        assert!(stream.summary().is_none());
    }

    #[tokio::test]
    async fn test_late_subscription_replays_buffered_rows() {
        let observer = observer();
        push_rows(&observer, 2);
        observer.on_completed(ResultSummary {
            database: Some("neo4j".into()),
            ..Default::default()
        });

        let stream = ReactiveRecordStream::from_observer(&observer);
        assert_eq!(stream.summary().unwrap().database.as_deref(), Some("neo4j"));
        assert_eq!(stream.count().await, 2);
    }

    #[tokio::test]
    async fn test_rows_delivered_while_streaming() {
        let observer = observer();
        let stream = ReactiveRecordStream::from_observer(&observer);

        let producer = {
            let observer = observer.clone();
            tokio::spawn(async move {
                push_rows(&observer, 100);
                observer.on_completed(ResultSummary::default());
            })
        };

        assert_eq!(stream.count().await, 100);
        producer.await.unwrap();
        assert_eq!(observer.buffered(), 0);
    }

    #[tokio::test]
    async fn test_reactive_stream_from_records() {
        let stream = ReactiveRecordStream::from_records(create_test_records(5));

        assert_eq!(stream.keys(), Some(vec!["id".to_string(), "name".to_string()]));
        assert_eq!(stream.collect().await.len(), 5);
    }

    #[tokio::test]
    async fn test_reactive_stream_empty() {
        let stream = ReactiveRecordStream::empty();
        assert!(stream.collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_reactive_stream_first() {
        let stream = ReactiveRecordStream::from_records(create_test_records(5));

        let first = stream.first().await.unwrap();
        assert_eq!(first.unwrap().get_int("id").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reactive_stream_single() {
        let single = ReactiveRecordStream::from_records(create_test_records(1)).single().await;
        assert_eq!(single.unwrap().get_int("id").unwrap(), 0);

        let many = ReactiveRecordStream::from_records(create_test_records(5)).single().await;
        assert!(many.is_err());
    }

    #[tokio::test]
    async fn test_reactive_stream_error() {
        let stream = ReactiveRecordStream::error(DriverError::protocol("bad"));
        assert!(stream.try_collect().await.is_err());

        let stream = ReactiveRecordStream::error(DriverError::protocol("bad"));
        assert!(stream.first().await.is_err());
    }

    #[tokio::test]
    async fn test_for_each() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stream = ReactiveRecordStream::from_records(create_test_records(3));

        let sink = seen.clone();
        stream
            .for_each(|r| {
                let sink = sink.clone();
                async move { sink.lock().push(r.get_int("id").unwrap()) }
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }
}
