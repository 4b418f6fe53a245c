//! Result Stream Observer
//!
//! 결과 스트림 상태 기계
//!
//! ```text
//! READY --keys--> STREAMING --next--> STREAMING
//!                     |
//!                     +--completed--> SUCCEEDED
//! (any) --error--> FAILED
//! ```
//!
//! 표에 없는 (상태, 이벤트) 조합은 프로토콜 에러 이벤트로 바뀌어 FAILED가 된다.
//! SUCCEEDED/FAILED 이후의 이벤트는 무시된다. 관찰자 콜백은 상태 락 밖에서 호출되며,
//! 전달 순서는 재진입 가능한 전달 락으로 유지된다.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::oneshot;
use tracing::trace;

use super::config::ServerAddress;
use super::error::{DriverError, DriverResult};
use super::record::{Record, RecordKeys};
use super::summary::{ResultSummary, StreamSummary};
use super::types::Value;

// ============================================================================
// RecordObserver - 관찰자
// ============================================================================

/// 스트림 관찰자
///
/// 한 관찰자는 성공 또는 에러 중 하나의 종료 알림만 받는다.
pub trait RecordObserver: Send + Sync {
    /// 컬럼 키 수신
    fn on_keys(&self, _keys: &[String]) {}

    /// 레코드 수신
    fn on_next(&self, _record: Record) {}

    /// 성공 종료
    fn on_completed(&self, _summary: &ResultSummary) {}

    /// 에러 종료
    fn on_error(&self, _error: &DriverError) {}

    /// 행을 받는 관찰자인지 (false면 키와 종료 알림만 받는다)
    fn accepts_records(&self) -> bool {
        true
    }
}

// ============================================================================
// StreamState / StreamEvent - 상태와 이벤트
// ============================================================================

/// 스트림 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// 초기 상태
    Ready,
    /// 키 수신 후 행 스트리밍 중
    Streaming,
    /// 성공 종료
    Succeeded,
    /// 실패 종료
    Failed,
}

impl StreamState {
    /// 종료 상태 여부
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// 스트림 이벤트
#[derive(Debug)]
pub enum StreamEvent {
    /// 컬럼 키
    Keys(Vec<String>),
    /// 디코딩된 한 행
    Next(Vec<Value>),
    /// 성공 종료
    Completed(ResultSummary),
    /// 에러
    Error(DriverError),
}

impl StreamEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Keys(_) => "keys",
            Self::Next(_) => "next",
            Self::Completed(_) => "completed",
            Self::Error(_) => "error",
        }
    }
}

/// 상태 전이 표 (`None`은 프로토콜 위반)
fn transition(state: StreamState, event: &StreamEvent) -> Option<StreamState> {
    use StreamEvent as E;
    use StreamState as S;

    match (state, event) {
        (S::Ready, E::Keys(_)) => Some(S::Streaming),
        (S::Streaming, E::Next(_)) => Some(S::Streaming),
        (S::Streaming, E::Completed(_)) => Some(S::Succeeded),
        (_, E::Error(_)) => Some(S::Failed),
        _ => None,
    }
}

// ============================================================================
// StreamConfig - 버퍼 설정
// ============================================================================

/// 버퍼 워터마크 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// 버퍼가 이 값을 넘으면 일시정지
    pub high_watermark: usize,
    /// 재생 후 버퍼가 이 값 미만이면 재개
    pub low_watermark: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_watermark: 700,
            low_watermark: 300,
        }
    }
}

// ============================================================================
// ResultStreamObserver - 결과 스트림
// ============================================================================

type ErrorHook = Box<dyn FnOnce(&DriverError) + Send>;
type CompleteHook = Box<dyn FnOnce(&ResultSummary) + Send>;
type Observers = Vec<Arc<dyn RecordObserver>>;

struct StreamInner {
    state: StreamState,
    keys: Option<Arc<RecordKeys>>,
    queue: VecDeque<Record>,
    observers: Observers,
    summary: Option<ResultSummary>,
    error: Option<DriverError>,
    paused: bool,
    have_records_streamed: bool,
    before_error: Option<ErrorHook>,
    after_complete: Option<CompleteHook>,
}

/// 락 밖에서 수행할 알림
enum Delivery {
    Keys(Observers, Arc<RecordKeys>),
    Records(Observers, Vec<Record>),
    Completed(Observers, ResultSummary, Option<CompleteHook>),
    Error(Observers, DriverError, Option<ErrorHook>),
}

fn deliver(deliveries: Vec<Delivery>) {
    for delivery in deliveries {
        match delivery {
            Delivery::Keys(observers, keys) => {
                for observer in &observers {
                    observer.on_keys(keys.keys());
                }
            }
            Delivery::Records(observers, records) => {
                for record in records {
                    for observer in &observers {
                        observer.on_next(record.clone());
                    }
                }
            }
            Delivery::Completed(observers, summary, hook) => {
                for observer in &observers {
                    observer.on_completed(&summary);
                }
                if let Some(hook) = hook {
                    hook(&summary);
                }
            }
            Delivery::Error(observers, error, hook) => {
                if let Some(hook) = hook {
                    hook(&error);
                }
                for observer in &observers {
                    observer.on_error(&error);
                }
            }
        }
    }
}

/// 결과 스트림 관찰 대상
///
/// 연결이 이벤트를 밀어 넣고, 호출자는 [`subscribe`](Self::subscribe)로 관찰자를
/// 등록한다. 늦게 등록한 관찰자에게는 버퍼된 키, 행, 종료 알림이 재생된다.
pub struct ResultStreamObserver {
    inner: Mutex<StreamInner>,
    delivery: ReentrantMutex<()>,
    config: StreamConfig,
    server: Option<ServerAddress>,
}

impl ResultStreamObserver {
    /// 새 스트림 생성
    pub fn new(config: StreamConfig, server: Option<ServerAddress>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(StreamInner {
                state: StreamState::Ready,
                keys: None,
                queue: VecDeque::new(),
                observers: Vec::new(),
                summary: None,
                error: None,
                paused: false,
                have_records_streamed: false,
                before_error: None,
                after_complete: None,
            }),
            delivery: ReentrantMutex::new(()),
            config,
            server,
        })
    }

    /// 에러 알림 직전에 한 번 실행할 훅
    pub fn set_before_error(&self, hook: impl FnOnce(&DriverError) + Send + 'static) {
        self.inner.lock().before_error = Some(Box::new(hook));
    }

    /// 성공 알림 직후에 한 번 실행할 훅
    pub fn set_after_complete(&self, hook: impl FnOnce(&ResultSummary) + Send + 'static) {
        self.inner.lock().after_complete = Some(Box::new(hook));
    }

    /// 현재 상태
    pub fn state(&self) -> StreamState {
        self.inner.lock().state
    }

    /// 종료 여부
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// 일시정지 여부
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    /// 스트림 일시정지
    pub fn pause(&self) {
        self.inner.lock().paused = true;
    }

    /// 스트림 재개
    pub fn resume(&self) {
        self.inner.lock().paused = false;
    }

    /// 버퍼된 행 수
    pub fn buffered(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// 수신한 컬럼 키
    pub fn keys(&self) -> Option<Vec<String>> {
        self.inner.lock().keys.as_ref().map(|k| k.keys().to_vec())
    }

    /// 키 이벤트
    pub fn on_keys(&self, keys: Vec<String>) {
        self.on_event(StreamEvent::Keys(keys));
    }

    /// 행 이벤트
    pub fn on_next(&self, values: Vec<Value>) {
        self.on_event(StreamEvent::Next(values));
    }

    /// 성공 종료 이벤트
    pub fn on_completed(&self, summary: ResultSummary) {
        self.on_event(StreamEvent::Completed(summary));
    }

    /// 에러 이벤트
    pub fn on_error(&self, error: DriverError) {
        self.on_event(StreamEvent::Error(error));
    }

    /// 이벤트 처리
    pub fn on_event(&self, event: StreamEvent) {
        let _delivery = self.delivery.lock();
        let deliveries = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                trace!(state = ?inner.state, event = event.name(), "event ignored after termination");
                return;
            }
            let event = match transition(inner.state, &event) {
                Some(_) => event,
                None => StreamEvent::Error(DriverError::protocol(format!(
                    "Unexpected {} event in {:?} state",
                    event.name(),
                    inner.state
                ))),
            };
            self.apply(&mut inner, event)
        };
        deliver(deliveries);
    }

    fn apply(&self, inner: &mut StreamInner, event: StreamEvent) -> Vec<Delivery> {
        let from = inner.state;
        let mut deliveries = Vec::new();

        match event {
            StreamEvent::Keys(keys) => {
                let keys = RecordKeys::new(keys);
                inner.keys = Some(keys.clone());
                inner.state = StreamState::Streaming;
                if !inner.observers.is_empty() {
                    deliveries.push(Delivery::Keys(inner.observers.clone(), keys));
                }
            }
            StreamEvent::Next(values) => {
                inner.have_records_streamed = true;
                let keys = inner.keys.clone().unwrap_or_else(|| RecordKeys::new(Vec::new()));
                let record = Record::with_keys(keys, values);
                let receivers: Observers = inner
                    .observers
                    .iter()
                    .filter(|o| o.accepts_records())
                    .cloned()
                    .collect();

                if receivers.is_empty() {
                    inner.queue.push_back(record);
                    if !inner.paused && inner.queue.len() > self.config.high_watermark {
                        inner.paused = true;
                        trace!(buffered = inner.queue.len(), "result stream paused");
                    }
                } else {
                    deliveries.push(Delivery::Records(receivers, vec![record]));
                }
            }
            StreamEvent::Completed(mut summary) => {
                if summary.server.is_none() {
                    summary.server = self.server.clone();
                }
                summary.stream = StreamSummary {
                    have_records_streamed: inner.have_records_streamed,
                    has_keys: inner.keys.is_some(),
                    pulled: true,
                };
                inner.state = StreamState::Succeeded;
                inner.summary = Some(summary.clone());
                deliveries.push(Delivery::Completed(
                    inner.observers.clone(),
                    summary,
                    inner.after_complete.take(),
                ));
            }
            StreamEvent::Error(error) => {
                inner.state = StreamState::Failed;
                inner.paused = false;
                inner.error = Some(error.clone());
                inner.after_complete = None;
                deliveries.push(Delivery::Error(
                    inner.observers.clone(),
                    error,
                    inner.before_error.take(),
                ));
            }
        }

        if from != inner.state {
            trace!(?from, to = ?inner.state, "result stream transition");
        }
        deliveries
    }

    /// 관찰자 등록
    ///
    /// 이미 받은 키, 버퍼된 행(행을 받는 관찰자인 경우), 종료 알림을 순서대로 재생한다.
    pub fn subscribe(&self, observer: Arc<dyn RecordObserver>) {
        let _delivery = self.delivery.lock();
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.observers.push(observer.clone());

            let target: Observers = vec![observer.clone()];
            let mut deliveries = Vec::new();

            if let Some(keys) = &inner.keys {
                deliveries.push(Delivery::Keys(target.clone(), keys.clone()));
            }
            if observer.accepts_records() && !inner.queue.is_empty() {
                let records: Vec<Record> = inner.queue.drain(..).collect();
                deliveries.push(Delivery::Records(target.clone(), records));
            }
            if inner.paused && inner.queue.len() < self.config.low_watermark {
                inner.paused = false;
                trace!("result stream resumed");
            }
            if let Some(summary) = &inner.summary {
                deliveries.push(Delivery::Completed(target, summary.clone(), None));
            } else if let Some(error) = &inner.error {
                deliveries.push(Delivery::Error(target, error.clone(), None));
            }
            deliveries
        };
        deliver(deliveries);
    }

    /// 종료까지 기다려 요약을 받는다 (행은 소비하지 않는다)
    pub async fn summary(&self) -> DriverResult<ResultSummary> {
        let (tx, rx) = oneshot::channel();
        self.subscribe(Arc::new(SummaryWaiter {
            sender: Mutex::new(Some(tx)),
        }));
        rx.await
            .unwrap_or_else(|_| Err(DriverError::internal("Result stream dropped before completion")))
    }
}

impl fmt::Debug for ResultStreamObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResultStreamObserver")
            .field("state", &inner.state)
            .field("buffered", &inner.queue.len())
            .field("paused", &inner.paused)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

/// 종료 알림만 기다리는 관찰자
struct SummaryWaiter {
    sender: Mutex<Option<oneshot::Sender<DriverResult<ResultSummary>>>>,
}

impl RecordObserver for SummaryWaiter {
    fn on_completed(&self, summary: &ResultSummary) {
        if let Some(tx) = self.sender.lock().take() {
            let _ = tx.send(Ok(summary.clone()));
        }
    }

    fn on_error(&self, error: &DriverError) {
        if let Some(tx) = self.sender.lock().take() {
            let _ = tx.send(Err(error.clone()));
        }
    }

    fn accepts_records(&self) -> bool {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 받은 알림을 기록하는 관찰자
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
        rows: bool,
    }

    impl Recorder {
        fn rows() -> Arc<Self> {
            Arc::new(Self {
                rows: true,
                ..Default::default()
            })
        }

        fn summary_only() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        fn terminals(&self) -> usize {
            self.events()
                .iter()
                .filter(|e| e.starts_with("completed") || e.starts_with("error"))
                .count()
        }
    }

    impl RecordObserver for Recorder {
        fn on_keys(&self, keys: &[String]) {
            self.events.lock().push(format!("keys {:?}", keys));
        }

        fn on_next(&self, record: Record) {
            self.events.lock().push(format!("next {}", record.values()[0]));
        }

        fn on_completed(&self, _summary: &ResultSummary) {
            self.events.lock().push("completed".into());
        }

        fn on_error(&self, error: &DriverError) {
            self.events.lock().push(format!("error {}", error.code()));
        }

        fn accepts_records(&self) -> bool {
            self.rows
        }
    }

    fn stream() -> Arc<ResultStreamObserver> {
        ResultStreamObserver::new(StreamConfig::default(), Some(ServerAddress::new("db", 7474)))
    }

    #[test]
    fn test_happy_path() {
        let stream = stream();
        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());

        stream.on_keys(vec!["n".into()]);
        stream.on_next(vec![Value::Integer(1)]);
        stream.on_next(vec![Value::Integer(2)]);
        stream.on_completed(ResultSummary::default());

        assert_eq!(stream.state(), StreamState::Succeeded);
        assert_eq!(
            recorder.events(),
            vec!["keys [\"n\"]", "next 1", "next 2", "completed"]
        );
    }

    #[test]
    fn test_next_before_keys_fails() {
        let stream = stream();
        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());

        stream.on_next(vec![Value::Integer(1)]);

        assert_eq!(stream.state(), StreamState::Failed);
        assert_eq!(recorder.events(), vec!["error ProtocolError"]);
    }

    #[test]
    fn test_events_after_terminal_are_ignored() {
        let stream = stream();
        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());

        stream.on_keys(vec![]);
        stream.on_completed(ResultSummary::default());
        stream.on_error(DriverError::service_unavailable("late"));
        stream.on_next(vec![Value::Null]);
        stream.on_completed(ResultSummary::default());

        assert_eq!(stream.state(), StreamState::Succeeded);
        assert_eq!(recorder.terminals(), 1);
    }

    #[test]
    fn test_completed_in_ready_state_fails() {
        let stream = stream();
        stream.on_completed(ResultSummary::default());
        assert_eq!(stream.state(), StreamState::Failed);
    }

    #[test]
    fn test_summary_carries_stream_summary_and_server() {
        let stream = stream();
        let summaries = Arc::new(Mutex::new(Vec::new()));
        let captured = summaries.clone();
        stream.set_after_complete(move |summary| captured.lock().push(summary.clone()));

        stream.on_keys(vec!["n".into()]);
        stream.on_next(vec![Value::Integer(1)]);
        stream.on_completed(ResultSummary::default());

        let summary = summaries.lock()[0].clone();
        assert!(summary.stream.have_records_streamed);
        assert!(summary.stream.has_keys);
        assert!(summary.stream.pulled);
        assert_eq!(summary.server, Some(ServerAddress::new("db", 7474)));
    }

    #[test]
    fn test_before_error_hook_runs_first() {
        let stream = stream();
        let order = Arc::new(Mutex::new(Vec::new()));

        let hook_order = order.clone();
        stream.set_before_error(move |_| hook_order.lock().push("hook"));

        struct Probe(Arc<Mutex<Vec<&'static str>>>);
        impl RecordObserver for Probe {
            fn on_error(&self, _error: &DriverError) {
                self.0.lock().push("observer");
            }
        }
        stream.subscribe(Arc::new(Probe(order.clone())));

        stream.on_error(DriverError::service_unavailable("down"));
        assert_eq!(*order.lock(), vec!["hook", "observer"]);
    }

    #[test]
    fn test_late_subscription_replays_everything() {
        let stream = stream();
        stream.on_keys(vec!["n".into()]);
        stream.on_next(vec![Value::Integer(1)]);
        stream.on_next(vec![Value::Integer(2)]);
        stream.on_completed(ResultSummary::default());
        assert_eq!(stream.buffered(), 2);

        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());

        assert_eq!(
            recorder.events(),
            vec!["keys [\"n\"]", "next 1", "next 2", "completed"]
        );
        assert_eq!(stream.buffered(), 0);
    }

    #[test]
    fn test_late_subscription_replays_error() {
        let stream = stream();
        stream.on_error(DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad"));

        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());
        assert_eq!(recorder.events(), vec!["error Neo.ClientError.Statement.SyntaxError"]);
    }

    #[test]
    fn test_summary_only_observer_leaves_rows_buffered() {
        let stream = stream();
        let waiter = Recorder::summary_only();
        stream.subscribe(waiter.clone());

        stream.on_keys(vec!["n".into()]);
        stream.on_next(vec![Value::Integer(1)]);

        assert_eq!(stream.buffered(), 1);
        assert_eq!(waiter.events(), vec!["keys [\"n\"]"]);
    }

    #[test]
    fn test_backpressure_pause_and_resume() {
        let stream = ResultStreamObserver::new(
            StreamConfig {
                high_watermark: 3,
                low_watermark: 1,
            },
            None,
        );
        stream.on_keys(vec!["n".into()]);
        for i in 0..3 {
            stream.on_next(vec![Value::Integer(i)]);
        }
        assert!(!stream.is_paused());

        stream.on_next(vec![Value::Integer(3)]);
        assert!(stream.is_paused());

        let recorder = Recorder::rows();
        stream.subscribe(recorder.clone());
        assert!(!stream.is_paused());
        assert_eq!(recorder.events().len(), 5);
    }

    #[test]
    fn test_callback_may_reenter_observer() {
        struct Reentrant(Arc<ResultStreamObserver>);
        impl RecordObserver for Reentrant {
            fn on_next(&self, _record: Record) {
                self.0.pause();
                assert_eq!(self.0.state(), StreamState::Streaming);
            }
        }

        let stream = stream();
        stream.subscribe(Arc::new(Reentrant(stream.clone())));
        stream.on_keys(vec!["n".into()]);
        stream.on_next(vec![Value::Integer(1)]);
        assert!(stream.is_paused());
    }

    #[tokio::test]
    async fn test_summary_future() {
        let stream = stream();
        let waiting = {
            let stream = stream.clone();
            tokio::spawn(async move { stream.summary().await })
        };
        tokio::task::yield_now().await;

        stream.on_keys(vec![]);
        stream.on_completed(ResultSummary {
            database: Some("neo4j".into()),
            ..Default::default()
        });

        let summary = waiting.await.unwrap().unwrap();
        assert_eq!(summary.database.as_deref(), Some("neo4j"));

        let failed = self::stream();
        failed.on_error(DriverError::service_unavailable("down"));
        assert!(matches!(failed.summary().await, Err(DriverError::ServiceUnavailable(_))));
    }
}
