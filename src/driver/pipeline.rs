//! Work Pipeline
//!
//! 연결 하나에 묶인 순차 실행 큐
//!
//! 제출 시점에 완료 티켓을 동기적으로 이어 붙이므로 실행 순서는 제출 순서와 같다.
//! 한 작업이 실패하면 `recover()` 전까지 이후 작업은 실행되지 않고 같은 에러로 끝난다.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::error::{DriverError, DriverResult};

/// 순차 실행 파이프라인
#[derive(Debug, Default)]
pub struct WorkPipeline {
    /// 마지막으로 제출된 작업의 완료 티켓
    tail: Mutex<Option<oneshot::Receiver<()>>>,
    /// 처음 실패한 작업의 에러
    failure: Arc<Mutex<Option<DriverError>>>,
}

impl WorkPipeline {
    /// 새 파이프라인 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 작업 제출
    ///
    /// 반환된 future는 앞선 작업이 모두 끝난 뒤에 `work`를 실행한다.
    /// future가 실행되지 않고 버려져도 다음 작업은 진행된다.
    pub fn submit<F, T>(&self, work: F) -> impl Future<Output = DriverResult<T>> + Send + 'static
    where
        F: Future<Output = DriverResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (ticket, next) = oneshot::channel::<()>();
        let previous = self.tail.lock().replace(next);
        let failure = self.failure.clone();

        async move {
            // 드롭되면 다음 작업이 깨어난다
            let _ticket = ticket;

            if let Some(previous) = previous {
                let _ = previous.await;
            }

            if let Some(error) = failure.lock().clone() {
                return Err(error);
            }

            let result = work.await;
            if let Err(error) = &result {
                let mut slot = failure.lock();
                if slot.is_none() {
                    *slot = Some(error.clone());
                }
            }
            result
        }
    }

    /// 실패 상태 해제
    pub fn recover(&self) {
        self.failure.lock().take();
    }

    /// 기록된 실패
    pub fn failure(&self) -> Option<DriverError> {
        self.failure.lock().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_units_run_in_submission_order() {
        let pipeline = WorkPipeline::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5u64 {
            let order = order.clone();
            let unit = pipeline.submit(async move {
                // 먼저 제출된 작업일수록 오래 걸린다
                tokio::time::sleep(Duration::from_millis(10 * (5 - i))).await;
                order.lock().push(i);
                Ok(i)
            });
            handles.push(tokio::spawn(unit));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), i as u64);
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_failure_skips_later_units() {
        let pipeline = WorkPipeline::new();
        let ran = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let ran = ran.clone();
            pipeline.submit(async move {
                ran.lock().push("first");
                Ok(())
            })
        };
        let failing = pipeline.submit(async { Err::<(), _>(DriverError::service_unavailable("down")) });
        let skipped = {
            let ran = ran.clone();
            pipeline.submit(async move {
                ran.lock().push("skipped");
                Ok(())
            })
        };

        assert!(first.await.is_ok());
        assert_eq!(failing.await, Err(DriverError::service_unavailable("down")));
        assert_eq!(skipped.await, Err(DriverError::service_unavailable("down")));
        assert_eq!(*ran.lock(), vec!["first"]);
        assert!(pipeline.failure().is_some());
    }

    #[tokio::test]
    async fn test_only_first_failure_is_kept() {
        let pipeline = WorkPipeline::new();

        let a = pipeline.submit(async { Err::<(), _>(DriverError::protocol("first")) });
        let b = pipeline.submit(async { Err::<(), _>(DriverError::protocol("second")) });

        assert_eq!(a.await, Err(DriverError::protocol("first")));
        assert_eq!(b.await, Err(DriverError::protocol("first")));
    }

    #[tokio::test]
    async fn test_recover_accepts_new_work() {
        let pipeline = WorkPipeline::new();

        let failing = pipeline.submit(async { Err::<(), _>(DriverError::timeout("slow")) });
        assert!(failing.await.is_err());

        pipeline.recover();
        assert!(pipeline.failure().is_none());

        let unit = pipeline.submit(async { Ok(42) });
        assert_eq!(unit.await, Ok(42));
    }

    #[tokio::test]
    async fn test_dropped_unit_releases_next() {
        let pipeline = WorkPipeline::new();

        let dropped = pipeline.submit(async { Ok(()) });
        let next = pipeline.submit(async { Ok("ran") });
        drop(dropped);

        let result = tokio::time::timeout(Duration::from_secs(1), next).await;
        assert_eq!(result.unwrap(), Ok("ran"));
    }
}
