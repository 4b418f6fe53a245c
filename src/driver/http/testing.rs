//! 테스트용 스크립트 트랜스포트

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value as Json;

use super::transport::HttpTransport;
use crate::driver::error::DriverResult;
use crate::query_api::http::{HttpRequest, HttpResponse};
use crate::query_api::message::QUERY_CONTENT_TYPE;

type Handler = dyn Fn(&HttpRequest) -> DriverResult<HttpResponse> + Send + Sync;

/// 요청을 기록하고 핸들러가 만든 응답을 돌려주는 트랜스포트
#[derive(Clone)]
pub struct ScriptedTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> DriverResult<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// 지금까지 받은 요청
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// URL이 `suffix`로 끝나는 요청 수
    pub fn count(&self, suffix: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url.ends_with(suffix)).count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, DriverResult<HttpResponse>> {
        let response = (self.handler)(&request);
        self.requests.lock().push(request);
        Box::pin(async move { response })
    }
}

/// Query API 응답
pub fn query_response(status: u16, body: Json) -> HttpResponse {
    HttpResponse::new(status, body.to_string()).with_header("Content-Type", QUERY_CONTENT_TYPE)
}

/// 일반 JSON 응답
pub fn json_response(status: u16, body: Json) -> HttpResponse {
    HttpResponse::new(status, body.to_string()).with_header("Content-Type", "application/json")
}

/// 디스커버리 응답
pub fn discovery_response() -> HttpResponse {
    json_response(
        200,
        serde_json::json!({
            "query": "http://localhost:7474/db/{databaseName}/query/v2",
            "neo4j_version": "5.23.0",
            "neo4j_edition": "enterprise"
        }),
    )
}
