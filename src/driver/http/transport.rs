//! HTTP Transport
//!
//! 연결과 디스커버리가 사용하는 HTTP 송수신 경계

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use crate::driver::error::{DriverError, DriverResult};
use crate::query_api::http::{HttpMethod, HttpRequest, HttpResponse};

/// HTTP 송수신 트레이트
///
/// 반환되는 future는 요청을 소유하므로 `'static`이다.
pub trait HttpTransport: Send + Sync {
    /// 요청 전송
    ///
    /// 교환 자체가 실패하면 서비스 불가 에러를 반환한다.
    /// HTTP 상태 코드 해석은 응답 코덱이 맡는다.
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, DriverResult<HttpResponse>>;
}

// ============================================================================
// ReqwestTransport
// ============================================================================

/// reqwest 기반 트랜스포트
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// 요청 타임아웃과 User-Agent로 클라이언트 생성
    pub fn new(request_timeout: Duration, user_agent: &str) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DriverError::configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// 기존 클라이언트 사용
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'static, DriverResult<HttpResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client.request(to_reqwest_method(request.method), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                debug!(url = %request.url, error = %e, "http exchange failed");
                DriverError::service_unavailable(format!("HTTP request to {} failed: {}", request.url, e))
            })?;

            let status = response.status().as_u16();
            let headers: HashMap<String, String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| DriverError::service_unavailable(format!("Failed to read response body: {}", e)))?;

            Ok(HttpResponse { status, headers, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(HttpMethod::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_service_unavailable() {
        let transport = ReqwestTransport::new(Duration::from_secs(2), "test-agent").unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/");

        let result = transport.send(request).await;
        assert!(matches!(result, Err(DriverError::ServiceUnavailable(_))));
    }
}
