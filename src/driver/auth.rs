//! Auth Token Manager
//!
//! 연결 획득 시 사용할 인증 토큰을 제공하고, 보안 에러의 재시도 여부를 결정한다.

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::debug;

use super::config::AuthToken;
use super::error::DriverResult;

/// 토큰 만료 에러 코드
pub const TOKEN_EXPIRED_CODE: &str = "Neo.ClientError.Security.TokenExpired";

/// 인증 실패 에러 코드
pub const UNAUTHORIZED_CODE: &str = "Neo.ClientError.Security.Unauthorized";

// ============================================================================
// AuthTokenManager - 토큰 매니저
// ============================================================================

/// 인증 토큰 매니저
pub trait AuthTokenManager: Send + Sync {
    /// 현재 토큰
    fn get_token(&self) -> BoxFuture<'_, DriverResult<AuthToken>>;

    /// 보안 에러 처리
    ///
    /// 같은 요청을 새 토큰으로 재시도해도 되면 true.
    fn handle_security_exception(&self, token: &AuthToken, code: &str) -> bool;
}

// ============================================================================
// StaticAuthTokenManager
// ============================================================================

/// 고정 토큰 매니저 (보안 에러는 재시도 불가)
#[derive(Debug, Clone)]
pub struct StaticAuthTokenManager {
    token: AuthToken,
}

impl StaticAuthTokenManager {
    pub fn new(token: AuthToken) -> Self {
        Self { token }
    }
}

impl AuthTokenManager for StaticAuthTokenManager {
    fn get_token(&self) -> BoxFuture<'_, DriverResult<AuthToken>> {
        let token = self.token.clone();
        Box::pin(async move { Ok(token) })
    }

    fn handle_security_exception(&self, _token: &AuthToken, _code: &str) -> bool {
        false
    }
}

// ============================================================================
// ExpirationBasedAuthTokenManager
// ============================================================================

/// 토큰과 만료 시각을 만드는 함수
pub type TokenProvider =
    Arc<dyn Fn() -> BoxFuture<'static, DriverResult<(AuthToken, Option<Instant>)>> + Send + Sync>;

/// 만료 기반 토큰 매니저
///
/// 만료 전까지 토큰을 캐시한다. 캐시된 토큰이 만료/인증 실패 에러를 받으면
/// 캐시를 비우고 재시도 가능으로 표시한다.
pub struct ExpirationBasedAuthTokenManager {
    provider: TokenProvider,
    cached: Mutex<Option<(AuthToken, Option<Instant>)>>,
}

impl ExpirationBasedAuthTokenManager {
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, DriverResult<(AuthToken, Option<Instant>)>> + Send + Sync + 'static,
    {
        Self {
            provider: Arc::new(provider),
            cached: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> Option<AuthToken> {
        match &*self.cached.lock() {
            Some((token, expiry)) if expiry.map(|e| Instant::now() < e).unwrap_or(true) => Some(token.clone()),
            _ => None,
        }
    }
}

impl AuthTokenManager for ExpirationBasedAuthTokenManager {
    fn get_token(&self) -> BoxFuture<'_, DriverResult<AuthToken>> {
        Box::pin(async move {
            if let Some(token) = self.cached_token() {
                return Ok(token);
            }
            let (token, expiry) = (self.provider)().await?;
            debug!(scheme = token.scheme(), "auth token refreshed");
            *self.cached.lock() = Some((token.clone(), expiry));
            Ok(token)
        })
    }

    fn handle_security_exception(&self, token: &AuthToken, code: &str) -> bool {
        if code != TOKEN_EXPIRED_CODE && code != UNAUTHORIZED_CODE {
            return false;
        }
        let mut cached = self.cached.lock();
        if cached.as_ref().map(|(t, _)| t == token).unwrap_or(false) {
            *cached = None;
        }
        true
    }
}

impl std::fmt::Debug for ExpirationBasedAuthTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationBasedAuthTokenManager")
            .field("cached", &self.cached.lock().is_some())
            .finish()
    }
}
