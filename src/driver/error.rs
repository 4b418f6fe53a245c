//! Driver Error Types
//!
//! 드라이버 에러 정의

use std::fmt;
use thiserror::Error;

/// 서버가 에러 목록을 비워 보냈거나 응답 형식이 잘못된 경우 사용하는 코드
pub const PROTOCOL_ERROR_CODE: &str = "ProtocolError";

/// 서비스 불가 에러 코드
pub const SERVICE_UNAVAILABLE_CODE: &str = "ServiceUnavailable";

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
///
/// 파이프라인과 응답 코덱이 같은 에러를 여러 번 돌려줘야 하므로 `Clone`이다.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 연결 에러
    #[error("Connection error: {0}")]
    Connection(String),

    /// 인증 에러
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// 프로토콜 에러
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 트랜잭션 에러
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// 서버가 보고한 에러
    #[error("Server error: {code} - {message}")]
    Server { code: String, message: String },

    /// 보안 에러 (재시도 여부는 인증 토큰 매니저가 결정)
    #[error("Security error: {code} - {message}")]
    Security {
        code: String,
        message: String,
        retriable: bool,
    },

    /// 타임아웃 에러
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 풀 에러
    #[error("Pool error: {0}")]
    Pool(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 타입 변환 에러
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// 서비스 불가
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 내부 에러
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DriverError {
    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 인증 에러 생성
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 트랜잭션 에러 생성
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// 타임아웃 에러 생성
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// 풀 에러 생성
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 서비스 불가 에러 생성
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// 타입 변환 에러 생성
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// 내부 에러 생성
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 서버 에러 생성
    ///
    /// 보안 코드(`Neo.ClientError.Security.*`)는 재시도 불가 보안 에러가 된다.
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerError::new(code, message).into()
    }

    /// 에러 코드
    pub fn code(&self) -> &str {
        match self {
            Self::Server { code, .. } | Self::Security { code, .. } => code,
            Self::Protocol(_) => PROTOCOL_ERROR_CODE,
            Self::ServiceUnavailable(_) | Self::Connection(_) => SERVICE_UNAVAILABLE_CODE,
            Self::Authentication(_) => "Neo.ClientError.Security.Unauthorized",
            Self::Timeout(_) => "Timeout",
            Self::Transaction(_) => "Neo.ClientError.Transaction.TransactionNotFound",
            Self::Pool(_) | Self::Configuration(_) | Self::TypeConversion(_) | Self::Internal(_) => {
                "Neo.ClientError.General.Unknown"
            }
        }
    }

    /// 보안 에러 여부
    pub fn is_security_error(&self) -> bool {
        matches!(self, Self::Security { .. } | Self::Authentication(_))
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::ServiceUnavailable(_) => true,
            Self::Server { code, .. } => is_retryable_code(code),
            Self::Security { retriable, .. } => *retriable,
            _ => false,
        }
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Authentication(_) | Self::Configuration(_) | Self::TypeConversion(_) => true,
            Self::Server { code, .. } => code.starts_with("Neo.ClientError"),
            _ => false,
        }
    }

    /// 재시도 가능 여부를 기록한 새 에러 (보안 에러가 아니면 그대로)
    pub fn with_retriable(self, retriable: bool) -> Self {
        match self {
            Self::Security { code, message, .. } => Self::Security {
                code,
                message,
                retriable,
            },
            other => other,
        }
    }
}

/// 재시도 가능한 에러 코드 확인
fn is_retryable_code(code: &str) -> bool {
    code.starts_with("Neo.TransientError")
        || code == "Neo.ClientError.Cluster.NotALeader"
        || code == "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase"
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// ServerError - 서버 에러 코드
// ============================================================================

/// Query API 서버 에러
///
/// 응답 본문의 `errors` 목록 한 항목을 나타냅니다.
/// 에러 코드는 "Neo.{Category}.{SubCategory}.{ErrorType}" 형식을 따릅니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// 에러 코드
    pub code: String,
    /// 에러 메시지
    pub message: String,
}

impl ServerError {
    /// 새 에러 생성
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        self.code.starts_with("Neo.ClientError")
    }

    /// 데이터베이스 에러 여부
    pub fn is_database_error(&self) -> bool {
        self.code.starts_with("Neo.DatabaseError")
    }

    /// 트랜지언트 에러 여부 (재시도 가능)
    pub fn is_transient_error(&self) -> bool {
        self.code.starts_with("Neo.TransientError")
    }

    /// 보안 에러 여부
    pub fn is_security_error(&self) -> bool {
        self.code.starts_with("Neo.ClientError.Security.")
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ServerError {}

impl From<ServerError> for DriverError {
    fn from(err: ServerError) -> Self {
        if err.is_security_error() {
            DriverError::Security {
                code: err.code,
                message: err.message,
                retriable: false,
            }
        } else {
            DriverError::Server {
                code: err.code,
                message: err.message,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_creation() {
        let err = DriverError::connection("Connection refused");
        assert!(matches!(err, DriverError::Connection(_)));

        let err = DriverError::authentication("Invalid credentials");
        assert!(matches!(err, DriverError::Authentication(_)));

        let err = DriverError::server("Neo.ClientError.Statement.SyntaxError", "Invalid syntax");
        assert!(matches!(err, DriverError::Server { .. }));
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::connection("Connection refused");
        assert_eq!(err.to_string(), "Connection error: Connection refused");

        let err = DriverError::server("Neo.ClientError.Statement.SyntaxError", "Invalid syntax");
        assert_eq!(
            err.to_string(),
            "Server error: Neo.ClientError.Statement.SyntaxError - Invalid syntax"
        );
    }

    #[test]
    fn test_driver_error_retryable() {
        assert!(DriverError::connection("Connection refused").is_retryable());
        assert!(DriverError::timeout("Operation timed out").is_retryable());
        assert!(DriverError::service_unavailable("down").is_retryable());
        assert!(!DriverError::authentication("Invalid credentials").is_retryable());

        let err = DriverError::server("Neo.TransientError.General.TemporarilyUnavailable", "Server busy");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_security_error_retriable_is_stamped() {
        let err = DriverError::server("Neo.ClientError.Security.TokenExpired", "expired");
        assert!(err.is_security_error());
        assert!(!err.is_retryable());

        let err = err.with_retriable(true);
        assert!(err.is_retryable());
        assert_eq!(err.code(), "Neo.ClientError.Security.TokenExpired");
    }

    #[test]
    fn test_with_retriable_ignores_other_errors() {
        let err = DriverError::protocol("bad").with_retriable(true);
        assert_eq!(err, DriverError::protocol("bad"));
        assert_eq!(err.code(), PROTOCOL_ERROR_CODE);
    }

    #[test]
    fn test_driver_error_client_error() {
        assert!(DriverError::authentication("Invalid credentials").is_client_error());
        assert!(DriverError::configuration("Invalid URI").is_client_error());
        assert!(!DriverError::connection("Connection refused").is_client_error());
        assert!(DriverError::server("Neo.ClientError.Statement.SyntaxError", "x").is_client_error());
    }

    #[test]
    fn test_server_error_classes() {
        let err = ServerError::new("Neo.ClientError.Statement.SyntaxError", "Invalid syntax");
        assert!(err.is_client_error());
        assert!(!err.is_database_error());
        assert!(!err.is_transient_error());

        let err = ServerError::new("Neo.DatabaseError.General.UnknownError", "Unknown error");
        assert!(err.is_database_error());

        let err = ServerError::new("Neo.TransientError.General.TemporarilyUnavailable", "Server busy");
        assert!(err.is_transient_error());

        let err = ServerError::new("Neo.ClientError.Security.Unauthorized", "Invalid credentials");
        assert!(err.is_security_error());
    }

    #[test]
    fn test_server_error_to_driver_error() {
        let driver_err: DriverError =
            ServerError::new("Neo.ClientError.Security.Unauthorized", "Invalid credentials").into();
        assert!(matches!(driver_err, DriverError::Security { retriable: false, .. }));

        let driver_err: DriverError =
            ServerError::new("Neo.ClientError.Statement.SyntaxError", "Invalid syntax").into();
        assert_eq!(
            driver_err,
            DriverError::Server {
                code: "Neo.ClientError.Statement.SyntaxError".into(),
                message: "Invalid syntax".into(),
            }
        );
    }
}
