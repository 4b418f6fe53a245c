//! Driver Configuration
//!
//! 인증 토큰, 서버 주소, 드라이버 설정

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::error::{DriverError, DriverResult};
use crate::query_api::codec::IntegerMode;

/// HTTP 기본 포트
pub const DEFAULT_HTTP_PORT: u16 = 7474;

/// HTTPS 기본 포트
pub const DEFAULT_HTTPS_PORT: u16 = 7473;

/// 기본 데이터베이스 이름
pub const DEFAULT_DATABASE: &str = "neo4j";

/// 기본 어피니티 헤더 이름
pub const DEFAULT_AFFINITY_HEADER: &str = "neo4j-cluster-affinity";

// ============================================================================
// AuthToken - 인증 토큰
// ============================================================================

/// 인증 토큰
///
/// Query API는 `basic`과 `bearer` 스킴만 지원한다.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthToken {
    /// 인증 없음
    #[default]
    None,
    /// Basic 인증 (사용자명/비밀번호)
    Basic {
        username: String,
        password: String,
        realm: Option<String>,
    },
    /// Bearer 토큰
    Bearer { token: String },
    /// Kerberos 인증
    Kerberos { ticket: String },
    /// 커스텀 인증
    Custom {
        principal: String,
        credentials: String,
        realm: String,
        scheme: String,
        parameters: Option<HashMap<String, String>>,
    },
}

impl AuthToken {
    /// Basic 인증 토큰 생성
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: None,
        }
    }

    /// Basic 인증 토큰 생성 (realm 포함)
    pub fn basic_with_realm(
        username: impl Into<String>,
        password: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: Some(realm.into()),
        }
    }

    /// Bearer 토큰 생성
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer { token: token.into() }
    }

    /// Kerberos 토큰 생성
    pub fn kerberos(ticket: impl Into<String>) -> Self {
        Self::Kerberos { ticket: ticket.into() }
    }

    /// 커스텀 토큰 생성
    pub fn custom(
        principal: impl Into<String>,
        credentials: impl Into<String>,
        realm: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self::Custom {
            principal: principal.into(),
            credentials: credentials.into(),
            realm: realm.into(),
            scheme: scheme.into(),
            parameters: None,
        }
    }

    /// 인증 없음
    pub fn none() -> Self {
        Self::None
    }

    /// 인증 스킴
    pub fn scheme(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
            Self::Kerberos { .. } => "kerberos",
            Self::Custom { scheme, .. } => scheme,
        }
    }
}

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// HTTPS 여부
    pub secure: bool,
}

impl ServerAddress {
    /// 새 서버 주소 생성 (HTTP)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
        }
    }

    /// URI에서 파싱
    ///
    /// `http://host[:port][/]` 또는 `https://host[:port][/]` 형식만 허용한다.
    pub fn from_uri(uri: &str) -> DriverResult<Self> {
        let (secure, rest) = if let Some(rest) = uri.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = uri.strip_prefix("http://") {
            (false, rest)
        } else {
            return Err(DriverError::configuration(format!(
                "Unsupported URI scheme: {} (expected http or https)",
                uri
            )));
        };

        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(DriverError::configuration(format!("Invalid server address: {}", uri)));
        }

        let default_port = if secure { DEFAULT_HTTPS_PORT } else { DEFAULT_HTTP_PORT };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| DriverError::configuration("Invalid port"))?;
                (host, port)
            }
            _ => (authority, default_port),
        };
        if host.is_empty() {
            return Err(DriverError::configuration(format!("Invalid server address: {}", uri)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            secure,
        })
    }

    /// 서버 루트 URL (디스커버리 대상)
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_HTTP_PORT)
    }
}

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 서버 주소
    pub address: ServerAddress,
    /// 인증 토큰
    pub auth: AuthToken,
    /// 기본 데이터베이스
    pub default_database: String,
    /// Fetch Size (한 번에 전달하는 행 수)
    pub fetch_size: usize,
    /// 버퍼 상한 (초과 시 스트림 일시정지)
    pub high_watermark: usize,
    /// 버퍼 하한 (미만이면 스트림 재개)
    pub low_watermark: usize,
    /// 정수 표현 방식
    pub integer_mode: IntegerMode,
    /// 트랜잭션 어피니티 헤더 이름
    pub affinity_header: String,
    /// 연결 풀 최대 크기
    pub max_connection_pool_size: usize,
    /// 연결 획득 타임아웃
    pub connection_acquisition_timeout: Duration,
    /// HTTP 요청 타임아웃
    pub request_timeout: Duration,
    /// 연결 최대 수명
    pub max_connection_lifetime: Duration,
    /// User Agent
    pub user_agent: String,
    /// 일시정지 상태 확인 간격
    pub pause_poll_interval: Duration,
    /// 청크당 일시정지 확인 최대 횟수
    pub max_pause_polls: u32,
}

impl DriverConfig {
    /// 새 설정 생성
    pub fn new(uri: &str, auth: AuthToken) -> DriverResult<Self> {
        Ok(Self {
            address: ServerAddress::from_uri(uri)?,
            auth,
            ..Self::default()
        })
    }

    /// 빌더 시작
    pub fn builder(uri: &str, auth: AuthToken) -> DriverResult<DriverConfigBuilder> {
        let config = Self::new(uri, auth)?;
        Ok(DriverConfigBuilder { config })
    }

    /// 설정 검증
    pub fn validate(&self) -> DriverResult<()> {
        if self.fetch_size == 0 {
            return Err(DriverError::configuration("fetch_size must be positive"));
        }
        if self.low_watermark > self.high_watermark {
            return Err(DriverError::configuration(
                "low_watermark must not exceed high_watermark",
            ));
        }
        if self.max_connection_pool_size == 0 {
            return Err(DriverError::configuration(
                "max_connection_pool_size must be positive",
            ));
        }
        if self.affinity_header.is_empty() {
            return Err(DriverError::configuration("affinity_header must not be empty"));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            auth: AuthToken::default(),
            default_database: DEFAULT_DATABASE.to_string(),
            fetch_size: 1000,
            high_watermark: 700,
            low_watermark: 300,
            integer_mode: IntegerMode::default(),
            affinity_header: DEFAULT_AFFINITY_HEADER.to_string(),
            max_connection_pool_size: 100,
            connection_acquisition_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            max_connection_lifetime: Duration::from_secs(3600),
            user_agent: format!("Zeta4G-Query/{}", env!("CARGO_PKG_VERSION")),
            pause_poll_interval: Duration::from_millis(10),
            max_pause_polls: 500,
        }
    }
}

// ============================================================================
// DriverConfigBuilder - 설정 빌더
// ============================================================================

/// 드라이버 설정 빌더
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// 기본 데이터베이스 설정
    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.config.default_database = database.into();
        self
    }

    /// Fetch Size 설정
    pub fn with_fetch_size(mut self, size: usize) -> Self {
        self.config.fetch_size = size;
        self
    }

    /// 버퍼 워터마크 설정
    pub fn with_watermarks(mut self, high: usize, low: usize) -> Self {
        self.config.high_watermark = high;
        self.config.low_watermark = low;
        self
    }

    /// 정수 표현 방식 설정
    pub fn with_integer_mode(mut self, mode: IntegerMode) -> Self {
        self.config.integer_mode = mode;
        self
    }

    /// 어피니티 헤더 이름 설정
    pub fn with_affinity_header(mut self, header: impl Into<String>) -> Self {
        self.config.affinity_header = header.into();
        self
    }

    /// 연결 풀 크기 설정
    pub fn with_max_connection_pool_size(mut self, size: usize) -> Self {
        self.config.max_connection_pool_size = size;
        self
    }

    /// 연결 획득 타임아웃 설정
    pub fn with_connection_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_acquisition_timeout = timeout;
        self
    }

    /// HTTP 요청 타임아웃 설정
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// 연결 최대 수명 설정
    pub fn with_max_connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.max_connection_lifetime = lifetime;
        self
    }

    /// User Agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 일시정지 대기 설정
    pub fn with_pause_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.config.pause_poll_interval = interval;
        self.config.max_pause_polls = max_polls;
        self
    }

    /// 빌드
    pub fn build(self) -> DriverResult<DriverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_schemes() {
        assert_eq!(AuthToken::basic("neo4j", "password").scheme(), "basic");
        assert_eq!(AuthToken::bearer("token").scheme(), "bearer");
        assert_eq!(AuthToken::kerberos("ticket").scheme(), "kerberos");
        assert_eq!(AuthToken::none().scheme(), "none");
        assert_eq!(AuthToken::custom("p", "c", "r", "saml").scheme(), "saml");
    }

    #[test]
    fn test_auth_token_basic_with_realm() {
        let auth = AuthToken::basic_with_realm("neo4j", "password", "native");

        if let AuthToken::Basic { realm, .. } = auth {
            assert_eq!(realm, Some("native".to_string()));
        } else {
            panic!("Expected Basic auth");
        }
    }

    #[test]
    fn test_server_address_from_uri() {
        let addr = ServerAddress::from_uri("http://localhost:7474").unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 7474);
        assert!(!addr.secure);

        let addr = ServerAddress::from_uri("https://db.example.com/").unwrap();
        assert_eq!(addr.port, DEFAULT_HTTPS_PORT);
        assert!(addr.secure);
        assert_eq!(addr.base_url(), "https://db.example.com:7473");

        let addr = ServerAddress::from_uri("http://example.com").unwrap();
        assert_eq!(addr.port, DEFAULT_HTTP_PORT);
        assert_eq!(addr.to_string(), "example.com:7474");
    }

    #[test]
    fn test_server_address_rejects_bad_uri() {
        assert!(ServerAddress::from_uri("bolt://localhost:7687").is_err());
        assert!(ServerAddress::from_uri("http://localhost:abc").is_err());
        assert!(ServerAddress::from_uri("http://").is_err());
        assert!(ServerAddress::from_uri("http://host/db/neo4j").is_err());
    }

    #[test]
    fn test_driver_config_defaults() {
        let config = DriverConfig::new("http://localhost:7474", AuthToken::basic("neo4j", "test")).unwrap();

        assert_eq!(config.default_database, "neo4j");
        assert_eq!(config.fetch_size, 1000);
        assert_eq!((config.high_watermark, config.low_watermark), (700, 300));
        assert_eq!(config.integer_mode, IntegerMode::Lossless);
        assert_eq!(config.affinity_header, "neo4j-cluster-affinity");
        assert_eq!(config.max_connection_pool_size, 100);
        assert_eq!(config.max_pause_polls, 500);
    }

    #[test]
    fn test_driver_config_builder() {
        let config = DriverConfig::builder("http://localhost:7474", AuthToken::none())
            .unwrap()
            .with_max_connection_pool_size(50)
            .with_request_timeout(Duration::from_secs(10))
            .with_fetch_size(500)
            .with_integer_mode(IntegerMode::BigInt)
            .build()
            .unwrap();

        assert_eq!(config.max_connection_pool_size, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch_size, 500);
        assert_eq!(config.integer_mode, IntegerMode::BigInt);
    }

    #[test]
    fn test_driver_config_builder_validates() {
        let result = DriverConfig::builder("http://localhost", AuthToken::none())
            .unwrap()
            .with_watermarks(10, 20)
            .build();
        assert!(matches!(result, Err(DriverError::Configuration(_))));

        let result = DriverConfig::builder("http://localhost", AuthToken::none())
            .unwrap()
            .with_fetch_size(0)
            .build();
        assert!(result.is_err());
    }
}
