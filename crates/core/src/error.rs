//! 에러 타입 -- 도메인별 에러 정의

/// streamtap 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum StreamtapError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 알림 전송 에러
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 알림 전송 에러
///
/// 알림 전송 실패는 dispatcher 경계에서 로깅되고 소비되며,
/// 로그 감시 루프로 전파되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// 요청 전송 실패 (연결, 타임아웃 등)
    #[error("request failed: {0}")]
    Request(String),

    /// 2xx가 아닌 응답
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// 알림기 구성 에러
    #[error("notifier config error: {0}")]
    Config(String),
}
