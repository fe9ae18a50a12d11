//! 로그 감시 에러 타입
//!
//! [`LogWatcherError`]는 디렉토리 스캔, 파일 tail 등 감시 루프 내부에서 발생하는
//! 에러를 표현합니다. 감시 루프는 이 에러를 로깅하고 계속 동작하므로, 상위로
//! 전파되는 것은 추출기 생성 실패뿐입니다.

use std::path::PathBuf;

/// 로그 감시 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogWatcherError {
    /// 로그 파일 열기 실패 (tail 세션 시작 불가)
    #[error("failed to open {path}: {source}")]
    Open {
        /// 열려고 한 파일 경로
        path: PathBuf,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// 로그 디렉토리 스캔 실패
    #[error("failed to scan directory {path}: {source}")]
    DirectoryScan {
        /// 스캔 대상 디렉토리
        path: PathBuf,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// tail 태스크가 비정상 종료됨 (panic 또는 abort)
    #[error("tail session {session_id} terminated abnormally: {reason}")]
    SessionJoin {
        /// 세션 ID
        session_id: String,
        /// 종료 사유
        reason: String,
    },

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}
