//! 이벤트 타입 -- 감지된 스트림 이벤트
//!
//! [`StreamEvent`]는 로그 라인에서 추출되고 중복 제거를 통과한 스트림 감지 결과입니다.
//! 알림 전송 이후에는 보관되지 않는 일회성 값입니다.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 감지된 스트림 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// 이벤트 고유 ID (로그 상관관계 추적용)
    pub id: String,
    /// 스트림 식별자 (이벤트 키)
    pub key: String,
    /// 이벤트가 감지된 로그 파일 경로
    pub source: PathBuf,
    /// 감지 시각
    pub detected_at: SystemTime,
}

impl StreamEvent {
    /// 새 UUID v4 ID로 이벤트를 생성합니다.
    pub fn new(key: impl Into<String>, source: impl AsRef<Path>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key: key.into(),
            source: source.as_ref().to_path_buf(),
            detected_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StreamEvent[{}] key={} source={}",
            self.id,
            self.key,
            self.source.display()
        )
    }
}
