#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`extractor`]: 로그 라인에서 `vrcdn.live` 스트림 키 추출
//! - [`dedup`]: 시간 윈도우 기반 중복 제거 캐시
//! - [`tail`]: 단일 파일 폴링 tail 엔진
//! - [`session`]: tail 엔진을 실행하는 취소 가능한 백그라운드 세션
//! - [`rotation`]: 최신 로그 파일 선택 및 세션 전환
//! - [`detector`]: 추출 -> 중복 제거 -> 알림 연결
//! - [`dispatch`]: 비동기 알림 디스패처
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! RotationWatcher -> TailSession -> StreamDetector -> Dispatcher -> Notifier
//!       |                |               |                |
//!  newest mtime      poll + EOF     extract + dedup   spawned task
//! ```

pub mod dedup;
pub mod detector;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod rotation;
pub mod session;
pub mod tail;

// --- 주요 타입 re-export ---

// 에러
pub use error::LogWatcherError;

// 추출 / 중복 제거
pub use dedup::{DEFAULT_DEDUP_WINDOW, DedupCache};
pub use extractor::StreamUrlExtractor;

// tail
pub use session::TailSession;
pub use tail::{TailConfig, TailEngine, follow};

// 로테이션
pub use rotation::{LineHandler, LogCandidate, RotationConfig, RotationWatcher, find_newest_log};

// 감지 / 알림
pub use detector::StreamDetector;
pub use dispatch::{Dispatcher, LogOnlyNotifier};
