#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, NotifyError, StreamtapError};

// 설정
pub use config::{GeneralConfig, MetricsConfig, NotifyConfig, StreamtapConfig, WatcherConfig};

// 이벤트
pub use event::StreamEvent;

// 파이프라인 trait
pub use pipeline::{BoxFuture, Notifier};
