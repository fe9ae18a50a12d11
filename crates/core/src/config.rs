//! 설정 관리 -- streamtap.toml 파싱 및 런타임 설정
//!
//! [`StreamtapConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`STREAMTAP_WATCHER_LOG_DIR=/path` 형식)
//! 3. 설정 파일 (`streamtap.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), streamtap_core::error::StreamtapError> {
//! use streamtap_core::config::StreamtapConfig;
//!
//! // 파일이 없으면 기본값 + 환경변수 오버라이드
//! let config = StreamtapConfig::load_or_default("streamtap.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = StreamtapConfig::parse("[watcher]\ndedup_window_secs = 60")?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, StreamtapError};

/// 로그 디렉토리 기본 상대 경로 (사용자 프로필 기준)
const DEFAULT_RELATIVE_LOG_DIR: [&str; 4] = ["AppData", "LocalLow", "VRChat", "VRChat"];

/// 기본 알림 엔드포인트
pub const DEFAULT_NOTIFY_ENDPOINT: &str = "https://api.dvr.vrc.bz/record";

/// streamtap 통합 설정
///
/// `streamtap.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamtapConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 감시 설정
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// 알림 설정
    #[serde(default)]
    pub notify: NotifyConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl StreamtapConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StreamtapError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 있으면 로드하고, 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    ///
    /// 설정 파일은 선택 사항이므로 파일 부재는 에러가 아닙니다.
    /// 파일이 존재하지만 파싱에 실패하면 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, StreamtapError> {
        let config = Self::read_or_default(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일(없으면 기본값)에 환경변수 오버라이드를 적용하되 검증은 하지 않습니다.
    ///
    /// CLI 오버라이드를 더 적용한 뒤 호출자가 직접 [`validate`](Self::validate)를 호출합니다.
    pub async fn read_or_default(path: impl AsRef<Path>) -> Result<Self, StreamtapError> {
        let path = path.as_ref();
        let mut config = match tokio::fs::try_exists(path).await {
            Ok(true) => Self::from_file(path).await?,
            _ => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StreamtapError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StreamtapError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                StreamtapError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, StreamtapError> {
        toml::from_str(toml_str).map_err(|e| {
            StreamtapError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `STREAMTAP_{SECTION}_{FIELD}`
    /// 예: `STREAMTAP_WATCHER_DEDUP_WINDOW_SECS=60`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "STREAMTAP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "STREAMTAP_GENERAL_LOG_FORMAT");

        // Watcher
        override_string(&mut self.watcher.log_dir, "STREAMTAP_WATCHER_LOG_DIR");
        override_u64(
            &mut self.watcher.tail_poll_interval_ms,
            "STREAMTAP_WATCHER_TAIL_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.watcher.rotation_poll_interval_ms,
            "STREAMTAP_WATCHER_ROTATION_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut self.watcher.dedup_window_secs,
            "STREAMTAP_WATCHER_DEDUP_WINDOW_SECS",
        );
        override_usize(
            &mut self.watcher.max_line_length,
            "STREAMTAP_WATCHER_MAX_LINE_LENGTH",
        );

        // Notify
        override_bool(&mut self.notify.enabled, "STREAMTAP_NOTIFY_ENABLED");
        override_string(&mut self.notify.endpoint, "STREAMTAP_NOTIFY_ENDPOINT");
        override_u64(&mut self.notify.timeout_secs, "STREAMTAP_NOTIFY_TIMEOUT_SECS");

        // Metrics
        override_bool(&mut self.metrics.enabled, "STREAMTAP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "STREAMTAP_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "STREAMTAP_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), StreamtapError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.watcher.validate()?;

        if self.notify.enabled {
            let endpoint = self.notify.endpoint.as_str();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "notify.endpoint".to_owned(),
                    reason: "must be an http:// or https:// URL when notify is enabled".to_owned(),
                }
                .into());
            }

            if self.notify.timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "notify.timeout_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "must be greater than 0 when metrics is enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 로그 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 감시할 로그 디렉토리. 비어 있으면 [`default_log_dir`]를 사용합니다.
    pub log_dir: String,
    /// tail 폴링 주기 (밀리초)
    pub tail_poll_interval_ms: u64,
    /// 디렉토리 재스캔 주기 (밀리초)
    pub rotation_poll_interval_ms: u64,
    /// 중복 제거 윈도우 (초)
    pub dedup_window_secs: u64,
    /// 버퍼링할 수 있는 최대 라인 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            log_dir: String::new(),
            tail_poll_interval_ms: 1000,
            rotation_poll_interval_ms: 2000,
            dedup_window_secs: 30,
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

impl WatcherConfig {
    /// 실제로 감시할 디렉토리를 반환합니다.
    pub fn resolved_log_dir(&self) -> PathBuf {
        if self.log_dir.trim().is_empty() {
            default_log_dir()
        } else {
            PathBuf::from(&self.log_dir)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        const MAX_POLL_INTERVAL_MS: u64 = 60_000;

        for (field, value) in [
            ("watcher.tail_poll_interval_ms", self.tail_poll_interval_ms),
            (
                "watcher.rotation_poll_interval_ms",
                self.rotation_poll_interval_ms,
            ),
        ] {
            if value == 0 || value > MAX_POLL_INTERVAL_MS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("must be 1-{}", MAX_POLL_INTERVAL_MS),
                });
            }
        }

        if self.dedup_window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watcher.dedup_window_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_line_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "watcher.max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 활성화 여부. 비활성화 시 감지된 스트림은 로그로만 남습니다.
    pub enabled: bool,
    /// 알림을 POST할 엔드포인트
    pub endpoint: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_NOTIFY_ENDPOINT.to_owned(),
            timeout_secs: 10,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

/// 기본 로그 디렉토리를 반환합니다.
///
/// `USERPROFILE`, `HOME` 순으로 사용자 디렉토리를 찾고, 둘 다 없으면 현재 디렉토리를 사용합니다.
pub fn default_log_dir() -> PathBuf {
    let profile = std::env::var("USERPROFILE")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("HOME").ok().filter(|v| !v.is_empty()));

    match profile {
        Some(home) => DEFAULT_RELATIVE_LOG_DIR
            .iter()
            .fold(PathBuf::from(home), |path, part| path.join(part)),
        None => PathBuf::from("."),
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
