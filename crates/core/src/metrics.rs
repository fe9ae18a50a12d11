//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다. recorder가 설치되지 않으면 모든 호출은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `streamtap_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! metrics::counter!(streamtap_core::metrics::WATCHER_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 알림 채널 레이블 키 (http, log)
pub const LABEL_CHANNEL: &str = "channel";

// ─── Log Watcher 메트릭 ─────────────────────────────────────────────

/// Watcher: tail 세션에서 읽은 라인 수 (counter)
pub const WATCHER_LINES_READ_TOTAL: &str = "streamtap_watcher_lines_read_total";

/// Watcher: 감지되어 중복 제거를 통과한 스트림 수 (counter)
pub const WATCHER_STREAMS_DETECTED_TOTAL: &str = "streamtap_watcher_streams_detected_total";

/// Watcher: 중복 제거 윈도우로 억제된 감지 수 (counter)
pub const WATCHER_DUPLICATES_SUPPRESSED_TOTAL: &str =
    "streamtap_watcher_duplicates_suppressed_total";

/// Watcher: 더 새로운 로그 파일로 전환한 횟수 (counter)
pub const WATCHER_ROTATIONS_TOTAL: &str = "streamtap_watcher_rotations_total";

/// Watcher: 시작된 tail 세션 수 (counter)
pub const WATCHER_TAIL_SESSIONS_TOTAL: &str = "streamtap_watcher_tail_sessions_total";

/// Watcher: 중복 제거 캐시 엔트리 수 (gauge)
pub const WATCHER_DEDUP_ENTRIES: &str = "streamtap_watcher_dedup_entries";

// ─── Notify 메트릭 ──────────────────────────────────────────────────

/// Notify: 성공한 알림 수 (counter, label: channel)
pub const NOTIFY_SENT_TOTAL: &str = "streamtap_notify_sent_total";

/// Notify: 실패한 알림 수 (counter, label: channel)
pub const NOTIFY_FAILED_TOTAL: &str = "streamtap_notify_failed_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "streamtap_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Log Watcher
    describe_counter!(
        WATCHER_LINES_READ_TOTAL,
        "Total number of complete log lines read by tail sessions"
    );
    describe_counter!(
        WATCHER_STREAMS_DETECTED_TOTAL,
        "Stream URLs detected and accepted by the dedup cache"
    );
    describe_counter!(
        WATCHER_DUPLICATES_SUPPRESSED_TOTAL,
        "Stream detections suppressed inside the dedup window"
    );
    describe_counter!(
        WATCHER_ROTATIONS_TOTAL,
        "Number of switches to a newer log file"
    );
    describe_counter!(
        WATCHER_TAIL_SESSIONS_TOTAL,
        "Number of tail sessions started"
    );
    describe_gauge!(
        WATCHER_DEDUP_ENTRIES,
        "Current number of keys held by the dedup cache"
    );

    // Notify
    describe_counter!(NOTIFY_SENT_TOTAL, "Notifications delivered successfully");
    describe_counter!(NOTIFY_FAILED_TOTAL, "Notifications that failed to deliver");

    // Daemon
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
}
