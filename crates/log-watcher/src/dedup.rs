//! 스트림 중복 제거 캐시
//!
//! [`DedupCache`]는 이벤트 키별 마지막 수락 시각을 기록하여, 윈도우 안에서
//! 반복된 감지를 억제합니다. 만료 엔트리는 별도 스윕 태스크 없이 매 `accept`
//! 호출마다 정리되므로 메모리는 최근 활성 키로만 제한됩니다.
//!
//! 확인과 갱신은 하나의 뮤텍스 구간 안에서 수행되므로, 여러 tail 세션이 동시에
//! 호출해도 윈도우당 최대 한 번만 수락됩니다.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// 기본 중복 제거 윈도우 (30초)
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(30);

/// 시간 윈도우 기반 중복 제거 캐시
#[derive(Debug)]
pub struct DedupCache {
    /// 중복 제거 윈도우
    window: Duration,
    /// 이벤트 키 -> 마지막 수락 시각
    seen: Mutex<HashMap<String, Instant>>,
}

impl DedupCache {
    /// 지정한 윈도우로 캐시를 생성합니다.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// 중복 제거 윈도우를 반환합니다.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// 이벤트 키를 처리해야 하는지 판단합니다.
    ///
    /// 처음 보는 키이거나 마지막 수락 후 윈도우가 지났으면 `true`를 반환하고
    /// 수락 시각을 갱신합니다. 그 외에는 `false` (중복)입니다.
    pub fn accept(&self, key: &str) -> bool {
        self.accept_at(key, Instant::now())
    }

    /// 주어진 시각을 "현재"로 간주하여 [`accept`](Self::accept)를 수행합니다.
    pub fn accept_at(&self, key: &str, now: Instant) -> bool {
        let mut seen = self.lock();

        let accepted = match seen.get(key) {
            Some(last) => now.saturating_duration_since(*last) > self.window,
            None => true,
        };

        if accepted {
            seen.insert(key.to_owned(), now);
        }

        // 결과와 무관하게 만료 엔트리 정리
        let window = self.window;
        seen.retain(|_, last| now.saturating_duration_since(*last) <= window);

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(streamtap_core::metrics::WATCHER_DEDUP_ENTRIES).set(seen.len() as f64);

        accepted
    }

    /// 키가 윈도우 안에서 수락된 적이 있는지 확인합니다 (상태 변경 없음).
    pub fn is_recent(&self, key: &str) -> bool {
        self.is_recent_at(key, Instant::now())
    }

    /// 주어진 시각 기준으로 [`is_recent`](Self::is_recent)를 수행합니다.
    pub fn is_recent_at(&self, key: &str, now: Instant) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|last| now.saturating_duration_since(*last) <= self.window)
    }

    /// 현재 보관 중인 키 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 보관 중인 키가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // 다른 스레드의 panic으로 poison되어도 맵 자체는 일관된 상태입니다.
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}
