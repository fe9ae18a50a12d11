//! 스트림 감지기
//!
//! tail 세션이 읽은 라인을 받아 추출 -> 중복 제거 -> 알림 순서로 처리합니다.
//! [`LineHandler`]를 구현하므로 [`RotationWatcher`](crate::rotation::RotationWatcher)에
//! 그대로 연결할 수 있습니다.

use std::path::Path;
use std::sync::Arc;

use streamtap_core::event::StreamEvent;
use streamtap_core::metrics as m;

use crate::dedup::DedupCache;
use crate::dispatch::Dispatcher;
use crate::extractor::StreamUrlExtractor;
use crate::rotation::LineHandler;

/// 로그 라인 기반 스트림 감지기
pub struct StreamDetector {
    extractor: StreamUrlExtractor,
    dedup: Arc<DedupCache>,
    dispatcher: Dispatcher,
}

impl StreamDetector {
    /// 새 감지기를 생성합니다.
    ///
    /// 중복 제거 캐시는 모든 tail 세션이 공유하도록 `Arc`로 받습니다.
    pub fn new(extractor: StreamUrlExtractor, dedup: Arc<DedupCache>, dispatcher: Dispatcher) -> Self {
        Self {
            extractor,
            dedup,
            dispatcher,
        }
    }

    /// 디스패처를 반환합니다.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 라인 하나를 처리합니다.
    ///
    /// 새 스트림이 감지되어 알림이 예약되면 해당 이벤트를 반환합니다.
    /// 매칭되지 않거나 윈도우 안의 중복이면 `None`입니다.
    pub fn process_line(&self, source: &Path, line: &str) -> Option<StreamEvent> {
        let key = self.extractor.extract(line)?;

        if !self.dedup.accept(&key) {
            tracing::debug!(key = %key, "duplicate stream suppressed");
            metrics::counter!(m::WATCHER_DUPLICATES_SUPPRESSED_TOTAL).increment(1);
            return None;
        }

        let event = StreamEvent::new(key, source);
        tracing::info!(
            event_id = %event.id,
            key = %event.key,
            source = %source.display(),
            "VRCDN stream detected"
        );
        metrics::counter!(m::WATCHER_STREAMS_DETECTED_TOTAL).increment(1);

        self.dispatcher.dispatch(event.clone());
        Some(event)
    }
}

impl LineHandler for StreamDetector {
    fn handle_line(&self, source: &Path, line: &str) {
        self.process_line(source, line);
    }
}
