//! 알림 디스패처
//!
//! [`Dispatcher`]는 감지 이벤트마다 독립된 태스크에서 [`Notifier`]를 호출합니다.
//! 호출자는 전송 결과를 기다리지 않으며, 실패는 로깅과 메트릭으로만 남습니다.
//! 재시도는 하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info};

use streamtap_core::error::NotifyError;
use streamtap_core::event::StreamEvent;
use streamtap_core::metrics as m;
use streamtap_core::pipeline::{BoxFuture, Notifier};

/// 알림 디스패처
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    tracker: TaskTracker,
}

impl Dispatcher {
    /// 주어진 notifier로 디스패처를 생성합니다.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            tracker: TaskTracker::new(),
        }
    }

    /// 알림 채널 이름을 반환합니다.
    pub fn channel(&self) -> &str {
        self.notifier.name()
    }

    /// 이벤트 알림을 백그라운드 태스크로 보냅니다.
    ///
    /// 즉시 반환합니다. tokio 런타임 밖에서 호출되면 이벤트를 버리고 에러를 로깅합니다.
    pub fn dispatch(&self, event: StreamEvent) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(key = %event.key, error = %e, "no runtime available, dropping notification");
                return;
            }
        };

        let notifier = Arc::clone(&self.notifier);
        let span = tracing::info_span!("notify", event_id = %event.id, key = %event.key);

        self.tracker.spawn_on(
            async move {
                let channel = notifier.name().to_owned();
                match notifier.notify(&event).await {
                    Ok(()) => {
                        metrics::counter!(m::NOTIFY_SENT_TOTAL, m::LABEL_CHANNEL => channel)
                            .increment(1);
                    }
                    Err(e) => {
                        error!(channel = %channel, error = %e, "notification failed");
                        metrics::counter!(m::NOTIFY_FAILED_TOTAL, m::LABEL_CHANNEL => channel)
                            .increment(1);
                    }
                }
            }
            .instrument(span),
            &handle,
        );
    }

    /// 아직 끝나지 않은 알림 태스크 수를 반환합니다.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// 진행 중인 알림이 끝나기를 최대 `timeout`만큼 기다립니다.
    ///
    /// 모두 끝났으면 `true`를 반환합니다. 호출 후에도 `dispatch`는 계속 사용할 수 있습니다.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        finished
    }
}

/// 실제 전송 없이 이벤트를 로그로만 남기는 notifier (dry-run 용)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyNotifier;

impl Notifier for LogOnlyNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify<'a>(&'a self, event: &'a StreamEvent) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            info!(
                key = %event.key,
                source = %event.source.display(),
                "dry-run: notification skipped"
            );
            Ok(())
        })
    }
}
