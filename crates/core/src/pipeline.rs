//! 파이프라인 trait -- 모듈 확장 포인트 정의

use std::future::Future;
use std::pin::Pin;

use crate::error::NotifyError;
use crate::event::StreamEvent;

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 감지된 스트림을 외부로 알리는 trait
///
/// dispatcher가 `Arc<dyn Notifier>`로 보관하므로 `BoxFuture`를 반환합니다.
/// 구현체는 재시도하지 않으며, 실패는 호출자가 로깅합니다.
pub trait Notifier: Send + Sync {
    /// 알림 채널 이름 (예: "http", "log")
    fn name(&self) -> &str;

    /// 이벤트 하나에 대해 알림을 한 번 전송합니다.
    fn notify<'a>(&'a self, event: &'a StreamEvent) -> BoxFuture<'a, Result<(), NotifyError>>;
}
