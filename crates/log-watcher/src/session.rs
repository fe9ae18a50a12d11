//! tail 세션 -- 로그 파일 하나를 따라가는 백그라운드 태스크
//!
//! [`TailSession`]은 [`TailEngine`]을 별도 태스크로 실행하고, 자신만의
//! [`CancellationToken`]을 소유합니다. 세션마다 새 토큰을 쓰므로 이전 세션의
//! 취소가 다음 세션에 영향을 주지 않습니다.

use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::LogWatcherError;
use crate::tail::{TailConfig, TailEngine};

/// 실행 중인 tail 세션
#[derive(Debug)]
pub struct TailSession {
    id: String,
    path: PathBuf,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), LogWatcherError>>,
}

impl TailSession {
    /// 파일을 열고 tail 태스크를 시작합니다.
    ///
    /// 파일 열기는 태스크 생성 전에 수행되므로, 열기 실패는 여기서 바로 반환됩니다.
    pub async fn start<F>(
        path: impl AsRef<Path>,
        config: TailConfig,
        on_line: F,
    ) -> Result<Self, LogWatcherError>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let engine = TailEngine::open(&path, config).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let span = tracing::info_span!("tail", session_id = %id, path = %path.display());

        let handle = tokio::spawn(engine.follow(on_line, cancel.clone()).instrument(span));

        metrics::counter!(streamtap_core::metrics::WATCHER_TAIL_SESSIONS_TOTAL).increment(1);
        tracing::debug!(session_id = %id, path = %path.display(), "tail session started");

        Ok(Self {
            id,
            path,
            cancel,
            handle,
        })
    }

    /// 세션 ID를 반환합니다.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 따라가는 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 태스크가 이미 종료되었는지 확인합니다.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 세션을 취소하고 태스크가 끝날 때까지 기다립니다.
    ///
    /// 반환 시점에는 파일 핸들이 닫혀 있고 더 이상 라인이 전달되지 않습니다.
    pub async fn stop(self) -> Result<(), LogWatcherError> {
        self.cancel.cancel();
        match self.handle.await {
            Ok(result) => {
                tracing::debug!(session_id = %self.id, "tail session stopped");
                result
            }
            Err(e) => Err(LogWatcherError::SessionJoin {
                session_id: self.id,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn fast_config() -> TailConfig {
        TailConfig {
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TailSession::start(dir.path().join("nope.txt"), fast_config(), |_| {}).await;
        assert!(matches!(result, Err(LogWatcherError::Open { .. })));
    }

    #[tokio::test]
    async fn delivers_lines_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_log_a.txt");
        std::fs::write(&path, "old line\n").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let session = TailSession::start(&path, fast_config(), move |line| {
            let _ = tx.send(line.to_owned());
        })
        .await
        .unwrap();

        assert_eq!(session.path(), path.as_path());
        assert!(!session.id().is_empty());
        assert!(!session.is_finished());

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "new line").unwrap();

        let line = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line, "new line");

        session.stop().await.unwrap();

        // 세션 종료 후에는 송신자가 drop 되어 채널이 닫힘
        writeln!(file, "after stop").unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn sessions_have_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_log.txt");
        std::fs::write(&path, "").unwrap();

        let a = TailSession::start(&path, fast_config(), |_| {}).await.unwrap();
        let b = TailSession::start(&path, fast_config(), |_| {}).await.unwrap();
        assert_ne!(a.id(), b.id());

        a.stop().await.unwrap();
        // 첫 세션의 취소는 두 번째 세션에 영향 없음
        assert!(!b.is_finished());
        b.stop().await.unwrap();
    }
}
