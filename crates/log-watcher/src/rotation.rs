//! 로그 로테이션 감시
//!
//! [`RotationWatcher`]는 로그 디렉토리를 주기적으로 스캔하여 가장 최근에 수정된
//! `output_log*.txt` 파일을 찾고, 항상 그 파일 하나만 tail 합니다.
//! 더 새로운 파일이 나타나면 이전 세션을 완전히 종료한 뒤 새 세션을 시작합니다.
//!
//! # 상태
//! - 세션 없음: 아직 로그 파일이 없음
//! - 세션 있음: 현재 최신 파일을 tail 중
//!
//! 디렉토리가 비어 있거나 스캔이 실패하면 현재 상태를 유지합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use streamtap_core::config::WatcherConfig;

use crate::error::LogWatcherError;
use crate::session::TailSession;
use crate::tail::TailConfig;

/// 로그 파일 이름 접두사
const LOG_FILE_PREFIX: &str = "output_log";

/// 로그 파일 확장자
const LOG_FILE_SUFFIX: &str = ".txt";

/// tail 세션이 읽은 라인을 받는 trait
pub trait LineHandler: Send + Sync {
    /// `source` 파일에서 읽은 라인 하나를 처리합니다.
    fn handle_line(&self, source: &Path, line: &str);
}

/// 로그 파일 후보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCandidate {
    /// 파일 경로
    pub path: PathBuf,
    /// 마지막 수정 시각
    pub modified: SystemTime,
}

impl LogCandidate {
    fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or_default()
    }

    /// `other`보다 최신인지 비교합니다.
    ///
    /// 수정 시각이 같으면 파일 이름이 사전순으로 큰 쪽을 최신으로 봅니다.
    fn is_newer_than(&self, other: &Self) -> bool {
        (self.modified, self.file_name()) > (other.modified, other.file_name())
    }
}

/// 파일 이름이 로그 파일 규칙(`output_log*.txt`, 대소문자 무시)에 맞는지 확인합니다.
pub fn is_log_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with(LOG_FILE_PREFIX) && lower.ends_with(LOG_FILE_SUFFIX)
}

/// 디렉토리에서 가장 최근에 수정된 로그 파일을 찾습니다.
///
/// 심볼릭 링크는 따라가며, 일반 파일이 아니거나 메타데이터를 읽지 못한 항목은 건너뜁니다.
/// 후보가 없으면 `Ok(None)`입니다.
pub async fn find_newest_log(dir: &Path) -> Result<Option<LogCandidate>, LogWatcherError> {
    let mut entries =
        tokio::fs::read_dir(dir)
            .await
            .map_err(|source| LogWatcherError::DirectoryScan {
                path: dir.to_path_buf(),
                source,
            })?;

    let mut newest: Option<LogCandidate> = None;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                return Err(LogWatcherError::DirectoryScan {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_log_file(name) {
            continue;
        }

        let path = entry.path();
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable log candidate");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };

        let candidate = LogCandidate { path, modified };
        if newest.as_ref().is_none_or(|n| candidate.is_newer_than(n)) {
            newest = Some(candidate);
        }
    }

    Ok(newest)
}

/// 로테이션 감시 설정
#[derive(Debug, Clone)]
pub struct RotationConfig {
    /// 감시할 로그 디렉토리
    pub log_dir: PathBuf,
    /// 디렉토리 재스캔 주기
    pub poll_interval: Duration,
    /// tail 세션 설정
    pub tail: TailConfig,
}

impl RotationConfig {
    /// core의 `WatcherConfig`에서 설정을 생성합니다.
    pub fn from_core(core: &WatcherConfig) -> Self {
        Self {
            log_dir: core.resolved_log_dir(),
            poll_interval: Duration::from_millis(core.rotation_poll_interval_ms),
            tail: TailConfig::from_core(core),
        }
    }
}

/// 로그 로테이션 감시기
///
/// 동시에 최대 하나의 tail 세션만 소유합니다.
pub struct RotationWatcher {
    config: RotationConfig,
    handler: Arc<dyn LineHandler>,
    shutdown: CancellationToken,
    current: Option<TailSession>,
}

impl RotationWatcher {
    /// 새 감시기를 생성합니다. `shutdown`이 취소되면 [`run`](Self::run)이 종료됩니다.
    pub fn new(
        config: RotationConfig,
        handler: Arc<dyn LineHandler>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            handler,
            shutdown,
            current: None,
        }
    }

    /// 현재 tail 중인 파일 경로를 반환합니다.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(TailSession::path)
    }

    /// 초기 스캔을 수행하고, 로그 파일이 있으면 tail을 시작합니다.
    pub async fn start(&mut self) {
        info!(log_dir = %self.config.log_dir.display(), "starting rotation watcher");
        self.rescan().await;
        if self.current.is_none() {
            info!(
                log_dir = %self.config.log_dir.display(),
                "no log files found yet, waiting"
            );
        }
    }

    /// 디렉토리를 한 번 스캔하고 필요하면 세션을 전환합니다.
    pub async fn rescan(&mut self) {
        let newest = match find_newest_log(&self.config.log_dir).await {
            Ok(newest) => newest,
            Err(LogWatcherError::DirectoryScan { path, source })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!(log_dir = %path.display(), "log directory does not exist yet");
                return;
            }
            Err(e) => {
                warn!(error = %e, "log directory scan failed, keeping current session");
                return;
            }
        };

        let Some(newest) = newest else {
            return;
        };

        // 종료된 세션은 같은 파일이라도 다시 시작
        if self.current.as_ref().is_some_and(TailSession::is_finished) {
            if let Some(finished) = self.current.take() {
                let path = finished.path().to_path_buf();
                if let Err(e) = finished.stop().await {
                    warn!(path = %path.display(), error = %e, "tail session ended with error");
                }
            }
        }

        if self.current_path() == Some(newest.path.as_path()) {
            return;
        }

        if let Some(old) = self.current.take() {
            info!(
                from = %old.path().display(),
                to = %newest.path.display(),
                "switching to newer log"
            );
            let old_path = old.path().to_path_buf();
            if let Err(e) = old.stop().await {
                warn!(path = %old_path.display(), error = %e, "previous tail session ended with error");
            }
            metrics::counter!(streamtap_core::metrics::WATCHER_ROTATIONS_TOTAL).increment(1);
        }

        self.start_session(newest.path).await;
    }

    async fn start_session(&mut self, path: PathBuf) {
        let handler = Arc::clone(&self.handler);
        let source = path.clone();
        let on_line = move |line: &str| handler.handle_line(&source, line);

        match TailSession::start(&path, self.config.tail.clone(), on_line).await {
            Ok(session) => {
                info!(path = %path.display(), session_id = %session.id(), "tailing newest log");
                self.current = Some(session);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to start tail session, retrying next scan");
            }
        }
    }

    /// 실행 중인 세션을 종료합니다.
    pub async fn shutdown(&mut self) {
        info!("stopping rotation watcher");
        if let Some(session) = self.current.take() {
            let path = session.path().to_path_buf();
            if let Err(e) = session.stop().await {
                warn!(path = %path.display(), error = %e, "tail session ended with error");
            }
        }
        info!("rotation watcher stopped");
    }

    /// shutdown 토큰이 취소될 때까지 감시 루프를 실행합니다.
    ///
    /// 반환 시점에는 모든 tail 세션이 종료되어 있습니다.
    pub async fn run(mut self) {
        self.start().await;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 첫 tick은 즉시 완료되므로 소비
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.rescan().await,
            }
        }

        self.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, FileTimes};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<(PathBuf, String)>>,
    }

    impl LineHandler for Recorder {
        fn handle_line(&self, source: &Path, line: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((source.to_path_buf(), line.to_owned()));
        }
    }

    fn touch(path: &Path, secs_ago: u64) {
        let time = SystemTime::now() - Duration::from_secs(secs_ago);
        File::options()
            .append(true)
            .create(true)
            .open(path)
            .unwrap()
            .set_times(FileTimes::new().set_modified(time))
            .unwrap();
    }

    fn config(dir: &Path) -> RotationConfig {
        RotationConfig {
            log_dir: dir.to_path_buf(),
            poll_interval: Duration::from_millis(20),
            tail: TailConfig {
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            },
        }
    }

    #[test]
    fn log_file_name_matching() {
        assert!(is_log_file("output_log.txt"));
        assert!(is_log_file("output_log_2024-01-15_12-00-00.txt"));
        assert!(is_log_file("OUTPUT_LOG_1.TXT"));
        assert!(!is_log_file("output.txt"));
        assert!(!is_log_file("output_log.txt.bak"));
        assert!(!is_log_file("my_output_log.txt"));
    }

    #[tokio::test]
    async fn find_newest_picks_latest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("output_log_a.txt"), 300);
        touch(&dir.path().join("output_log_b.txt"), 10);
        touch(&dir.path().join("output_log_c.txt"), 100);
        touch(&dir.path().join("unrelated.txt"), 0);

        let newest = find_newest_log(dir.path()).await.unwrap().unwrap();
        assert!(newest.path.ends_with("output_log_b.txt"));
    }

    #[tokio::test]
    async fn equal_mtime_prefers_greatest_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("output_log_1.txt"), 50);
        touch(&dir.path().join("output_log_2.txt"), 50);

        let a = find_newest_log(dir.path()).await.unwrap().unwrap();
        let b = find_newest_log(dir.path()).await.unwrap().unwrap();
        // mtime 해상도와 무관하게 결과는 결정적
        assert_eq!(a.path, b.path);
        assert!(a.path.ends_with("output_log_2.txt"));
    }

    #[tokio::test]
    async fn find_newest_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("output_log_dir.txt")).unwrap();
        assert!(find_newest_log(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_newest_in_missing_dir_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_newest_log(&dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, LogWatcherError::DirectoryScan { .. }));
    }

    #[tokio::test]
    async fn start_with_empty_dir_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        );
        watcher.start().await;
        assert!(watcher.current_path().is_none());
    }

    #[tokio::test]
    async fn missing_dir_keeps_running_without_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = RotationWatcher::new(
            config(&dir.path().join("not-yet")),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        );
        watcher.start().await;
        watcher.rescan().await;
        assert!(watcher.current_path().is_none());
    }

    #[tokio::test]
    async fn rescan_switches_to_newer_file() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("output_log_old.txt");
        touch(&old, 120);

        let mut watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        );
        watcher.start().await;
        assert_eq!(watcher.current_path(), Some(old.as_path()));

        // 같은 파일이면 세션 유지
        watcher.rescan().await;
        assert_eq!(watcher.current_path(), Some(old.as_path()));

        let new = dir.path().join("output_log_new.txt");
        touch(&new, 0);
        watcher.rescan().await;
        assert_eq!(watcher.current_path(), Some(new.as_path()));

        watcher.shutdown().await;
        assert!(watcher.current_path().is_none());
    }

    #[tokio::test]
    async fn emptied_dir_keeps_current_session() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log.txt");
        touch(&log, 0);

        let mut watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        );
        watcher.start().await;
        assert!(watcher.current_path().is_some());

        std::fs::remove_file(&log).unwrap();
        watcher.rescan().await;
        assert_eq!(watcher.current_path(), Some(log.as_path()));
        watcher.shutdown().await;
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn late_log_file_is_announced_at_info() {
        let dir = tempfile::tempdir().unwrap();
        let captured = CaptureWriter::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        );
        watcher.start().await;
        assert!(watcher.current_path().is_none());

        let late = dir.path().join("output_log_late.txt");
        touch(&late, 0);
        watcher.rescan().await;
        assert_eq!(watcher.current_path(), Some(late.as_path()));
        watcher.shutdown().await;

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let announced = output
            .lines()
            .find(|line| line.contains("tailing newest log"))
            .expect("info line for the late log file");
        assert!(announced.contains("INFO"));
        assert!(announced.contains("output_log_late.txt"));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("output_log.txt"), 0);

        let shutdown = CancellationToken::new();
        let watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::new(Recorder::default()),
            shutdown.clone(),
        );
        let task = tokio::spawn(watcher.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn lines_are_tagged_with_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("output_log.txt");
        std::fs::write(&log, "").unwrap();

        let recorder = Arc::new(Recorder::default());
        let mut watcher = RotationWatcher::new(
            config(dir.path()),
            Arc::clone(&recorder) as Arc<dyn LineHandler>,
            CancellationToken::new(),
        );
        watcher.start().await;

        let mut file = std::fs::OpenOptions::new().append(true).open(&log).unwrap();
        std::io::Write::write_all(&mut file, b"hello\n").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while recorder.lines.lock().unwrap().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        watcher.shutdown().await;

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(lines.as_slice(), &[(log.clone(), "hello".to_owned())]);
    }
}
