//! 파일 tail 엔진
//!
//! 로그 파일을 현재 끝에서부터 따라가며, 새로 추가된 완전한 라인만 콜백으로 전달합니다.
//! `tail -f`와 유사한 동작을 고정 주기 폴링으로 구현합니다.
//!
//! # 동작 규칙
//! - 세션 시작 전에 기록된 라인은 전달하지 않음 (열자마자 EOF로 이동)
//! - 개행으로 끝나지 않은 부분 라인은 다음 폴링까지 버퍼에 보관
//! - EOF는 종료 조건이 아님 (새 데이터를 무기한 기다림)
//! - 폴링 중 읽기 에러는 로깅 후 다음 주기에 재시도
//! - 파일 크기가 읽은 위치보다 작아지면 (truncation) 처음부터 다시 읽음
//! - 취소는 폴링 사이에서만 관찰됨 (읽는 도중에 중단하지 않음)

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use streamtap_core::config::WatcherConfig;

use crate::error::LogWatcherError;

/// tail 엔진 설정
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// 폴링 주기
    pub poll_interval: Duration,
    /// 최대 라인 길이 (바이트). 초과하는 라인은 버려집니다.
    pub max_line_length: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

impl TailConfig {
    /// core의 `WatcherConfig`에서 tail 설정을 생성합니다.
    pub fn from_core(core: &WatcherConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(core.tail_poll_interval_ms),
            max_line_length: core.max_line_length,
        }
    }
}

/// 단일 파일 tail 엔진
///
/// 열린 파일 핸들 하나와 읽기 위치를 소유합니다. [`follow`](Self::follow)가
/// 어떤 경로로든 종료되면 엔진과 함께 핸들도 해제됩니다.
#[derive(Debug)]
pub struct TailEngine {
    /// 따라가는 파일 경로
    path: PathBuf,
    /// 파일 리더
    reader: BufReader<File>,
    /// 지금까지 소비한 바이트 오프셋 (부분 라인 포함)
    offset: u64,
    /// 아직 개행을 만나지 못한 부분 라인
    pending: Vec<u8>,
    /// 최대 길이를 넘은 라인의 나머지를 버리는 중인지 여부
    discarding: bool,
    /// 엔진 설정
    config: TailConfig,
}

impl TailEngine {
    /// 파일을 열고 현재 EOF로 이동합니다.
    ///
    /// 열기 또는 이동 실패는 즉시 [`LogWatcherError::Open`]으로 반환됩니다.
    pub async fn open(path: impl AsRef<Path>, config: TailConfig) -> Result<Self, LogWatcherError> {
        let path = path.as_ref().to_path_buf();

        let mut file = File::open(&path)
            .await
            .map_err(|source| LogWatcherError::Open {
                path: path.clone(),
                source,
            })?;

        let offset = file
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| LogWatcherError::Open {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), offset, "opened log file at end");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            pending: Vec::new(),
            discarding: false,
            config,
        })
    }

    /// 따라가는 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 현재 읽기 오프셋을 반환합니다.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 취소될 때까지 파일을 따라가며 각 라인을 `on_line`으로 전달합니다.
    ///
    /// 취소 시 `Ok(())`를 반환하며, 이때 파일 핸들이 닫힙니다.
    pub async fn follow<F>(
        mut self,
        mut on_line: F,
        cancel: CancellationToken,
    ) -> Result<(), LogWatcherError>
    where
        F: FnMut(&str),
    {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(path = %self.path.display(), "tail cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.poll(&mut on_line).await;
                }
            }
        }
    }

    /// 현재 읽을 수 있는 완전한 라인을 모두 읽어 전달합니다.
    ///
    /// 전달한 라인 수를 반환합니다. 부분 라인은 다음 호출까지 보관됩니다.
    pub async fn poll<F>(&mut self, on_line: &mut F) -> usize
    where
        F: FnMut(&str),
    {
        self.check_truncation().await;

        let mut emitted = 0;
        loop {
            let buf = match self.reader.fill_buf().await {
                Ok(buf) => buf,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "read error while tailing, retrying next poll"
                    );
                    break;
                }
            };
            if buf.is_empty() {
                break;
            }

            // 버퍼 단위로 소비하므로 pending은 max_line_length를 넘지 않음
            let newline = buf.iter().position(|&b| b == b'\n');
            let complete = newline.is_some();
            let take = newline.map_or(buf.len(), |i| i + 1);
            let content = &buf[..newline.unwrap_or(buf.len())];

            if self.discarding {
                self.discarding = !complete;
            } else if self.pending.len() + content.len() > self.config.max_line_length {
                warn!(
                    path = %self.path.display(),
                    length = self.pending.len() + content.len(),
                    max = self.config.max_line_length,
                    "discarding over-long log line"
                );
                self.pending.clear();
                self.pending.shrink_to_fit();
                self.discarding = !complete;
            } else {
                self.pending.extend_from_slice(content);
                if complete {
                    let text = String::from_utf8_lossy(&self.pending);
                    let line = text.trim();
                    if !line.is_empty() {
                        on_line(line);
                        emitted += 1;
                    }
                    self.pending.clear();
                }
            }

            self.reader.consume(take);
            self.offset += take as u64;
        }

        if emitted > 0 {
            metrics::counter!(streamtap_core::metrics::WATCHER_LINES_READ_TOTAL)
                .increment(emitted as u64);
        }
        emitted
    }

    /// 파일이 잘렸으면 처음부터 다시 읽도록 위치를 되돌립니다.
    async fn check_truncation(&mut self) {
        let len = match self.reader.get_ref().metadata().await {
            Ok(meta) => meta.len(),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "failed to stat tailed file");
                return;
            }
        };

        if len >= self.offset {
            return;
        }

        warn!(
            path = %self.path.display(),
            previous_offset = self.offset,
            current_len = len,
            "log file truncated, restarting from beginning"
        );

        match self.reader.seek(SeekFrom::Start(0)).await {
            Ok(_) => {
                self.offset = 0;
                self.pending.clear();
                self.discarding = false;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to rewind truncated file");
            }
        }
    }
}

/// 파일을 열고 취소될 때까지 따라갑니다.
///
/// [`TailEngine::open`] 후 [`TailEngine::follow`]를 호출하는 편의 함수입니다.
pub async fn follow<F>(
    path: impl AsRef<Path>,
    config: TailConfig,
    on_line: F,
    cancel: CancellationToken,
) -> Result<(), LogWatcherError>
where
    F: FnMut(&str),
{
    TailEngine::open(path, config)
        .await?
        .follow(on_line, cancel)
        .await
}
