//! 스트림 URL 추출기 -- 로그 라인에서 스트림 키를 추출합니다.
//!
//! [`StreamUrlExtractor`]는 URL 해석 로그 라인(`Resolving URL '...'`,
//! `Attempting to resolve URL "..."`)에서 `vrcdn.live` 스트림 식별자를 꺼냅니다.
//!
//! # 추출 규칙
//! 1. 대소문자 무시, 두 가지 문구 중 하나 뒤에 작은/큰따옴표로 감싼 URL
//! 2. URL host에 `vrcdn.live`가 포함되어야 함 (대소문자 무시)
//! 3. path를 `/`로 나눠 비어 있지 않은 마지막 세그먼트 선택
//! 4. `.live.ts` 접미사 제거
//!
//! 형식이 맞지 않는 입력은 에러가 아니라 `None`입니다.

use regex::Regex;
use url::Url;

use crate::error::LogWatcherError;

/// URL 해석 문구 + 따옴표로 감싼 URL
const RESOLVE_URL_PATTERN: &str =
    r#"(?i)(?:attempting\s+to\s+resolve|resolving)\s+url\s+['"]([^'"]+)['"]"#;

/// 스트림 CDN host 식별 문자열
const STREAM_CDN_HOST: &str = "vrcdn.live";

/// 스트림 세그먼트 접미사
const LIVE_SEGMENT_SUFFIX: &str = ".live.ts";

/// 다른 벤더 URL 식별 문자열 (로그 메시지만 남김)
const OTHER_VENDOR_MARKER: &str = "vr-m.net";

/// 스트림 URL 추출기
///
/// 정규식은 생성 시 한 번만 컴파일되며, 이후 `extract`는 순수 함수처럼 동작합니다.
#[derive(Debug, Clone)]
pub struct StreamUrlExtractor {
    pattern: Regex,
}

impl StreamUrlExtractor {
    /// 새 추출기를 생성합니다.
    pub fn new() -> Result<Self, LogWatcherError> {
        Ok(Self {
            pattern: Regex::new(RESOLVE_URL_PATTERN)?,
        })
    }

    /// 로그 라인에서 스트림 키를 추출합니다.
    ///
    /// 매칭되지 않으면 `None`을 반환합니다.
    pub fn extract(&self, line: &str) -> Option<String> {
        let raw_url = self.pattern.captures(line)?.get(1)?.as_str();

        if raw_url.contains(OTHER_VENDOR_MARKER) {
            tracing::debug!(url = raw_url, "resolved URL points at another vendor");
        }

        let url = Url::parse(raw_url).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        if !host.contains(STREAM_CDN_HOST) {
            return None;
        }

        let segment = url.path().split('/').rev().find(|s| !s.is_empty())?;
        let key = segment.strip_suffix(LIVE_SEGMENT_SUFFIX).unwrap_or(segment);

        if key.is_empty() {
            return None;
        }

        Some(key.to_owned())
    }
}
