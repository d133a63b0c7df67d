//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 규칙 정의, 매칭 결과, 리포트가 공유하는 심각도 타입을 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 로그 라인 분류의 심각도를 나타냅니다. Unreal 자체의 verbosity와 1:1 대응하지 않으며,
/// 패턴 정의 문서에서 선언한 값만 사용합니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Message < Warning < SevereWarning < Error < Fatal`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 일반 메시지 (기본값)
    #[default]
    Message,
    /// 경고
    Warning,
    /// 심각한 경고
    #[serde(rename = "Severe_Warning")]
    SevereWarning,
    /// 에러
    Error,
    /// 치명적 에러
    Fatal,
}

impl Severity {
    /// 모든 심각도를 낮은 순서대로 반환합니다.
    pub fn all() -> &'static [Severity] {
        &[
            Self::Message,
            Self::Warning,
            Self::SevereWarning,
            Self::Error,
            Self::Fatal,
        ]
    }

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며 `Severe_Warning`, `SevereWarning`, `severe-warning`을 모두 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "message" | "msg" | "display" => Some(Self::Message),
            "warning" | "warn" => Some(Self::Warning),
            "severewarning" => Some(Self::SevereWarning),
            "error" | "err" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// 리포트와 문서에서 사용하는 정규 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "Message",
            Self::Warning => "Warning",
            Self::SevereWarning => "Severe_Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// 빌드 실패로 간주되는 심각도인지 여부
    pub fn is_error(&self) -> bool {
        *self >= Self::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| {
            format!(
                "unknown severity '{s}' (expected one of: {})",
                Self::all()
                    .iter()
                    .map(Severity::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}
