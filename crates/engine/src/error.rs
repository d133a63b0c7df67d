//! 로그 파싱 엔진 에러 타입
//!
//! [`LogParseError`]는 규칙 정의 로딩, 트리 해석, 로그 파일 입출력에서 발생하는
//! 모든 치명적 에러를 표현합니다. 라인 단위의 문제(숫자 캡처 파싱 실패, 닫히지 않은 스코프)는
//! 에러가 아니라 [`ParseWarning`](crate::summary::ParseWarning)으로 요약에 모입니다.
//!
//! `From<LogParseError> for ScopelogError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use scopelog_core::error::{ConfigError, ScopelogError};

/// 로그 파싱 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogParseError {
    /// 규칙 정의 문서 로딩 실패 (XML 문법, 스키마 위반, 파일 크기 등)
    #[error("definition load error: {path}: {reason}")]
    DefinitionLoad {
        /// 문서 출처 (파일 경로 또는 식별자)
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 패턴 컴파일 실패
    #[error("pattern compile error in {owner}: '{pattern}': {reason}")]
    PatternCompile {
        /// 패턴을 소유한 요소 (예: "pattern list 'MSVC Errors'")
        owner: String,
        /// 패턴 원문
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// Link 순환 참조
    #[error("cyclic template reference: {chain}")]
    CyclicReference {
        /// 순환 경로 (예: "BuildCookRun -> A -> B -> A")
        chain: String,
    },

    /// 존재하지 않는 템플릿 참조
    #[error("unknown template '{name}' referenced from '{referenced_from}'")]
    UnknownTemplate {
        /// 참조된 템플릿 이름
        name: String,
        /// 참조한 템플릿/타겟/스코프 이름
        referenced_from: String,
    },

    /// 존재하지 않는 타겟
    #[error("unknown target '{name}'")]
    UnknownTarget {
        /// 요청된 타겟 이름
        name: String,
    },

    /// 해석된 트리에 패턴이 하나도 없음
    #[error("target '{target}' resolves to a rule tree without any patterns")]
    EmptyRuleTree {
        /// 타겟 이름
        target: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogParseError {
    /// 로그 처리 시작 전에 실행을 중단시키는 로딩 단계 에러인지 여부
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::DefinitionLoad { .. }
                | Self::PatternCompile { .. }
                | Self::CyclicReference { .. }
                | Self::UnknownTemplate { .. }
                | Self::UnknownTarget { .. }
                | Self::EmptyRuleTree { .. }
        )
    }
}

impl From<LogParseError> for ScopelogError {
    fn from(err: LogParseError) -> Self {
        match err {
            LogParseError::Io(e) => ScopelogError::Io(e),
            LogParseError::Config { field, reason } => {
                ScopelogError::Config(ConfigError::InvalidValue { field, reason })
            }
            other if other.is_load_error() => ScopelogError::Definition(other.to_string()),
            other => ScopelogError::Parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_compile_error_names_owner_and_pattern() {
        let err = LogParseError::PatternCompile {
            owner: "pattern list 'MSVC Errors'".to_owned(),
            pattern: "error (C|LNK".to_owned(),
            reason: "unclosed group".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("MSVC Errors"));
        assert!(msg.contains("error (C|LNK"));
        assert!(msg.contains("unclosed group"));
    }

    #[test]
    fn cyclic_reference_display_shows_chain() {
        let err = LogParseError::CyclicReference {
            chain: "BuildCookRun -> A -> B -> A".to_owned(),
        };
        assert!(err.to_string().contains("A -> B -> A"));
    }

    #[test]
    fn load_errors_are_classified() {
        assert!(
            LogParseError::UnknownTemplate {
                name: "MSVC".to_owned(),
                referenced_from: "Build".to_owned(),
            }
            .is_load_error()
        );
        assert!(
            LogParseError::EmptyRuleTree {
                target: "Empty".to_owned()
            }
            .is_load_error()
        );
        assert!(!LogParseError::Io(std::io::Error::other("boom")).is_load_error());
        assert!(
            !LogParseError::Config {
                field: "target".to_owned(),
                reason: "empty".to_owned(),
            }
            .is_load_error()
        );
    }

    #[test]
    fn converts_to_scopelog_error() {
        let err: ScopelogError = LogParseError::UnknownTarget {
            name: "Missing".to_owned(),
        }
        .into();
        assert!(matches!(err, ScopelogError::Definition(_)));
        assert!(err.to_string().contains("Missing"));

        let err: ScopelogError = LogParseError::Config {
            field: "max_concurrent_files".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, ScopelogError::Config(_)));

        let err: ScopelogError = LogParseError::Io(std::io::Error::other("disk")).into();
        assert!(matches!(err, ScopelogError::Io(_)));
    }
}
