//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`ParseConfig`](scopelog_core::config::ParseConfig)에서
//! 규칙 로딩과 파일 병렬 처리에 필요한 값만 추려 냅니다.
//! 리포트 필터 값은 [`ReportFilter::from_core`](crate::report::ReportFilter::from_core)가 담당합니다.
//!
//! # 사용 예시
//! ```ignore
//! use scopelog_core::config::ScopelogConfig;
//! use scopelog_engine::config::EngineConfig;
//!
//! let core_config = ScopelogConfig::default();
//! let config = EngineConfig::from_core(&core_config.parse);
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LogParseError;

/// 규칙 파일 최대 크기 기본값 (10MB)
pub const DEFAULT_MAX_RULE_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 규칙 정의 문서 경로
    pub rules_path: String,
    /// 해석할 타겟 이름
    pub target: String,
    /// 규칙 파일 최대 크기 (바이트)
    pub max_rule_file_bytes: u64,
    /// 동시에 파싱할 로그 파일 수 상한
    pub max_concurrent_files: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_path: "logparse_patterns.xml".to_owned(),
            target: "BuildCookRun".to_owned(),
            max_rule_file_bytes: DEFAULT_MAX_RULE_FILE_BYTES,
            max_concurrent_files: 4,
        }
    }
}

impl EngineConfig {
    /// core의 `ParseConfig`에서 엔진 설정을 생성합니다.
    pub fn from_core(core: &scopelog_core::config::ParseConfig) -> Self {
        Self {
            rules_path: core.rules_path.clone(),
            target: core.target.clone(),
            max_rule_file_bytes: core.max_rule_file_bytes,
            max_concurrent_files: core.max_concurrent_files,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogParseError> {
        const MAX_CONCURRENT_FILES: usize = 256;

        if self.target.trim().is_empty() {
            return Err(LogParseError::Config {
                field: "target".to_owned(),
                reason: "target name must not be empty".to_owned(),
            });
        }

        if self.max_rule_file_bytes == 0 {
            return Err(LogParseError::Config {
                field: "max_rule_file_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_concurrent_files == 0 || self.max_concurrent_files > MAX_CONCURRENT_FILES {
            return Err(LogParseError::Config {
                field: "max_concurrent_files".to_owned(),
                reason: format!("must be 1-{MAX_CONCURRENT_FILES}"),
            });
        }

        Ok(())
    }
}
