//! 설정 관리 -- scopelog.toml 파싱 및 런타임 설정
//!
//! [`ScopelogConfig`]는 로깅과 로그 파싱 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SCOPELOG_PARSE_TARGET=BuildCookRun` 형식)
//! 3. 설정 파일 (`scopelog.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scopelog_core::error::ScopelogError> {
//! use scopelog_core::config::ScopelogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScopelogConfig::load("scopelog.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScopelogConfig::parse("[parse]\ntarget = \"BuildCookRun\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScopelogError};
use crate::types::Severity;

/// scopelog 통합 설정
///
/// `scopelog.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopelogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 파싱 설정
    #[serde(default)]
    pub parse: ParseConfig,
}

impl ScopelogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScopelogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에 환경변수 오버라이드만 적용합니다.
    ///
    /// 파일이 존재하지만 잘못된 경우에는 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ScopelogError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(ScopelogError::Config(ConfigError::FileNotFound { .. })) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScopelogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScopelogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScopelogError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScopelogError> {
        toml::from_str(toml_str).map_err(|e| {
            ScopelogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCOPELOG_{SECTION}_{FIELD}`
    /// 예: `SCOPELOG_PARSE_RULES_PATH=/opt/rules.xml`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCOPELOG_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCOPELOG_GENERAL_LOG_FORMAT");

        // Parse
        override_string(&mut self.parse.rules_path, "SCOPELOG_PARSE_RULES_PATH");
        override_string(&mut self.parse.target, "SCOPELOG_PARSE_TARGET");
        override_string(&mut self.parse.min_severity, "SCOPELOG_PARSE_MIN_SEVERITY");
        override_csv(&mut self.parse.tags, "SCOPELOG_PARSE_TAGS");
        override_usize(&mut self.parse.min_matches, "SCOPELOG_PARSE_MIN_MATCHES");
        override_usize(&mut self.parse.max_lines, "SCOPELOG_PARSE_MAX_LINES");
        override_u64(
            &mut self.parse.max_rule_file_bytes,
            "SCOPELOG_PARSE_MAX_RULE_FILE_BYTES",
        );
        override_usize(
            &mut self.parse.max_concurrent_files,
            "SCOPELOG_PARSE_MAX_CONCURRENT_FILES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ScopelogError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.parse.target.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "parse.target".to_owned(),
                reason: "target must not be empty".to_owned(),
            }
            .into());
        }

        if let Err(reason) = self.parse.min_severity.parse::<Severity>() {
            return Err(ConfigError::InvalidValue {
                field: "parse.min_severity".to_owned(),
                reason,
            }
            .into());
        }

        if self.parse.max_rule_file_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parse.max_rule_file_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.parse.max_concurrent_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parse.max_concurrent_files".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 로그 파싱 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// 패턴 정의 XML 문서 경로
    pub rules_path: String,
    /// 사용할 타겟 이름
    pub target: String,
    /// 리포트에 표시할 최소 심각도
    pub min_severity: String,
    /// 리포트 필터 태그 (비어 있으면 전체)
    pub tags: Vec<String>,
    /// 표시할 패턴 리스트의 최소 매칭 라인 수
    pub min_matches: usize,
    /// 텍스트 출력 시 패턴 리스트당 최대 라인 수 (0 = 무제한)
    pub max_lines: usize,
    /// 규칙 파일 최대 크기 (바이트)
    pub max_rule_file_bytes: u64,
    /// 동시에 파싱할 최대 로그 파일 수
    pub max_concurrent_files: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            rules_path: "logparse_patterns.xml".to_owned(),
            target: "BuildCookRun".to_owned(),
            min_severity: "Message".to_owned(),
            tags: Vec::new(),
            min_matches: 1,
            max_lines: 20,
            max_rule_file_bytes: 10 * 1024 * 1024, // 10MB
            max_concurrent_files: 4,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split([',', ';'])
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
