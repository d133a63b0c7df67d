#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`rule`]: XML 규칙 정의 로딩과 타겟별 규칙 트리 해석
//! - [`scope`]: 라인 스트림을 스코프 트리로 바꾸는 오토마톤
//! - [`aggregate`]: 매칭 라인 집계와 태그 카운트
//! - [`report`]: 직렬화 리포트, 필터, 텍스트 렌더링
//! - [`summary`]: 라인 단위 경고 요약
//! - [`parser`]: 여러 로그 파일 처리
//! - [`config`]: 엔진 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! RuleLoader -> RuleSet -> RuleTreeResolver -> RuleTree
//!                                                |
//!          lines -> ScopeAutomaton -> MatchAggregator -> ScopeReport -> Report
//!                        |
//!                    SignalBus (success/failure flags)
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod parser;
pub mod report;
pub mod rule;
pub mod scope;
pub mod summary;

// --- 주요 타입 re-export ---

// 파서
pub use parser::{LogParser, LogParserBuilder, ParseOutcome};

// 설정
pub use config::EngineConfig;

// 에러
pub use error::LogParseError;

// 규칙
pub use rule::{RuleLoader, RuleSet, RuleTree, RuleTreeResolver};

// 스코프
pub use scope::{ParsedLog, ScopeAutomaton, ScopeStatus};

// 리포트
pub use report::{LineReport, MatchListReport, Report, ReportFilter, ScopeReport};

// 요약
pub use summary::{ParseSummary, ParseWarning};
