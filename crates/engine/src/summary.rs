//! 파싱 요약 -- 라인 단위 경고의 집계
//!
//! 숫자 캡처 파싱 실패나 닫히지 않은 스코프는 실행을 중단시키지 않습니다.
//! 발생할 때마다 출력하는 대신 [`ParseSummary`]에 모아 두었다가
//! 실행이 끝날 때 한 번 로그로 남깁니다.

use std::collections::BTreeMap;

use serde::Serialize;

use scopelog_core::types::Severity;

use crate::rule::pattern::CaptureFailure;

/// 라인 단위 경고
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// 숫자 캡처를 해석하지 못해 변수가 비어 있음
    CaptureParse {
        /// 라인을 가져간 패턴 리스트 (또는 Start/End 마커의 스코프)
        owner: String,
        /// 변수 이름
        variable: String,
        /// 발생 횟수
        occurrences: u64,
        /// 처음 발생한 라인 번호
        first_line_nr: usize,
        /// 처음 발생한 캡처 원문
        first_value: String,
    },
    /// 입력이 끝날 때까지 열려 있던 스코프 (중립으로 강제 종료됨)
    UnterminatedScope {
        /// 정규화된 스코프 이름
        scope: String,
        /// 시작 마커의 라인 번호
        start_line_nr: Option<usize>,
    },
}

/// 로그 하나의 파싱 요약
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseSummary {
    /// 원본 로그 식별자
    pub source_id: String,
    /// 처리한 라인 수
    pub lines_processed: u64,
    /// 패턴 리스트에 매칭된 라인 수
    pub lines_matched: u64,
    /// 열린 스코프 인스턴스 수
    pub scopes_opened: u64,
    /// 심각도별 매칭 수
    pub severity_counts: BTreeMap<Severity, u64>,
    /// 문서 전체 태그별 발생 수
    pub tag_counts: BTreeMap<String, u64>,
    /// 숫자 캡처 파싱 실패 수
    pub capture_warnings: u64,
    /// 입력 종료 시 열려 있던 스코프
    pub unterminated_scopes: Vec<String>,
    /// 듣는 스코프가 없어 버려진 이름 있는 플래그 수
    pub unclaimed_flags: u64,
    /// 집계된 경고
    pub warnings: Vec<ParseWarning>,
}

impl ParseSummary {
    /// 빈 요약을 생성합니다.
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Self::default()
        }
    }

    /// 숫자 캡처 실패를 기록합니다. 같은 소유자/변수 조합은 하나로 합칩니다.
    pub fn record_capture_failure(&mut self, owner: &str, failure: &CaptureFailure, line_nr: usize) {
        self.capture_warnings += 1;

        for warning in &mut self.warnings {
            if let ParseWarning::CaptureParse {
                owner: o,
                variable,
                occurrences,
                ..
            } = warning
                && o.as_str() == owner
                && *variable == failure.variable
            {
                *occurrences += 1;
                return;
            }
        }

        self.warnings.push(ParseWarning::CaptureParse {
            owner: owner.to_owned(),
            variable: failure.variable.clone(),
            occurrences: 1,
            first_line_nr: line_nr,
            first_value: failure.value.clone(),
        });
    }

    /// 닫히지 않은 스코프를 기록합니다.
    pub fn record_unterminated(&mut self, scope: &str, start_line_nr: Option<usize>) {
        self.unterminated_scopes.push(scope.to_owned());
        self.warnings.push(ParseWarning::UnterminatedScope {
            scope: scope.to_owned(),
            start_line_nr,
        });
    }

    /// 매칭된 라인 하나를 심각도별로 셉니다.
    pub fn count_match(&mut self, severity: Severity) {
        self.lines_matched += 1;
        *self.severity_counts.entry(severity).or_insert(0) += 1;
    }

    /// 해당 심각도로 매칭된 라인 수
    pub fn severity_count(&self, severity: Severity) -> u64 {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// 경고가 있는지 여부
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 실행 종료 시 집계된 캡처 경고를 한 번 로그로 남깁니다.
    pub(crate) fn log_capture_warnings(&self) {
        for warning in &self.warnings {
            if let ParseWarning::CaptureParse {
                owner,
                variable,
                occurrences,
                first_line_nr,
                first_value,
            } = warning
            {
                tracing::warn!(
                    source_id = %self.source_id,
                    owner = %owner,
                    variable = %variable,
                    occurrences,
                    first_line_nr,
                    first_value = %first_value,
                    "numeric capture could not be parsed, variable left unset"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(variable: &str, value: &str) -> CaptureFailure {
        CaptureFailure {
            variable: variable.to_owned(),
            value: value.to_owned(),
        }
    }

    #[test]
    fn capture_failures_are_aggregated_per_owner_and_variable() {
        let mut summary = ParseSummary::new("Build.log");
        summary.record_capture_failure("Cook Stats", &failure("secs", "n/a"), 4);
        summary.record_capture_failure("Cook Stats", &failure("secs", "??"), 9);
        summary.record_capture_failure("Cook Stats", &failure("count", "x"), 12);

        assert_eq!(summary.capture_warnings, 3);
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(
            summary.warnings[0],
            ParseWarning::CaptureParse {
                owner: "Cook Stats".to_owned(),
                variable: "secs".to_owned(),
                occurrences: 2,
                first_line_nr: 4,
                first_value: "n/a".to_owned(),
            }
        );
    }

    #[test]
    fn unterminated_scope_is_listed() {
        let mut summary = ParseSummary::new("Cook.log");
        summary.record_unterminated("BuildCookRun.Cook", Some(7));
        assert_eq!(summary.unterminated_scopes, vec!["BuildCookRun.Cook"]);
        assert!(summary.has_warnings());
    }

    #[test]
    fn severity_counts_accumulate() {
        let mut summary = ParseSummary::default();
        summary.count_match(Severity::Error);
        summary.count_match(Severity::Error);
        summary.count_match(Severity::Warning);
        assert_eq!(summary.lines_matched, 3);
        assert_eq!(summary.severity_count(Severity::Error), 2);
        assert_eq!(summary.severity_count(Severity::Fatal), 0);
    }

    #[test]
    fn summary_serializes_severity_keys_by_name() {
        let mut summary = ParseSummary::new("a.log");
        summary.count_match(Severity::SevereWarning);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["severity_counts"]["Severe_Warning"], 1);
    }
}
