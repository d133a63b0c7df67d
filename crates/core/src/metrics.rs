//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. exporter 설치는 바이너리의 몫입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scopelog_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(scopelog_core::metrics::LINES_PROCESSED_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 스코프 종료 상태 레이블 키 (closed_success, closed_failure, closed_neutral)
pub const LABEL_STATUS: &str = "status";

/// 심각도 레이블 키 (Message, Warning, Severe_Warning, Error, Fatal)
pub const LABEL_SEVERITY: &str = "severity";

// ─── 엔진 메트릭 ───────────────────────────────────────────────────

/// 오토마톤에 입력된 전체 라인 수 (counter)
pub const LINES_PROCESSED_TOTAL: &str = "scopelog_lines_processed_total";

/// 패턴 리스트에 매칭된 라인 수 (counter, label: severity)
pub const LINES_MATCHED_TOTAL: &str = "scopelog_lines_matched_total";

/// 열린 스코프 인스턴스 수 (counter)
pub const SCOPES_OPENED_TOTAL: &str = "scopelog_scopes_opened_total";

/// 닫힌 스코프 인스턴스 수 (counter, label: status)
pub const SCOPES_CLOSED_TOTAL: &str = "scopelog_scopes_closed_total";

/// 숫자 캡처 파싱 실패 수 (counter)
pub const CAPTURE_PARSE_WARNINGS_TOTAL: &str = "scopelog_capture_parse_warnings_total";

/// 규칙 트리 해석 소요 시간 (histogram, 초)
pub const RULE_TREE_RESOLVE_DURATION_SECONDS: &str = "scopelog_rule_tree_resolve_duration_seconds";

/// 모든 메트릭의 설명을 등록합니다.
///
/// exporter 설치 직후 한 번 호출합니다.
pub fn describe_metrics() {
    describe_counter!(
        LINES_PROCESSED_TOTAL,
        "Total number of log lines fed into the scope automaton"
    );
    describe_counter!(
        LINES_MATCHED_TOTAL,
        "Total number of log lines captured by a pattern list"
    );
    describe_counter!(SCOPES_OPENED_TOTAL, "Total number of scope instances opened");
    describe_counter!(
        SCOPES_CLOSED_TOTAL,
        "Total number of scope instances closed, by terminal status"
    );
    describe_counter!(
        CAPTURE_PARSE_WARNINGS_TOTAL,
        "Numeric captures that could not be parsed and were left unset"
    );
    describe_histogram!(
        RULE_TREE_RESOLVE_DURATION_SECONDS,
        "Time spent expanding a target into its rule tree"
    );
}
