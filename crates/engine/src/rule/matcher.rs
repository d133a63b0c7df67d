//! 라인 매처 -- 한 라인을 패턴 리스트에 대해 평가
//!
//! [`LineMatcher`]는 상태가 없습니다. 정규식은 패턴 로딩 시 이미 컴파일되어
//! 있으므로 매칭은 순수 함수입니다.

use std::sync::Arc;

use super::pattern::{CaptureFailure, FlagSet, Variables};
use super::types::PatternList;

/// 패턴 리스트 매칭 결과
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// 매칭을 결정한 Include의 순번 (Include만 센 0 기반 인덱스)
    pub include_index: usize,
    /// 추출된 변수
    pub variables: Variables,
    /// 숫자로 해석하지 못한 캡처
    pub capture_failures: Vec<CaptureFailure>,
    /// 리스트 태그와 패턴 태그의 합집합 (선언 순서, 중복 제거)
    pub tags: Vec<String>,
    /// 리스트 플래그와 패턴 플래그의 합집합
    pub flags: FlagSet,
}

/// 라인 매처
pub struct LineMatcher;

impl LineMatcher {
    /// 라인을 하나의 패턴 리스트에 대해 평가합니다.
    ///
    /// Include를 선언 순서대로 시도해 처음 매칭된 것이 결과를 결정합니다.
    /// 같은 리스트의 Exclude가 하나라도 매칭되면 `None`을 반환합니다.
    pub fn match_line(line: &str, list: &PatternList) -> Option<MatchResult> {
        let (include_index, pattern, extraction) = list
            .includes()
            .enumerate()
            .find_map(|(idx, pattern)| pattern.extract(line).map(|ex| (idx, pattern, ex)))?;

        if list.excludes().any(|exclude| exclude.is_match(line)) {
            return None;
        }

        let mut tags = list.tags.clone();
        for tag in pattern.tags() {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        Some(MatchResult {
            include_index,
            variables: extraction.variables,
            capture_failures: extraction.failures,
            tags,
            flags: list.flags.union(pattern.flags()),
        })
    }

    /// 여러 패턴 리스트 중 선언 순서상 처음 매칭되는 리스트를 찾습니다.
    pub fn first_match(
        line: &str,
        lists: &[Arc<PatternList>],
    ) -> Option<(usize, MatchResult)> {
        lists
            .iter()
            .enumerate()
            .find_map(|(idx, list)| Self::match_line(line, list).map(|result| (idx, result)))
    }
}
