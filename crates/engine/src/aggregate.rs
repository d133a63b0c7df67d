//! 매치 집계 -- 동일 라인 중복 제거와 태그 카운트
//!
//! [`MatchAggregator`]는 스코프 인스턴스 하나의 패턴 리스트 하나에 대응합니다.
//! 텍스트가 정확히 같은 라인은 하나의 [`MatchedLine`]으로 합쳐지며,
//! 처음 본 라인 번호를 유지하고 발생 횟수만 증가합니다.
//! 집계 범위는 패턴 리스트 인스턴스 단위이며 문서 전체가 아닙니다.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use scopelog_core::types::Severity;

use crate::rule::Variables;

/// 집계된 매칭 라인
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedLine {
    /// 라인 텍스트 (줄바꿈 제거)
    pub text: String,
    /// 처음 본 라인 번호 (0 기반)
    pub line_nr: usize,
    /// 발생 횟수
    pub occurrences: u64,
    /// 심각도
    pub severity: Severity,
    /// 태그 합집합
    pub tags: BTreeSet<String>,
    /// 추출 변수 (같은 이름은 마지막 값)
    pub variables: Variables,
    /// 원본 로그 식별자
    pub source_file: Arc<str>,
}

/// 한 번의 매칭 기록
#[derive(Debug, Clone)]
pub struct LineHit<'a> {
    pub text: &'a str,
    pub line_nr: usize,
    pub severity: Severity,
    pub tags: &'a [String],
    pub variables: Variables,
}

impl MatchedLine {
    /// 단일 매칭 기록에서 새 라인을 만듭니다.
    pub fn from_hit(hit: LineHit<'_>, source_file: &Arc<str>) -> Self {
        Self {
            text: hit.text.to_owned(),
            line_nr: hit.line_nr,
            occurrences: 1,
            severity: hit.severity,
            tags: hit.tags.iter().cloned().collect(),
            variables: hit.variables,
            source_file: Arc::clone(source_file),
        }
    }
}

/// 패턴 리스트 인스턴스 단위 집계기
#[derive(Debug, Clone, Default)]
pub struct MatchAggregator {
    lines: Vec<MatchedLine>,
    index: HashMap<String, usize>,
}

impl MatchAggregator {
    /// 빈 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 매칭 라인을 기록합니다.
    ///
    /// 문서 전체 태그 카운터는 중복 여부와 관계없이 발생마다 증가합니다.
    /// 새로운 텍스트였으면 `true`를 반환합니다.
    pub fn record(
        &mut self,
        hit: LineHit<'_>,
        source_file: &Arc<str>,
        tag_counter: &mut TagCounter,
    ) -> bool {
        tag_counter.add(hit.tags);

        if let Some(&idx) = self.index.get(hit.text) {
            let existing = &mut self.lines[idx];
            existing.occurrences += 1;
            existing.tags.extend(hit.tags.iter().cloned());
            existing.variables.merge(hit.variables);
            return false;
        }

        self.index.insert(hit.text.to_owned(), self.lines.len());
        self.lines.push(MatchedLine::from_hit(hit, source_file));
        true
    }

    /// 처음 본 순서대로의 라인
    pub fn lines(&self) -> &[MatchedLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<MatchedLine> {
        self.lines
    }

    /// 서로 다른 라인 수
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 전체 발생 횟수
    pub fn total_occurrences(&self) -> u64 {
        self.lines.iter().map(|l| l.occurrences).sum()
    }
}

/// 문서 전체 태그별 발생 횟수
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounter {
    counts: BTreeMap<String, u64>,
}

impl TagCounter {
    /// 태그마다 발생 횟수를 1 증가시킵니다.
    pub fn add<'t>(&mut self, tags: impl IntoIterator<Item = &'t String>) {
        for tag in tags {
            *self.counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    /// 태그의 발생 횟수
    pub fn get(&self, tag: &str) -> u64 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, u64> {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit<'a>(text: &'a str, line_nr: usize, tags: &'a [String]) -> LineHit<'a> {
        LineHit {
            text,
            line_nr,
            severity: Severity::Warning,
            tags,
            variables: Variables::default(),
        }
    }

    #[test]
    fn identical_text_is_deduplicated() {
        let source: Arc<str> = Arc::from("Build.log");
        let mut agg = MatchAggregator::new();
        let mut counter = TagCounter::default();

        assert!(agg.record(hit("warning C4996", 10, &[]), &source, &mut counter));
        assert!(!agg.record(hit("warning C4996", 25, &[]), &source, &mut counter));

        assert_eq!(agg.len(), 1);
        let line = &agg.lines()[0];
        assert_eq!(line.occurrences, 2);
        assert_eq!(line.line_nr, 10);
        assert_eq!(&*line.source_file, "Build.log");
    }

    #[test]
    fn different_text_keeps_first_seen_order() {
        let source: Arc<str> = Arc::from("log");
        let mut agg = MatchAggregator::new();
        let mut counter = TagCounter::default();
        agg.record(hit("b", 1, &[]), &source, &mut counter);
        agg.record(hit("a", 2, &[]), &source, &mut counter);
        agg.record(hit("b", 3, &[]), &source, &mut counter);

        let texts: Vec<_> = agg.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a"]);
        assert_eq!(agg.total_occurrences(), 3);
    }

    #[test]
    fn tags_union_and_variables_last_write_wins() {
        let source: Arc<str> = Arc::from("log");
        let mut agg = MatchAggregator::new();
        let mut counter = TagCounter::default();

        let first_tags = vec!["MSVC".to_owned()];
        let mut first = hit("error C2065", 1, &first_tags);
        first.variables.strings.insert("code".to_owned(), "old".to_owned());
        agg.record(first, &source, &mut counter);

        let second_tags = vec!["CPP".to_owned()];
        let mut second = hit("error C2065", 2, &second_tags);
        second.variables.strings.insert("code".to_owned(), "new".to_owned());
        agg.record(second, &source, &mut counter);

        let line = &agg.lines()[0];
        assert_eq!(
            line.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["CPP", "MSVC"]
        );
        assert_eq!(line.variables.strings["code"], "new");
    }

    #[test]
    fn tag_counter_counts_every_occurrence() {
        let source: Arc<str> = Arc::from("log");
        let mut agg = MatchAggregator::new();
        let mut counter = TagCounter::default();
        let tags = vec!["MSVC".to_owned()];

        for nr in 0..3 {
            agg.record(hit("same", nr, &tags), &source, &mut counter);
        }
        assert_eq!(counter.get("MSVC"), 3);
        assert_eq!(counter.get("UBT"), 0);
    }
}
