//! 리포트 -- 종료된 스코프 트리의 직렬화 형식
//!
//! [`Report`]는 원본 로그 식별자에서 루트 스코프로의 매핑이며 JSON으로 직렬화되어
//! 외부 뷰어가 소비합니다. 필드 이름(`occurences` 철자 포함)은 뷰어가 기대하는
//! 형식을 그대로 따릅니다.
//!
//! # JSON 형식
//! ```text
//! { "<source_id>": { name, status, start, end, tags, hidden, match_lists: [...], child_scopes: [...] } }
//! match_list: { name, severity, tags, hidden, lines: [...] }
//! line:       { line, line_nr, occurences, severity, tags, strings: {...}, numerics: {...} }
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use scopelog_core::types::Severity;

use crate::aggregate::MatchedLine;
use crate::error::LogParseError;
use crate::rule::PatternList;
use crate::scope::ScopeStatus;

/// 직렬화된 매칭 라인
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    /// 라인 텍스트
    pub line: String,
    /// 처음 본 라인 번호 (0 기반)
    pub line_nr: usize,
    /// 발생 횟수
    pub occurences: u64,
    /// 심각도
    pub severity: Severity,
    /// 태그
    pub tags: Vec<String>,
    /// 문자열 변수
    pub strings: BTreeMap<String, String>,
    /// 숫자 변수
    pub numerics: BTreeMap<String, f64>,
}

impl From<MatchedLine> for LineReport {
    fn from(line: MatchedLine) -> Self {
        Self {
            line: line.text,
            line_nr: line.line_nr,
            occurences: line.occurrences,
            severity: line.severity,
            tags: line.tags.into_iter().collect(),
            strings: line.variables.strings,
            numerics: line.variables.numerics,
        }
    }
}

/// 직렬화된 패턴 리스트 인스턴스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchListReport {
    pub name: String,
    pub severity: Severity,
    pub tags: Vec<String>,
    pub hidden: bool,
    pub lines: Vec<LineReport>,
}

impl MatchListReport {
    /// 패턴 리스트 정의와 집계 결과로 리포트를 만듭니다.
    pub fn new(list: &PatternList, lines: Vec<MatchedLine>) -> Self {
        Self {
            name: list.name.clone(),
            severity: list.severity,
            tags: list.tags.clone(),
            hidden: list.hidden,
            lines: lines.into_iter().map(LineReport::from).collect(),
        }
    }

    /// 태그 중 하나라도 일치하는지 (대소문자 무시). 빈 요청 태그는 모두 일치합니다.
    fn matches_tags(&self, tags: &[String]) -> bool {
        tags.is_empty()
            || tags.iter().any(|wanted| {
                let wanted = wanted.trim();
                wanted.is_empty() || self.tags.iter().any(|t| t.eq_ignore_ascii_case(wanted))
            })
    }
}

/// 직렬화된 스코프 인스턴스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeReport {
    /// 표시 이름 (DisplayNameVariable이 있으면 그 값)
    pub name: String,
    /// 종료 상태
    pub status: ScopeStatus,
    /// 시작 마커
    pub start: Option<LineReport>,
    /// 종료 마커 (End 패턴으로 닫힌 경우만)
    pub end: Option<LineReport>,
    /// 스코프 안에서 매칭된 태그의 합집합
    pub tags: Vec<String>,
    /// 표시 숨김 여부
    pub hidden: bool,
    /// 패턴 리스트 인스턴스 (정의 순서)
    pub match_lists: Vec<MatchListReport>,
    /// 자식 스코프 인스턴스 (열린 순서)
    pub child_scopes: Vec<ScopeReport>,
}

/// 리포트 필터 조건
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    /// 요청 태그 (비어 있으면 전체)
    pub tags: Vec<String>,
    /// 최소 심각도
    pub min_severity: Severity,
    /// 패턴 리스트의 최소 라인 수
    pub min_matches: usize,
}

impl ReportFilter {
    /// core의 `ParseConfig`에서 필터를 생성합니다.
    pub fn from_core(core: &scopelog_core::config::ParseConfig) -> Result<Self, LogParseError> {
        let min_severity =
            core.min_severity
                .parse::<Severity>()
                .map_err(|reason| LogParseError::Config {
                    field: "min_severity".to_owned(),
                    reason,
                })?;
        Ok(Self {
            tags: core.tags.clone(),
            min_severity,
            min_matches: core.min_matches,
        })
    }

    fn accepts(&self, list: &MatchListReport) -> bool {
        list.lines.len() >= self.min_matches
            && list.severity >= self.min_severity
            && list.matches_tags(&self.tags)
    }
}

/// 텍스트 렌더링 단위 -- 헤더 하나와 그 아래 라인들
#[derive(Debug, Clone, PartialEq)]
pub struct TextSection<'r> {
    /// 정규화된 스코프 이름 (예: "BuildCookRun.Build")
    pub scope: String,
    /// 심각도
    pub severity: Severity,
    /// 패턴 리스트 이름 또는 "Start"/"End"
    pub title: &'r str,
    /// 표시할 라인
    pub lines: Vec<&'r LineReport>,
    /// 전체 라인 수
    pub total: usize,
    /// 태그
    pub tags: &'r [String],
}

impl TextSection<'_> {
    /// `### [Scope] Severity Title (n/m) <TAGS> ###`
    pub fn header(&self) -> String {
        format!(
            "### [{}] {} {} ({}/{}) <{}> ###",
            self.scope,
            self.severity,
            self.title,
            self.lines.len(),
            self.total,
            self.tags.join(";")
        )
    }
}

/// 라인 하나의 텍스트 표현
pub fn format_line(line: &LineReport) -> String {
    if line.occurences > 1 {
        format!("{} (x{})", line.line, line.occurences)
    } else {
        line.line.clone()
    }
}

impl ScopeReport {
    /// 조건을 만족하는 패턴 리스트만 남긴 복사본을 반환합니다.
    ///
    /// 스코프 자체는 모두 유지되며 자식 스코프에도 같은 조건이 적용됩니다.
    pub fn filter(&self, filter: &ReportFilter) -> ScopeReport {
        ScopeReport {
            name: self.name.clone(),
            status: self.status,
            start: self.start.clone(),
            end: self.end.clone(),
            tags: self.tags.clone(),
            hidden: self.hidden,
            match_lists: self
                .match_lists
                .iter()
                .filter(|list| filter.accepts(list))
                .cloned()
                .collect(),
            child_scopes: self
                .child_scopes
                .iter()
                .map(|child| child.filter(filter))
                .collect(),
        }
    }

    /// 깊이 우선으로 모든 스코프를 정규화된 이름과 함께 방문합니다.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&str, &'a ScopeReport)) {
        self.walk_inner(&self.name, visit);
    }

    fn walk_inner<'a>(&'a self, qualified: &str, visit: &mut impl FnMut(&str, &'a ScopeReport)) {
        visit(qualified, self);
        for child in &self.child_scopes {
            child.walk_inner(&format!("{qualified}.{}", child.name), visit);
        }
    }

    /// 이름 경로로 자식 스코프를 찾습니다 (예: `["Build", "Compile"]`).
    pub fn find(&self, path: &[&str]) -> Option<&ScopeReport> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .child_scopes
                .iter()
                .find(|child| child.name == *head)
                .and_then(|child| child.find(rest)),
        }
    }

    /// 이 스코프나 하위 스코프 중 실패로 닫힌 것이 있는지 여부
    pub fn has_failure(&self) -> bool {
        self.status == ScopeStatus::ClosedFailure
            || self.child_scopes.iter().any(ScopeReport::has_failure)
    }

    /// 이 트리 전체의 서로 다른 매칭 라인 수
    pub fn matched_line_count(&self) -> usize {
        self.match_lists.iter().map(|l| l.lines.len()).sum::<usize>()
            + self
                .child_scopes
                .iter()
                .map(ScopeReport::matched_line_count)
                .sum::<usize>()
    }

    /// 텍스트 렌더링 단위를 수집합니다.
    ///
    /// 숨김 패턴 리스트와 숨김 스코프, 심각도가 Message인 마커는 제외합니다.
    /// `max_lines`가 0이면 라인 수를 제한하지 않습니다.
    pub fn text_sections(&self, max_lines: usize) -> Vec<TextSection<'_>> {
        let mut sections = Vec::new();
        self.collect_sections(&self.name, max_lines, &mut sections);
        sections
    }

    fn collect_sections<'a>(
        &'a self,
        qualified: &str,
        max_lines: usize,
        sections: &mut Vec<TextSection<'a>>,
    ) {
        // 숨김 스코프는 하위 트리 전체를 건너뜀
        if self.hidden {
            return;
        }
        for (title, marker) in [("Start", &self.start), ("End", &self.end)] {
            if let Some(marker) = marker
                && marker.severity > Severity::Message
            {
                sections.push(TextSection {
                    scope: qualified.to_owned(),
                    severity: marker.severity,
                    title,
                    lines: vec![marker],
                    total: 1,
                    tags: &marker.tags,
                });
            }
        }
        for list in self.match_lists.iter().filter(|l| !l.hidden) {
            let shown = if max_lines == 0 {
                list.lines.len()
            } else {
                list.lines.len().min(max_lines)
            };
            sections.push(TextSection {
                scope: qualified.to_owned(),
                severity: list.severity,
                title: &list.name,
                lines: list.lines.iter().take(shown).collect(),
                total: list.lines.len(),
                tags: &list.tags,
            });
        }
        for child in &self.child_scopes {
            child.collect_sections(&format!("{qualified}.{}", child.name), max_lines, sections);
        }
    }

    /// 모든 스코프의 정규화된 이름 (깊이 우선)
    pub fn qualified_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.walk(&mut |qualified, _| names.push(qualified.to_owned()));
        names
    }

    /// 색 없는 텍스트로 렌더링합니다.
    pub fn render_text(&self, max_lines: usize) -> String {
        let mut out = String::new();
        for section in self.text_sections(max_lines) {
            let _ = writeln!(out, "{}", section.header());
            for line in &section.lines {
                let _ = writeln!(out, "{}", format_line(line));
            }
            out.push('\n');
        }
        out.trim_end().to_owned()
    }
}

/// 원본 로그 식별자 -> 루트 스코프 매핑
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    scopes: BTreeMap<String, ScopeReport>,
}

impl Report {
    /// 빈 리포트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 로그 하나의 루트 스코프를 추가합니다.
    pub fn insert(&mut self, source_id: impl Into<String>, root: ScopeReport) {
        self.scopes.insert(source_id.into(), root);
    }

    pub fn get(&self, source_id: &str) -> Option<&ScopeReport> {
        self.scopes.get(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.scopes.contains_key(source_id)
    }

    /// 식별자 순서로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScopeReport)> {
        self.scopes.iter().map(|(id, scope)| (id.as_str(), scope))
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// 모든 루트에 필터를 적용한 복사본
    pub fn filter(&self, filter: &ReportFilter) -> Report {
        Report {
            scopes: self
                .scopes
                .iter()
                .map(|(id, scope)| (id.clone(), scope.filter(filter)))
                .collect(),
        }
    }

    /// 실패로 닫힌 스코프가 하나라도 있는지 여부
    pub fn has_failure(&self) -> bool {
        self.scopes.values().any(ScopeReport::has_failure)
    }

    /// 들여쓴 JSON 문자열로 직렬화합니다.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 들여쓴 JSON을 writer에 씁니다.
    pub fn write_json<W: std::io::Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, self)
    }
}

/// 파일 이름에서 원본 로그 식별자를 만듭니다.
///
/// `. ()@;[]#,` 문자는 `_`로 바뀝니다.
pub fn source_file_id(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '.' | ' ' | '(' | ')' | '@' | ';' | '[' | ']' | '#' | ',' => '_',
            other => other,
        })
        .collect()
}
