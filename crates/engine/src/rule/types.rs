//! 규칙 정의 데이터 구조
//!
//! 규칙 정의 문서의 요소(`Patterns`, `Scope`, `Link`, `Template`, `Target`)를
//! 그대로 옮긴 타입입니다. `Link`는 아직 해석되지 않은 이름 참조로 남아 있으며,
//! [`resolver`](super::resolver)가 타겟 단위로 펼칩니다.

use std::sync::Arc;

use scopelog_core::types::Severity;

use super::pattern::{FlagSet, Pattern};

/// Include/Exclude 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Include,
    Exclude,
}

/// 패턴 리스트의 한 항목
#[derive(Debug, Clone, PartialEq)]
pub struct PatternEntry {
    pub kind: EntryKind,
    pub pattern: Pattern,
}

/// 패턴 리스트 -- 이름 붙은 하나의 이슈 분류
///
/// 선언 순서가 의미를 가집니다. Include는 선언 순서대로 평가되어 처음 매칭된
/// 항목이 캡처 추출을 결정하고, 같은 리스트의 Exclude가 하나라도 매칭되면
/// 라인은 이 리스트에 매칭되지 않은 것으로 취급됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternList {
    /// 표시 이름 (고유하지 않음)
    pub name: String,
    /// 심각도
    pub severity: Severity,
    /// 이 리스트로 매칭된 모든 라인에 붙는 태그
    pub tags: Vec<String>,
    /// 표시 숨김 여부 (매칭에는 영향 없음)
    pub hidden: bool,
    /// 이 리스트로 매칭된 모든 라인이 발생시키는 플래그
    pub flags: FlagSet,
    /// Include/Exclude 항목 (선언 순서)
    pub entries: Vec<PatternEntry>,
}

impl PatternList {
    /// 빈 패턴 리스트를 생성합니다.
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            severity,
            tags: Vec::new(),
            hidden: false,
            flags: FlagSet::default(),
            entries: Vec::new(),
        }
    }

    /// Include 패턴을 추가합니다.
    pub fn include(mut self, pattern: Pattern) -> Self {
        self.entries.push(PatternEntry {
            kind: EntryKind::Include,
            pattern,
        });
        self
    }

    /// Exclude 패턴을 추가합니다.
    pub fn exclude(mut self, pattern: Pattern) -> Self {
        self.entries.push(PatternEntry {
            kind: EntryKind::Exclude,
            pattern,
        });
        self
    }

    /// 태그를 지정합니다.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// 플래그를 지정합니다.
    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// 숨김 여부를 지정합니다.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Include 패턴 (선언 순서)
    pub fn includes(&self) -> impl Iterator<Item = &Pattern> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Include)
            .map(|e| &e.pattern)
    }

    /// Exclude 패턴 (선언 순서)
    pub fn excludes(&self) -> impl Iterator<Item = &Pattern> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Exclude)
            .map(|e| &e.pattern)
    }

    /// Include와 Exclude를 합친 패턴 수
    pub fn pattern_count(&self) -> usize {
        self.entries.len()
    }
}

/// 스코프 정의 -- Start/End 패턴으로 경계가 정해지는 구간
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeDef {
    /// 이름
    pub name: String,
    /// 하나 이상의 시작 패턴
    pub start: Vec<Pattern>,
    /// 하나 이상의 종료 패턴
    pub end: Vec<Pattern>,
    /// 매칭되지 않는 라인이 나오면 즉시 스코프를 닫을지 여부
    pub require_all_lines_match: bool,
    /// 표시 이름으로 쓸 문자열 변수 이름
    pub display_name_variable: Option<String>,
    /// 표시 숨김 여부
    pub hidden: bool,
    /// 하위 항목 (선언 순서)
    pub entries: Vec<Entry>,
}

impl ScopeDef {
    /// 하위 항목이 없는 스코프를 생성합니다.
    pub fn new(name: impl Into<String>, start: Vec<Pattern>, end: Vec<Pattern>) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            require_all_lines_match: false,
            display_name_variable: None,
            hidden: false,
            entries: Vec::new(),
        }
    }

    /// 하위 항목을 추가합니다.
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// `RequireAllLinesMatch`를 지정합니다.
    pub fn require_all_lines_match(mut self, require: bool) -> Self {
        self.require_all_lines_match = require;
        self
    }

    /// `DisplayNameVariable`을 지정합니다.
    pub fn display_name_variable(mut self, variable: impl Into<String>) -> Self {
        self.display_name_variable = Some(variable.into());
        self
    }
}

/// 컨테이너(템플릿, 타겟, 스코프)의 하위 항목
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// 패턴 리스트 (해석 후에도 참조로 공유됨)
    Patterns(Arc<PatternList>),
    /// 중첩 스코프
    Scope(ScopeDef),
    /// 템플릿 이름 참조
    Link(String),
}

impl Entry {
    /// 패턴 리스트 항목을 생성합니다.
    pub fn patterns(list: PatternList) -> Self {
        Self::Patterns(Arc::new(list))
    }

    /// 링크 항목을 생성합니다.
    pub fn link(template: impl Into<String>) -> Self {
        Self::Link(template.into())
    }
}

/// 재사용 가능한 템플릿
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDef {
    /// 고유 이름
    pub name: String,
    /// 하위 항목 (선언 순서)
    pub entries: Vec<Entry>,
}

/// 타겟 -- 하나의 규칙 트리의 루트
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDef {
    /// 고유 이름
    pub name: String,
    /// 하위 항목 (선언 순서)
    pub entries: Vec<Entry>,
}

/// 하위 항목 종류별 개수를 셉니다 (patterns, scopes, links).
pub fn entry_counts(entries: &[Entry]) -> (usize, usize, usize) {
    entries
        .iter()
        .fold((0, 0, 0), |(p, s, l), entry| match entry {
            Entry::Patterns(_) => (p + 1, s, l),
            Entry::Scope(_) => (p, s + 1, l),
            Entry::Link(_) => (p, s, l + 1),
        })
}
