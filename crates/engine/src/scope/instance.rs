//! 스코프 인스턴스 -- 실행 중 열려 있는 스코프 하나의 상태

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::{LineHit, MatchAggregator, MatchedLine, TagCounter};
use crate::report::{LineReport, MatchListReport, ScopeReport};
use crate::rule::{Polarity, ScopeNode};

/// 스코프 인스턴스 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStatus {
    Open,
    ClosedSuccess,
    ClosedFailure,
    ClosedNeutral,
}

impl ScopeStatus {
    /// 직렬화 표기와 같은 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::ClosedSuccess => "closed_success",
            Self::ClosedFailure => "closed_failure",
            Self::ClosedNeutral => "closed_neutral",
        }
    }
}

impl std::fmt::Display for ScopeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 스코프가 받은 성공/실패 신호
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    success: bool,
    failure: bool,
}

impl Signals {
    pub fn raise(&mut self, polarity: Polarity) {
        match polarity {
            Polarity::Success => self.success = true,
            Polarity::Failure => self.failure = true,
        }
    }

    /// 실패 신호가 성공 신호보다 우선합니다.
    pub fn terminal_status(&self) -> ScopeStatus {
        if self.failure {
            ScopeStatus::ClosedFailure
        } else if self.success {
            ScopeStatus::ClosedSuccess
        } else {
            ScopeStatus::ClosedNeutral
        }
    }
}

/// 열려 있는 스코프 인스턴스
///
/// 종료 시 [`finalize`](Self::finalize)로 불변 [`ScopeReport`]가 되어
/// 부모 인스턴스의 자식 목록에 들어갑니다.
#[derive(Debug)]
pub struct ScopeInstance<'t> {
    def: &'t ScopeNode,
    display_name: Option<String>,
    start: Option<MatchedLine>,
    end: Option<MatchedLine>,
    aggregators: Vec<MatchAggregator>,
    children: Vec<ScopeReport>,
    signals: Signals,
}

impl<'t> ScopeInstance<'t> {
    /// 입력 전체를 감싸는 루트 인스턴스
    pub fn root(def: &'t ScopeNode) -> Self {
        Self::new(def, None)
    }

    /// 시작 마커와 함께 새 인스턴스를 엽니다.
    pub fn open(def: &'t ScopeNode, start: MatchedLine) -> Self {
        let mut instance = Self::new(def, Some(start));
        instance.display_name = def
            .display_name_variable
            .as_ref()
            .and_then(|var| instance.start.as_ref()?.variables.strings.get(var))
            .cloned();
        instance
    }

    fn new(def: &'t ScopeNode, start: Option<MatchedLine>) -> Self {
        Self {
            def,
            display_name: None,
            start,
            end: None,
            aggregators: vec![MatchAggregator::new(); def.pattern_lists.len()],
            children: Vec::new(),
            signals: Signals::default(),
        }
    }

    /// 원본 정의 (트리 수명)
    pub fn definition(&self) -> &'t ScopeNode {
        self.def
    }

    /// 리포트에 쓰일 이름. `DisplayNameVariable` 값이 잡혔으면 그 값, 아니면 정의 이름
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.def.name)
    }

    pub fn start_line_nr(&self) -> Option<usize> {
        self.start.as_ref().map(|s| s.line_nr)
    }

    /// 지금까지 받은 신호
    pub fn signals(&self) -> Signals {
        self.signals
    }

    pub fn raise(&mut self, polarity: Polarity) {
        self.signals.raise(polarity);
    }

    /// 패턴 리스트 `list_idx`에 매칭 라인을 기록합니다.
    pub fn record(
        &mut self,
        list_idx: usize,
        hit: LineHit<'_>,
        source_file: &Arc<str>,
        tag_counter: &mut TagCounter,
    ) {
        if self.display_name.is_none()
            && let Some(var) = &self.def.display_name_variable
            && let Some(value) = hit.variables.strings.get(var)
        {
            self.display_name = Some(value.clone());
        }

        if let Some(aggregator) = self.aggregators.get_mut(list_idx) {
            aggregator.record(hit, source_file, tag_counter);
        }
    }

    pub fn set_end(&mut self, end: MatchedLine) {
        self.end = Some(end);
    }

    /// 종료된 자식 스코프를 받아들입니다.
    pub fn adopt(&mut self, child: ScopeReport) {
        self.children.push(child);
    }

    /// 받은 신호로 종료 상태를 정하고 불변 리포트로 변환합니다.
    pub fn finalize(self) -> ScopeReport {
        let status = self.signals.terminal_status();

        let match_lists: Vec<MatchListReport> = self
            .def
            .pattern_lists
            .iter()
            .zip(self.aggregators)
            .map(|(list, aggregator)| MatchListReport::new(list, aggregator.into_lines()))
            .collect();

        let mut tags = BTreeSet::new();
        for list in &match_lists {
            for line in &list.lines {
                tags.extend(line.tags.iter().cloned());
            }
        }
        for child in &self.children {
            tags.extend(child.tags.iter().cloned());
        }

        ScopeReport {
            name: self.display_name.unwrap_or_else(|| self.def.name.clone()),
            status,
            start: self.start.map(LineReport::from),
            end: self.end.map(LineReport::from),
            tags: tags.into_iter().collect(),
            hidden: self.def.hidden,
            match_lists,
            child_scopes: self.children,
        }
    }
}
