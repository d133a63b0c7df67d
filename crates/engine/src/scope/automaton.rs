//! 스코프 오토마톤 -- 라인 스트림을 한 번 훑으며 스코프 트리를 구성
//!
//! 오토마톤은 열린 스코프 인스턴스의 스택을 유지합니다. 스택의 바닥은 입력 전체를
//! 감싸는 루트(타겟)이며, 스택은 항상 규칙 트리의 중첩을 따르는 조상 체인입니다.
//!
//! # 라인 처리 순서
//!
//! 가장 안쪽의 열린 스코프를 기준으로:
//! 1. 직계 자식 스코프의 Start 패턴에 매칭되면 자식을 엽니다. 같은 라인은 새 스코프의
//!    패턴 리스트에 다시 평가하지 않습니다.
//! 2. 현재 스코프의 End 패턴에 매칭되면 스코프를 닫고, 같은 라인을 바깥 스코프의
//!    패턴 리스트에만 평가합니다.
//! 3. 현재 스코프의 패턴 리스트를 선언 순서대로 평가하여 처음 매칭된 리스트에 기록합니다.
//! 4. 아무것도 매칭되지 않았고 `RequireAllLinesMatch`가 설정되어 있으면 스코프를 닫고
//!    같은 라인을 바깥 스코프에서 처음부터 다시 처리합니다.
//! 5. 그 외의 라인은 버립니다.
//!
//! 오토마톤은 재진입하지 않으며 모든 라인을 파일 순서대로 정확히 한 번 봐야 합니다.
//! 입력 일부만 넣고 [`ScopeAutomaton::finish`]를 호출해도 유효한 리포트가 나옵니다.

use std::sync::Arc;

use scopelog_core::metrics as m;

use super::instance::ScopeInstance;
use super::signal::SignalBus;
use crate::aggregate::{LineHit, MatchedLine, TagCounter};
use crate::report::ScopeReport;
use crate::rule::{LineMatcher, Pattern, RuleTree, ScopeNode};
use crate::summary::ParseSummary;

/// 로그 하나의 파싱 결과
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    /// 원본 로그 식별자
    pub source_id: String,
    /// 루트 스코프 리포트
    pub root: ScopeReport,
    /// 파싱 요약
    pub summary: ParseSummary,
}

/// 스코프가 닫히는 이유
enum Closure<'a> {
    /// End 패턴 매칭
    EndMarker {
        pattern: &'a Pattern,
        line: &'a str,
        line_nr: usize,
    },
    /// `RequireAllLinesMatch` 스코프에서 매칭 실패
    Forced,
    /// 입력 종료
    EndOfInput,
}

/// 스코프 오토마톤
pub struct ScopeAutomaton<'t> {
    tree: &'t RuleTree,
    source_file: Arc<str>,
    stack: Vec<ScopeInstance<'t>>,
    bus: SignalBus,
    tag_counter: TagCounter,
    summary: ParseSummary,
    next_line_nr: usize,
}

impl<'t> ScopeAutomaton<'t> {
    /// 루트 스코프만 열린 오토마톤을 생성합니다.
    pub fn new(tree: &'t RuleTree, source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        Self {
            tree,
            source_file: Arc::from(source_id.as_str()),
            stack: vec![ScopeInstance::root(tree.root())],
            bus: SignalBus::new(),
            tag_counter: TagCounter::default(),
            summary: ParseSummary::new(source_id),
            next_line_nr: 0,
        }
    }

    /// 지금까지 입력된 라인 수
    pub fn lines_fed(&self) -> usize {
        self.next_line_nr
    }

    /// 현재 열린 스코프의 정규화 이름 (바깥에서 안쪽 순)
    pub fn open_scope_path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.stack.len());
        for scope in &self.stack {
            let qualified = match path.last() {
                Some(parent) => format!("{parent}.{}", scope.name()),
                None => scope.name().to_owned(),
            };
            path.push(qualified);
        }
        path
    }

    /// 라인 하나를 처리합니다. 끝의 `\n`, `\r`은 무시합니다.
    pub fn feed_line(&mut self, raw: &str) {
        let line = raw.trim_end_matches(['\n', '\r']);
        let line_nr = self.next_line_nr;
        self.next_line_nr += 1;
        self.summary.lines_processed += 1;
        metrics::counter!(m::LINES_PROCESSED_TOTAL).increment(1);

        loop {
            let current = self.current_definition();

            if let Some((child, pattern)) = find_start(current, line) {
                self.open_scope(child, pattern, line, line_nr);
                return;
            }

            if let Some(pattern) = current.end.iter().find(|p| p.is_match(line)) {
                self.close_innermost(Closure::EndMarker {
                    pattern,
                    line,
                    line_nr,
                });
                self.match_pattern_lists(line, line_nr);
                return;
            }

            if self.match_pattern_lists(line, line_nr) {
                return;
            }

            if current.require_all_lines_match && self.stack.len() > 1 {
                self.close_innermost(Closure::Forced);
                continue;
            }

            return;
        }
    }

    /// 남은 스코프를 모두 닫고 결과를 반환합니다.
    ///
    /// 열려 있던 스코프는 받은 신호에 따라 종료 상태가 정해지며
    /// 요약에 닫히지 않은 스코프로 기록됩니다.
    pub fn finish(mut self) -> ParsedLog {
        while self.stack.len() > 1 {
            self.close_innermost(Closure::EndOfInput);
        }

        let root = self
            .stack
            .pop()
            .unwrap_or_else(|| ScopeInstance::root(self.tree.root()))
            .finalize();
        metrics::counter!(m::SCOPES_CLOSED_TOTAL, m::LABEL_STATUS => root.status.as_str())
            .increment(1);

        self.summary.unclaimed_flags = self.bus.unclaimed();
        self.summary.tag_counts = self.tag_counter.into_map();
        self.summary.log_capture_warnings();

        tracing::debug!(
            source_id = %self.summary.source_id,
            lines = self.summary.lines_processed,
            matched = self.summary.lines_matched,
            scopes = self.summary.scopes_opened,
            "log parsed"
        );

        ParsedLog {
            source_id: self.summary.source_id.clone(),
            root,
            summary: self.summary,
        }
    }

    fn current_definition(&self) -> &'t ScopeNode {
        self.stack
            .last()
            .map_or(self.tree.root(), ScopeInstance::definition)
    }

    /// 스택에 없는 `instance`가 현재 최상단 스코프의 자식일 때의 정규화 이름.
    /// 리포트와 같은 이름(표시 이름)을 점으로 잇습니다.
    fn qualified_name_of(&self, instance: &ScopeInstance<'_>) -> String {
        let mut names: Vec<&str> = self.stack.iter().map(ScopeInstance::name).collect();
        names.push(instance.name());
        names.join(".")
    }

    fn open_scope(&mut self, def: &'t ScopeNode, pattern: &'t Pattern, line: &str, line_nr: usize) {
        let marker = self.marker(pattern, line, line_nr, &def.name);
        let instance = ScopeInstance::open(def, marker);
        tracing::trace!(scope = %self.qualified_name_of(&instance), line_nr, "scope opened");

        self.stack.push(instance);
        self.summary.scopes_opened += 1;
        metrics::counter!(m::SCOPES_OPENED_TOTAL).increment(1);

        // Start 패턴의 플래그는 새로 열린 스코프부터 적용
        self.bus.dispatch(pattern.flags(), &mut self.stack);
    }

    fn close_innermost(&mut self, closure: Closure<'_>) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(mut instance) = self.stack.pop() else {
            return;
        };

        match closure {
            Closure::EndMarker {
                pattern,
                line,
                line_nr,
            } => {
                // End 패턴의 이름 있는 플래그는 구독 선언이므로 auto만 적용
                for polarity in pattern.flags().auto() {
                    instance.raise(polarity);
                }
                let marker = self.marker(pattern, line, line_nr, &instance.definition().name);
                instance.set_end(marker);
            }
            Closure::Forced => {
                tracing::trace!(scope = %self.qualified_name_of(&instance), "scope force-closed");
            }
            Closure::EndOfInput => {
                let qualified = self.qualified_name_of(&instance);
                tracing::warn!(
                    source_id = %self.summary.source_id,
                    scope = %qualified,
                    start_line_nr = ?instance.start_line_nr(),
                    "input ended while scope was still open"
                );
                self.summary
                    .record_unterminated(&qualified, instance.start_line_nr());
            }
        }

        let report = instance.finalize();
        metrics::counter!(m::SCOPES_CLOSED_TOTAL, m::LABEL_STATUS => report.status.as_str())
            .increment(1);

        if let Some(parent) = self.stack.last_mut() {
            parent.adopt(report);
        }
    }

    /// 가장 안쪽 스코프의 패턴 리스트에 라인을 평가합니다.
    fn match_pattern_lists(&mut self, line: &str, line_nr: usize) -> bool {
        let def = self.current_definition();
        let Some((idx, result)) = LineMatcher::first_match(line, &def.pattern_lists) else {
            return false;
        };
        let list = &def.pattern_lists[idx];

        for failure in &result.capture_failures {
            tracing::debug!(
                pattern_list = %list.name,
                variable = %failure.variable,
                value = %failure.value,
                line_nr,
                "numeric capture could not be parsed"
            );
            self.summary.record_capture_failure(&list.name, failure, line_nr);
            metrics::counter!(m::CAPTURE_PARSE_WARNINGS_TOTAL).increment(1);
        }

        if let Some(instance) = self.stack.last_mut() {
            instance.record(
                idx,
                LineHit {
                    text: line,
                    line_nr,
                    severity: list.severity,
                    tags: &result.tags,
                    variables: result.variables,
                },
                &self.source_file,
                &mut self.tag_counter,
            );
        }
        self.summary.count_match(list.severity);
        metrics::counter!(m::LINES_MATCHED_TOTAL, m::LABEL_SEVERITY => list.severity.as_str())
            .increment(1);

        self.bus.dispatch(&result.flags, &mut self.stack);
        true
    }

    /// Start/End 마커 라인을 만듭니다.
    fn marker(&mut self, pattern: &Pattern, line: &str, line_nr: usize, owner: &str) -> MatchedLine {
        let extraction = pattern.extract(line).unwrap_or_default();
        for failure in &extraction.failures {
            self.summary.record_capture_failure(owner, failure, line_nr);
            metrics::counter!(m::CAPTURE_PARSE_WARNINGS_TOTAL).increment(1);
        }
        MatchedLine::from_hit(
            LineHit {
                text: line,
                line_nr,
                severity: pattern.severity(),
                tags: pattern.tags(),
                variables: extraction.variables,
            },
            &self.source_file,
        )
    }
}

/// 직계 자식 중 Start 패턴이 매칭되는 첫 스코프 (선언 순서)
fn find_start<'t>(current: &'t ScopeNode, line: &str) -> Option<(&'t ScopeNode, &'t Pattern)> {
    current.children.iter().find_map(|child| {
        child
            .start
            .iter()
            .find(|pattern| pattern.is_match(line))
            .map(|pattern| (child, pattern))
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::rule::{Entry, Flag, FlagSet, PatternList, RuleSet, ScopeDef, TargetDef};
    use proptest::prelude::*;
    use scopelog_core::types::Severity;

    const VOCABULARY: &[&str] = &[
        "BUILD START",
        "BUILD END",
        "COOK START",
        "COOK END",
        "error C2065: undeclared identifier",
        "warning C4996: deprecated",
        "error C2065: undeclared identifier (suppressed)",
        "LogCook: Display: Cooked 12 packages",
        "unrelated noise",
        "",
    ];

    fn tree() -> RuleTree {
        let cook = ScopeDef::new(
            "Cook",
            vec![Pattern::literal("COOK START")],
            vec![Pattern::literal("COOK END").with_flags(FlagSet::new(vec![Flag::Auto], vec![]))],
        )
        .require_all_lines_match(true)
        .with_entry(Entry::patterns(
            PatternList::new("Cook Output", Severity::Message).include(Pattern::literal("LogCook")),
        ));
        let build = ScopeDef::new(
            "Build",
            vec![Pattern::literal("BUILD START")],
            vec![Pattern::literal("BUILD END")],
        )
        .with_entry(Entry::patterns(
            PatternList::new("Errors", Severity::Error)
                .include(Pattern::literal("error"))
                .exclude(Pattern::literal("(suppressed)"))
                .with_flags(FlagSet::new(vec![], vec![Flag::Auto])),
        ))
        .with_entry(Entry::patterns(
            PatternList::new("Warnings", Severity::Warning).include(Pattern::literal("warning")),
        ))
        .with_entry(Entry::Scope(cook));

        let mut rules = RuleSet::new("proptest");
        rules
            .add_target(TargetDef {
                name: "Root".to_owned(),
                entries: vec![Entry::Scope(build)],
            })
            .unwrap();
        rules.resolve("Root").unwrap()
    }

    fn lines() -> impl Strategy<Value = Vec<&'static str>> {
        prop::collection::vec(prop::sample::select(VOCABULARY), 0..64)
    }

    fn all_lines(report: &ScopeReport, out: &mut Vec<String>) {
        for list in &report.match_lists {
            out.extend(list.lines.iter().map(|l| l.line.clone()));
        }
        for child in &report.child_scopes {
            all_lines(child, out);
        }
    }

    proptest! {
        #[test]
        fn same_input_gives_same_report(input in lines()) {
            let tree = tree();
            let run = |lines: &[&str]| {
                let mut automaton = ScopeAutomaton::new(&tree, "a.log");
                for line in lines {
                    automaton.feed_line(line);
                }
                automaton.finish()
            };
            prop_assert_eq!(run(&input), run(&input));
        }

        #[test]
        fn stack_is_always_an_ancestor_chain(input in lines()) {
            let tree = tree();
            let mut automaton = ScopeAutomaton::new(&tree, "a.log");
            for line in &input {
                automaton.feed_line(line);
                let chain_ok = automaton.stack.windows(2).all(|pair| {
                    pair[0]
                        .definition()
                        .children
                        .iter()
                        .any(|child| std::ptr::eq(child, pair[1].definition()))
                });
                prop_assert!(chain_ok);
                prop_assert!(std::ptr::eq(automaton.stack[0].definition(), tree.root()));
            }
        }

        #[test]
        fn excluded_lines_never_reach_a_report(input in lines()) {
            let tree = tree();
            let mut automaton = ScopeAutomaton::new(&tree, "a.log");
            for line in &input {
                automaton.feed_line(line);
            }
            let parsed = automaton.finish();
            let mut matched = Vec::new();
            all_lines(&parsed.root, &mut matched);
            prop_assert!(matched.iter().all(|l| !l.contains("(suppressed)")));
        }

        #[test]
        fn occurrences_add_up_to_matched_lines(input in lines()) {
            let tree = tree();
            let mut automaton = ScopeAutomaton::new(&tree, "a.log");
            for line in &input {
                automaton.feed_line(line);
            }
            let parsed = automaton.finish();

            let mut total = 0u64;
            parsed.root.walk(&mut |_, scope| {
                for list in &scope.match_lists {
                    for line in &list.lines {
                        total += line.occurences;
                    }
                }
            });
            prop_assert_eq!(total, parsed.summary.lines_matched);
            prop_assert_eq!(parsed.summary.lines_processed, input.len() as u64);
        }
    }
}
