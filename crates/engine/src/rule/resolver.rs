//! 규칙 트리 해석기 -- Link 참조를 펼쳐 불변 트리를 생성
//!
//! 타겟 하나를 루트로 삼아 모든 `Link`를 참조된 템플릿 내용의 복사본으로 치환합니다.
//! 컨테이너마다 자신의 `Patterns`, 자신의 `Scope`, 그리고 `Link` 순서로 펼치며,
//! 같은 종류 안에서는 선언 순서를 유지합니다. 이 순서가 모호한 라인을 어느 패턴 리스트가
//! 먼저 가져가는지를 결정합니다.
//!
//! 해석 결과인 [`RuleTree`]는 생성 후 변경되지 않으므로 `Arc`로 감싸
//! 여러 파싱 실행이 동시에 공유할 수 있습니다.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use scopelog_core::metrics as m;

use super::RuleSet;
use super::pattern::Pattern;
use super::types::{Entry, PatternList, ScopeDef};
use crate::error::LogParseError;

/// 해석된 스코프 노드
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeNode {
    /// 정의 이름
    pub name: String,
    /// 시작 패턴 (루트는 비어 있음)
    pub start: Vec<Pattern>,
    /// 종료 패턴 (루트는 비어 있음)
    pub end: Vec<Pattern>,
    /// 매칭되지 않는 라인에서 강제 종료할지 여부
    pub require_all_lines_match: bool,
    /// 표시 이름으로 쓸 문자열 변수
    pub display_name_variable: Option<String>,
    /// 표시 숨김 여부
    pub hidden: bool,
    /// 이 스코프에 직접 속한 패턴 리스트 (평가 순서)
    pub pattern_lists: Vec<Arc<PatternList>>,
    /// 직접 중첩된 자식 스코프 (평가 순서)
    pub children: Vec<ScopeNode>,
}

impl ScopeNode {
    fn root(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            start: Vec::new(),
            end: Vec::new(),
            require_all_lines_match: false,
            display_name_variable: None,
            hidden: false,
            pattern_lists: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_def(def: &ScopeDef) -> Self {
        Self {
            name: def.name.clone(),
            start: def.start.clone(),
            end: def.end.clone(),
            require_all_lines_match: def.require_all_lines_match,
            display_name_variable: def.display_name_variable.clone(),
            hidden: def.hidden,
            pattern_lists: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 이 노드와 하위 노드의 패턴 리스트에 속한 패턴 수
    pub fn pattern_count(&self) -> usize {
        self.pattern_lists
            .iter()
            .map(|list| list.pattern_count())
            .sum::<usize>()
            + self
                .children
                .iter()
                .map(ScopeNode::pattern_count)
                .sum::<usize>()
    }

    /// 이 스코프가 해당 이름의 플래그를 듣는지 여부
    ///
    /// End 패턴의 SuccessFlags/FailureFlags에 등장하는 이름만 듣습니다.
    pub fn listens_for(&self, flag: &str) -> bool {
        self.end
            .iter()
            .any(|pattern| pattern.flags().named().any(|(name, _)| name == flag))
    }
}

/// 타겟 하나를 완전히 펼친 불변 규칙 트리
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTree {
    target: String,
    root: ScopeNode,
}

impl RuleTree {
    /// 타겟 이름
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 루트 스코프 (타겟 자신)
    pub fn root(&self) -> &ScopeNode {
        &self.root
    }

    /// 트리 전체의 패턴 리스트 패턴 수
    pub fn pattern_count(&self) -> usize {
        self.root.pattern_count()
    }

    /// 사람이 읽을 수 있는 트리 개요를 반환합니다.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        write_outline(&mut out, &self.root, 0);
        out
    }
}

fn write_outline(out: &mut String, node: &ScopeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut attrs = Vec::new();
    if node.require_all_lines_match {
        attrs.push("require-all-lines-match".to_owned());
    }
    if let Some(var) = &node.display_name_variable {
        attrs.push(format!("display-name=${var}"));
    }
    if node.hidden {
        attrs.push("hidden".to_owned());
    }
    let attrs = if attrs.is_empty() {
        String::new()
    } else {
        format!(" [{}]", attrs.join(", "))
    };
    let _ = writeln!(out, "{indent}{}{attrs}", node.name);

    for list in &node.pattern_lists {
        let _ = writeln!(
            out,
            "{indent}  - {} <{}> ({} include, {} exclude){}",
            list.name,
            list.severity,
            list.includes().count(),
            list.excludes().count(),
            if list.hidden { " hidden" } else { "" }
        );
    }
    for child in &node.children {
        write_outline(out, child, depth + 1);
    }
}

/// 규칙 트리 해석기
///
/// 한 번의 해석 동안 현재 펼치는 중인 템플릿 이름 스택을 유지하여
/// 순환 참조를 검출합니다.
pub struct RuleTreeResolver<'a> {
    rules: &'a RuleSet,
    target: &'a str,
    stack: Vec<&'a str>,
}

impl<'a> RuleTreeResolver<'a> {
    /// 해석기를 생성합니다.
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            target: "",
            stack: Vec::new(),
        }
    }

    /// 타겟을 해석합니다.
    ///
    /// # Errors
    /// - `UnknownTarget`: 타겟이 없는 경우
    /// - `UnknownTemplate`: Link가 없는 템플릿을 가리키는 경우
    /// - `CyclicReference`: Link 체인이 펼치는 중인 템플릿을 다시 방문하는 경우
    /// - `EmptyRuleTree`: 트리에 패턴이 하나도 없는 경우
    pub fn resolve(mut self, target: &'a str) -> Result<RuleTree, LogParseError> {
        let started = Instant::now();
        let def = self
            .rules
            .target(target)
            .ok_or_else(|| LogParseError::UnknownTarget {
                name: target.to_owned(),
            })?;
        self.target = target;

        let mut root = ScopeNode::root(&def.name);
        self.expand(&def.entries, &def.name, &mut root)?;

        let tree = RuleTree {
            target: def.name.clone(),
            root,
        };
        if tree.pattern_count() == 0 {
            return Err(LogParseError::EmptyRuleTree {
                target: def.name.clone(),
            });
        }

        metrics::histogram!(m::RULE_TREE_RESOLVE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            rule_target = %tree.target,
            patterns = tree.pattern_count(),
            "resolved rule tree"
        );

        Ok(tree)
    }

    fn expand(
        &mut self,
        entries: &'a [Entry],
        owner: &str,
        into: &mut ScopeNode,
    ) -> Result<(), LogParseError> {
        for entry in entries {
            if let Entry::Patterns(list) = entry {
                into.pattern_lists.push(Arc::clone(list));
            }
        }

        for entry in entries {
            if let Entry::Scope(def) = entry {
                let mut child = ScopeNode::from_def(def);
                self.expand(&def.entries, &def.name, &mut child)?;
                into.children.push(child);
            }
        }

        for entry in entries {
            let Entry::Link(name) = entry else {
                continue;
            };

            if self.stack.contains(&name.as_str()) {
                let chain = std::iter::once(self.target)
                    .chain(self.stack.iter().copied())
                    .chain(std::iter::once(name.as_str()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(LogParseError::CyclicReference { chain });
            }

            let template =
                self.rules
                    .template(name)
                    .ok_or_else(|| LogParseError::UnknownTemplate {
                        name: name.clone(),
                        referenced_from: owner.to_owned(),
                    })?;

            self.stack.push(name);
            self.expand(&template.entries, &template.name, into)?;
            self.stack.pop();
        }

        Ok(())
    }
}
