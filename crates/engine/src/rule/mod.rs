//! 규칙 정의 -- XML 기반 패턴/스코프/템플릿 정의 및 해석
//!
//! 규칙 정의 문서는 두 단계로 처리합니다. 먼저 모든 `Template`/`Target`을 이름 키 테이블
//! ([`RuleSet`])로 읽어 들이고, 그 다음 필요한 타겟을 [`RuleTree`]로 해석합니다.
//! 템플릿은 뒤에 선언된 다른 템플릿을 참조할 수 있습니다.
//!
//! # 규칙 형식
//! ```xml
//! <Root>
//!   <Template Name="MSVC">
//!     <Patterns Name="MSVC Errors" Severity="Error" Tags="MSVC">
//!       <Include Style="Regex">error (C|LNK)\d+</Include>
//!     </Patterns>
//!   </Template>
//!   <Target Name="BuildCookRun">
//!     <Scope Name="Build">
//!       <Start>BUILD COMMAND STARTED</Start>
//!       <End SuccessFlags="auto">BUILD COMMAND COMPLETED</End>
//!       <Link Template="MSVC"/>
//!     </Scope>
//!   </Target>
//! </Root>
//! ```
//!
//! # 아키텍처
//! - [`RuleSet`]: 템플릿/타겟 테이블
//! - [`loader`]: XML 문서 로딩 및 유효성 검증
//! - [`pattern`]: 컴파일된 단일 패턴과 캡처 추출
//! - [`matcher`]: 패턴 리스트 매칭 (Include/Exclude)
//! - [`resolver`]: Link 펼치기, 순환 검출
//! - [`types`]: 규칙 데이터 구조 정의

pub mod loader;
pub mod matcher;
pub mod pattern;
pub mod resolver;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::{LineMatcher, MatchResult};
pub use pattern::{Flag, FlagSet, Pattern, PatternStyle, Polarity, Variables};
pub use resolver::{RuleTree, RuleTreeResolver, ScopeNode};
pub use types::{Entry, EntryKind, PatternList, ScopeDef, TargetDef, TemplateDef};

use std::collections::BTreeMap;

use crate::error::LogParseError;

/// 템플릿/타겟 이름 키 테이블
///
/// 로딩 1단계의 결과입니다. Link는 아직 이름 참조로 남아 있습니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    source: String,
    templates: BTreeMap<String, TemplateDef>,
    targets: BTreeMap<String, TargetDef>,
}

impl RuleSet {
    /// 빈 규칙 집합을 생성합니다.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// 문서 출처
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 템플릿을 추가합니다. 이름이 중복되면 에러를 반환합니다.
    pub fn add_template(&mut self, template: TemplateDef) -> Result<(), LogParseError> {
        if self.templates.contains_key(&template.name) {
            return Err(LogParseError::DefinitionLoad {
                path: self.source.clone(),
                reason: format!("duplicate template name '{}'", template.name),
            });
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// 타겟을 추가합니다. 이름이 중복되면 에러를 반환합니다.
    pub fn add_target(&mut self, target: TargetDef) -> Result<(), LogParseError> {
        if self.targets.contains_key(&target.name) {
            return Err(LogParseError::DefinitionLoad {
                path: self.source.clone(),
                reason: format!("duplicate target name '{}'", target.name),
            });
        }
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    pub fn template(&self, name: &str) -> Option<&TemplateDef> {
        self.templates.get(name)
    }

    pub fn target(&self, name: &str) -> Option<&TargetDef> {
        self.targets.get(name)
    }

    /// 이름순 템플릿 목록
    pub fn templates(&self) -> impl Iterator<Item = &TemplateDef> {
        self.templates.values()
    }

    /// 이름순 타겟 목록
    pub fn targets(&self) -> impl Iterator<Item = &TargetDef> {
        self.targets.values()
    }

    /// 타겟 하나를 규칙 트리로 해석합니다.
    pub fn resolve(&self, target: &str) -> Result<RuleTree, LogParseError> {
        RuleTreeResolver::new(self).resolve(target)
    }

    /// 모든 타겟을 해석하여 타겟별 결과를 반환합니다.
    pub fn resolve_all(&self) -> Vec<(String, Result<RuleTree, LogParseError>)> {
        self.targets
            .keys()
            .map(|name| (name.clone(), self.resolve(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopelog_core::types::Severity;

    fn msvc_template() -> TemplateDef {
        TemplateDef {
            name: "MSVC".to_owned(),
            entries: vec![Entry::patterns(
                PatternList::new("MSVC Errors", Severity::Error)
                    .include(Pattern::regex(r"error (C|LNK)\d+").unwrap()),
            )],
        }
    }

    #[test]
    fn duplicate_template_is_rejected() {
        let mut rules = RuleSet::new("dup.xml");
        rules.add_template(msvc_template()).unwrap();
        let err = rules.add_template(msvc_template()).unwrap_err();
        assert!(err.to_string().contains("duplicate template name 'MSVC'"));
        assert!(err.to_string().contains("dup.xml"));
    }

    #[test]
    fn resolve_all_reports_each_target() {
        let mut rules = RuleSet::new("test");
        rules.add_template(msvc_template()).unwrap();
        rules
            .add_target(TargetDef {
                name: "Good".to_owned(),
                entries: vec![Entry::link("MSVC")],
            })
            .unwrap();
        rules
            .add_target(TargetDef {
                name: "Broken".to_owned(),
                entries: vec![Entry::link("Missing")],
            })
            .unwrap();

        let results = rules.resolve_all();
        assert_eq!(results.len(), 2);
        // 이름순
        assert_eq!(results[0].0, "Broken");
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
    }
}
