//! 규칙 파일 로더 -- XML 규칙 정의 문서를 디스크에서 로드합니다.
//!
//! 문서 구조 위반, 잘못된 정규식, 알 수 없는 심각도는 모두 로딩 에러이며
//! 어떤 로그도 처리하기 전에 실행을 중단시킵니다. 에러 메시지에는 문제가 된
//! 템플릿/패턴 리스트/스코프 이름과 문서상의 줄 번호가 포함됩니다.

use std::path::Path;

use roxmltree::{Document, Node};

use scopelog_core::types::Severity;

use super::RuleSet;
use super::pattern::{Flag, FlagSet, Pattern, PatternStyle};
use super::types::{Entry, PatternList, ScopeDef, TargetDef, TemplateDef};
use crate::error::LogParseError;

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// XML 규칙 파일을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 `max_bytes`보다 큰 경우
    /// - 문서가 올바른 XML이 아니거나 스키마를 위반한 경우
    /// - 패턴 컴파일에 실패한 경우
    pub async fn load_file(
        path: impl AsRef<Path>,
        max_bytes: u64,
    ) -> Result<RuleSet, LogParseError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata =
            tokio::fs::metadata(path)
                .await
                .map_err(|e| LogParseError::DefinitionLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file metadata: {e}"),
                })?;

        if metadata.len() > max_bytes {
            return Err(LogParseError::DefinitionLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {max_bytes})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogParseError::DefinitionLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let rules = Self::parse_xml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            templates = rules.templates().count(),
            targets = rules.targets().count(),
            "loaded rule definitions"
        );

        Ok(rules)
    }

    /// XML 문자열을 파싱하여 규칙 집합을 생성합니다.
    ///
    /// 루트 요소의 이름은 검사하지 않으며, 루트의 직계 자식 중
    /// `Template`과 `Target`만 허용합니다.
    pub fn parse_xml(xml: &str, source: &str) -> Result<RuleSet, LogParseError> {
        let doc = Document::parse(xml).map_err(|e| LogParseError::DefinitionLoad {
            path: source.to_owned(),
            reason: format!("XML parse error: {e}"),
        })?;

        let reader = DocumentReader { doc: &doc, source };
        let root = doc.root_element();
        let mut rules = RuleSet::new(source);

        for node in elements(root) {
            match node.tag_name().name() {
                "Template" => {
                    let name = reader.required_attr(node, "Name", "<Template>")?;
                    let entries =
                        reader.entries(node, &format!("template '{name}'"), false)?;
                    rules.add_template(TemplateDef { name, entries })?;
                }
                "Target" => {
                    let name = reader.required_attr(node, "Name", "<Target>")?;
                    let entries = reader.entries(node, &format!("target '{name}'"), false)?;
                    rules.add_target(TargetDef { name, entries })?;
                }
                other => {
                    return Err(reader.error(
                        node,
                        format!(
                            "unexpected element <{other}> under <{}>",
                            root.tag_name().name()
                        ),
                    ));
                }
            }
        }

        if rules.targets().next().is_none() {
            return Err(LogParseError::DefinitionLoad {
                path: source.to_owned(),
                reason: "document declares no <Target>".to_owned(),
            });
        }

        Ok(rules)
    }
}

/// 요소 자식만 순회합니다 (텍스트, 주석 제외).
fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// 세미콜론 구분 목록. 공백을 제거하고 빈 항목은 버립니다.
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// 태그 목록 (대문자로 정규화)
fn split_tags(value: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in split_list(value) {
        let tag = tag.to_uppercase();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn flags_of(node: Node<'_, '_>) -> FlagSet {
    let parse = |attr: &str| -> Vec<Flag> {
        split_list(node.attribute(attr))
            .iter()
            .map(|s| Flag::parse(s))
            .collect()
    };
    FlagSet::new(parse("SuccessFlags"), parse("FailureFlags"))
}

struct DocumentReader<'a, 'input> {
    doc: &'a Document<'input>,
    source: &'a str,
}

impl DocumentReader<'_, '_> {
    fn line_of(&self, node: Node<'_, '_>) -> u32 {
        self.doc.text_pos_at(node.range().start).row
    }

    fn error(&self, node: Node<'_, '_>, reason: impl std::fmt::Display) -> LogParseError {
        LogParseError::DefinitionLoad {
            path: self.source.to_owned(),
            reason: format!("line {}: {reason}", self.line_of(node)),
        }
    }

    fn required_attr(
        &self,
        node: Node<'_, '_>,
        attr: &str,
        context: &str,
    ) -> Result<String, LogParseError> {
        match node.attribute(attr).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_owned()),
            _ => Err(self.error(node, format!("{context} requires a non-empty '{attr}' attribute"))),
        }
    }

    fn bool_attr(&self, node: Node<'_, '_>, attr: &str, owner: &str) -> Result<bool, LogParseError> {
        let Some(value) = node.attribute(attr) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            _ => Err(self.error(
                node,
                format!("invalid boolean '{value}' for '{attr}' in {owner}"),
            )),
        }
    }

    fn severity(&self, node: Node<'_, '_>, owner: &str) -> Result<Severity, LogParseError> {
        match node.attribute("Severity").map(str::trim) {
            None | Some("") => Ok(Severity::Message),
            Some(value) => value
                .parse::<Severity>()
                .map_err(|reason| self.error(node, format!("{owner}: {reason}"))),
        }
    }

    fn entries(
        &self,
        node: Node<'_, '_>,
        owner: &str,
        in_scope: bool,
    ) -> Result<Vec<Entry>, LogParseError> {
        let mut entries = Vec::new();
        for child in elements(node) {
            match child.tag_name().name() {
                "Patterns" => entries.push(Entry::patterns(self.pattern_list(child)?)),
                "Scope" => entries.push(Entry::Scope(self.scope(child)?)),
                "Link" => {
                    let template = self.required_attr(child, "Template", "<Link>")?;
                    entries.push(Entry::Link(template));
                }
                "Start" | "End" if in_scope => {}
                other => {
                    return Err(self.error(child, format!("unexpected element <{other}> in {owner}")));
                }
            }
        }
        Ok(entries)
    }

    fn pattern_list(&self, node: Node<'_, '_>) -> Result<PatternList, LogParseError> {
        let name = self.required_attr(node, "Name", "<Patterns>")?;
        let owner = format!("pattern list '{name}'");

        let mut list = PatternList::new(name, self.severity(node, &owner)?)
            .with_tags(split_tags(node.attribute("Tags")))
            .with_flags(flags_of(node))
            .hidden(self.bool_attr(node, "Hidden", &owner)?);

        for child in elements(node) {
            match child.tag_name().name() {
                "Include" => list = list.include(self.pattern(child, &owner)?),
                "Exclude" => list = list.exclude(self.pattern(child, &owner)?),
                other => {
                    return Err(self.error(child, format!("unexpected element <{other}> in {owner}")));
                }
            }
        }

        if list.includes().next().is_none() {
            return Err(self.error(node, format!("{owner} has no <Include> pattern")));
        }

        Ok(list)
    }

    fn scope(&self, node: Node<'_, '_>) -> Result<ScopeDef, LogParseError> {
        let name = self.required_attr(node, "Name", "<Scope>")?;
        let owner = format!("scope '{name}'");

        let mut start = Vec::new();
        let mut end = Vec::new();
        for child in elements(node) {
            match child.tag_name().name() {
                "Start" => start.push(
                    self.pattern(child, &owner)?
                        .with_severity(self.severity(child, &owner)?),
                ),
                "End" => end.push(
                    self.pattern(child, &owner)?
                        .with_severity(self.severity(child, &owner)?),
                ),
                _ => {}
            }
        }
        if start.is_empty() {
            return Err(self.error(node, format!("{owner} needs at least one <Start> pattern")));
        }
        if end.is_empty() {
            return Err(self.error(node, format!("{owner} needs at least one <End> pattern")));
        }

        let mut def = ScopeDef::new(name, start, end)
            .require_all_lines_match(self.bool_attr(node, "RequireAllLinesMatch", &owner)?);
        if let Some(var) = node
            .attribute("DisplayNameVariable")
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            def = def.display_name_variable(var);
        }
        def.hidden = self.bool_attr(node, "Hidden", &owner)?;
        def.entries = self.entries(node, &owner, true)?;

        Ok(def)
    }

    fn pattern(&self, node: Node<'_, '_>, owner: &str) -> Result<Pattern, LogParseError> {
        let text = node.text().unwrap_or("");

        let style = match node.attribute("Style") {
            None => PatternStyle::Literal,
            Some(value) => PatternStyle::parse(value).ok_or_else(|| {
                self.error(node, format!("unknown Style '{value}' in {owner}"))
            })?,
        };

        let pattern = Pattern::compile(
            text,
            style,
            split_list(node.attribute("StringVariables")),
            split_list(node.attribute("NumericVariables")),
        )
        .map_err(|reason| LogParseError::PatternCompile {
            owner: format!("{owner} (line {})", self.line_of(node)),
            pattern: text.to_owned(),
            reason,
        })?;

        Ok(pattern
            .with_tags(split_tags(node.attribute("Tags")))
            .with_flags(flags_of(node)))
    }
}
