//! 로그 파서 -- 규칙 트리 하나로 여러 로그 파일을 처리
//!
//! [`LogParser`]는 해석된 [`RuleTree`]를 `Arc`로 소유하며, 파일마다 독립된
//! [`ScopeAutomaton`]을 만들어 처리합니다. 파일 간에 공유되는 가변 상태는 없으므로
//! 여러 파일을 블로킹 스레드 풀에서 동시에 처리할 수 있습니다.
//!
//! # 사용 예시
//! ```ignore
//! use scopelog_engine::{EngineConfig, LogParser};
//!
//! let parser = LogParser::from_config(EngineConfig::default()).await?;
//! let outcome = parser.parse_files(&["Build.log".into(), "Cook.log".into()]).await?;
//! outcome.report.write_json(std::io::stdout())?;
//! ```

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::error::LogParseError;
use crate::report::{Report, source_file_id};
use crate::rule::{RuleLoader, RuleSet, RuleTree};
use crate::scope::{ParsedLog, ScopeAutomaton};
use crate::summary::ParseSummary;

/// 여러 로그 파일의 처리 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    /// 원본 로그 식별자별 루트 스코프
    pub report: Report,
    /// 입력 순서의 파일별 요약
    pub summaries: Vec<ParseSummary>,
}

impl ParseOutcome {
    fn push(&mut self, parsed: ParsedLog) {
        self.report.insert(parsed.source_id, parsed.root);
        self.summaries.push(parsed.summary);
    }

    /// 모든 파일의 매칭 라인 수 합계
    pub fn lines_matched(&self) -> u64 {
        self.summaries.iter().map(|s| s.lines_matched).sum()
    }
}

/// 해석된 규칙 트리를 공유하는 로그 파서
#[derive(Debug, Clone)]
pub struct LogParser {
    tree: Arc<RuleTree>,
    config: EngineConfig,
}

impl LogParser {
    /// 빌더를 생성합니다.
    pub fn builder() -> LogParserBuilder {
        LogParserBuilder::new()
    }

    /// 설정의 규칙 파일을 로드하고 타겟을 해석하여 파서를 생성합니다.
    pub async fn from_config(config: EngineConfig) -> Result<Self, LogParseError> {
        config.validate()?;
        let rules = RuleLoader::load_file(&config.rules_path, config.max_rule_file_bytes).await?;
        LogParserBuilder::new().config(config).rule_set(rules).build()
    }

    pub fn rule_tree(&self) -> &Arc<RuleTree> {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 메모리상의 로그 텍스트를 처리합니다.
    pub fn parse_str(&self, source_id: impl Into<String>, text: &str) -> ParsedLog {
        let mut automaton = ScopeAutomaton::new(&self.tree, source_id);
        for line in text.lines() {
            automaton.feed_line(line);
        }
        automaton.finish()
    }

    /// 라인 단위 reader를 처리합니다. 잘못된 UTF-8은 대체 문자로 바뀝니다.
    pub fn parse_reader<R: BufRead>(
        &self,
        source_id: impl Into<String>,
        reader: R,
    ) -> Result<ParsedLog, LogParseError> {
        parse_lines(&self.tree, source_id.into(), reader)
    }

    /// 로그 파일 하나를 처리합니다. 식별자는 파일 이름에서 만듭니다.
    pub async fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParsedLog, LogParseError> {
        let path = path.as_ref().to_path_buf();
        let source_id = source_file_id(&file_name_of(&path));
        let tree = Arc::clone(&self.tree);

        tokio::task::spawn_blocking(move || parse_path(&tree, source_id, &path))
            .await
            .map_err(|e| LogParseError::Io(std::io::Error::other(e)))?
    }

    /// 여러 로그 파일을 `max_concurrent_files`개까지 동시에 처리합니다.
    ///
    /// 결과는 입력 순서와 무관하게 결정적입니다. 같은 식별자가 나오면
    /// 두 번째부터 `_2`, `_3` 접미사가 붙습니다.
    ///
    /// # Errors
    /// 읽지 못한 파일이 있으면 모든 작업이 끝난 뒤 입력 순서상 가장 앞선
    /// 파일의 에러를 반환합니다.
    pub async fn parse_files(&self, paths: &[PathBuf]) -> Result<ParseOutcome, LogParseError> {
        let ids = unique_source_ids(paths);
        let limit = self.config.max_concurrent_files.max(1);
        let mut results: Vec<Option<Result<ParsedLog, LogParseError>>> =
            Vec::with_capacity(paths.len());
        results.resize_with(paths.len(), || None);
        let mut join_error = None;

        let mut tasks = JoinSet::new();
        let mut pending = paths.iter().cloned().zip(ids).enumerate();

        loop {
            while tasks.len() < limit {
                let Some((idx, (path, source_id))) = pending.next() else {
                    break;
                };
                let tree = Arc::clone(&self.tree);
                tasks.spawn_blocking(move || (idx, parse_path(&tree, source_id, &path)));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok((idx, parsed)) => results[idx] = Some(parsed),
                Err(e) => {
                    join_error.get_or_insert(LogParseError::Io(std::io::Error::other(e)));
                }
            }
        }

        let mut parsed_logs = Vec::with_capacity(results.len());
        for result in results.into_iter().flatten() {
            parsed_logs.push(result?);
        }
        if let Some(e) = join_error {
            return Err(e);
        }

        let mut outcome = ParseOutcome::default();
        for parsed in parsed_logs {
            outcome.push(parsed);
        }

        tracing::info!(
            files = paths.len(),
            rule_target = %self.tree.target(),
            lines_matched = outcome.lines_matched(),
            "log files parsed"
        );

        Ok(outcome)
    }
}

/// [`LogParser`] 빌더
///
/// 규칙 집합(`rule_set`)이나 이미 해석된 트리(`rule_tree`) 중 하나가 필요합니다.
#[derive(Debug, Default)]
pub struct LogParserBuilder {
    config: EngineConfig,
    rules: Option<RuleSet>,
    tree: Option<RuleTree>,
    target: Option<String>,
}

impl LogParserBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 타겟을 해석할 규칙 집합을 지정합니다.
    pub fn rule_set(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// 이미 해석된 규칙 트리를 지정합니다. 규칙 집합보다 우선합니다.
    pub fn rule_tree(mut self, tree: RuleTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// 설정의 타겟 이름을 덮어씁니다.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// 파서를 빌드합니다.
    pub fn build(mut self) -> Result<LogParser, LogParseError> {
        if let Some(target) = self.target.take() {
            self.config.target = target;
        }
        self.config.validate()?;

        let tree = match (self.tree, self.rules) {
            (Some(tree), _) => tree,
            (None, Some(rules)) => rules.resolve(&self.config.target)?,
            (None, None) => {
                return Err(LogParseError::Config {
                    field: "rules".to_owned(),
                    reason: "either a rule set or a resolved rule tree is required".to_owned(),
                });
            }
        };

        tracing::debug!(
            rule_target = %tree.target(),
            patterns = tree.pattern_count(),
            "log parser built"
        );

        Ok(LogParser {
            tree: Arc::new(tree),
            config: self.config,
        })
    }
}

fn parse_lines<R: BufRead>(
    tree: &RuleTree,
    source_id: String,
    mut reader: R,
) -> Result<ParsedLog, LogParseError> {
    let mut automaton = ScopeAutomaton::new(tree, source_id);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        automaton.feed_line(&String::from_utf8_lossy(&buf));
    }
    Ok(automaton.finish())
}

fn parse_path(tree: &RuleTree, source_id: String, path: &Path) -> Result<ParsedLog, LogParseError> {
    let file = std::fs::File::open(path).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "failed to open log file");
        io_error_at(path, e)
    })?;
    parse_lines(tree, source_id, std::io::BufReader::new(file)).map_err(|e| match e {
        LogParseError::Io(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read log file");
            LogParseError::Io(io_error_at(path, e))
        }
        other => other,
    })
}

/// 에러 메시지 앞에 파일 경로를 붙입니다.
fn io_error_at(path: &Path, e: std::io::Error) -> std::io::Error {
    std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 입력 순서대로 충돌 없는 식별자를 만듭니다.
fn unique_source_ids(paths: &[PathBuf]) -> Vec<String> {
    let mut used = BTreeSet::new();
    paths
        .iter()
        .map(|path| {
            let base = source_file_id(&file_name_of(path));
            let mut id = base.clone();
            let mut suffix = 2;
            while !used.insert(id.clone()) {
                id = format!("{base}_{suffix}");
                suffix += 1;
            }
            id
        })
        .collect()
}
