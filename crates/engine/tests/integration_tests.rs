//! 통합 테스트 -- 규칙 로딩부터 리포트 생성까지의 전체 흐름 검증

use std::path::PathBuf;

use scopelog_core::types::Severity;
use scopelog_engine::report::{MatchListReport, ReportFilter, ScopeReport};
use scopelog_engine::{
    EngineConfig, LogParseError, LogParser, ParsedLog, RuleLoader, ScopeStatus,
};

const TEAMCITY_RULES: &str = r#"<Root>
  <Template Name="TeamCityStart">
    <Scope Name="TC Start Boilerplate" RequireAllLinesMatch="true">
      <Start>Build '</Start>
      <End>##never##</End>
      <Patterns Name="TeamCity" Hidden="true"><Include>TeamCity</Include></Patterns>
    </Scope>
  </Template>
  <Template Name="MSVC">
    <Patterns Name="MSVC Errors" Severity="Error" __FLAGS__>
      <Include Style="Regex">error (C|LNK)\d+</Include>
    </Patterns>
  </Template>
  <Target Name="BuildCookRun">
    <Scope Name="Build">
      <Start>********** BUILD COMMAND STARTED **********</Start>
      <End SuccessFlags="auto">********** BUILD COMMAND COMPLETED **********</End>
      <Link Template="MSVC"/>
    </Scope>
    <Link Template="TeamCityStart"/>
  </Target>
</Root>"#;

const TEAMCITY_LOG: &[&str] = &[
    "Build '123' CL, branch 'main'",
    "TeamCity server version is 1.0",
    "********** BUILD COMMAND STARTED **********",
    "error LNK2019: unresolved external",
    "********** BUILD COMMAND COMPLETED **********",
];

fn parse(xml: &str, target: &str, lines: &[&str]) -> ParsedLog {
    let rules = RuleLoader::parse_xml(xml, "inline").expect("rules should load");
    let parser = LogParser::builder()
        .rule_set(rules)
        .target(target)
        .build()
        .expect("target should resolve");
    parser.parse_str("test_log", &lines.join("\n"))
}

fn list<'r>(scope: &'r ScopeReport, name: &str) -> &'r MatchListReport {
    scope
        .match_lists
        .iter()
        .find(|l| l.name == name)
        .unwrap_or_else(|| panic!("no match list named {name}"))
}

fn bundled_rules_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("rules/logparse_patterns.xml")
}

/// TeamCity 머리말 건너뛰기 + Build 스코프 시나리오
#[test]
fn teamcity_boilerplate_then_build_scope() {
    let parsed = parse(
        &TEAMCITY_RULES.replace("__FLAGS__", ""),
        "BuildCookRun",
        TEAMCITY_LOG,
    );

    let names: Vec<_> = parsed.root.child_scopes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["TC Start Boilerplate", "Build"]);

    let tc = &parsed.root.child_scopes[0];
    assert_eq!(tc.status, ScopeStatus::ClosedNeutral);
    assert_eq!(list(tc, "TeamCity").lines.len(), 1);
    assert!(list(tc, "TeamCity").hidden);

    let build = parsed.root.find(&["Build"]).unwrap();
    assert_eq!(build.status, ScopeStatus::ClosedSuccess);
    let errors = list(build, "MSVC Errors");
    assert_eq!(errors.lines.len(), 1);
    assert_eq!(errors.lines[0].line, "error LNK2019: unresolved external");
    assert_eq!(errors.lines[0].occurences, 1);
    assert_eq!(errors.lines[0].severity, Severity::Error);
    assert_eq!(errors.lines[0].line_nr, 3);

    assert!(parsed.summary.unterminated_scopes.is_empty());
}

/// 패턴 리스트에 auto 실패 플래그가 있으면 COMPLETED 마커보다 우선
#[test]
fn auto_failure_binding_overrides_completed_marker() {
    let parsed = parse(
        &TEAMCITY_RULES.replace("__FLAGS__", r#"FailureFlags="auto""#),
        "BuildCookRun",
        TEAMCITY_LOG,
    );
    let build = parsed.root.find(&["Build"]).unwrap();
    assert_eq!(build.status, ScopeStatus::ClosedFailure);
    assert!(parsed.root.has_failure());
}

/// 같은 경고가 10, 25번 라인에 나오면 하나로 합쳐짐
#[test]
fn repeated_warning_is_aggregated_once() {
    let xml = r#"<Root><Target Name="T">
        <Scope Name="Cook">
          <Start>COOK START</Start>
          <End>COOK END</End>
          <Patterns Name="Cook Warnings" Severity="Warning">
            <Include>LogCook: Warning:</Include>
          </Patterns>
        </Scope>
    </Target></Root>"#;

    let warning = "LogCook: Warning: Package /Game/Maps/Entry has no thumbnail";
    let mut lines: Vec<String> = (0..30).map(|i| format!("LogCook: Display: step {i}")).collect();
    lines[0] = "COOK START".to_owned();
    lines[10] = warning.to_owned();
    lines[25] = warning.to_owned();
    lines[29] = "COOK END".to_owned();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();

    let parsed = parse(xml, "T", &lines);
    let cook = parsed.root.find(&["Cook"]).unwrap();
    let warnings = list(cook, "Cook Warnings");
    assert_eq!(warnings.lines.len(), 1);
    assert_eq!(warnings.lines[0].occurences, 2);
    assert_eq!(warnings.lines[0].line_nr, 10);
}

/// 템플릿 Link와 내용을 직접 펼친 타겟은 같은 리포트를 만듦
#[test]
fn linked_templates_match_inlined_contents() {
    let linked = r#"<Root>
      <Template Name="Errors">
        <Patterns Name="Errors" Severity="Error"><Include>error</Include></Patterns>
        <Scope Name="Link">
          <Start>Linking</Start><End>Link done</End>
          <Patterns Name="Linker" Severity="Error"><Include>LNK</Include></Patterns>
        </Scope>
      </Template>
      <Template Name="Warnings">
        <Patterns Name="Warnings" Severity="Warning"><Include>warning</Include></Patterns>
      </Template>
      <Target Name="T"><Link Template="Errors"/><Link Template="Warnings"/></Target>
    </Root>"#;
    let inlined = r#"<Root>
      <Target Name="T">
        <Patterns Name="Errors" Severity="Error"><Include>error</Include></Patterns>
        <Patterns Name="Warnings" Severity="Warning"><Include>warning</Include></Patterns>
        <Scope Name="Link">
          <Start>Linking</Start><End>Link done</End>
          <Patterns Name="Linker" Severity="Error"><Include>LNK</Include></Patterns>
        </Scope>
      </Target>
    </Root>"#;

    let lines = [
        "warning: deprecated call",
        "Linking",
        "error LNK2019: unresolved external",
        "Link done",
        "error: something else",
        "warning and error on one line",
    ];

    let a = parse(linked, "T", &lines);
    let b = parse(inlined, "T", &lines);
    assert_eq!(a.root, b.root);
    assert_eq!(list(&a.root, "Errors").lines.len(), 2);
}

/// 같은 타겟을 두 번 해석하면 구조적으로 같은 트리
#[test]
fn resolving_twice_is_deterministic() {
    let rules = RuleLoader::parse_xml(&TEAMCITY_RULES.replace("__FLAGS__", ""), "inline").unwrap();
    let first = rules.resolve("BuildCookRun").unwrap();
    let second = rules.resolve("BuildCookRun").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.outline(), second.outline());
}

/// Exclude는 Include 순서와 관계없이 매칭을 막음
#[test]
fn exclude_wins_regardless_of_include_order() {
    for includes in [
        "<Include>warning</Include><Include>C4996</Include>",
        "<Include>C4996</Include><Include>warning</Include>",
    ] {
        let xml = format!(
            r#"<Root><Target Name="T">
              <Patterns Name="W" Severity="Warning">{includes}<Exclude>deprecated</Exclude></Patterns>
            </Target></Root>"#
        );
        let parsed = parse(
            &xml,
            "T",
            &["warning C4996: 'strcpy' was deprecated", "warning C4996: other"],
        );
        let lines = &list(&parsed.root, "W").lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line, "warning C4996: other");
    }
}

#[test]
fn cyclic_links_are_rejected_with_chain() {
    let xml = r#"<Root>
      <Template Name="A"><Link Template="B"/></Template>
      <Template Name="B"><Link Template="A"/></Template>
      <Target Name="T"><Link Template="A"/></Target>
    </Root>"#;
    let rules = RuleLoader::parse_xml(xml, "inline").unwrap();
    let err = rules.resolve("T").unwrap_err();
    assert!(matches!(err, LogParseError::CyclicReference { .. }));
    assert!(err.to_string().contains("A -> B -> A"));
    assert!(err.is_load_error());
}

#[test]
fn unknown_template_names_the_referrer() {
    let xml = r#"<Root>
      <Target Name="T">
        <Patterns Name="p"><Include>x</Include></Patterns>
        <Scope Name="Build"><Start>s</Start><End>e</End><Link Template="Missing"/></Scope>
      </Target>
    </Root>"#;
    let rules = RuleLoader::parse_xml(xml, "inline").unwrap();
    let err = LogParser::builder()
        .rule_set(rules)
        .target("T")
        .build()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Missing"));
    assert!(message.contains("Build"));
}

#[test]
fn invalid_regex_fails_before_any_log_is_read() {
    let xml = r#"<Root><Target Name="T">
        <Patterns Name="Broken List" Severity="Error"><Include Style="Regex">([a-</Include></Patterns>
    </Target></Root>"#;
    let err = RuleLoader::parse_xml(xml, "inline").unwrap_err();
    assert!(matches!(err, LogParseError::PatternCompile { .. }));
    assert!(err.to_string().contains("Broken List"));
}

#[test]
fn report_json_uses_viewer_field_names() {
    let parsed = parse(
        &TEAMCITY_RULES.replace("__FLAGS__", ""),
        "BuildCookRun",
        TEAMCITY_LOG,
    );
    let mut report = scopelog_engine::Report::new();
    report.insert(parsed.source_id.clone(), parsed.root);

    let json = serde_json::to_value(&report).unwrap();
    let build = &json["test_log"]["child_scopes"][1];
    assert_eq!(build["name"], "Build");
    assert_eq!(build["status"], "closed_success");
    let line = &build["match_lists"][0]["lines"][0];
    assert_eq!(line["occurences"], 1);
    assert_eq!(line["severity"], "Error");
    assert_eq!(line["line_nr"], 3);
    assert!(line["strings"].as_object().unwrap().is_empty());
}

#[test]
fn filter_keeps_scopes_but_drops_quiet_lists() {
    let parsed = parse(
        &TEAMCITY_RULES.replace("__FLAGS__", ""),
        "BuildCookRun",
        TEAMCITY_LOG,
    );
    let filtered = parsed.root.filter(&ReportFilter {
        tags: Vec::new(),
        min_severity: Severity::Warning,
        min_matches: 1,
    });
    assert_eq!(filtered.child_scopes.len(), 2);
    assert!(filtered.child_scopes[0].match_lists.is_empty());
    assert_eq!(filtered.child_scopes[1].match_lists.len(), 1);
}

/// 동봉된 규칙 파일로 실제 형태의 UAT 로그를 처리
#[tokio::test]
async fn bundled_rules_parse_build_cook_run_log() {
    let rules = RuleLoader::load_file(bundled_rules_path(), 10 * 1024 * 1024)
        .await
        .expect("bundled rules should load");
    for (target, resolved) in rules.resolve_all() {
        assert!(resolved.is_ok(), "target {target} failed: {resolved:?}");
    }

    let log = [
        "Build '123' CL, branch 'main'",
        "TeamCity server version is 2024.1",
        "********** BUILD COMMAND STARTED **********",
        r#"Running UnrealBuildTool: dotnet "UnrealBuildTool.dll" Game Win64 Development"#,
        "[1/3] Compile Module.Game.cpp",
        r"D:\Game\Source\Game.cpp(12): error C2065: 'foo': undeclared identifier",
        r"D:\Game\Source\Game.cpp(12): error C2065: 'foo': undeclared identifier",
        "Result: Failed (OtherCompilationError)",
        "Total execution time: 12,5 seconds",
        "********** BUILD COMMAND COMPLETED **********",
        "********** COOK COMMAND STARTED **********",
        "LogCook: Display: Cooking for platform Win64",
        "LogCook: Warning: Missing asset /Game/Foo",
        "LogLinker: Warning: Unable to load package /Game/Bar",
        "LogCook: Display: Cooked 42 packages",
        "********** COOK COMMAND COMPLETED **********",
        "AutomationTool exiting with ExitCode=1 (Error_Unknown)",
    ];

    let parser = LogParser::builder()
        .rule_set(rules)
        .target("BuildCookRun")
        .build()
        .unwrap();
    let parsed = parser.parse_str("Build_log", &log.join("\n"));
    let root = &parsed.root;

    let names: Vec<_> = root.child_scopes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["TeamCity Boilerplate", "Build", "Win64"]);
    assert!(root.child_scopes[0].hidden);

    // 이름 있는 플래그 CompileFailed가 COMPLETED 마커의 성공보다 우선
    let build = root.find(&["Build"]).unwrap();
    assert_eq!(build.status, ScopeStatus::ClosedFailure);

    let compile = build.find(&["Compile"]).unwrap();
    assert_eq!(compile.status, ScopeStatus::ClosedFailure);
    assert_eq!(compile.end.as_ref().unwrap().numerics["seconds"], 12.5);
    let msvc = list(compile, "MSVC Errors");
    assert_eq!(msvc.lines[0].occurences, 2);
    assert_eq!(msvc.lines[0].line_nr, 5);
    let actions = list(compile, "Compiled Actions");
    assert_eq!(actions.lines[0].numerics["total"], 3.0);

    let cook = root.find(&["Win64"]).unwrap();
    assert_eq!(cook.status, ScopeStatus::ClosedSuccess);
    let warnings = list(cook, "Log Warnings");
    assert_eq!(warnings.lines.len(), 1);
    assert_eq!(warnings.lines[0].strings["category"], "LogCook");
    assert_eq!(list(cook, "Cook Statistics").lines[1].numerics["packages"], 42.0);

    assert_eq!(list(root, "AutomationTool Result").lines[0].line_nr, 16);

    assert_eq!(parsed.summary.lines_processed, 17);
    assert_eq!(parsed.summary.tag_counts["MSVC"], 2);
    assert_eq!(parsed.summary.unclaimed_flags, 0);
    assert!(parsed.summary.unterminated_scopes.is_empty());

    let text = root.render_text(10);
    assert!(!text.contains("TeamCity"));
    assert!(text.contains("### [BuildCookRun.Build.Compile] Error MSVC Errors (1/1) <MSVC;CPP> ###"));
    assert!(text.contains("undeclared identifier (x2)"));
}

/// TeamCity 머리말 정규식의 끝 공백이 유지되어 BuildGraph 라인을 삼키지 않음
#[tokio::test]
async fn teamcity_header_requires_trailing_space() {
    let rules = RuleLoader::load_file(bundled_rules_path(), 10 * 1024 * 1024)
        .await
        .expect("bundled rules should load");
    let parser = LogParser::builder()
        .rule_set(rules)
        .target("BuildCookRun")
        .build()
        .unwrap();
    let parsed = parser.parse_str("Build_log", "Build '1' x\nBuildGraph: starting");

    let tc = parsed.root.find(&["TeamCity Boilerplate"]).unwrap();
    assert_eq!(tc.status, ScopeStatus::ClosedNeutral);
    assert!(!tc.match_lists.is_empty());
    for list in &tc.match_lists {
        assert!(list.lines.is_empty(), "{} absorbed {:?}", list.name, list.lines);
    }
    assert_eq!(parsed.summary.lines_matched, 0);
}

/// 여러 파일 동시 처리 결과는 파일 이름 식별자로 묶임
#[tokio::test]
async fn parse_files_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("Build (1).log");
    let second = dir.path().join("Editor.log");
    std::fs::write(&first, "LogInit: Error: missing module\n").unwrap();
    std::fs::write(&second, "LogInit: Warning: slow startup\nFatal error: crash\n").unwrap();

    let config = EngineConfig {
        rules_path: bundled_rules_path().display().to_string(),
        target: "Editor".to_owned(),
        max_concurrent_files: 1,
        ..EngineConfig::default()
    };
    let parser = LogParser::from_config(config).await.unwrap();
    let outcome = parser.parse_files(&[first, second]).await.unwrap();

    let ids: Vec<_> = outcome.report.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["Build__1__log", "Editor_log"]);
    assert_eq!(outcome.summaries[1].severity_count(Severity::Fatal), 1);
    assert_eq!(outcome.lines_matched(), 3);
}
