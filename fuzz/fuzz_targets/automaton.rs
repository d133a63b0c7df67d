#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use scopelog_engine::{LogParser, RuleLoader};

static PARSER: LazyLock<Option<LogParser>> = LazyLock::new(|| {
    let rules = RuleLoader::parse_xml(
        include_str!("../../crates/engine/rules/logparse_patterns.xml"),
        "logparse_patterns.xml",
    )
    .ok()?;
    LogParser::builder()
        .rule_set(rules)
        .target("BuildCookRun")
        .build()
        .ok()
});

fuzz_target!(|data: &[u8]| {
    let Some(parser) = PARSER.as_ref() else {
        return;
    };

    // 잘못된 UTF-8은 파일 입력과 같이 대체 문자로 처리
    let text = String::from_utf8_lossy(data);
    let parsed = parser.parse_str("fuzz", &text);

    // 입력이 끝나면 모든 스코프가 닫혀 있어야 함
    parsed.root.walk(&mut |_, scope| {
        assert_ne!(scope.status, scopelog_engine::ScopeStatus::Open);
    });
    let _ = parsed.root.render_text(0);
});
