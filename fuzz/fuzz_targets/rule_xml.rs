#![no_main]

use libfuzzer_sys::fuzz_target;
use scopelog_engine::RuleLoader;

fuzz_target!(|data: &[u8]| {
    // roxmltree는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(xml) = std::str::from_utf8(data)
        && let Ok(rules) = RuleLoader::parse_xml(xml, "fuzz-input.xml")
    {
        // 해석 실패(순환, 미정의 템플릿)는 에러로만 끝나야 함
        for (_, tree) in rules.resolve_all() {
            if let Ok(tree) = tree {
                let _ = tree.outline();
            }
        }
    }
});
