#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use scopelog_core::types::Severity;
use scopelog_engine::rule::{LineMatcher, Pattern, PatternList};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// Include/Exclude 패턴 (최대 8개로 제한)
    patterns: Vec<FuzzPattern>,
    /// 매칭 대상 라인
    lines: Vec<String>,
}

#[derive(Arbitrary, Debug)]
struct FuzzPattern {
    exclude: bool,
    regex: bool,
    source: String,
}

fuzz_target!(|input: FuzzInput| {
    let mut list = PatternList::new("Fuzz", Severity::Warning);
    for p in input.patterns.iter().take(8) {
        let pattern = if p.regex {
            // 컴파일 실패는 정상 경로
            match Pattern::regex(p.source.as_str()) {
                Ok(pattern) => pattern,
                Err(_) => continue,
            }
        } else {
            if p.source.is_empty() {
                continue;
            }
            Pattern::literal(p.source.as_str())
        };
        list = if p.exclude {
            list.exclude(pattern)
        } else {
            list.include(pattern)
        };
    }

    for line in input.lines.iter().take(64) {
        // 매칭된 라인은 어떤 Exclude에도 걸리지 않아야 함
        if LineMatcher::match_line(line, &list).is_some() {
            assert!(!list.excludes().any(|p| p.is_match(line)));
        }
    }
});
