//! 단일 매칭 규칙 -- 리터럴/정규식 패턴과 캡처 변수 추출
//!
//! [`Pattern`]은 규칙 정의 로딩 시 한 번 컴파일되고 이후 변경되지 않습니다.
//! 정규식은 생성 시점에 컴파일하여 매칭 시 재컴파일 오버헤드가 없습니다.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use scopelog_core::types::Severity;

/// 패턴 매칭 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PatternStyle {
    /// 대소문자를 구분하는 부분 문자열 포함 검사 (기본값)
    #[default]
    Literal,
    /// 라인 내 임의 위치에서의 정규식 검색
    Regex,
}

impl PatternStyle {
    /// 대소문자를 구분하지 않고 스타일 이름을 파싱합니다.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("literal") {
            Some(Self::Literal)
        } else if s.eq_ignore_ascii_case("regex") {
            Some(Self::Regex)
        } else {
            None
        }
    }

    /// 정규 표기
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "Literal",
            Self::Regex => "Regex",
        }
    }
}

/// 성공/실패 신호의 극성
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Polarity {
    Success,
    Failure,
}

/// 플래그 이름
///
/// `auto`는 이름이 아니라 "가장 가까운 스코프 자신의 상태"를 뜻하는 예약어입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    /// 바로 바깥 스코프의 종료 상태에만 영향을 줌
    Auto,
    /// 이 이름을 듣는 가장 가까운 조상 스코프로 전달되는 신호
    Named(String),
}

impl Flag {
    /// 플래그 이름을 파싱합니다. `auto`는 대소문자를 구분하지 않습니다.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Named(s.to_owned())
        }
    }

    /// 이름 있는 플래그의 이름
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::Named(name) => Some(name),
        }
    }
}

/// 성공/실패 플래그 묶음
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    /// 성공 플래그
    pub success: Vec<Flag>,
    /// 실패 플래그
    pub failure: Vec<Flag>,
}

impl FlagSet {
    /// 새 플래그 묶음을 생성합니다.
    pub fn new(success: Vec<Flag>, failure: Vec<Flag>) -> Self {
        Self { success, failure }
    }

    /// 플래그가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.failure.is_empty()
    }

    /// 모든 플래그를 극성과 함께 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&Flag, Polarity)> {
        self.success
            .iter()
            .map(|f| (f, Polarity::Success))
            .chain(self.failure.iter().map(|f| (f, Polarity::Failure)))
    }

    /// 이름 있는 플래그만 순회합니다.
    pub fn named(&self) -> impl Iterator<Item = (&str, Polarity)> {
        self.iter()
            .filter_map(|(flag, polarity)| flag.name().map(|name| (name, polarity)))
    }

    /// `auto` 플래그의 극성을 순회합니다.
    pub fn auto(&self) -> impl Iterator<Item = Polarity> {
        self.iter()
            .filter(|(flag, _)| **flag == Flag::Auto)
            .map(|(_, polarity)| polarity)
    }

    /// 다른 플래그 묶음을 합친 새 묶음을 반환합니다.
    pub fn union(&self, other: &FlagSet) -> FlagSet {
        let mut merged = self.clone();
        merged.success.extend(other.success.iter().cloned());
        merged.failure.extend(other.failure.iter().cloned());
        merged
    }
}

/// 캡처 그룹에서 추출한 변수
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Variables {
    /// 문자열 변수 (원문 그대로)
    pub strings: BTreeMap<String, String>,
    /// 숫자 변수 (쉼표 소수점은 '.'으로 정규화)
    pub numerics: BTreeMap<String, f64>,
}

impl Variables {
    /// 변수가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.numerics.is_empty()
    }

    /// 다른 변수 집합을 병합합니다. 같은 이름은 나중 값이 이깁니다.
    pub fn merge(&mut self, other: Variables) {
        self.strings.extend(other.strings);
        self.numerics.extend(other.numerics);
    }
}

/// 숫자로 해석하지 못한 캡처 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    /// 변수 이름
    pub variable: String,
    /// 캡처된 원문
    pub value: String,
}

/// 패턴 한 번의 매칭에서 얻은 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// 추출에 성공한 변수
    pub variables: Variables,
    /// 숫자 파싱에 실패한 캡처 (변수는 설정되지 않음)
    pub failures: Vec<CaptureFailure>,
}

/// 컴파일된 단일 패턴
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    style: PatternStyle,
    regex: Option<Regex>,
    string_variables: Vec<String>,
    numeric_variables: Vec<String>,
    tags: Vec<String>,
    flags: FlagSet,
    severity: Severity,
}

impl Pattern {
    /// 패턴을 컴파일합니다.
    ///
    /// # Errors
    /// 실패 사유 문자열을 반환합니다. 호출자가 소유자 정보를 붙여
    /// [`LogParseError::PatternCompile`](crate::error::LogParseError::PatternCompile)로 감쌉니다.
    /// - 패턴 원문이 비어 있거나 공백뿐인 경우 (앞뒤 공백 자체는 패턴의 일부로 유지)
    /// - 정규식 컴파일 실패
    /// - 변수가 정규식에 없는 이름 있는 캡처 그룹을 가리키는 경우
    /// - 리터럴 패턴이 변수를 선언한 경우
    pub fn compile(
        source: impl Into<String>,
        style: PatternStyle,
        string_variables: Vec<String>,
        numeric_variables: Vec<String>,
    ) -> Result<Self, String> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err("pattern text is empty".to_owned());
        }

        let regex = match style {
            PatternStyle::Literal => {
                if let Some(var) = string_variables.iter().chain(&numeric_variables).next() {
                    return Err(format!(
                        "literal pattern cannot declare capture variable '{var}'"
                    ));
                }
                None
            }
            PatternStyle::Regex => {
                let regex = Regex::new(&source).map_err(|e| e.to_string())?;
                let groups: Vec<&str> = regex.capture_names().flatten().collect();
                if let Some(var) = string_variables
                    .iter()
                    .chain(&numeric_variables)
                    .find(|var| !groups.contains(&var.as_str()))
                {
                    return Err(format!("variable '{var}' has no named capture group"));
                }
                Some(regex)
            }
        };

        Ok(Self {
            source,
            style,
            regex,
            string_variables,
            numeric_variables,
            tags: Vec::new(),
            flags: FlagSet::default(),
            severity: Severity::Message,
        })
    }

    /// 변수 없는 리터럴 패턴을 생성합니다. 빈 문자열은 모든 라인에 매칭됩니다.
    pub fn literal(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            style: PatternStyle::Literal,
            regex: None,
            string_variables: Vec::new(),
            numeric_variables: Vec::new(),
            tags: Vec::new(),
            flags: FlagSet::default(),
            severity: Severity::Message,
        }
    }

    /// 변수 없는 정규식 패턴을 컴파일합니다.
    pub fn regex(source: impl Into<String>) -> Result<Self, String> {
        Self::compile(source, PatternStyle::Regex, Vec::new(), Vec::new())
    }

    /// 태그를 지정합니다.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// 성공/실패 플래그를 지정합니다.
    pub fn with_flags(mut self, flags: FlagSet) -> Self {
        self.flags = flags;
        self
    }

    /// Start/End 마커의 심각도를 지정합니다.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn style(&self) -> PatternStyle {
        self.style
    }

    pub fn string_variables(&self) -> &[String] {
        &self.string_variables
    }

    pub fn numeric_variables(&self) -> &[String] {
        &self.numeric_variables
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// 라인이 이 패턴에 매칭되는지 검사합니다.
    pub fn is_match(&self, line: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(line),
            None => line.contains(self.source.as_str()),
        }
    }

    /// 매칭되면 캡처 변수를 추출합니다.
    ///
    /// 캡처 그룹이 참여하지 않은 경우 변수는 설정되지 않으며 에러가 아닙니다.
    pub fn extract(&self, line: &str) -> Option<Extraction> {
        let Some(regex) = &self.regex else {
            return line
                .contains(self.source.as_str())
                .then(Extraction::default);
        };

        if self.string_variables.is_empty() && self.numeric_variables.is_empty() {
            return regex.is_match(line).then(Extraction::default);
        }

        let caps = regex.captures(line)?;
        let mut extraction = Extraction::default();

        for var in &self.string_variables {
            if let Some(m) = caps.name(var) {
                extraction
                    .variables
                    .strings
                    .insert(var.clone(), m.as_str().to_owned());
            }
        }

        for var in &self.numeric_variables {
            let Some(m) = caps.name(var) else {
                continue;
            };
            match parse_numeric(m.as_str()) {
                Some(value) => {
                    extraction.variables.numerics.insert(var.clone(), value);
                }
                None => extraction.failures.push(CaptureFailure {
                    variable: var.clone(),
                    value: m.as_str().to_owned(),
                }),
            }
        }

        Some(extraction)
    }
}

impl PartialEq for Pattern {
    // 원문과 스타일이 같으면 컴파일된 정규식도 같습니다.
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.style == other.style
            && self.string_variables == other.string_variables
            && self.numeric_variables == other.numeric_variables
            && self.tags == other.tags
            && self.flags == other.flags
            && self.severity == other.severity
    }
}

/// 십진수 캡처 값을 파싱합니다. 쉼표 소수점은 '.'으로 바꿉니다.
fn parse_numeric(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_case_sensitive_substring() {
        let p = Pattern::literal("BUILD COMMAND STARTED");
        assert!(p.is_match("********** BUILD COMMAND STARTED **********"));
        assert!(!p.is_match("build command started"));
    }

    #[test]
    fn regex_matches_anywhere_in_line() {
        let p = Pattern::regex(r"error (C|LNK)\d+").unwrap();
        assert!(p.is_match("Foo.obj : error LNK2019: unresolved external"));
        assert!(!p.is_match("warning C4996: deprecated"));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = Pattern::compile("", PatternStyle::Regex, vec![], vec![]).unwrap_err();
        assert!(err.contains("empty"));
        let err = Pattern::compile(" \t ", PatternStyle::Literal, vec![], vec![]).unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_pattern() {
        let p = Pattern::literal(" LNK");
        assert!(p.is_match("error LNK2019"));
        assert!(!p.is_match("xLNK2019"));

        let p = Pattern::regex(r"^\s*(Checkout|Agent|Build) ").unwrap();
        assert!(p.is_match("  Build step"));
        assert!(!p.is_match("BuildGraph: starting"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(Pattern::regex("error (C|LNK").is_err());
    }

    #[test]
    fn literal_cannot_declare_variables() {
        let err = Pattern::compile(
            "Took",
            PatternStyle::Literal,
            vec![],
            vec!["seconds".to_owned()],
        )
        .unwrap_err();
        assert!(err.contains("seconds"));
    }

    #[test]
    fn variables_must_name_capture_groups() {
        let err = Pattern::compile(
            r"Took (?<secs>[\d.]+)s",
            PatternStyle::Regex,
            vec!["map".to_owned()],
            vec![],
        )
        .unwrap_err();
        assert!(err.contains("map"));
    }

    #[test]
    fn extracts_string_and_numeric_variables() {
        let p = Pattern::compile(
            r"Cooking (?<map>\w+) took (?<secs>[\d.,]+)s",
            PatternStyle::Regex,
            vec!["map".to_owned()],
            vec!["secs".to_owned()],
        )
        .unwrap();

        let ex = p.extract("LogCook: Cooking Lobby took 12,5s").unwrap();
        assert_eq!(ex.variables.strings["map"], "Lobby");
        assert_eq!(ex.variables.numerics["secs"], 12.5);
        assert!(ex.failures.is_empty());
    }

    #[test]
    fn unparsable_numeric_is_reported_and_left_unset() {
        let p = Pattern::compile(
            r"took (?<secs>\S+)s",
            PatternStyle::Regex,
            vec![],
            vec!["secs".to_owned()],
        )
        .unwrap();

        let ex = p.extract("took 1.2.3s").unwrap();
        assert!(ex.variables.numerics.is_empty());
        assert_eq!(
            ex.failures,
            vec![CaptureFailure {
                variable: "secs".to_owned(),
                value: "1.2.3".to_owned(),
            }]
        );
    }

    #[test]
    fn optional_group_absence_is_not_an_error() {
        let p = Pattern::compile(
            r"Result: (?<code>\d+)?done",
            PatternStyle::Regex,
            vec![],
            vec!["code".to_owned()],
        )
        .unwrap();
        let ex = p.extract("Result: done").unwrap();
        assert!(ex.variables.is_empty());
        assert!(ex.failures.is_empty());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric(" 3,25 "), Some(3.25));
    }

    #[test]
    fn flag_set_separates_auto_and_named() {
        let flags = FlagSet::new(
            vec![Flag::parse("AUTO"), Flag::parse("BuildOk")],
            vec![Flag::parse("LinkFailed")],
        );
        assert_eq!(flags.auto().collect::<Vec<_>>(), vec![Polarity::Success]);
        assert_eq!(
            flags.named().collect::<Vec<_>>(),
            vec![
                ("BuildOk", Polarity::Success),
                ("LinkFailed", Polarity::Failure)
            ]
        );
    }

    #[test]
    fn variables_merge_last_write_wins() {
        let mut a = Variables::default();
        a.strings.insert("map".to_owned(), "Lobby".to_owned());
        let mut b = Variables::default();
        b.strings.insert("map".to_owned(), "Arena".to_owned());
        b.numerics.insert("secs".to_owned(), 1.0);
        a.merge(b);
        assert_eq!(a.strings["map"], "Arena");
        assert_eq!(a.numerics["secs"], 1.0);
    }

    #[test]
    fn style_parse_is_case_insensitive() {
        assert_eq!(PatternStyle::parse("regex"), Some(PatternStyle::Regex));
        assert_eq!(PatternStyle::parse("LITERAL"), Some(PatternStyle::Literal));
        assert_eq!(PatternStyle::parse("glob"), None);
    }
}
