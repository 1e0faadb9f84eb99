use benchrun::output::{Classifier, LogLine, Matcher, Rule};
use benchrun::types::LogTag;
use proptest::prelude::*;

#[test]
fn builtin_rules_tag_known_prefixes() {
    let c = Classifier::builtin();

    assert_eq!(c.classify("Error: connection refused"), LogTag::Error);
    assert_eq!(c.classify("exception: ValueError"), LogTag::Error);
    assert_eq!(c.classify("WARNING: slow response"), LogTag::Warning);
    assert_eq!(c.classify("warn: retrying"), LogTag::Warning);
    assert_eq!(c.classify("Info: loading exercises"), LogTag::Info);
    assert_eq!(c.classify("Running: say"), LogTag::Info);
    assert_eq!(c.classify("All tests completed"), LogTag::Success);
    assert_eq!(c.classify("SUCCESS"), LogTag::Success);
}

#[test]
fn unmatched_lines_are_plain() {
    let c = Classifier::builtin();

    assert_eq!(c.classify(""), LogTag::Plain);
    assert_eq!(c.classify("pass_rate_1: 42.0"), LogTag::Plain);
    // Prefix rules only look at the start of the line.
    assert_eq!(c.classify("got an error: nope"), LogTag::Plain);
    assert_eq!(c.classify("  Error: indented"), LogTag::Plain);
}

#[test]
fn first_matching_rule_wins() {
    let c = Classifier::builtin();

    assert_eq!(c.classify("Error: success rate dropped"), LogTag::Error);
    assert_eq!(c.classify("Warning: task completed late"), LogTag::Warning);
    assert_eq!(c.classify("Info: 3 tests completed"), LogTag::Success);
    assert_eq!(c.classify("Running: completed exercises"), LogTag::Success);
}

#[test]
fn extra_patterns_come_after_builtins() {
    let c = Classifier::with_extra_patterns([(r"^FAIL\b", LogTag::Error), (r"pass_rate", LogTag::Info)])
        .expect("valid patterns");

    assert_eq!(c.rules().len(), 6);
    assert_eq!(c.classify("FAIL: test_say_zero"), LogTag::Error);
    assert_eq!(c.classify("pass_rate_1: 100.0"), LogTag::Info);
    // A built-in match takes precedence over an extra rule.
    assert_eq!(c.classify("warning: pass_rate unavailable"), LogTag::Warning);
    // Regex rules are case-sensitive unless the pattern says otherwise.
    assert_eq!(c.classify("fail: lowercase"), LogTag::Plain);
}

#[test]
fn invalid_extra_pattern_is_a_config_error() {
    let err = Classifier::with_extra_patterns([("(unclosed", LogTag::Info)]).unwrap_err();
    assert!(err.to_string().contains("invalid classify pattern"), "got: {err}");
}

#[test]
fn pushed_rules_have_lowest_precedence() {
    let mut c = Classifier::builtin();
    c.push(Rule::new(Matcher::contains(["Skipped"]), LogTag::Warning));

    assert_eq!(c.classify("3 tests skipped"), LogTag::Warning);
    assert_eq!(c.classify("skipped but completed"), LogTag::Success);
}

#[test]
fn log_line_constructors() {
    let c = Classifier::builtin();

    assert_eq!(LogLine::classified("error: x", &c).tag, LogTag::Error);
    assert_eq!(LogLine::error("anything").tag, LogTag::Error);
    assert_eq!(LogLine::new("text", LogTag::Info).text, "text");
}

#[test]
fn log_tags_parse_and_display() {
    assert_eq!("warn".parse::<LogTag>(), Ok(LogTag::Warning));
    assert_eq!(" Success ".parse::<LogTag>(), Ok(LogTag::Success));
    assert!("loud".parse::<LogTag>().is_err());
    assert_eq!(LogTag::Plain.to_string(), "plain");
    assert_eq!(LogTag::default(), LogTag::Plain);
}

proptest! {
    #[test]
    fn error_prefix_always_wins(rest in "[ -~]{0,40}") {
        let c = Classifier::builtin();
        prop_assert_eq!(c.classify(&format!("Error: {rest}")), LogTag::Error);
        prop_assert_eq!(c.classify(&format!("EXCEPTION: {rest}")), LogTag::Error);
    }

    #[test]
    fn success_keyword_beats_info_prefix(before in "[a-z ]{0,10}", after in "[a-z ]{0,10}") {
        let c = Classifier::builtin();
        let line = format!("info: {before}completed{after}");
        prop_assert_eq!(c.classify(&line), LogTag::Success);
    }

    #[test]
    fn lines_without_keywords_are_plain(line in "[0-9 .=_-]{0,40}") {
        let c = Classifier::builtin();
        prop_assert_eq!(c.classify(&line), LogTag::Plain);
    }
}
