// src/output/classify.rs

//! Ordered line classification rules.
//!
//! Rules are evaluated top to bottom and the first match decides the tag.
//! Anything that matches no rule is tagged [`LogTag::Plain`].
//!
//! The built-in order is:
//! 1. `error:` / `exception:` prefix → `Error`
//! 2. `warning:` / `warn:` prefix → `Warning`
//! 3. contains `success` / `completed` → `Success`
//! 4. `info:` / `running:` prefix → `Info`
//!
//! All built-in comparisons are case-insensitive. Extra regex rules (from
//! `[[classify.rule]]` in the config file) are appended after the built-ins.

use regex::Regex;

use crate::errors::{BenchError, Result};
use crate::types::LogTag;

/// How a rule decides whether a line matches.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Lowercased line starts with any of these (lowercase) prefixes.
    Prefix(Vec<String>),
    /// Lowercased line contains any of these (lowercase) needles.
    Contains(Vec<String>),
    /// Arbitrary regex, matched against the original line.
    Pattern(Regex),
}

impl Matcher {
    pub fn prefix<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Matcher::Prefix(lowercased(items))
    }

    pub fn contains<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Matcher::Contains(lowercased(items))
    }

    fn is_match(&self, original: &str, lower: &str) -> bool {
        match self {
            Matcher::Prefix(prefixes) => prefixes.iter().any(|p| lower.starts_with(p.as_str())),
            Matcher::Contains(needles) => needles.iter().any(|n| lower.contains(n.as_str())),
            Matcher::Pattern(re) => re.is_match(original),
        }
    }
}

fn lowercased<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .collect()
}

/// A single `matcher → tag` entry.
#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub tag: LogTag,
}

impl Rule {
    pub fn new(matcher: Matcher, tag: LogTag) -> Self {
        Self { matcher, tag }
    }
}

/// Ordered list of classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Classifier {
    /// The built-in rule set, in precedence order.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                Rule::new(Matcher::prefix(["error:", "exception:"]), LogTag::Error),
                Rule::new(Matcher::prefix(["warning:", "warn:"]), LogTag::Warning),
                Rule::new(Matcher::contains(["success", "completed"]), LogTag::Success),
                Rule::new(Matcher::prefix(["info:", "running:"]), LogTag::Info),
            ],
        }
    }

    /// Built-in rules followed by user-supplied `(pattern, tag)` pairs.
    pub fn with_extra_patterns<'a, I>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, LogTag)>,
    {
        let mut classifier = Self::builtin();
        for (pattern, tag) in extra {
            let re = Regex::new(pattern).map_err(|e| {
                BenchError::ConfigError(format!("invalid classify pattern '{pattern}': {e}"))
            })?;
            classifier.push(Rule::new(Matcher::Pattern(re), tag));
        }
        Ok(classifier)
    }

    /// Append a rule with the lowest precedence so far.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, line: &str) -> LogTag {
        let lower = line.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.is_match(line, &lower))
            .map(|rule| rule.tag)
            .unwrap_or(LogTag::Plain)
    }
}
