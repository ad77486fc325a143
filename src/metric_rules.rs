use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;

/// Ordered metric-renaming rules, as supplied by the collector.
///
/// Deserializes from a JSON array of `{"match_expression", "replacement"}`
/// objects.  A malformed match expression is surfaced as a deserialization
/// error; nothing is compiled lazily, so a table that is already accumulating
/// can never be corrupted by bad rule input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MetricRules(Vec<MetricRule>);

impl MetricRules {
    /// Applies the first matching rule to `name`.  Rules are evaluated in
    /// the order given and are never re-applied to the renamed result.
    pub(crate) fn apply(&self, name: &str) -> Option<String> {
        let rule = self.0.iter().find(|rule| rule.pattern.is_match(name))?;
        Some(
            rule.pattern
                .replace(name, rule.replacement.as_str())
                .into_owned(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MetricRule {
    pattern: Regex,
    replacement: String,
}

impl<'de> Deserialize<'de> for MetricRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRule<'a> {
            match_expression: Cow<'a, str>,
            replacement: Cow<'a, str>,
        }

        let raw = RawRule::deserialize(deserializer)?;
        let pattern = Regex::new(&raw.match_expression).map_err(|e| {
            D::Error::custom(format_args!(
                "bad metric rule expression {:?}: {}",
                raw.match_expression, e
            ))
        })?;
        Ok(MetricRule {
            pattern,
            replacement: raw.replacement.into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MetricRules {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_simple_rename() {
        let rules = parse(
            r#"[{"match_expression": "rename_me", "replacement": "been_renamed"}]"#,
        );
        assert_eq!(rules.apply("rename_me").as_deref(), Some("been_renamed"));
        assert_eq!(rules.apply("something_else"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let rules = parse(
            r#"[
                {"match_expression": "^WebTransaction/old", "replacement": "WebTransaction/new"},
                {"match_expression": "old", "replacement": "never_applied"}
            ]"#,
        );
        assert_eq!(
            rules.apply("WebTransaction/old/zip").as_deref(),
            Some("WebTransaction/new/zip")
        );
        // Second rule still reachable when the first does not match.
        assert_eq!(rules.apply("other/old").as_deref(), Some("other/never_applied"));
    }

    #[test]
    fn test_capture_group_replacement() {
        let rules = parse(
            r#"[{"match_expression": "^Custom/([^/]+)/.*$", "replacement": "Custom/$1/*"}]"#,
        );
        assert_eq!(
            rules.apply("Custom/foo/bar/baz").as_deref(),
            Some("Custom/foo/*")
        );
    }

    #[test]
    fn test_bad_expression_is_deserialize_error() {
        let result: Result<MetricRules, _> =
            serde_json::from_str(r#"[{"match_expression": "(unclosed", "replacement": "x"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_rules() {
        let rules = MetricRules::default();
        assert!(rules.is_empty());
        assert_eq!(rules.apply("anything"), None);
    }
}
