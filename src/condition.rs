use std::collections::HashMap;

use regex::RegexBuilder;

use crate::template::substitute;

/// Evaluate a `condition` node's predicate against the current variables.
///
/// `variable_name`, `comparison` and `value` are the node's raw (possibly
/// templated) fields; `raw` is the un-expanded value held in `variables` for
/// the resolved variable name, used as-is by `regex` so patterns can match
/// against literal text rather than its templated expansion.
pub fn evaluate_condition(
    variable_name: Option<&str>,
    comparison: Option<&str>,
    value: Option<&str>,
    variables: &HashMap<String, String>,
) -> bool {
    let Some(name) = variable_name.map(|n| substitute(Some(n), variables).unwrap_or_default()) else {
        return false;
    };
    let name = name.trim().to_string();
    let raw = variables.get(&name).cloned();

    let comparison = match comparison {
        Some(c) => c,
        None => {
            tracing::warn!("condition node missing 'comparison'");
            return false;
        }
    };

    if comparison == "isSet" {
        return is_set(raw.as_deref());
    }
    if comparison == "isNotSet" {
        return !is_set(raw.as_deref());
    }

    let Some(actual) = raw.as_deref() else {
        return false;
    };

    if comparison == "regex" {
        let Some(pattern) = value else { return false };
        return evaluate_regex(pattern, actual);
    }

    let expected = value
        .map(|v| substitute(Some(v), variables).unwrap_or_default())
        .unwrap_or_default();
    let actual_expanded = substitute(Some(actual), variables).unwrap_or_default();

    match comparison {
        "equals" => actual_expanded.to_lowercase() == expected.to_lowercase(),
        "notEquals" => actual_expanded.to_lowercase() != expected.to_lowercase(),
        "contains" => actual_expanded.to_lowercase().contains(&expected.to_lowercase()),
        "startsWith" => actual_expanded.to_lowercase().starts_with(&expected.to_lowercase()),
        "endsWith" => actual_expanded.to_lowercase().ends_with(&expected.to_lowercase()),
        "greaterThan" => numeric(&actual_expanded, &expected).is_some_and(|(a, b)| a > b),
        "lessThan" => numeric(&actual_expanded, &expected).is_some_and(|(a, b)| a < b),
        "greaterOrEquals" => numeric(&actual_expanded, &expected).is_some_and(|(a, b)| a >= b),
        "lessOrEquals" => numeric(&actual_expanded, &expected).is_some_and(|(a, b)| a <= b),
        other => {
            tracing::warn!(comparison = other, "unknown condition comparison");
            false
        }
    }
}

/// `isSet`: non-null, non-empty, and not the literal `"none"` (case-insensitive).
fn is_set(raw: Option<&str>) -> bool {
    match raw {
        None => false,
        Some(v) => !v.is_empty() && !v.eq_ignore_ascii_case("none"),
    }
}

fn numeric(a: &str, b: &str) -> Option<(f64, f64)> {
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// `regex` comparison, supporting a trailing inline `[i]` case-insensitive flag.
fn evaluate_regex(pattern: &str, actual: &str) -> bool {
    let (pattern, case_insensitive) = match pattern.strip_suffix("[i]") {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };
    match RegexBuilder::new(pattern).case_insensitive(case_insensitive).build() {
        Ok(re) => re.is_match(actual),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid regex in condition node");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn equals_is_case_insensitive_and_symmetric() {
        let v = vars(&[("x", "Yes")]);
        assert!(evaluate_condition(Some("x"), Some("equals"), Some("yes"), &v));
        let v2 = vars(&[("x", "yes")]);
        assert_eq!(
            evaluate_condition(Some("x"), Some("equals"), Some("Yes"), &v2),
            evaluate_condition(Some("y"), Some("equals"), Some("yes"), &vars(&[("y", "Yes")]))
        );
    }

    #[test]
    fn not_equals_is_negation_of_equals() {
        let v = vars(&[("x", "a")]);
        let eq = evaluate_condition(Some("x"), Some("equals"), Some("b"), &v);
        let neq = evaluate_condition(Some("x"), Some("notEquals"), Some("b"), &v);
        assert_eq!(eq, !neq);
    }

    #[test]
    fn is_set_is_negation_of_is_not_set() {
        let v = vars(&[("x", "hello")]);
        assert_ne!(
            evaluate_condition(Some("x"), Some("isSet"), None, &v),
            evaluate_condition(Some("x"), Some("isNotSet"), None, &v)
        );
        let empty = vars(&[]);
        assert_ne!(
            evaluate_condition(Some("x"), Some("isSet"), None, &empty),
            evaluate_condition(Some("x"), Some("isNotSet"), None, &empty)
        );
    }

    #[test]
    fn none_literal_counts_as_not_set() {
        let v = vars(&[("x", "none")]);
        assert!(!evaluate_condition(Some("x"), Some("isSet"), None, &v));
    }

    #[test]
    fn numeric_comparison_with_unparseable_value_is_false() {
        let v = vars(&[("x", "not-a-number")]);
        assert!(!evaluate_condition(Some("x"), Some("greaterThan"), Some("5"), &v));
    }

    #[test]
    fn greater_than_parses_floats() {
        let v = vars(&[("x", "7.5")]);
        assert!(evaluate_condition(Some("x"), Some("greaterThan"), Some("5"), &v));
    }

    #[test]
    fn regex_supports_inline_case_insensitive_flag() {
        let v = vars(&[("x", "HELLO world")]);
        assert!(evaluate_condition(Some("x"), Some("regex"), Some("^hello[i]"), &v));
    }

    #[test]
    fn missing_variable_is_false_for_non_isset_comparisons() {
        let v = vars(&[]);
        assert!(!evaluate_condition(Some("x"), Some("equals"), Some("y"), &v));
    }

    #[test]
    fn unknown_comparison_is_false() {
        let v = vars(&[("x", "y")]);
        assert!(!evaluate_condition(Some("x"), Some("matches-moon-phase"), Some("y"), &v));
    }
}
