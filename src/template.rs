use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Matches `{{NAME}}` placeholders; the name is trimmed before lookup.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("valid placeholder regex"));

/// Bound on the number of substitution passes (§4.3); guards against
/// unbounded work from nested references like `{{a}}` expanding to `{{b}}`.
const MAX_PASSES: u32 = 5;

/// Replace every `{{NAME}}` occurrence in `text` with `vars[NAME]`, repeating
/// up to [`MAX_PASSES`] times to resolve references that expand into further
/// placeholders. A name absent from `vars` is left untouched. `None` input
/// yields `None` output.
pub fn substitute(text: Option<&str>, vars: &HashMap<String, String>) -> Option<String> {
    let mut current = text?.to_string();
    for _ in 0..MAX_PASSES {
        let next = expand_once(&current, vars);
        if next == current {
            break;
        }
        current = next;
    }
    Some(current)
}

fn expand_once(text: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures| {
            let name = caps[1].trim();
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn replaces_known_variable() {
        let v = vars(&[("name", "Alice")]);
        assert_eq!(substitute(Some("hi {{name}}"), &v), Some("hi Alice".to_string()));
    }

    #[test]
    fn leaves_unknown_variable_untouched() {
        let v = vars(&[]);
        assert_eq!(substitute(Some("hi {{name}}"), &v), Some("hi {{name}}".to_string()));
    }

    #[test]
    fn resolves_nested_reference_within_pass_budget() {
        let v = vars(&[("a", "{{b}}"), ("b", "{{c}}"), ("c", "final")]);
        assert_eq!(substitute(Some("{{a}}"), &v), Some("final".to_string()));
    }

    #[test]
    fn none_input_yields_none() {
        let v = vars(&[]);
        assert_eq!(substitute(None, &v), None);
    }

    #[test]
    fn idempotent_when_no_new_placeholders_are_introduced() {
        let v = vars(&[("name", "Alice")]);
        let once = substitute(Some("hi {{name}}, bye {{name}}"), &v);
        let twice = substitute(once.as_deref(), &v);
        assert_eq!(once, twice);
    }

    #[test]
    fn trims_whitespace_inside_braces() {
        let v = vars(&[("name", "Alice")]);
        assert_eq!(substitute(Some("hi {{ name }}"), &v), Some("hi Alice".to_string()));
    }
}
