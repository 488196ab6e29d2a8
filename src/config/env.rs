//! `${NAME}` placeholder substitution over a parsed config tree.

use regex::{Captures, Regex};
use serde_yaml::Value;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Replace placeholders in every string scalar using the process environment.
pub fn substitute_env(value: Value) -> Value {
    substitute_with(value, &|name: &str| std::env::var(name).ok())
}

/// Replace placeholders in every string scalar using `lookup`.
///
/// Unknown variables leave the placeholder text in place. Mapping keys and
/// non-string scalars are returned untouched.
pub fn substitute_with<F>(value: Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => Value::String(substitute_str(&s, lookup)),
        Value::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(|item| substitute_with(item, lookup))
                .collect(),
        ),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, substitute_with(v, lookup)))
                .collect(),
        ),
        Value::Tagged(mut tagged) => {
            let inner = std::mem::take(&mut tagged.value);
            tagged.value = substitute_with(inner, lookup);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn substitute_str<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    placeholder_pattern()
        .replace_all(input, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// First placeholder name still present in `input`, if any.
pub fn unresolved_placeholder(input: &str) -> Option<&str> {
    placeholder_pattern()
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
