use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static INTERPOLATION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").ok());

/// Every `${...}` expression found in the string leaves of `value`.
///
/// Maps and lists are walked recursively; numbers, booleans and nulls carry
/// no references. Expressions are returned verbatim and deduplicated.
#[must_use]
pub fn extract_references(value: &Value) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    collect(value, &mut tokens);
    tokens
}

/// [`extract_references`] over every value of a config map.
pub fn extract_map_references<'a>(values: impl IntoIterator<Item = &'a Value>) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for value in values {
        collect(value, &mut tokens);
    }
    tokens
}

fn collect(value: &Value, tokens: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => scan(text, tokens),
        Value::Array(items) => {
            for item in items {
                collect(item, tokens);
            }
        }
        Value::Object(entries) => {
            for entry in entries.values() {
                collect(entry, tokens);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn scan(text: &str, tokens: &mut BTreeSet<String>) {
    let Some(pattern) = INTERPOLATION.as_ref() else {
        return;
    };
    for captures in pattern.captures_iter(text) {
        if let Some(inner) = captures.get(1) {
            tokens.insert(inner.as_str().to_string());
        }
    }
}
