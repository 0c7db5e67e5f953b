/*!
 * Flattening of nested template variables.
 *
 * Templates only know flat placeholder names, so a nested variable map such as
 * `{"generalOptions": {"style": "epic"}}` is flattened to
 * `generalOptions_style = "epic"` before rendering.
 *
 * Rules:
 * - keys are joined with the separator (`_` by default)
 * - strings render raw, numbers and booleans through `Display`, null as ""
 * - arrays render as their items joined with ", "
 * - when two paths produce the same key the deeper path wins; at equal depth
 *   the entry visited last (map order) wins
 */

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Separator used between nested keys
pub const DEFAULT_SEPARATOR: &str = "_";

/// Flattened variables, keyed by placeholder name
pub type FlatVariables = BTreeMap<String, String>;

/// Flatten a nested variable map. A non-object root yields no variables.
pub fn flatten_variables(variables: &Value, separator: &str) -> FlatVariables {
    let mut flat: BTreeMap<String, (usize, String)> = BTreeMap::new();
    if let Value::Object(map) = variables {
        walk(map, "", 0, separator, &mut flat);
    }
    flat.into_iter().map(|(key, (_, value))| (key, value)).collect()
}

fn walk(
    map: &Map<String, Value>,
    prefix: &str,
    depth: usize,
    separator: &str,
    flat: &mut BTreeMap<String, (usize, String)>,
) {
    for (name, value) in map {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}{}{}", prefix, separator, name)
        };

        match value {
            Value::Object(child) => walk(child, &key, depth + 1, separator, flat),
            other => {
                let shadowed = flat.get(&key).is_some_and(|(existing, _)| *existing > depth);
                if !shadowed {
                    flat.insert(key, (depth, render_value(other)));
                }
            }
        }
    }
}

/// Text form of a leaf value
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}
