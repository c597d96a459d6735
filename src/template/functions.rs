//! Filters shared by every template environment.
//!
//! Compiled renderers and the admin preview helpers are all built through
//! [`new_environment`], so a preview behaves exactly like production.

use minijinja::{Environment, Error, Value};

/// Build an environment with the relay's filter set.
pub fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_filter("default", default_value);
    env.add_filter("kv", format_kv);
    env
}

/// `value | default(fallback)`: the fallback when the value is missing, none,
/// or a blank string.
fn default_value(value: Value, fallback: String) -> String {
    if value.is_undefined() || value.is_none() {
        return fallback;
    }
    match value.as_str() {
        Some(s) if s.trim().is_empty() => fallback,
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// `map | kv`: `k=v` pairs sorted by key, joined by single spaces.
fn format_kv(value: Value) -> Result<String, Error> {
    if value.is_undefined() || value.is_none() {
        return Ok(String::new());
    }
    let mut pairs = Vec::new();
    for key in value.try_iter()? {
        let item = value.get_item(&key)?;
        pairs.push((key.to_string(), item.to_string()));
    }
    pairs.sort();
    Ok(pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" "))
}
