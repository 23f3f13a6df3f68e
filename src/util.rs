//! Small utility helpers used across modules.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings.
/// Cuts on a char boundary so Arabic payloads never split a code point.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Remove a markdown code fence wrapped around a model reply.
/// Accepts both "```json" and bare "```" openers; text without a fence is only trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else { return s };
  let rest = rest.strip_prefix("json").or_else(|| rest.strip_prefix("JSON")).unwrap_or(rest);
  let rest = rest.strip_suffix("```").unwrap_or(rest);
  rest.trim()
}

/// Render any JSON scalar the way a document would print it.
pub fn display_value(v: &Value) -> String {
  match v {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Text field of any JSON shape. Arrays are joined line by line; `null` is empty.
fn display_text(v: &Value) -> String {
  match v {
    Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join("\n"),
    other => display_value(other),
  }
}

/// A display string; numbers, bools and `null` are accepted.
pub fn display_string<'de, D>(d: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(display_text(&Value::deserialize(d)?))
}

/// An optional display string; only `null` (or a missing field) is `None`.
pub fn display_opt<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(d)? {
    Value::Null => None,
    v => Some(display_text(&v)),
  })
}

/// A list of display strings. Scalars of any JSON type are accepted, and a bare
/// scalar counts as a one-item list.
pub fn display_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(d)? {
    Value::Null => Vec::new(),
    Value::Array(items) => items.iter().map(display_value).collect(),
    other => vec![display_value(&other)],
  })
}

/// Table rows: ordered rows of display cells. Rows may be ragged; a scalar row is one cell.
pub fn display_rows<'de, D>(d: D) -> Result<Vec<Vec<String>>, D::Error>
where
  D: Deserializer<'de>,
{
  let rows = match Value::deserialize(d)? {
    Value::Array(rows) => rows,
    _ => return Ok(Vec::new()),
  };
  Ok(
    rows
      .iter()
      .map(|row| match row {
        Value::Null => Vec::new(),
        Value::Array(cells) => cells.iter().map(display_value).collect(),
        cell => vec![display_value(cell)],
      })
      .collect(),
  )
}

/// A list of objects. Items that do not fit `T` are dropped; a lone object is a one-item list.
pub fn lenient_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let items = match Value::deserialize(d)? {
    Value::Array(items) => items,
    Value::Object(map) => vec![Value::Object(map)],
    _ => return Ok(Vec::new()),
  };
  Ok(
    items
      .into_iter()
      .filter_map(|item| match serde_json::from_value(item) {
        Ok(t) => Some(t),
        Err(e) => {
          warn!(target: "generation", error = %e, "Dropping unusable list item");
          None
        }
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    let out = fill_template("{a} و {b} و {a}", &[("a", "س"), ("b", "ص")]);
    assert_eq!(out, "س و ص و س");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "درس".repeat(10);
    let out = trunc_for_log(&s, 5);
    assert!(out.starts_with("در"));
    assert!(out.ends_with(&format!("({} bytes total)", s.len())));
    assert_eq!(trunc_for_log("short", 50), "short");
  }

  #[test]
  fn strips_fences() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    assert_eq!(strip_code_fence(""), "");
  }

  #[test]
  fn display_values() {
    assert_eq!(display_value(&serde_json::json!(3.5)), "3.5");
    assert_eq!(display_value(&serde_json::json!(true)), "true");
    assert_eq!(display_value(&Value::Null), "");
    assert_eq!(display_value(&serde_json::json!("نص")), "نص");
  }

  #[derive(Debug, Deserialize)]
  struct Loose {
    #[serde(default, deserialize_with = "display_opt")]
    text: Option<String>,
    #[serde(default, deserialize_with = "display_list")]
    items: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pairs: Vec<Pair>,
  }

  #[derive(Debug, Deserialize, PartialEq)]
  struct Pair {
    a: String,
  }

  #[test]
  fn loose_fields_accept_mistyped_values() {
    let l: Loose = serde_json::from_str(r#"{"text":5,"items":"وحيد","pairs":[{"a":"x"},{"a":1},"?"]}"#).unwrap();
    assert_eq!(l.text.as_deref(), Some("5"));
    assert_eq!(l.items, vec!["وحيد"]);
    assert_eq!(l.pairs, vec![Pair { a: "x".into() }]);

    let l: Loose = serde_json::from_str(r#"{"text":["a","b"],"items":null,"pairs":{"a":"y"}}"#).unwrap();
    assert_eq!(l.text.as_deref(), Some("a\nb"));
    assert!(l.items.is_empty());
    assert_eq!(l.pairs, vec![Pair { a: "y".into() }]);

    let l: Loose = serde_json::from_str(r#"{"text":null}"#).unwrap();
    assert!(l.text.is_none() && l.items.is_empty() && l.pairs.is_empty());
  }
}
