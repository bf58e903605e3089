// src/extract/structured.rs
//! Inline script scan: JSON blobs (`application/json`, `ld+json`, `__NEXT_DATA__`)
//! and embedded state assignments such as `window.__INITIAL_STATE__ = {...}`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::text::parse_amount;
use super::{select_max, ExtractPolicy, Method, PageScan, RaisedValue};

/// Keys whose values may carry the raised total.
static RE_MONEY_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)raised|donat|total|amount|progress|goal|sum|value").expect("money key regex")
});

/// Left-hand side of a state assignment, up to the opening brace/bracket.
static RE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:window\.[A-Za-z_$][\w$]*|(?:var|let|const)\s+[A-Za-z_$][\w$]*|\b__[A-Z0-9_]+__)\s*=\s*[\{\[]",
    )
    .expect("assignment regex")
});

pub fn structured_data(scan: &PageScan<'_>, policy: &ExtractPolicy) -> Option<RaisedValue> {
    let mut found = Vec::new();
    for blob in script_blobs(&scan.doc) {
        collect_money_values(&blob, false, &mut found);
    }
    let candidates = found.into_iter().filter(|v| policy.plausible(*v));
    select_max(candidates, policy.goal).map(|value| RaisedValue {
        value,
        method: Method::StructuredData,
    })
}

/// Parse every inline script either as a whole JSON document or, failing that,
/// as a sequence of `lhs = {...}` assignments.
pub(crate) fn script_blobs(doc: &Html) -> Vec<Value> {
    let mut out = Vec::new();
    let Ok(sel) = Selector::parse("script") else {
        return out;
    };
    for script in doc.select(&sel) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let body: String = script.text().collect();
        let trimmed = body.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
            out.push(v);
            continue;
        }
        for m in RE_ASSIGNMENT.find_iter(trimmed) {
            // The match ends right after the opening delimiter.
            let open = m.end() - 1;
            if let Some(seg) = balanced_segment(trimmed, open) {
                if let Ok(v) = serde_json::from_str::<Value>(seg) {
                    out.push(v);
                }
            }
        }
    }
    out
}

/// Slice from the `{`/`[` at `open` through its matching close, honoring
/// string literals and escapes.
fn balanced_segment(s: &str, open: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_str: Option<u8> = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = in_str {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                in_str = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => in_str = Some(b),
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walk `v`, keeping numbers (or numeric strings) stored under money-ish keys.
/// Array elements inherit the key of the array.
fn collect_money_values(v: &Value, under_money_key: bool, out: &mut Vec<f64>) {
    match v {
        Value::Object(map) => {
            for (k, child) in map {
                collect_money_values(child, RE_MONEY_KEY.is_match(k), out);
            }
        }
        Value::Array(items) => {
            for it in items {
                collect_money_values(it, under_money_key, out);
            }
        }
        Value::Number(n) if under_money_key => {
            if let Some(x) = n.as_f64().filter(|x| x.is_finite()) {
                out.push(x);
            }
        }
        Value::String(s) if under_money_key => {
            if let Some(x) = parse_amount(s) {
                out.push(x);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PageContent;

    fn policy() -> ExtractPolicy {
        ExtractPolicy::default()
    }

    fn run(html: &str) -> Option<RaisedValue> {
        let page = PageContent::new(html, "");
        structured_data(&PageScan::new(&page), &policy())
    }

    #[test]
    fn reads_plain_json_script() {
        let html = r#"<script type="application/json" id="__NEXT_DATA__">
            {"props":{"campaign":{"id":99182,"amountRaised":186576,"goal":250000,"donors":1203}}}
        </script>"#;
        let got = run(html).unwrap();
        assert_eq!(got.value, 186_576.0);
        assert_eq!(got.method, Method::StructuredData);
    }

    #[test]
    fn reads_window_state_assignment_with_string_amounts() {
        let html = r#"<script>
            window.__INITIAL_STATE__ = {"widget":{"raised":"$73,210.50","label":"a } brace"}};
            window.analytics = [];
        </script>"#;
        let got = run(html).unwrap();
        assert_eq!(got.value, 73_210.5);
    }

    #[test]
    fn ignores_small_and_goal_values() {
        let html = r#"<script>{"total_donations": 250000, "progress": 0.74, "donationCount": 812}</script>"#;
        assert!(run(html).is_none());
    }

    #[test]
    fn unrelated_keys_are_not_collected() {
        let html = r#"<script>{"userId": 55000, "raised": 12000}</script>"#;
        assert_eq!(run(html).unwrap().value, 12_000.0);
    }

    #[test]
    fn array_values_inherit_parent_key() {
        let v: Value = serde_json::from_str(r#"{"totals":[1500, 2500], "ids":[9000]}"#).unwrap();
        let mut out = Vec::new();
        collect_money_values(&v, false, &mut out);
        out.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(out, vec![1_500.0, 2_500.0]);
    }

    #[test]
    fn balanced_segment_handles_nesting_and_strings() {
        let s = r#"x = {"a": {"b": "}"}, "c": [1, 2]}; tail"#;
        let open = s.find('{').unwrap();
        assert_eq!(
            balanced_segment(s, open),
            Some(r#"{"a": {"b": "}"}, "c": [1, 2]}"#)
        );
        assert_eq!(balanced_segment("{ unterminated", 0), None);
    }

    #[test]
    fn external_scripts_are_skipped() {
        let html = r#"<script src="/app.js">{"raised": 5000}</script>"#;
        assert!(run(html).is_none());
    }
}
