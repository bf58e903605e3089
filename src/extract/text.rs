// src/extract/text.rs
//! Dollar-amount parsing and markup-to-text normalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Digits with optional thousands separators and cents, without the `$`.
pub(crate) const AMOUNT: &str = r"(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?";

static RE_DOLLARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\$\s?(?P<amt>{AMOUNT})")).expect("dollar regex"));

static RE_HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<!--.*?-->")
        .expect("hidden blocks regex")
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[^>]+>").expect("tags regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Parse `186,576` / `$186,576.50` / `"186576"` into a finite number.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Every `$<amount>` in `s`, in document order.
pub fn dollar_amounts(s: &str) -> Vec<f64> {
    RE_DOLLARS
        .captures_iter(s)
        .filter_map(|c| c.name("amt"))
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

/// Approximate the visible text of a page from its markup:
/// drop script/style/comments, replace tags with spaces, decode entities,
/// collapse whitespace.
pub fn visible_text(html: &str) -> String {
    let out = RE_HIDDEN_BLOCKS.replace_all(html, " ");
    let out = RE_TAGS.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out);
    collapse_ws(&out)
}

pub(crate) fn collapse_ws(s: &str) -> String {
    RE_WS.replace_all(s, " ").trim().to_string()
}

/// Byte offset of the `n`-th char after `start` (clamped to the end of `s`).
pub(crate) fn window_end(s: &str, start: usize, n: usize) -> usize {
    s[start..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| start + i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grouped_and_plain_amounts() {
        assert_eq!(parse_amount("186,576"), Some(186_576.0));
        assert_eq!(parse_amount("$1,234.50"), Some(1_234.5));
        assert_eq!(parse_amount(" 42 "), Some(42.0));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn finds_all_dollar_amounts_in_order() {
        let s = "We raised $186,576 of our $250,000 goal ($1.50 fee) and $ 900";
        assert_eq!(
            dollar_amounts(s),
            vec![186_576.0, 250_000.0, 1.5, 900.0]
        );
        assert!(dollar_amounts("no money here, just $ signs and 5 dollars").is_empty());
    }

    #[test]
    fn visible_text_splits_adjacent_tags_and_drops_scripts() {
        let html = r#"<div><span>$186,576</span><span>RAISED</span></div>
            <script>var x = "$999,999 RAISED";</script><p>Fund&nbsp;the&amp;roof</p>"#;
        let text = visible_text(html);
        // U+00A0 from &nbsp; counts as whitespace and collapses too
        assert_eq!(text, "$186,576 RAISED Fund the&roof");
    }

    #[test]
    fn window_end_respects_char_boundaries() {
        let s = "raised — €€ goal";
        let end = window_end(s, 0, 8);
        assert!(s.is_char_boundary(end));
        assert_eq!(window_end(s, 0, 1_000), s.len());
    }
}
