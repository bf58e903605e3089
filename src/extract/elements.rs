// src/extract/elements.rs
//! DOM-scoped scan: find the smallest element whose text mentions RAISED
//! (preferably alongside GOAL) and read the dollar figures inside it.

use scraper::{ElementRef, Html};

use super::text::{collapse_ws, dollar_amounts};
use super::{select_max, ExtractPolicy, Method, PageScan, RaisedValue};

const HIDDEN: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements that always span the whole page.
const PAGE_LEVEL: [&str; 2] = ["html", "body"];

struct Block {
    text: String,
    page_level: bool,
}

pub fn element_scan(scan: &PageScan<'_>, policy: &ExtractPolicy) -> Option<RaisedValue> {
    let blocks = raised_blocks(&scan.doc);
    // `html`/`body` mention GOAL whenever any part of the page does.
    let with_goal: Vec<&str> = blocks
        .iter()
        .filter(|b| !b.page_level && b.text.to_ascii_uppercase().contains("GOAL"))
        .map(|b| b.text.as_str())
        .collect();
    let all: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();

    pick_from_shortest(with_goal, policy)
        .or_else(|| pick_from_shortest(all, policy))
        .map(|value| RaisedValue {
            value,
            method: Method::ElementScan,
        })
}

/// Visible text of every element mentioning RAISED.
fn raised_blocks(doc: &Html) -> Vec<Block> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !HIDDEN.contains(&el.value().name()))
        .filter_map(|el| {
            let text = element_text(el);
            text.to_ascii_uppercase().contains("RAISED").then(|| Block {
                text,
                page_level: PAGE_LEVEL.contains(&el.value().name()),
            })
        })
        .collect()
}

/// Shortest block first; the first one carrying a plausible figure decides.
fn pick_from_shortest(mut blocks: Vec<&str>, policy: &ExtractPolicy) -> Option<f64> {
    blocks.sort_by_key(|b| b.len());
    blocks.into_iter().find_map(|b| {
        let amounts = dollar_amounts(b).into_iter().filter(|v| policy.plausible(*v));
        select_max(amounts, policy.goal)
    })
}

/// Text of `el` without script/style content, whitespace-collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(t) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN.contains(&e.name()))
        });
        if !hidden {
            out.push_str(t);
            out.push(' ');
        }
    }
    collapse_ws(&out)
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
        element_scan(&PageScan::new(&page), &policy())
    }

    #[test]
    fn picks_shortest_block_with_raised_and_goal() {
        let html = r#"<body>
            <section>
              <p>Last year we raised $310,000 for the shelter.</p>
              <div class="widget">
                <div><span>$98,400</span><small>Raised</small></div>
                <div><span>$250,000</span><small>Goal</small></div>
              </div>
              <footer>Our goal is big: $250,000 raised by spring, $5,000 matched.</footer>
            </section>
        </body>"#;
        let got = run(html).unwrap();
        assert_eq!(got.value, 98_400.0);
        assert_eq!(got.method, Method::ElementScan);
    }

    #[test]
    fn falls_back_to_raised_only_blocks() {
        let html = r#"<div><h3>Raised so far</h3><p>$12,750</p></div><p>Thanks to 80 donors</p>"#;
        let got = run(html).unwrap();
        assert_eq!(got.value, 12_750.0);
    }

    #[test]
    fn script_text_is_not_part_of_blocks() {
        let html = r#"<div>Raised<script>var a = "$88,000";</script></div>"#;
        assert!(run(html).is_none());
    }

    #[test]
    fn no_raised_mention_yields_none() {
        let html = "<div>$50,000 pledged</div>";
        assert!(run(html).is_none());
    }

    #[test]
    fn goal_elsewhere_on_page_does_not_promote_the_whole_body() {
        let html = r#"<div><h3>Raised so far</h3><p>$12,750</p></div>
            <p>Our goal: $250,000. Last year's gala brought in $40,000.</p>"#;
        assert_eq!(run(html).unwrap().value, 12_750.0);
    }

    #[test]
    fn page_level_block_still_serves_as_last_resort() {
        let html = "<body>Raised $8,200 so far</body>";
        assert_eq!(run(html).unwrap().value, 8_200.0);
    }
}
