// src/extract/patterns.rs
//! Regex-only strategies: the strict label, the RAISED/GOAL proximity pair and
//! the largest-amount last resort.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::text::{dollar_amounts, parse_amount, window_end, AMOUNT};
use super::{select_max, ExtractPolicy, Method, PageScan, RaisedValue};

/// Max `$`-free chars between an amount and the label it belongs to.
const LABEL_GAP: usize = 40;

/// `$186,576 RAISED`, tolerating whitespace between amount and label.
static RE_RAISED_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\$\s?(?P<amt>{AMOUNT})\s*raised\b")).expect("raised label regex")
});

/// A RAISED or GOAL label word.
static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:raised|goal)\b").expect("label regex"));

static RE_DOLLAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\$\s?(?P<amt>{AMOUNT})")).expect("dollar regex"));

static RE_GOAL_LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)\$\s?{AMOUNT}[^$]{{0,40}}?\bgoal\b|\bgoal\b[^$]{{0,40}}?\$\s?{AMOUNT}"
    ))
    .expect("goal loose regex")
});

/// Strict `$<amount> RAISED` over visible text and markup.
pub fn raised_label(scan: &PageScan<'_>, policy: &ExtractPolicy) -> Option<RaisedValue> {
    let candidates = scan.page.haystacks().into_iter().flat_map(|hay| {
        RE_RAISED_LABEL
            .captures_iter(hay)
            .filter_map(|c| c.name("amt").and_then(|m| parse_amount(m.as_str())))
            .collect::<Vec<_>>()
    });
    select_max(candidates, policy.goal).map(|value| RaisedValue {
        value,
        method: Method::RaisedLabel,
    })
}

/// A RAISED amount followed within `proximity_window` chars by a GOAL amount.
/// Only the raised side is kept.
pub fn raised_near_goal(scan: &PageScan<'_>, policy: &ExtractPolicy) -> Option<RaisedValue> {
    let mut candidates = Vec::new();
    for hay in scan.page.haystacks() {
        let labels = label_hits(hay);
        for caps in RE_DOLLAR.captures_iter(hay) {
            let (Some(whole), Some(amt)) = (caps.get(0), caps.name("amt")) else {
                continue;
            };
            let Some(label) = owning_label(hay, whole.range(), &labels) else {
                continue;
            };
            if label.kind != Label::Raised {
                continue;
            }
            let Some(value) = parse_amount(amt.as_str()) else {
                continue;
            };
            let from = whole.end().max(label.span.end);
            let end = window_end(hay, from, policy.proximity_window);
            if RE_GOAL_LOOSE.is_match(&hay[from..end]) {
                candidates.push(value);
            }
        }
    }
    select_max(candidates, policy.goal).map(|value| RaisedValue {
        value,
        method: Method::RaisedNearGoal,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Raised,
    Goal,
}

struct LabelHit {
    span: Range<usize>,
    kind: Label,
}

fn label_hits(hay: &str) -> Vec<LabelHit> {
    RE_LABEL
        .find_iter(hay)
        .map(|m| LabelHit {
            span: m.range(),
            kind: if m.as_str().eq_ignore_ascii_case("raised") {
                Label::Raised
            } else {
                Label::Goal
            },
        })
        .collect()
}

/// The label an amount belongs to: the nearest one on either side, reachable
/// through a short `$`-free gap. Ties go to GOAL.
fn owning_label<'a>(hay: &str, amt: Range<usize>, labels: &'a [LabelHit]) -> Option<&'a LabelHit> {
    let i = labels.partition_point(|l| l.span.end <= amt.start);
    let left = i
        .checked_sub(1)
        .map(|j| &labels[j])
        .and_then(|l| label_gap(&hay[l.span.end..amt.start]).map(|d| (d, l)));
    let right = labels
        .get(i)
        .filter(|l| l.span.start >= amt.end)
        .and_then(|l| label_gap(&hay[amt.end..l.span.start]).map(|d| (d, l)));

    match (left, right) {
        (Some((dl, l)), Some((dr, r))) if dl == dr => {
            Some(if l.kind == Label::Goal { l } else { r })
        }
        (Some((dl, l)), Some((dr, r))) => Some(if dl < dr { l } else { r }),
        (Some((_, l)), None) | (None, Some((_, l))) => Some(l),
        (None, None) => None,
    }
}

/// Char length of `gap` when it is short enough and holds no other amount.
fn label_gap(gap: &str) -> Option<usize> {
    let mut n = 0;
    for c in gap.chars() {
        if c == '$' || n == LABEL_GAP {
            return None;
        }
        n += 1;
    }
    Some(n)
}

/// Every `$` figure on the page minus the goal and implausibly small values.
pub fn largest_amount(scan: &PageScan<'_>, policy: &ExtractPolicy) -> Option<RaisedValue> {
    let candidates = scan
        .page
        .haystacks()
        .into_iter()
        .flat_map(dollar_amounts)
        .filter(|v| policy.plausible(*v));
    select_max(candidates, policy.goal).map(|value| RaisedValue {
        value,
        method: Method::LargestAmount,
    })
}
