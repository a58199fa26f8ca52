//! Monetary target extraction from free-text goal titles.
//!
//! Titles like "年商1億円" or "Revenue 1000" carry an implied yearly target.
//! This is a heuristic: a missing amount or a wrong classification is an
//! accepted outcome, never an error.

use crate::models::TargetKind;
use crate::models::title::plain_title;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Substrings that mark a title as a revenue goal (matched lowercase).
pub const REVENUE_KEYWORDS: &[&str] = &[
    "売上", "売り上げ", "年商", "売上高", "収入", "revenue", "sales", "turnover",
];

/// Substrings that mark a title as a profit goal (matched lowercase).
pub const PROFIT_KEYWORDS: &[&str] = &[
    "利益", "粗利", "営業利益", "純利益", "経常利益", "profit", "margin",
];

/// One hundred million (億).
const OKU: f64 = 100_000_000.0;

/// Ten thousand (万).
const MAN: f64 = 10_000.0;

static OKU_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)億").expect("valid regex"));

static MAN_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)万").expect("valid regex"));

static BARE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9,]*").expect("valid regex"));

/// Result of running the heuristic on one title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetExtraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_target: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_target: Option<i64>,

    #[serde(rename = "type")]
    pub kind: TargetKind,
}

/// Infer a monetary target and its kind from a goal title.
///
/// Classification order: revenue keyword, then profit keyword, then any
/// amount (assumed revenue, kind `custom`), then nothing.
pub fn extract_target(title: &str) -> TargetExtraction {
    let text = normalize(title);
    let amount = extract_amount_normalized(&text);

    if matches_any(&text, REVENUE_KEYWORDS) {
        TargetExtraction {
            revenue_target: amount,
            profit_target: None,
            kind: TargetKind::Revenue,
        }
    } else if matches_any(&text, PROFIT_KEYWORDS) {
        TargetExtraction {
            revenue_target: None,
            profit_target: amount,
            kind: TargetKind::Profit,
        }
    } else if amount.is_some() {
        TargetExtraction {
            revenue_target: amount,
            profit_target: None,
            kind: TargetKind::Custom,
        }
    } else {
        TargetExtraction::default()
    }
}

/// Whether the title contains a revenue keyword.
pub fn is_revenue_like(title: &str) -> bool {
    matches_any(&normalize(title), REVENUE_KEYWORDS)
}

/// Whether the title contains a profit keyword.
pub fn is_profit_like(title: &str) -> bool {
    matches_any(&normalize(title), PROFIT_KEYWORDS)
}

/// Extract the first amount in a title, applying 億/万 units.
pub fn extract_amount(title: &str) -> Option<i64> {
    extract_amount_normalized(&normalize(title))
}

fn extract_amount_normalized(text: &str) -> Option<i64> {
    if let Some(value) = unit_amount(&OKU_AMOUNT, text, OKU) {
        return Some(value);
    }
    if let Some(value) = unit_amount(&MAN_AMOUNT, text, MAN) {
        return Some(value);
    }
    BARE_AMOUNT
        .find(text)
        .and_then(|m| strip_separators(m.as_str()).parse::<i64>().ok())
}

fn unit_amount(pattern: &Regex, text: &str, unit: f64) -> Option<i64> {
    let captures = pattern.captures(text)?;
    let number: f64 = strip_separators(captures.get(1)?.as_str()).parse().ok()?;
    Some((number * unit).round() as i64)
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != ',').collect()
}

fn matches_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lowered.contains(keyword))
}

/// Remove display line breaks, fold full-width digits and punctuation to
/// ASCII, and lowercase.
fn normalize(title: &str) -> String {
    plain_title(title)
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '，' => ',',
            '．' => '.',
            _ => c,
        })
        .collect::<String>()
        .to_lowercase()
}
