//! Menu import matching
//!
//! Menu items come from two sources: a vision model reads names and prices
//! off a page image, and the PDF text layer gives positioned text blocks.
//! Matching pairs each item with the block that names it so the item can be
//! shown at its place on the printed menu.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Weight of the containment bonus added on top of Jaccard similarity
const CONTAINMENT_BONUS: f64 = 0.25;

/// Item read from a menu image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub name: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Positioned text from a PDF page (PDF points, origin top-left)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub page: i32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuPosition {
    pub page: i32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&TextBlock> for MenuPosition {
    fn from(block: &TextBlock) -> Self {
        Self {
            page: block.page,
            x: block.x,
            y: block.y,
            width: block.width,
            height: block.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedItem {
    pub item: ScrapedItem,
    pub position: Option<MenuPosition>,
    pub score: f64,
}

fn is_price_token(token: &str) -> bool {
    let digits = token.trim_start_matches(['$', '€', '£']);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// Lowercase, drop price tokens and punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .filter(|t| !is_price_token(t))
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token Jaccard similarity plus a bonus when one text contains the other.
///
/// Scores are in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (na, nb) = (normalize(a), normalize(b));
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    let ta: HashSet<&str> = na.split(' ').collect();
    let tb: HashSet<&str> = nb.split(' ').collect();
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    let mut score = intersection / union;
    if na.contains(nb.as_str()) || nb.contains(na.as_str()) {
        score += CONTAINMENT_BONUS;
    }
    score.min(1.0)
}

/// Pair items with text blocks one-to-one.
///
/// All candidate pairs at or above `threshold` are taken greedily, best score
/// first; each item and each block is used at most once. Pairs sharing no
/// words never match, whatever the threshold. Output keeps the
/// input item order.
pub fn match_items(items: &[ScrapedItem], blocks: &[TextBlock], threshold: f64) -> Vec<MatchedItem> {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (i, item) in items.iter().enumerate() {
        for (b, block) in blocks.iter().enumerate() {
            let score = similarity(&item.name, &block.text);
            if score > 0.0 && score >= threshold {
                candidates.push((score, i, b));
            }
        }
    }
    candidates.sort_by(|x, y| {
        y.0.total_cmp(&x.0)
            .then(x.1.cmp(&y.1))
            .then(x.2.cmp(&y.2))
    });

    let mut assigned: Vec<Option<(usize, f64)>> = vec![None; items.len()];
    let mut used_blocks = HashSet::new();
    for (score, i, b) in candidates {
        if assigned[i].is_some() || used_blocks.contains(&b) {
            continue;
        }
        assigned[i] = Some((b, score));
        used_blocks.insert(b);
    }

    items
        .iter()
        .zip(assigned)
        .map(|(item, hit)| MatchedItem {
            item: item.clone(),
            position: hit.map(|(b, _)| MenuPosition::from(&blocks[b])),
            score: hit.map(|(_, s)| s).unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ScrapedItem {
        ScrapedItem {
            name: name.to_string(),
            price: None,
            description: None,
            category: None,
        }
    }

    fn block(text: &str, y: f64) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            page: 1,
            x: 40.0,
            y,
            width: 200.0,
            height: 14.0,
        }
    }

    #[test]
    fn normalize_strips_prices_and_punctuation() {
        assert_eq!(normalize("  Fish & Chips ..... $12.50 "), "fish chips");
        assert_eq!(normalize("CAFÉ Latte, 4.00"), "café latte");
        assert_eq!(normalize("€9"), "");
    }

    #[test]
    fn similarity_scores() {
        assert_eq!(similarity("Margherita Pizza", "MARGHERITA PIZZA 14.00"), 1.0);
        assert_eq!(similarity("Soup", ""), 0.0);
        // {margherita, pizza} vs {pizza}: 0.5 jaccard + containment
        assert!((similarity("Margherita Pizza", "Pizza") - 0.75).abs() < 1e-9);
        assert!(similarity("Caesar Salad", "Chocolate Cake") < 0.1);
    }

    #[test]
    fn greedy_one_to_one_matching() {
        let items = vec![item("Pizza"), item("Margherita Pizza"), item("Tiramisu")];
        let blocks = vec![block("Margherita Pizza  12.00", 100.0), block("Pizza", 200.0)];
        let matched = match_items(&items, &blocks, DEFAULT_MATCH_THRESHOLD);

        assert_eq!(matched.len(), 3);
        // exact matches win over the containment pair
        assert_eq!(matched[0].position.map(|p| p.y), Some(200.0));
        assert_eq!(matched[1].position.map(|p| p.y), Some(100.0));
        assert_eq!(matched[2].position, None);
        assert_eq!(matched[2].score, 0.0);
    }

    #[test]
    fn each_block_used_once() {
        let items = vec![item("Flat White"), item("Flat White")];
        let blocks = vec![block("Flat White", 10.0)];
        let matched = match_items(&items, &blocks, DEFAULT_MATCH_THRESHOLD);
        assert!(matched[0].position.is_some());
        assert!(matched[1].position.is_none());
    }

    #[test]
    fn threshold_filters_weak_pairs() {
        let items = vec![item("Grilled Chicken Burger")];
        let blocks = vec![block("Chicken Soup", 10.0)];
        assert!(match_items(&items, &blocks, DEFAULT_MATCH_THRESHOLD)[0]
            .position
            .is_none());
        assert!(match_items(&items, &blocks, 0.2)[0].position.is_some());
    }

    #[test]
    fn unrelated_blocks_never_match() {
        let items = vec![item("Tiramisu")];
        let blocks = vec![block("Opening hours", 10.0)];
        let matched = match_items(&items, &blocks, 0.0);
        assert!(matched[0].position.is_none());
        assert_eq!(matched[0].score, 0.0);
    }
}
