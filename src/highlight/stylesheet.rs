//! Stylesheet injected alongside the fallback script.

use super::{category_class, MARKER_CLASS};
use crate::token::CATEGORIES;

/// Background colour per category key
const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("名詞", "rgba(255, 99, 71, 0.3)"),
    ("代名詞", "rgba(255, 99, 71, 0.3)"),
    ("動詞", "rgba(65, 105, 225, 0.3)"),
    ("形容詞", "rgba(60, 179, 113, 0.3)"),
    ("副詞", "rgba(255, 165, 0, 0.3)"),
    ("助詞", "rgba(186, 85, 211, 0.3)"),
    ("接続詞", "rgba(70, 130, 180, 0.3)"),
    ("感動詞", "rgba(255, 105, 180, 0.3)"),
    ("助動詞", "rgba(240, 230, 140, 0.3)"),
    ("連体詞", "rgba(173, 216, 230, 0.3)"),
    ("接頭詞", "rgba(144, 238, 144, 0.3)"),
    ("接尾辞", "rgba(144, 238, 144, 0.3)"),
    ("補助記号", "rgba(169, 169, 169, 0.3)"),
    ("形状詞", "rgba(138, 43, 226, 0.3)"),
    ("default", "rgba(169, 169, 169, 0.3)"),
];

const FALLBACK_COLOR: &str = "rgba(169, 169, 169, 0.3)";

pub fn category_color(category: &str) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(key, _)| *key == category)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_COLOR)
}

/// Marker rules plus one rule per category
pub fn stylesheet() -> String {
    let mut css = format!(
        ".{MARKER_CLASS} {{ padding: 1px 2px; cursor: pointer; border-radius: 2px; transition: all 0.2s ease; position: relative; }}\n\
         .{MARKER_CLASS}:hover {{ box-shadow: 0 0 3px rgba(0, 0, 0, 0.3); opacity: 0.9; }}\n"
    );
    for category in CATEGORIES {
        css.push_str(&format!(
            ".{} {{ background-color: {}; }}\n",
            category_class(category),
            category_color(category)
        ));
    }
    css
}
