//! Canonical 12-color fiber palette and tolerant color-token parsing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// One of the twelve standard fiber colors, ordered by palette position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiberColor {
    Blue,
    Orange,
    Green,
    Brown,
    Slate,
    White,
    Red,
    Black,
    Yellow,
    Violet,
    Rose,
    Aqua,
}

/// Palette positions 1 through 12.
pub const FIBER_COLORS: [FiberColor; 12] = [
    FiberColor::Blue,
    FiberColor::Orange,
    FiberColor::Green,
    FiberColor::Brown,
    FiberColor::Slate,
    FiberColor::White,
    FiberColor::Red,
    FiberColor::Black,
    FiberColor::Yellow,
    FiberColor::Violet,
    FiberColor::Rose,
    FiberColor::Aqua,
];

impl FiberColor {
    pub fn name(self) -> &'static str {
        match self {
            FiberColor::Blue => "Blue",
            FiberColor::Orange => "Orange",
            FiberColor::Green => "Green",
            FiberColor::Brown => "Brown",
            FiberColor::Slate => "Slate",
            FiberColor::White => "White",
            FiberColor::Red => "Red",
            FiberColor::Black => "Black",
            FiberColor::Yellow => "Yellow",
            FiberColor::Violet => "Violet",
            FiberColor::Rose => "Rose",
            FiberColor::Aqua => "Aqua",
        }
    }

    /// 1-based palette position.
    pub fn index(self) -> u32 {
        self as u32 + 1
    }
}

impl fmt::Display for FiberColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Order-insensitive set of canonical colors, iterated in palette order.
pub type ColorSet = BTreeSet<FiberColor>;

/// Map a 1-based fiber index to its color. Cyclic in both directions, so
/// 13 maps to Blue and 0 maps to Aqua.
pub fn index_to_color(i: i64) -> FiberColor {
    FIBER_COLORS[(i - 1).rem_euclid(FIBER_COLORS.len() as i64) as usize]
}

/// Colors for a sequence of 1-based indices (non-positive indices skipped).
pub fn colors_for_indices<I>(indices: I) -> ColorSet
where
    I: IntoIterator<Item = u32>,
{
    indices
        .into_iter()
        .filter(|&i| i >= 1)
        .map(|i| index_to_color(i as i64))
        .collect()
}

/// Result of matching a bare color name against the palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorLookup {
    Exact(FiberColor),
    /// Matched ignoring case; the token's spelling differs from the palette.
    CaseMismatch(FiberColor),
    Unknown,
}

/// Case-insensitive whole-name lookup.
pub fn color_lookup(token: &str) -> ColorLookup {
    let token = token.trim();
    for color in FIBER_COLORS {
        if token == color.name() {
            return ColorLookup::Exact(color);
        }
        if token.eq_ignore_ascii_case(color.name()) {
            return ColorLookup::CaseMismatch(color);
        }
    }
    ColorLookup::Unknown
}

fn parse_palette_index(s: &str) -> Option<FiberColor> {
    match s.trim().parse::<u32>() {
        Ok(i) if (1..=12).contains(&i) => Some(index_to_color(i as i64)),
        _ => None,
    }
}

/// A canonical name at the start of `s`, followed by end of text or a
/// non-letter ("Black 1.1" is Black, "Blueberry" is nothing).
fn color_name_prefix(s: &str) -> Option<FiberColor> {
    let lower = s.trim().to_ascii_lowercase();
    FIBER_COLORS.into_iter().find(|color| {
        let name = color.name().to_ascii_lowercase();
        lower.starts_with(&name)
            && !lower[name.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic())
    })
}

/// Resolve a single free-form color token.
///
/// Accepts `"N - Name"` (the name wins when canonical, else `N`), a token
/// starting with a canonical name, or a bare integer 1..12.
pub fn token_to_color(token: &str) -> Option<FiberColor> {
    let s = token.trim();
    if s.is_empty() {
        return None;
    }
    if let Some((left, right)) = s.split_once('-') {
        let left = left.trim();
        if !left.is_empty() && left.chars().all(|c| c.is_ascii_digit()) {
            return color_name_prefix(right).or_else(|| parse_palette_index(left));
        }
    }
    color_name_prefix(s).or_else(|| parse_palette_index(s))
}

/// Parse every resolvable color out of a delimited string.
pub fn parse_color_set(raw: &str) -> ColorSet {
    raw.split([',', ';', '/', '\n', '\r'])
        .filter_map(token_to_color)
        .collect()
}

/// `"Blue, Orange"` in palette order.
pub fn format_colors(colors: &ColorSet) -> String {
    colors
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Python bindings
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "index_to_color")]
pub fn py_index_to_color(i: i64) -> &'static str {
    index_to_color(i).name()
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "token_to_color")]
pub fn py_token_to_color(token: &str) -> Option<&'static str> {
    token_to_color(token).map(FiberColor::name)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "parse_color_set")]
pub fn py_parse_color_set(raw: &str) -> Vec<&'static str> {
    parse_color_set(raw).into_iter().map(FiberColor::name).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_index_to_color_palette_positions() {
        assert_eq!(index_to_color(1), FiberColor::Blue);
        assert_eq!(index_to_color(12), FiberColor::Aqua);
        assert_eq!(index_to_color(13), FiberColor::Blue);
        assert_eq!(index_to_color(0), FiberColor::Aqua);
        assert_eq!(index_to_color(-11), FiberColor::Blue);
    }

    #[test]
    fn test_token_dash_form_prefers_name() {
        assert_eq!(token_to_color("5 - Slate"), Some(FiberColor::Slate));
        assert_eq!(token_to_color("5 - Slate 1.5"), Some(FiberColor::Slate));
        // Name side is not canonical: fall back to the number.
        assert_eq!(token_to_color("3 - Grn"), Some(FiberColor::Green));
    }

    #[test]
    fn test_token_name_prefix_and_case() {
        assert_eq!(token_to_color("Black 1.1"), Some(FiberColor::Black));
        assert_eq!(token_to_color("slate"), Some(FiberColor::Slate));
        assert_eq!(token_to_color("  Rose  "), Some(FiberColor::Rose));
        assert_eq!(token_to_color("Blueberry"), None);
    }

    #[test]
    fn test_token_bare_integer() {
        assert_eq!(token_to_color("4"), Some(FiberColor::Brown));
        assert_eq!(token_to_color("0"), None);
        assert_eq!(token_to_color("13"), None);
        assert_eq!(token_to_color(""), None);
        assert_eq!(token_to_color("Tie Point"), None);
    }

    #[test]
    fn test_parse_color_set_mixed_delimiters() {
        let set = parse_color_set("Black 1.1, Black 1.2; Slate 2.7\nRed/garbage");
        let expected: ColorSet = [FiberColor::Black, FiberColor::Slate, FiberColor::Red]
            .into_iter()
            .collect();
        assert_eq!(set, expected);
        assert!(parse_color_set("").is_empty());
    }

    #[test]
    fn test_color_lookup_reports_case() {
        assert_eq!(color_lookup("Yellow"), ColorLookup::Exact(FiberColor::Yellow));
        assert_eq!(color_lookup("yellow"), ColorLookup::CaseMismatch(FiberColor::Yellow));
        assert_eq!(color_lookup("Purple"), ColorLookup::Unknown);
    }

    #[test]
    fn test_format_colors_palette_order() {
        let set: ColorSet = [FiberColor::Aqua, FiberColor::Blue].into_iter().collect();
        assert_eq!(format_colors(&set), "Blue, Aqua");
    }

    proptest! {
        #[test]
        fn index_to_color_is_cyclic(i in -10_000i64..10_000i64) {
            prop_assert_eq!(index_to_color(i), index_to_color(i + 12));
        }

        #[test]
        fn numeric_token_round_trips(pos in 0usize..12) {
            let color = FIBER_COLORS[pos];
            prop_assert_eq!(token_to_color(&color.index().to_string()), Some(color));
        }

        #[test]
        fn joined_names_parse_back_to_the_same_set(
            picks in proptest::collection::vec(0usize..12, 0..20)
        ) {
            let colors: Vec<FiberColor> = picks.iter().map(|&p| FIBER_COLORS[p]).collect();
            let joined = colors.iter().map(|c| c.name()).collect::<Vec<_>>().join(",");
            let expected: ColorSet = colors.into_iter().collect();
            prop_assert_eq!(parse_color_set(&joined), expected);
        }
    }
}
