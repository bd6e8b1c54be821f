//! NAP descriptor parsing: fiber count, loose-tube groups, and tie points.
//!
//! Every parser here is best-effort. Malformed text never aborts a run; a
//! field that cannot be parsed comes back empty and the reason is recorded on
//! the per-run [`WarningTracker`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::colors::{color_lookup, colors_for_indices, ColorLookup, ColorSet, FiberColor};
use crate::models::{Nap, NapProperties};

// ---------------------------------------------------------------------------
// Regex patterns
// ---------------------------------------------------------------------------

static TIE_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:Tie\s*Point\s*)?(?P<lct>\d+)\s*ct\s*(?P<ls>\d+)\s*-\s*(?P<le>\d+)\s*to\s*(?:[A-Za-z]+\s+)*(?P<rct>\d+)\s*ct\s*(?P<rs>\d+)\s*-\s*(?P<re>\d+)",
    )
    .unwrap()
});

static RANGE_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").unwrap());

static INDEX_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)|(\d+)").unwrap());

/// Widest `a-b` fiber range a descriptor may name. Anything wider is a typo
/// and is dropped rather than materialized.
pub const MAX_RANGE_SPAN: u32 = 1024;

/// `a..=b` in ascending order, or `None` when it spans more than
/// [`MAX_RANGE_SPAN`] fibers.
fn index_range(a: u32, b: u32) -> Option<RangeInclusive<u32>> {
    let (lo, hi) = (a.min(b), a.max(b));
    (hi - lo < MAX_RANGE_SPAN).then_some(lo..=hi)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One loose-tube group: its abbreviation and the 1-based fiber indices it
/// carries at this NAP.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TubeSpec {
    pub abbrev: String,
    pub indices: Vec<u32>,
}

/// A positional fiber re-mapping from a parent line onto a child line.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TiePoint {
    pub left_ct: u32,
    pub left_range: (u32, u32),
    pub right_ct: u32,
    pub right_range: (u32, u32),
    pub right_indices: Vec<u32>,
}

impl TiePoint {
    /// Build a tie point, normalizing both ranges to ascending order.
    /// `right_indices` holds at most [`MAX_RANGE_SPAN`] entries.
    pub fn new(left_ct: u32, left: (u32, u32), right_ct: u32, right: (u32, u32)) -> Self {
        let left_range = (left.0.min(left.1), left.0.max(left.1));
        let right_range = (right.0.min(right.1), right.0.max(right.1));
        Self {
            left_ct,
            left_range,
            right_ct,
            right_range,
            right_indices: (right_range.0..=right_range.1)
                .take(MAX_RANGE_SPAN as usize)
                .collect(),
        }
    }

    fn exceeds_span(&self) -> bool {
        let span = |(lo, hi): (u32, u32)| hi - lo >= MAX_RANGE_SPAN;
        span(self.left_range) || span(self.right_range)
    }

    /// Map branch indices that fall inside `left_range` to the same offset in
    /// `right_indices`. Order of first appearance is kept, duplicates dropped.
    pub fn map_indices(&self, fiber_indices: &[u32]) -> Vec<u32> {
        let (l0, l1) = self.left_range;
        let mut seen = HashSet::new();
        let mut mapped = Vec::new();
        for &i in fiber_indices {
            if i < l0 || i > l1 {
                continue;
            }
            let Some(&right) = self.right_indices.get((i - l0) as usize) else {
                continue;
            };
            if seen.insert(right) {
                mapped.push(right);
            }
        }
        mapped
    }
}

impl fmt::Display for TiePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tie Point {}ct {}-{} to {}ct {}-{}",
            self.left_ct,
            self.left_range.0,
            self.left_range.1,
            self.right_ct,
            self.right_range.0,
            self.right_range.1
        )
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl TiePoint {
    fn __repr__(&self) -> String {
        format!("TiePoint({self})")
    }
}

/// Structured form of a NAP's descriptor fields.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NapSpec {
    pub fiber_count: Option<u32>,
    pub tube_specs: Vec<TubeSpec>,
    pub tie_points: Vec<TiePoint>,
}

impl NapSpec {
    /// Every loose-tube index, in group order.
    pub fn tube_indices(&self) -> Vec<u32> {
        self.tube_specs
            .iter()
            .flat_map(|t| t.indices.iter().copied())
            .collect()
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl NapSpec {
    fn __repr__(&self) -> String {
        format!(
            "NapSpec(fiber_count={:?}, tube_specs={}, tie_points={})",
            self.fiber_count,
            self.tube_specs.len(),
            self.tie_points.len(),
        )
    }
}

/// Why part of a NAP descriptor was ignored or corrected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    #[error("loose/splice group count mismatch {loose}!={splice}")]
    TubeGroupMismatch { loose: usize, splice: usize },

    #[error("unknown splice color '{token}'")]
    UnknownColor { token: String },

    #[error("splice color case mismatch '{token}' -> '{canonical}'")]
    ColorCaseMismatch { token: String, canonical: FiberColor },

    #[error("fiber range '{range}' spans more than {MAX_RANGE_SPAN} fibers")]
    RangeTooLong { range: String },
}

impl ParseWarning {
    fn dedup_token(&self) -> String {
        match self {
            ParseWarning::TubeGroupMismatch { .. } => "<tube groups>".to_string(),
            ParseWarning::UnknownColor { token }
            | ParseWarning::ColorCaseMismatch { token, .. }
            | ParseWarning::RangeTooLong { range: token } => token.trim().to_lowercase(),
        }
    }
}

/// A warning attributed to a NAP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpecWarning {
    pub nap_id: String,
    #[serde(flatten)]
    pub warning: ParseWarning,
}

/// Per-run de-duplication of resolver warnings: each `(NAP id, token)` pair
/// is reported once.
#[derive(Debug, Default)]
pub struct WarningTracker {
    seen: HashSet<(String, String)>,
    warnings: Vec<SpecWarning>,
}

impl WarningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning; returns false when the same token was already
    /// reported for this NAP.
    pub fn record(&mut self, nap_id: &str, warning: ParseWarning) -> bool {
        let key = (nap_id.to_string(), warning.dedup_token());
        if !self.seen.insert(key) {
            return false;
        }
        warn!(nap_id, "NAP spec: {warning}");
        self.warnings.push(SpecWarning {
            nap_id: nap_id.to_string(),
            warning,
        });
        true
    }

    pub fn warnings(&self) -> &[SpecWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<SpecWarning> {
        self.warnings
    }
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// `"48ct"` -> 48. Non-digits are stripped; nothing left means no count.
pub fn parse_fiber_count(raw: Option<&str>) -> Option<u32> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn resolve_group_color(
    nap_id: &str,
    token: &str,
    tracker: &mut WarningTracker,
) -> Option<u32> {
    match color_lookup(token) {
        ColorLookup::Exact(c) => Some(c.index()),
        ColorLookup::CaseMismatch(c) => {
            tracker.record(
                nap_id,
                ParseWarning::ColorCaseMismatch {
                    token: token.to_string(),
                    canonical: c,
                },
            );
            Some(c.index())
        }
        ColorLookup::Unknown => {
            tracker.record(
                nap_id,
                ParseWarning::UnknownColor {
                    token: token.to_string(),
                },
            );
            None
        }
    }
}

/// Indices for one splice group: `a-b`, `n`, a comma list of numbers and/or
/// color names, or a single color name.
fn parse_splice_group(nap_id: &str, group: &str, tracker: &mut WarningTracker) -> Vec<u32> {
    if let Some(caps) = RANGE_GROUP_RE.captures(group) {
        let (Ok(a), Ok(b)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            return Vec::new();
        };
        let Some(range) = index_range(a, b) else {
            tracker.record(
                nap_id,
                ParseWarning::RangeTooLong {
                    range: group.to_string(),
                },
            );
            return Vec::new();
        };
        return range.collect();
    }
    if !group.is_empty() && group.chars().all(|c| c.is_ascii_digit()) {
        return group.parse().map(|i| vec![i]).unwrap_or_default();
    }
    if group.contains(',') {
        let mut indices = Vec::new();
        for token in group.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(i) = token.parse() {
                    indices.push(i);
                }
                continue;
            }
            if let Some(i) = resolve_group_color(nap_id, token, tracker) {
                indices.push(i);
            }
        }
        return indices;
    }
    resolve_group_color(nap_id, group, tracker)
        .map(|i| vec![i])
        .unwrap_or_default()
}

/// Pair loose-tube groups with splice groups.
///
/// Loose tubes split on `,` and `/`; splice colors split on `/` only since
/// one group may itself be a comma list. A single splice group is shared by
/// every loose tube. Any other count mismatch discards both sides.
pub fn parse_tube_specs(
    nap_id: &str,
    loose_raw: &str,
    splice_raw: &str,
    tracker: &mut WarningTracker,
) -> Result<Vec<TubeSpec>, ParseWarning> {
    let loose_parts: Vec<&str> = loose_raw
        .split([',', '/'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let mut splice_parts: Vec<&str> = splice_raw
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if loose_parts.is_empty() || splice_parts.is_empty() {
        return Ok(Vec::new());
    }
    if splice_parts.len() == 1 {
        splice_parts = vec![splice_parts[0]; loose_parts.len()];
    }
    if loose_parts.len() != splice_parts.len() {
        return Err(ParseWarning::TubeGroupMismatch {
            loose: loose_parts.len(),
            splice: splice_parts.len(),
        });
    }

    let mut specs = Vec::new();
    for (abbrev, group) in loose_parts.into_iter().zip(splice_parts) {
        let indices = parse_splice_group(nap_id, group, tracker);
        if !indices.is_empty() {
            specs.push(TubeSpec {
                abbrev: abbrev.to_string(),
                indices,
            });
        }
    }
    Ok(specs)
}

/// Every `<LCT>ct <LS>-<LE> to <RCT>ct <RS>-<RE>` occurrence in `text`.
/// Tie points naming a range wider than [`MAX_RANGE_SPAN`] are dropped.
pub fn parse_tie_points(text: &str) -> Vec<TiePoint> {
    scan_tie_points(text).0
}

fn scan_tie_points(text: &str) -> (Vec<TiePoint>, Vec<ParseWarning>) {
    let mut tie_points = Vec::new();
    let mut warnings = Vec::new();
    for caps in TIE_POINT_RE.captures_iter(text) {
        let num = |name: &str| caps[name].parse::<u32>().ok();
        let (Some(lct), Some(ls), Some(le), Some(rct), Some(rs), Some(re)) = (
            num("lct"),
            num("ls"),
            num("le"),
            num("rct"),
            num("rs"),
            num("re"),
        ) else {
            continue;
        };
        let tp = TiePoint::new(lct, (ls, le), rct, (rs, re));
        if tp.exceeds_span() {
            warnings.push(ParseWarning::RangeTooLong {
                range: caps[0].trim().to_string(),
            });
            continue;
        }
        tie_points.push(tp);
    }
    (tie_points, warnings)
}

/// Text the tie-point parser reads: the explicit field when present, else
/// the NAP id, with one level of wrapping parentheses removed.
pub fn tie_point_source(nap_id: &str, props: &NapProperties) -> String {
    let src = props
        .tie_points
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(nap_id.trim());
    match src.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => inner.trim().to_string(),
        None => src.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve one NAP's raw fields into a [`NapSpec`].
pub fn resolve_nap_spec(nap_id: &str, props: &NapProperties, tracker: &mut WarningTracker) -> NapSpec {
    let fiber_count = parse_fiber_count(props.fiber_count.as_deref());

    let loose_raw = props.loose_tubes.as_deref().unwrap_or("").trim();
    let splice_raw = props.splice_colors.as_deref().unwrap_or("").trim();
    let tube_specs = match parse_tube_specs(nap_id, loose_raw, splice_raw, tracker) {
        Ok(specs) => specs,
        Err(warning) => {
            tracker.record(nap_id, warning);
            Vec::new()
        }
    };

    let (tie_points, warnings) = scan_tie_points(&tie_point_source(nap_id, props));
    for warning in warnings {
        tracker.record(nap_id, warning);
    }

    NapSpec {
        fiber_count,
        tube_specs,
        tie_points,
    }
}

/// Resolve every NAP in the snapshot, keyed by NAP id. A repeated id keeps
/// the last occurrence.
pub fn resolve_nap_specs(naps: &[Nap], tracker: &mut WarningTracker) -> BTreeMap<String, NapSpec> {
    let mut specs = BTreeMap::new();
    for nap in naps {
        let spec = resolve_nap_spec(&nap.id, &nap.props, tracker);
        if specs.insert(nap.id.clone(), spec).is_some() {
            debug!(nap_id = %nap.id, "duplicate NAP id, keeping last spec");
        }
    }
    specs
}

// ---------------------------------------------------------------------------
// Expected colors from the descriptor text
// ---------------------------------------------------------------------------

/// Text inside the first parenthesized block of a NAP id.
fn descriptor_text(nap_id: &str) -> &str {
    match nap_id.split_once('(') {
        Some((_, inside)) => inside.trim_end().trim_end_matches(')'),
        None => "",
    }
}

/// Indices named after the last comma of one `/`-separated descriptor
/// segment. Fiber counts (`24ct`) and unit numbers are skipped.
fn segment_indices(segment: &str) -> Vec<u32> {
    let tail = segment.rsplit(',').next().unwrap_or("");
    let mut indices = Vec::new();
    for caps in INDEX_TOKEN_RE.captures_iter(tail) {
        let Some(whole) = caps.get(0) else { continue };
        let rest = tail[whole.end()..].trim_start().to_lowercase();
        if rest.starts_with("ct") || rest.starts_with("unit") {
            continue;
        }
        if let (Some(a), Some(b)) = (caps.get(1), caps.get(2)) {
            let (Ok(a), Ok(b)) = (a.as_str().parse::<u32>(), b.as_str().parse::<u32>()) else {
                continue;
            };
            match index_range(a, b) {
                Some(range) => indices.extend(range),
                None => debug!(range = whole.as_str(), "skipping oversized descriptor range"),
            }
        } else if let Some(single) = caps.get(3) {
            if let Ok(i) = single.as_str().parse::<u32>() {
                if i >= 1 {
                    indices.push(i);
                }
            }
        }
    }
    indices
}

/// Indices from the second comma field of the id's parenthesized block:
/// `"04.AC01.HAR.N2 (24ct, 2-4)"` -> `[2, 3, 4]`.
pub fn indices_from_nap_id(nap_id: &str) -> Vec<u32> {
    if !nap_id.contains('(') {
        return Vec::new();
    }
    let parts: Vec<&str> = descriptor_text(nap_id).split(',').map(str::trim).collect();
    let Some(field) = parts.get(1) else {
        return Vec::new();
    };
    let field = field.split('/').next().unwrap_or("").trim();
    let indices: Vec<u32> = if let Some((a, b)) = field.split_once('-') {
        match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
            (Ok(a), Ok(b)) if a <= b => index_range(a, b).map(|r| r.collect()).unwrap_or_default(),
            _ => Vec::new(),
        }
    } else {
        field
            .split_whitespace()
            .filter_map(|t| t.parse::<u32>().ok())
            .collect()
    };
    indices.into_iter().filter(|&i| i > 0).collect()
}

/// Expected drop colors at a NAP before any walk (no branch context).
///
/// With a tie point, the union of every loose-tube index written to the left
/// of `" / Tie Point"` in the id's descriptor, falling back to
/// [`indices_from_nap_id`]. Without one, the union of all tube specs,
/// falling back to every descriptor segment.
pub fn expected_colors_at_nap(nap_id: &str, spec: Option<&NapSpec>) -> ColorSet {
    let inside = descriptor_text(nap_id);
    let has_tie_point = spec.is_some_and(|s| !s.tie_points.is_empty())
        || inside.to_lowercase().contains("tie point");

    if has_tie_point && !inside.is_empty() {
        let indices: Vec<u32> = inside
            .split('/')
            .map(str::trim)
            .take_while(|seg| !seg.to_lowercase().starts_with("tie point"))
            .flat_map(segment_indices)
            .collect();
        if !indices.is_empty() {
            return colors_for_indices(indices);
        }
        return colors_for_indices(indices_from_nap_id(nap_id));
    }

    let mut indices: Vec<u32> = spec.map(NapSpec::tube_indices).unwrap_or_default();
    if indices.is_empty() && !inside.is_empty() {
        indices = inside.split('/').flat_map(segment_indices).collect();
    }
    colors_for_indices(indices)
}

/// `[1, 2, 3, 5, 7, 8]` -> `"1-3, 5, 7-8"`.
pub fn compress_indices(indices: &[u32]) -> String {
    let mut sorted: Vec<u32> = indices.iter().copied().filter(|&i| i > 0).collect();
    sorted.sort_unstable();
    sorted.dedup();
    let Some((&first, rest)) = sorted.split_first() else {
        return String::new();
    };

    let mut out = Vec::new();
    let (mut start, mut end) = (first, first);
    let mut flush = |a: u32, b: u32| {
        out.push(if a == b { a.to_string() } else { format!("{a}-{b}") });
    };
    for &x in rest {
        if x == end + 1 {
            end = x;
        } else {
            flush(start, end);
            start = x;
            end = x;
        }
    }
    flush(start, end);
    out.join(", ")
}

// ---------------------------------------------------------------------------
// Tie-point dump
// ---------------------------------------------------------------------------

/// One line of the tie-point dump logged before a deep walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TiePointDumpEntry {
    pub nap_id: String,
    pub descriptor: String,
    pub branches: Vec<(u32, Vec<u32>)>,
}

/// NAPs carrying tie points, in NAP-number order.
pub fn tie_point_dump(specs: &BTreeMap<String, NapSpec>) -> Vec<TiePointDumpEntry> {
    let mut entries: Vec<TiePointDumpEntry> = specs
        .iter()
        .filter(|(_, spec)| !spec.tie_points.is_empty())
        .map(|(nap_id, spec)| TiePointDumpEntry {
            nap_id: nap_id.clone(),
            descriptor: spec
                .tie_points
                .iter()
                .map(TiePoint::to_string)
                .collect::<Vec<_>>()
                .join(" / "),
            branches: spec
                .tie_points
                .iter()
                .map(|tp| (tp.right_ct, tp.right_indices.clone()))
                .collect(),
        })
        .collect();
    entries.sort_by_key(|e| crate::issues::nap_number(&e.nap_id).unwrap_or(u32::MAX));
    entries
}

// ---------------------------------------------------------------------------
// Python bindings
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "resolve_nap_spec")]
#[pyo3(signature = (nap_id, fiber_count=None, loose_tubes=None, splice_colors=None, tie_points=None))]
pub fn py_resolve_nap_spec(
    nap_id: &str,
    fiber_count: Option<String>,
    loose_tubes: Option<String>,
    splice_colors: Option<String>,
    tie_points: Option<String>,
) -> NapSpec {
    let props = NapProperties {
        fiber_count,
        loose_tubes,
        splice_colors,
        tie_points,
    };
    resolve_nap_spec(nap_id, &props, &mut WarningTracker::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn props(loose: &str, splice: &str) -> NapProperties {
        NapProperties {
            fiber_count: Some("48ct".to_string()),
            loose_tubes: Some(loose.to_string()),
            splice_colors: Some(splice.to_string()),
            tie_points: None,
        }
    }

    fn set(colors: &[FiberColor]) -> ColorSet {
        colors.iter().copied().collect()
    }

    #[test]
    fn test_parse_fiber_count() {
        assert_eq!(parse_fiber_count(Some("48ct")), Some(48));
        assert_eq!(parse_fiber_count(Some(" 24 CT ")), Some(24));
        assert_eq!(parse_fiber_count(Some("n/a")), None);
        assert_eq!(parse_fiber_count(None), None);
    }

    #[test]
    fn test_tube_specs_range_single_and_list() {
        let mut tracker = WarningTracker::new();
        let specs = parse_tube_specs("N1", "BLT / OLT / GLT", "5-2 / 7 / 1,4,12", &mut tracker).unwrap();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].abbrev, "BLT");
        assert_eq!(specs[0].indices, vec![2, 3, 4, 5]);
        assert_eq!(specs[1].indices, vec![7]);
        assert_eq!(specs[2].indices, vec![1, 4, 12]);
        assert!(tracker.warnings().is_empty());
    }

    #[test]
    fn test_tube_specs_color_names_and_warnings() {
        let mut tracker = WarningTracker::new();
        let specs = parse_tube_specs("N1", "BLT", "Blue, orange, Purple", &mut tracker).unwrap();
        assert_eq!(specs[0].indices, vec![1, 2]);
        assert_eq!(tracker.warnings().len(), 2);
        assert!(matches!(
            tracker.warnings()[0].warning,
            ParseWarning::ColorCaseMismatch { canonical: FiberColor::Orange, .. }
        ));
        assert!(matches!(tracker.warnings()[1].warning, ParseWarning::UnknownColor { .. }));
    }

    #[test]
    fn test_tube_specs_single_splice_group_broadcasts() {
        let mut tracker = WarningTracker::new();
        let specs = parse_tube_specs("N1", "BLT, OLT", "1-2", &mut tracker).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].indices, vec![1, 2]);
    }

    #[test]
    fn test_tube_specs_mismatch_is_a_warning() {
        let mut tracker = WarningTracker::new();
        let err = parse_tube_specs("N1", "BLT, OLT, GLT", "1 / 2", &mut tracker).unwrap_err();
        assert_eq!(err, ParseWarning::TubeGroupMismatch { loose: 3, splice: 2 });

        let spec = resolve_nap_spec("N1", &props("BLT, OLT, GLT", "1 / 2"), &mut tracker);
        assert!(spec.tube_specs.is_empty());
        assert_eq!(spec.fiber_count, Some(48));
        assert_eq!(tracker.warnings().len(), 1);
    }

    #[test]
    fn test_warning_tracker_dedups_per_nap_and_token() {
        let mut tracker = WarningTracker::new();
        let w = || ParseWarning::UnknownColor { token: "Purple".to_string() };
        assert!(tracker.record("N1", w()));
        assert!(!tracker.record("N1", ParseWarning::UnknownColor { token: "purple ".to_string() }));
        assert!(tracker.record("N2", w()));
        assert_eq!(tracker.into_warnings().len(), 2);
    }

    #[test]
    fn test_parse_tie_points_multiple_and_direction_words() {
        let tps = parse_tie_points(
            "Tie Point 48ct 15-20 to 24ct 1-6 / Tie Point 48ct 30-25 to South 24ct 7-12",
        );
        assert_eq!(tps.len(), 2);
        assert_eq!(tps[0].left_range, (15, 20));
        assert_eq!(tps[0].right_indices, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(tps[1].left_range, (25, 30));
        assert_eq!(tps[1].right_ct, 24);
        assert_eq!(tps[1].to_string(), "Tie Point 48ct 25-30 to 24ct 7-12");
        assert!(parse_tie_points("24ct, 2-4").is_empty());
    }

    #[test]
    fn test_tie_point_source_falls_back_to_id() {
        let mut p = NapProperties::default();
        assert_eq!(tie_point_source("(48ct 1-2 to 24ct 1-2)", &p), "48ct 1-2 to 24ct 1-2");
        p.tie_points = Some("  ".to_string());
        assert_eq!(tie_point_source("N1", &p), "N1");
        p.tie_points = Some("48ct 1-2 to 12ct 3-4".to_string());
        assert_eq!(tie_point_source("N1", &p), "48ct 1-2 to 12ct 3-4");
    }

    #[test]
    fn test_map_indices_positional() {
        let tp = TiePoint::new(48, (15, 20), 24, (1, 6));
        assert_eq!(tp.map_indices(&[1, 15, 17, 20, 21]), vec![1, 3, 6]);
        assert!(tp.map_indices(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_map_indices_shorter_right_range() {
        let tp = TiePoint::new(48, (1, 6), 12, (1, 3));
        assert_eq!(tp.map_indices(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3]);
    }

    #[test]
    fn test_expected_at_nap_simple_id() {
        let nap_id = "04.AC01.HAR.N2 (24ct, 2-4)";
        let spec = resolve_nap_spec(nap_id, &NapProperties::default(), &mut WarningTracker::new());
        assert!(spec.tie_points.is_empty());
        assert_eq!(
            expected_colors_at_nap(nap_id, Some(&spec)),
            set(&[FiberColor::Orange, FiberColor::Green, FiberColor::Brown])
        );
    }

    #[test]
    fn test_expected_at_nap_two_loose_tubes_and_tie_point() {
        let nap_id = "04.AC01.HAR.N7 (48ct BLT,12 / OLT,1-2 / Tie Point 48ct 15-20 to 24ct 15-20)";
        let spec = resolve_nap_spec(nap_id, &NapProperties::default(), &mut WarningTracker::new());
        assert_eq!(spec.tie_points.len(), 1);
        assert_eq!(
            expected_colors_at_nap(nap_id, Some(&spec)),
            set(&[FiberColor::Aqua, FiberColor::Blue, FiberColor::Orange])
        );
    }

    #[test]
    fn test_expected_at_nap_only_reads_left_of_tie_point() {
        let nap_id = "N9 (48ct, 3 / Tie Point 48ct 1-2 to 24ct 1-2)";
        // The only left segment is "48ct, 3" whose tail is " 3".
        assert_eq!(
            expected_colors_at_nap(nap_id, None),
            set(&[FiberColor::Green])
        );
        let bare = "N9 (Tie Point 48ct 1-2 to 24ct 1-2)";
        assert!(expected_colors_at_nap(bare, None).is_empty());
    }

    #[test]
    fn test_expected_at_nap_prefers_tube_specs_without_tie_point() {
        let mut tracker = WarningTracker::new();
        let spec = resolve_nap_spec("N3 (48ct, 9)", &props("BLT / OLT", "1 / 5-6"), &mut tracker);
        assert_eq!(
            expected_colors_at_nap("N3 (48ct, 9)", Some(&spec)),
            set(&[FiberColor::Blue, FiberColor::Slate, FiberColor::White])
        );
    }

    #[test]
    fn test_indices_from_nap_id_forms() {
        assert_eq!(indices_from_nap_id("X.N2 (24ct, 2-4)"), vec![2, 3, 4]);
        assert_eq!(indices_from_nap_id("X.N2 (24ct, 5 / BLT)"), vec![5]);
        assert!(indices_from_nap_id("X.N2 (24ct)").is_empty());
        assert!(indices_from_nap_id("X.N2").is_empty());
    }

    #[test]
    fn test_oversized_ranges_are_dropped_with_warning() {
        let mut tracker = WarningTracker::new();
        let specs = parse_tube_specs("N1", "BLT / OLT", "1-4000000000 / 3", &mut tracker).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].abbrev, "OLT");
        assert_eq!(
            tracker.warnings()[0].warning,
            ParseWarning::RangeTooLong {
                range: "1-4000000000".to_string()
            }
        );

        let nap_id = "X.N7 (48ct, 1-4000000000 / Tie Point 48ct 1-4000000000 to 24ct 1-4)";
        let mut tracker = WarningTracker::new();
        let spec = resolve_nap_spec(nap_id, &NapProperties::default(), &mut tracker);
        assert!(spec.tie_points.is_empty());
        assert!(tracker
            .warnings()
            .iter()
            .any(|w| matches!(w.warning, ParseWarning::RangeTooLong { .. })));
        assert!(expected_colors_at_nap(nap_id, Some(&spec)).is_empty());
        assert!(indices_from_nap_id(nap_id).is_empty());

        // Widest accepted span still parses.
        assert_eq!(parse_tie_points("48ct 1-1024 to 24ct 1-4").len(), 1);
        assert!(parse_tie_points("48ct 1-4 to 24ct 1-1025").is_empty());
    }

    #[test]
    fn test_compress_indices() {
        assert_eq!(compress_indices(&[1, 2, 3, 5, 7, 8]), "1-3, 5, 7-8");
        assert_eq!(compress_indices(&[4, 4, 0]), "4");
        assert_eq!(compress_indices(&[]), "");
    }

    #[test]
    fn test_tie_point_dump_orders_by_nap_number() {
        let mut specs = BTreeMap::new();
        let tp = TiePoint::new(48, (1, 2), 24, (3, 4));
        for id in ["A.N10", "A.N2", "A.N3"] {
            let tie_points = if id == "A.N3" { vec![] } else { vec![tp.clone()] };
            specs.insert(
                id.to_string(),
                NapSpec {
                    tie_points,
                    ..NapSpec::default()
                },
            );
        }
        let dump = tie_point_dump(&specs);
        let ids: Vec<&str> = dump.iter().map(|e| e.nap_id.as_str()).collect();
        assert_eq!(ids, vec!["A.N2", "A.N10"]);
        assert_eq!(dump[0].branches, vec![(24, vec![3, 4])]);
        assert_eq!(dump[0].descriptor, "Tie Point 48ct 1-2 to 24ct 3-4");
    }
}
