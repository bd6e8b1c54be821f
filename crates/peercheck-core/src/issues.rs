//! Structured defect records, the append-only collector, and the service
//! location visitation order.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::colors::ColorSet;

static NAP_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.N(\d+)").unwrap());

/// Separator used in every human-readable path trail.
pub const PATH_SEPARATOR: &str = " → ";

/// Join non-empty path tokens with [`PATH_SEPARATOR`].
pub fn format_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Numeric NAP suffix: `"04.AC01.HAR.N12 (24ct, 2-4)"` -> 12.
pub fn nap_number(nap_id: &str) -> Option<u32> {
    NAP_NUMBER_RE
        .captures(nap_id)
        .and_then(|caps| caps[1].parse().ok())
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// A drop observed at a NAP, as reported in a missing-colors issue.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoundDrop {
    pub drop_id: String,
    pub color: String,
    pub distance_m: f64,
}

/// One detected defect. Created at detection time and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum Issue {
    DistributionNotFound {
        path: String,
        dist_id: String,
    },
    NapMissingSpec {
        path: String,
        nap_id: String,
    },
    MissingDropColorsAtNap {
        path: String,
        nap_id: String,
        expected_colors: ColorSet,
        found_drops: Vec<FoundDrop>,
        missing_colors: ColorSet,
    },
    DropColorNotExpectedAtNap {
        path: String,
        nap_id: String,
        expected_colors: ColorSet,
        found_drop_color: String,
    },
    SlSpliceMismatch {
        path: String,
        nap_id: String,
        svc_id: String,
        drop_color: String,
        svc_colors: ColorSet,
    },
    ChildDistributionUnresolved {
        path: String,
        nap_id: String,
        parent_dist_id: String,
        target_ct: u32,
        fiber_indices: Vec<u32>,
    },
}

/// Discriminant of [`Issue`], with the label shown in reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueKind {
    DistributionNotFound,
    NapMissingSpec,
    MissingDropColorsAtNap,
    DropColorNotExpectedAtNap,
    SlSpliceMismatch,
    ChildDistributionUnresolved,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::DistributionNotFound => "Distribution not found",
            IssueKind::NapMissingSpec => "NAP missing specs",
            IssueKind::MissingDropColorsAtNap => "Missing drop colors at NAP",
            IssueKind::DropColorNotExpectedAtNap => "Drop color not expected at NAP",
            IssueKind::SlSpliceMismatch => "SL splice mismatch",
            IssueKind::ChildDistributionUnresolved => "Child distribution unresolved",
        }
    }
}

impl Issue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Issue::DistributionNotFound { .. } => IssueKind::DistributionNotFound,
            Issue::NapMissingSpec { .. } => IssueKind::NapMissingSpec,
            Issue::MissingDropColorsAtNap { .. } => IssueKind::MissingDropColorsAtNap,
            Issue::DropColorNotExpectedAtNap { .. } => IssueKind::DropColorNotExpectedAtNap,
            Issue::SlSpliceMismatch { .. } => IssueKind::SlSpliceMismatch,
            Issue::ChildDistributionUnresolved { .. } => IssueKind::ChildDistributionUnresolved,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Issue::DistributionNotFound { path, .. }
            | Issue::NapMissingSpec { path, .. }
            | Issue::MissingDropColorsAtNap { path, .. }
            | Issue::DropColorNotExpectedAtNap { path, .. }
            | Issue::SlSpliceMismatch { path, .. }
            | Issue::ChildDistributionUnresolved { path, .. } => path,
        }
    }

    pub fn nap_id(&self) -> Option<&str> {
        match self {
            Issue::DistributionNotFound { .. } => None,
            Issue::NapMissingSpec { nap_id, .. }
            | Issue::MissingDropColorsAtNap { nap_id, .. }
            | Issue::DropColorNotExpectedAtNap { nap_id, .. }
            | Issue::SlSpliceMismatch { nap_id, .. }
            | Issue::ChildDistributionUnresolved { nap_id, .. } => Some(nap_id),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind().label(), self.path())
    }
}

/// Stable sort by NAP number; issues without a NAP go last.
pub fn sort_issues_by_nap(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| {
        let n = issue.nap_id().and_then(nap_number);
        (n.is_none(), n)
    });
}

// ---------------------------------------------------------------------------
// IssueCollector
// ---------------------------------------------------------------------------

/// Ordered, append-only issue sink. No dedup, no sorting.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IssueCollector {
    issues: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: IssueCollector) {
        self.issues.extend(other.issues);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind() == kind).count()
    }

    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}

// ---------------------------------------------------------------------------
// WalkOrder
// ---------------------------------------------------------------------------

/// Service locations in first-visit order, with the path trail that first
/// reached each one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WalkOrder {
    pub order_map: IndexMap<String, usize>,
    pub path_map: IndexMap<String, String>,
}

impl WalkOrder {
    /// Record a visit. Returns false when `svc_id` was already seen.
    pub fn record(&mut self, svc_id: &str, path: &str) -> bool {
        if self.order_map.contains_key(svc_id) {
            return false;
        }
        let ordinal = self.order_map.len() + 1;
        self.order_map.insert(svc_id.to_string(), ordinal);
        self.path_map.insert(svc_id.to_string(), path.to_string());
        true
    }

    /// Append another walk's visits after this one's, renumbering ordinals.
    pub fn merge(&mut self, other: WalkOrder) {
        let mut paths = other.path_map;
        for (svc_id, _) in other.order_map {
            let path = paths.shift_remove(&svc_id).unwrap_or_default();
            self.record(&svc_id, &path);
        }
    }

    pub fn len(&self) -> usize {
        self.order_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::FiberColor;

    fn missing_spec(nap_id: &str) -> Issue {
        Issue::NapMissingSpec {
            path: format_path(&["V", nap_id]),
            nap_id: nap_id.to_string(),
        }
    }

    #[test]
    fn test_nap_number() {
        assert_eq!(nap_number("04.AC01.HAR.N12 (24ct, 2-4)"), Some(12));
        assert_eq!(nap_number("A.N3"), Some(3));
        assert_eq!(nap_number("A.DF1.48A"), None);
    }

    #[test]
    fn test_format_path_skips_empty_tokens() {
        assert_eq!(format_path(&["V", "", "V.DF1.48A", "N1"]), "V → V.DF1.48A → N1");
        assert_eq!(format_path::<&str>(&[]), "");
    }

    #[test]
    fn test_sort_issues_by_nap_is_stable_and_puts_nap_less_last() {
        let mut issues = vec![
            Issue::DistributionNotFound {
                path: "V".to_string(),
                dist_id: "V.DF1.48A".to_string(),
            },
            missing_spec("A.N10"),
            missing_spec("A.N2"),
            Issue::ChildDistributionUnresolved {
                path: "V → A.N2".to_string(),
                nap_id: "A.N2".to_string(),
                parent_dist_id: "V.DF1.48A".to_string(),
                target_ct: 24,
                fiber_indices: vec![1],
            },
        ];
        sort_issues_by_nap(&mut issues);
        let kinds: Vec<IssueKind> = issues.iter().map(Issue::kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::NapMissingSpec,
                IssueKind::ChildDistributionUnresolved,
                IssueKind::NapMissingSpec,
                IssueKind::DistributionNotFound,
            ]
        );
        assert_eq!(issues[2].nap_id(), Some("A.N10"));
    }

    #[test]
    fn test_issue_serializes_with_tag() {
        let issue = Issue::DropColorNotExpectedAtNap {
            path: "V → N1".to_string(),
            nap_id: "N1".to_string(),
            expected_colors: [FiberColor::Orange, FiberColor::Green].into_iter().collect(),
            found_drop_color: "Blue".to_string(),
        };
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["issue"], "drop_color_not_expected_at_nap");
        assert_eq!(value["found_drop_color"], "Blue");
        assert_eq!(value["expected_colors"], serde_json::json!(["Orange", "Green"]));
        assert_eq!(issue.to_string(), "Drop color not expected at NAP: V → N1");
    }

    #[test]
    fn test_collector_keeps_insertion_order() {
        let mut c = IssueCollector::new();
        c.push(missing_spec("A.N5"));
        c.push(missing_spec("A.N1"));
        assert_eq!(c.len(), 2);
        assert_eq!(c.count(IssueKind::NapMissingSpec), 2);
        let ids: Vec<_> = c.iter().filter_map(Issue::nap_id).collect();
        assert_eq!(ids, vec!["A.N5", "A.N1"]);
    }

    #[test]
    fn test_walk_order_first_seen_wins() {
        let mut order = WalkOrder::default();
        assert!(order.record("SL1", "a"));
        assert!(order.record("SL2", "b"));
        assert!(!order.record("SL1", "c"));
        assert_eq!(order.order_map["SL1"], 1);
        assert_eq!(order.path_map["SL1"], "a");

        let mut other = WalkOrder::default();
        other.record("SL2", "x");
        other.record("SL3", "y");
        order.merge(other);
        assert_eq!(order.len(), 3);
        assert_eq!(order.order_map["SL3"], 3);
        assert_eq!(order.path_map["SL2"], "b");
    }
}
