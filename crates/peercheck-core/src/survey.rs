//! Pre-walk NAP survey.
//!
//! Visits every NAP in natural id order, independent of line topology, and
//! checks each drop touching it against the NAP's own descriptor rather than
//! a branch's fiber set. Produces one [`SurveyEntry`] per drop.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::colors::{format_colors, parse_color_set, ColorSet};
use crate::issues::{format_path, Issue};
use crate::models::{Nap, NetworkSnapshot, Point};
use crate::nap_spec::{compress_indices, expected_colors_at_nap, NapSpec};

/// Service location found at a drop's far end.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SurveyService {
    pub svc_id: String,
    pub splice_raw: String,
    pub svc_colors: ColorSet,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SurveyEntry {
    pub nap_id: String,
    pub drop_id: String,
    pub color: String,
    pub fiber_number: Option<u32>,
    pub far_end: Point,
    pub meta: String,
    pub service: Option<SurveyService>,
    pub flagged: bool,
}

impl SurveyEntry {
    /// One log line: `✅  DROP d1: color=Blue touches N1 (48ct, 1)`.
    pub fn log_line(&self) -> String {
        let icon = if self.flagged { "❌" } else { "✅" };
        let meta = if self.meta.is_empty() {
            String::new()
        } else {
            format!(" {}", self.meta)
        };
        format!(
            "{icon}  DROP {}: color={} touches {}{meta}",
            self.drop_id, self.color, self.nap_id
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SurveyReport {
    pub entries: Vec<SurveyEntry>,
    pub issues: Vec<Issue>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Compare ids treating digit runs as numbers: `N2 < N10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn chunks(s: &str) -> Vec<(bool, &str)> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut digit = None;
        for (i, c) in s.char_indices() {
            let is_digit = c.is_ascii_digit();
            if digit.is_some_and(|d| d != is_digit) {
                out.push((digit == Some(true), &s[start..i]));
                start = i;
            }
            digit = Some(is_digit);
        }
        if start < s.len() {
            out.push((digit == Some(true), &s[start..]));
        }
        out
    }

    let (ca, cb) = (chunks(a), chunks(b));
    for ((da, xa), (db, xb)) in ca.iter().zip(cb.iter()) {
        let ord = match (da, db) {
            (true, true) => {
                let na = xa.trim_start_matches('0');
                let nb = xb.trim_start_matches('0');
                na.len().cmp(&nb.len()).then_with(|| na.cmp(nb))
            }
            _ => xa.to_lowercase().cmp(&xb.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(b))
}

/// `"(48ct, 12 / BLT, 12 / OLT, 1-2 / Tie Point 48ct 15-20 to 24ct 15-20)"`.
///
/// The lead-in is the fiber count followed by the drop's fiber number when
/// known. Empty when the spec has nothing to show.
pub fn nap_meta(spec: Option<&NapSpec>, fiber_number: Option<u32>) -> String {
    let Some(spec) = spec else {
        return String::new();
    };
    let mut segments = Vec::new();
    if let Some(ct) = spec.fiber_count.filter(|&c| c > 0) {
        segments.push(match fiber_number {
            Some(n) => format!("{ct}ct, {n}"),
            None => format!("{ct}ct"),
        });
    }
    for tube in &spec.tube_specs {
        let range = compress_indices(&tube.indices);
        segments.push(match (tube.abbrev.is_empty(), range.is_empty()) {
            (false, false) => format!("{}, {range}", tube.abbrev),
            (false, true) => tube.abbrev.clone(),
            _ => range,
        });
    }
    segments.extend(spec.tie_points.iter().map(|tp| tp.to_string()));

    if segments.is_empty() {
        String::new()
    } else {
        format!("({})", segments.join(" / "))
    }
}

// ---------------------------------------------------------------------------
// Survey
// ---------------------------------------------------------------------------

pub fn survey_naps(
    snapshot: &NetworkSnapshot,
    specs: &BTreeMap<String, NapSpec>,
    threshold_m: f64,
) -> SurveyReport {
    let mut naps: Vec<&Nap> = snapshot.naps.iter().filter(|n| !n.id.is_empty()).collect();
    naps.sort_by(|a, b| natural_cmp(&a.id, &b.id));

    let mut report = SurveyReport::default();
    for nap in naps {
        let spec = specs.get(&nap.id);
        let expected = expected_colors_at_nap(&nap.id, spec);

        for touch in snapshot.drops_touching(nap.point, threshold_m) {
            let drop = touch.drop;
            let color = drop.color_label();
            let mut flagged = false;

            let in_nap = drop.color.is_some_and(|c| expected.contains(&c));
            if !expected.is_empty() && !in_nap {
                report.issues.push(Issue::DropColorNotExpectedAtNap {
                    path: format_path(&[nap.id.as_str(), drop.id.as_str()]),
                    nap_id: nap.id.clone(),
                    expected_colors: expected.clone(),
                    found_drop_color: color.clone(),
                });
                flagged = true;
            }

            let service = snapshot
                .service_location_near(touch.far_end, threshold_m)
                .map(|sl| SurveyService {
                    svc_id: sl.id.clone(),
                    splice_raw: sl.splice_raw.clone(),
                    svc_colors: parse_color_set(&sl.splice_raw),
                });
            if let Some(svc) = &service {
                let matches = drop.color.is_some_and(|c| svc.svc_colors.contains(&c));
                if !svc.svc_colors.is_empty() && !drop.raw_color.is_empty() && !matches {
                    report.issues.push(Issue::SlSpliceMismatch {
                        path: format_path(&[nap.id.as_str(), drop.id.as_str(), svc.svc_id.as_str()]),
                        nap_id: nap.id.clone(),
                        svc_id: svc.svc_id.clone(),
                        drop_color: color.clone(),
                        svc_colors: svc.svc_colors.clone(),
                    });
                    flagged = true;
                }
            }

            let fiber_number = drop.color.map(|c| c.index());
            let entry = SurveyEntry {
                nap_id: nap.id.clone(),
                drop_id: drop.id.clone(),
                color,
                fiber_number,
                far_end: touch.far_end,
                meta: nap_meta(spec, fiber_number),
                service,
                flagged,
            };
            info!("{}", entry.log_line());
            if let Some(svc) = &entry.service {
                info!(
                    "    SVC {}: splice={} → colors=[{}]",
                    svc.svc_id,
                    svc.splice_raw,
                    format_colors(&svc.svc_colors)
                );
            }
            report.entries.push(entry);
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::THRESHOLD_M;
    use crate::issues::IssueKind;
    use crate::models::NapProperties;
    use crate::nap_spec::{resolve_nap_specs, WarningTracker};
    use crate::test_support::NetworkBuilder;

    fn survey(snapshot: &NetworkSnapshot) -> SurveyReport {
        let specs = resolve_nap_specs(&snapshot.naps, &mut WarningTracker::new());
        survey_naps(snapshot, &specs, THRESHOLD_M)
    }

    #[test]
    fn test_natural_cmp() {
        let mut ids = vec!["A.N10", "A.N2", "A.N1", "a.N3"];
        ids.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(ids, vec!["A.N1", "A.N2", "a.N3", "A.N10"]);
        assert_eq!(natural_cmp("N02", "N2"), Ordering::Less);
    }

    #[test]
    fn test_nap_meta_string() {
        let props = NapProperties {
            fiber_count: Some("48ct".to_string()),
            loose_tubes: Some("BLT / OLT".to_string()),
            splice_colors: Some("12 / 1-2".to_string()),
            tie_points: Some("Tie Point 48ct 15-20 to 24ct 15-20".to_string()),
        };
        let spec = crate::nap_spec::resolve_nap_spec("N1", &props, &mut WarningTracker::new());
        assert_eq!(
            nap_meta(Some(&spec), Some(12)),
            "(48ct, 12 / BLT, 12 / OLT, 1-2 / Tie Point 48ct 15-20 to 24ct 15-20)"
        );
        assert_eq!(nap_meta(Some(&NapSpec::default()), None), "");
        assert_eq!(nap_meta(None, Some(1)), "");
    }

    #[test]
    fn test_survey_flags_unexpected_drop_and_splice_mismatch() {
        let snapshot = NetworkBuilder::new()
            .nap("04.AC01.HAR.N10 (24ct, 5)", 40.002, -75.0)
            .nap("04.AC01.HAR.N2 (24ct, 2-4)", 40.001, -75.0)
            .drop_line("D1", (40.001, -75.0), (40.001, -74.9995), "Blue")
            .drop_line("D2", (40.001, -75.0), (40.0012, -75.0), "3 - Green")
            .drop_line("D3", (40.002, -74.9995), (40.002, -75.0), "Slate")
            .service_location("SL2", 40.0012, -75.0, "Green")
            .service_location("SL3", 40.002, -74.9995, "Red")
            .build();
        let report = survey(&snapshot);

        let rows: Vec<(&str, &str, bool)> = report
            .entries
            .iter()
            .map(|e| (e.nap_id.as_str(), e.drop_id.as_str(), e.flagged))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("04.AC01.HAR.N2 (24ct, 2-4)", "D1", true),
                ("04.AC01.HAR.N2 (24ct, 2-4)", "D2", false),
                ("04.AC01.HAR.N10 (24ct, 5)", "D3", true),
            ]
        );

        let kinds: Vec<IssueKind> = report.issues.iter().map(Issue::kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::DropColorNotExpectedAtNap, IssueKind::SlSpliceMismatch]
        );
        assert_eq!(report.issues[0].path(), "04.AC01.HAR.N2 (24ct, 2-4) → D1");
        assert_eq!(report.issues[1].path(), "04.AC01.HAR.N10 (24ct, 5) → D3 → SL3");

        let d2 = &report.entries[1];
        assert_eq!(d2.fiber_number, Some(3));
        assert_eq!(d2.service.as_ref().map(|s| s.svc_id.as_str()), Some("SL2"));
        assert!(d2.log_line().starts_with("✅  DROP D2: color=Green touches"));
    }

    #[test]
    fn test_survey_skips_color_check_without_expectation() {
        let snapshot = NetworkBuilder::new()
            .nap("04.AC01.HAR.N1", 40.001, -75.0)
            .drop_line("D1", (40.001, -75.0), (40.001, -74.9995), "Magenta")
            .build();
        let report = survey(&snapshot);
        assert!(report.issues.is_empty());
        assert_eq!(report.entries[0].color, "Magenta");
        assert_eq!(report.entries[0].fiber_number, None);
    }
}
