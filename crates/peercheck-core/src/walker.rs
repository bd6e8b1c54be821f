//! Depth-first topology walk: vault → trunk → NAPs → tie-point branches.
//!
//! Each trunk is walked with its own [`WalkContext`], threaded through the
//! recursion by `&mut` and folded into a [`WalkReport`] when the trunk is
//! done. The walker never fails; every problem it meets becomes an
//! [`Issue`] and traversal continues with whatever is still reachable.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, debug_span, info, warn};

use crate::colors::{colors_for_indices, format_colors, parse_color_set, ColorSet};
use crate::config::WalkConfig;
use crate::issues::{format_path, nap_number, FoundDrop, Issue, IssueCollector, WalkOrder};
use crate::models::{DistributionLine, Nap, NetworkSnapshot, Point, Vault};
use crate::nap_spec::{compress_indices, NapSpec};

// ---------------------------------------------------------------------------
// Walk state
// ---------------------------------------------------------------------------

/// Mutable state for one trunk walk.
#[derive(Debug, Default)]
pub struct WalkContext {
    pub visited: IndexSet<String>,
    /// NAPs already checked in this walk. A child line starts at its
    /// tie-point NAP, which belongs to the parent frame.
    pub checked_naps: IndexSet<String>,
    pub issues: IssueCollector,
    pub order: WalkOrder,
}

impl WalkContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything one walk pass produced, trunk by trunk in vault order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WalkReport {
    pub issues: Vec<Issue>,
    pub order_map: IndexMap<String, usize>,
    pub path_map: IndexMap<String, String>,
    pub visited: IndexSet<String>,
}

impl WalkReport {
    /// Fold a finished trunk walk into the report. Service location
    /// ordinals continue from earlier trunks; first-seen still wins.
    pub fn absorb(&mut self, ctx: WalkContext) {
        self.issues.extend(ctx.issues.into_vec());

        let mut order = WalkOrder {
            order_map: std::mem::take(&mut self.order_map),
            path_map: std::mem::take(&mut self.path_map),
        };
        order.merge(ctx.order);
        self.order_map = order.order_map;
        self.path_map = order.path_map;

        self.visited.extend(ctx.visited);
    }
}

/// Outcome of looking for the child line behind a tie point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildResolution<'s> {
    Assigned(&'s str),
    /// Every candidate letter was already taken at this NAP; the first
    /// candidate is handed back again.
    ReusedFirst(&'s str),
    Unresolved,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Colors a branch expects at a NAP: its indices remapped through every tie
/// point, or the branch indices themselves when nothing maps.
pub fn expected_colors_for_branch(spec: &NapSpec, fiber_indices: &[u32]) -> ColorSet {
    let mapped: BTreeSet<u32> = spec
        .tie_points
        .iter()
        .flat_map(|tp| tp.map_indices(fiber_indices))
        .collect();
    if mapped.is_empty() {
        colors_for_indices(fiber_indices.iter().copied())
    } else {
        colors_for_indices(mapped)
    }
}

/// Branch letter of a distribution id: `"...DF1.24B"` -> `'B'`.
pub fn df_letter(dist_id: &str) -> Option<char> {
    let tail = dist_id.rsplit('.').next()?;
    let mut chars = tail.chars();
    let letter = chars.next_back()?;
    let digits = chars.as_str();
    if letter.is_ascii_alphabetic() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(letter.to_ascii_uppercase())
    } else {
        None
    }
}

/// Find the child line for a tie point at `nap_point`.
///
/// Candidates are `<parent prefix>.<target_ct><Letter>` lines with a vertex
/// within `threshold_m` of the NAP. The parent id needs at least five
/// dot-separated tokens. Letters are handed out in ascending order and
/// recorded in `used_letters`.
pub fn resolve_child_distribution<'s>(
    snapshot: &'s NetworkSnapshot,
    parent_dist_id: &str,
    nap_point: Point,
    target_ct: u32,
    threshold_m: f64,
    used_letters: &mut BTreeSet<char>,
) -> ChildResolution<'s> {
    let parts: Vec<&str> = parent_dist_id.split('.').collect();
    if parts.len() < 5 {
        return ChildResolution::Unresolved;
    }
    let prefix = format!("{}.", parts[..parts.len() - 1].join("."));
    let ct = target_ct.to_string();

    let mut candidates: Vec<(char, &'s str)> = snapshot
        .distributions
        .values()
        .filter_map(|line| {
            let tail = line.id.strip_prefix(&prefix)?;
            let letter = tail.strip_prefix(&ct)?;
            let mut chars = letter.chars();
            let c = chars.next().filter(|c| c.is_ascii_alphabetic())?;
            if chars.next().is_some() || !line.has_vertex_near(nap_point, threshold_m) {
                return None;
            }
            Some((c.to_ascii_uppercase(), line.id.as_str()))
        })
        .collect();
    candidates.sort_by_key(|&(letter, _)| letter);

    let Some(&(_, first)) = candidates.first() else {
        return ChildResolution::Unresolved;
    };
    for (letter, id) in candidates {
        if used_letters.insert(letter) {
            return ChildResolution::Assigned(id);
        }
    }
    ChildResolution::ReusedFirst(first)
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

pub struct Walker<'a> {
    snapshot: &'a NetworkSnapshot,
    specs: &'a BTreeMap<String, NapSpec>,
    config: &'a WalkConfig,
}

impl<'a> Walker<'a> {
    pub fn new(
        snapshot: &'a NetworkSnapshot,
        specs: &'a BTreeMap<String, NapSpec>,
        config: &'a WalkConfig,
    ) -> Self {
        Self {
            snapshot,
            specs,
            config,
        }
    }

    /// Walk every trunk of every vault, vaults in id order.
    pub fn walk_all(&self, initial_indices: &[u32]) -> WalkReport {
        let mut vaults: Vec<&Vault> = self.snapshot.vaults.iter().collect();
        vaults.sort_by(|a, b| a.id.cmp(&b.id));

        let mut report = WalkReport::default();
        let mut trunks = 0usize;
        for vault in vaults {
            for trunk in self.trunks_for_vault(vault) {
                trunks += 1;
                let mut ctx = WalkContext::new();
                self.walk_trunk(vault, trunk, initial_indices, &mut ctx);
                report.absorb(ctx);
            }
        }

        info!(
            trunks,
            distributions = report.visited.len(),
            issues = report.issues.len(),
            service_locations = report.order_map.len(),
            "walk complete"
        );
        report
    }

    /// Trunks `<vault>.DF<n>.<trunk ct>A` with a segment endpoint at the vault.
    pub fn trunks_for_vault(&self, vault: &Vault) -> Vec<&'a DistributionLine> {
        let pattern = format!(
            r"^{}\.DF\d+\.{}A$",
            regex::escape(&vault.id),
            self.config.trunk_fiber_count
        );
        let Ok(re) = Regex::new(&pattern) else {
            return Vec::new();
        };
        self.snapshot
            .distributions
            .values()
            .filter(|line| re.is_match(&line.id))
            .filter(|line| line.has_endpoint_near(vault.point, self.config.threshold_m))
            .collect()
    }

    pub fn walk_trunk(
        &self,
        vault: &Vault,
        trunk: &DistributionLine,
        initial_indices: &[u32],
        ctx: &mut WalkContext,
    ) {
        debug!(vault = %vault.id, trunk = %trunk.id, "starting trunk walk");
        let path = vec![vault.id.clone(), trunk.id.clone()];
        self.walk_distribution(&trunk.id, initial_indices, &path, 0, ctx);
    }

    /// NAPs lying on `line`, ordered by NAP number then id.
    pub fn naps_on_line(&self, line: &DistributionLine) -> Vec<&'a Nap> {
        let mut naps: Vec<&Nap> = self
            .snapshot
            .naps
            .iter()
            .filter(|nap| line.passes_near(nap.point, self.config.threshold_m))
            .collect();
        naps.sort_by(|a, b| {
            let ka = nap_number(&a.id).unwrap_or(u32::MAX);
            let kb = nap_number(&b.id).unwrap_or(u32::MAX);
            ka.cmp(&kb).then_with(|| a.id.cmp(&b.id))
        });
        naps
    }

    pub fn walk_distribution(
        &self,
        dist_id: &str,
        fiber_indices: &[u32],
        path: &[String],
        depth: usize,
        ctx: &mut WalkContext,
    ) {
        let span = debug_span!("walk_distribution", dist_id, depth);
        let _guard = span.enter();

        ctx.visited.insert(dist_id.to_string());

        let Some(line) = self.snapshot.distribution(dist_id) else {
            warn!(dist_id, "distribution not found");
            ctx.issues.push(Issue::DistributionNotFound {
                path: format_path(path),
                dist_id: dist_id.to_string(),
            });
            return;
        };

        for nap in self.naps_on_line(line) {
            if !ctx.checked_naps.insert(nap.id.clone()) {
                debug!(nap_id = %nap.id, "NAP already checked on a parent line");
                continue;
            }
            self.visit_nap(line, nap, fiber_indices, path, depth, ctx);
        }
        debug!(dist_id, "finished branch");
    }

    fn visit_nap(
        &self,
        line: &DistributionLine,
        nap: &Nap,
        fiber_indices: &[u32],
        path: &[String],
        depth: usize,
        ctx: &mut WalkContext,
    ) {
        let threshold = self.config.threshold_m;
        let mut nap_path = path.to_vec();
        nap_path.push(nap.id.clone());

        let Some(spec) = self.specs.get(&nap.id) else {
            warn!(nap_id = %nap.id, "NAP missing specs");
            ctx.issues.push(Issue::NapMissingSpec {
                path: format_path(&nap_path),
                nap_id: nap.id.clone(),
            });
            return;
        };

        let expected = expected_colors_for_branch(spec, fiber_indices);
        let touches = self.snapshot.drops_touching(nap.point, threshold);
        debug!(
            nap_id = %nap.id,
            fibers = %compress_indices(fiber_indices),
            expected = %format_colors(&expected),
            drops = touches.len(),
            "checking NAP"
        );

        for touch in &touches {
            let in_branch = touch.drop.color.is_some_and(|c| expected.contains(&c));
            if !in_branch {
                let found = touch.drop.color_label();
                warn!(nap_id = %nap.id, drop = %found, "drop color not expected at NAP");
                ctx.issues.push(Issue::DropColorNotExpectedAtNap {
                    path: format_path(&nap_path),
                    nap_id: nap.id.clone(),
                    expected_colors: expected.clone(),
                    found_drop_color: found,
                });
            }
        }

        let found_colors: ColorSet = touches.iter().filter_map(|t| t.drop.color).collect();
        let missing: ColorSet = expected.difference(&found_colors).copied().collect();
        if !missing.is_empty() {
            warn!(nap_id = %nap.id, missing = %format_colors(&missing), "missing drop colors at NAP");
            ctx.issues.push(Issue::MissingDropColorsAtNap {
                path: format_path(&nap_path),
                nap_id: nap.id.clone(),
                expected_colors: expected.clone(),
                found_drops: touches
                    .iter()
                    .map(|t| FoundDrop {
                        drop_id: t.drop.id.clone(),
                        color: t.drop.color_label(),
                        distance_m: (t.distance_m * 1000.0).round() / 1000.0,
                    })
                    .collect(),
                missing_colors: missing,
            });
        }

        for touch in &touches {
            let drop = touch.drop;
            debug!(
                dist_id = %line.id,
                drop_id = %drop.id,
                color = %drop.color_label(),
                far_end = ?touch.far_end,
                "drop touches {}",
                nap.id
            );
            let Some(sl) = self.snapshot.service_location_near(touch.far_end, threshold) else {
                continue;
            };
            let mut sl_path = nap_path.clone();
            sl_path.push(sl.id.clone());
            let sl_path = format_path(&sl_path);
            ctx.order.record(&sl.id, &sl_path);

            let svc_colors = parse_color_set(&sl.splice_raw);
            let matches = drop.color.is_some_and(|c| svc_colors.contains(&c));
            debug!(svc_id = %sl.id, splice = %sl.splice_raw, colors = %format_colors(&svc_colors), "service location");
            if !svc_colors.is_empty() && !drop.raw_color.is_empty() && !matches {
                warn!(svc_id = %sl.id, drop = %drop.color_label(), "SL splice mismatch");
                ctx.issues.push(Issue::SlSpliceMismatch {
                    path: sl_path,
                    nap_id: nap.id.clone(),
                    svc_id: sl.id.clone(),
                    drop_color: drop.color_label(),
                    svc_colors,
                });
            }
        }

        if spec.tie_points.is_empty() {
            debug!(nap_id = %nap.id, "no tie points, continuing down {}", line.id);
            return;
        }

        let mut used_letters: HashMap<u32, BTreeSet<char>> = HashMap::new();
        for tp in &spec.tie_points {
            let child_indices = tp.map_indices(fiber_indices);
            let resolution = resolve_child_distribution(
                self.snapshot,
                &line.id,
                nap.point,
                tp.right_ct,
                threshold,
                used_letters.entry(tp.right_ct).or_default(),
            );
            let child_id = match resolution {
                ChildResolution::Assigned(id) => id,
                ChildResolution::ReusedFirst(id) => {
                    warn!(nap_id = %nap.id, child = id, "all branch letters used, reusing first candidate");
                    id
                }
                ChildResolution::Unresolved => {
                    warn!(
                        nap_id = %nap.id,
                        target_ct = tp.right_ct,
                        fibers = %compress_indices(&child_indices),
                        "could not resolve a child distribution"
                    );
                    ctx.issues.push(Issue::ChildDistributionUnresolved {
                        path: format_path(&nap_path),
                        nap_id: nap.id.clone(),
                        parent_dist_id: line.id.clone(),
                        target_ct: tp.right_ct,
                        fiber_indices: child_indices,
                    });
                    continue;
                }
            };

            if ctx.visited.contains(child_id) {
                debug!(child = child_id, "skipping already-walked branch");
                continue;
            }
            debug!(
                nap_id = %nap.id,
                child = child_id,
                fibers = %compress_indices(&child_indices),
                "branching at tie point"
            );
            let mut child_path = nap_path.clone();
            child_path.push(child_id.to_string());
            self.walk_distribution(child_id, &child_indices, &child_path, depth + 1, ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
