//! Run-level entry points: the full audit and the lighter walk-order pass.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::config::WalkConfig;
use crate::issues::{sort_issues_by_nap, Issue};
use crate::models::NetworkSnapshot;
use crate::nap_spec::{
    resolve_nap_specs, tie_point_dump, NapSpec, SpecWarning, TiePointDumpEntry, WarningTracker,
};
use crate::survey::{survey_naps, SurveyEntry};
use crate::walker::{WalkReport, Walker};

/// Everything one audit run produced, ready for a report renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub issues: Vec<Issue>,
    pub warnings: Vec<SpecWarning>,
    pub survey: Vec<SurveyEntry>,
    pub tie_points: Vec<TiePointDumpEntry>,
    pub order_map: IndexMap<String, usize>,
    pub path_map: IndexMap<String, String>,
}

fn resolve_specs(snapshot: &NetworkSnapshot) -> (BTreeMap<String, NapSpec>, Vec<SpecWarning>) {
    let mut tracker = WarningTracker::new();
    let specs = resolve_nap_specs(&snapshot.naps, &mut tracker);
    (specs, tracker.into_warnings())
}

/// Resolve specs, survey every NAP, then deep-walk every trunk.
///
/// Survey issues come first, then walk issues; the combined list is sorted
/// by NAP number (stable).
pub fn audit_network(snapshot: &NetworkSnapshot, config: &WalkConfig) -> AuditReport {
    let (specs, warnings) = resolve_specs(snapshot);

    let tie_points = tie_point_dump(&specs);
    for entry in &tie_points {
        debug!(
            "NAP {} ({}) tie-points: {:?}",
            entry.nap_id, entry.descriptor, entry.branches
        );
    }

    let survey = survey_naps(snapshot, &specs, config.threshold_m);
    let walk = Walker::new(snapshot, &specs, config).walk_all(&config.deep_indices());

    let mut issues = survey.issues;
    issues.extend(walk.issues);
    sort_issues_by_nap(&mut issues);

    info!(
        issues = issues.len(),
        warnings = warnings.len(),
        "deep distribution walk complete"
    );
    AuditReport {
        issues,
        warnings,
        survey: survey.entries,
        tie_points,
        order_map: walk.order_map,
        path_map: walk.path_map,
    }
}

/// Summary pass over the first fibers only, for the service location
/// order and path maps other rule modules present results in.
pub fn walk_order(snapshot: &NetworkSnapshot, config: &WalkConfig) -> WalkReport {
    let (specs, _) = resolve_specs(snapshot);
    Walker::new(snapshot, &specs, config).walk_all(&config.summary_indices())
}

// ---------------------------------------------------------------------------
// Python bindings
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
fn config_from_args(
    threshold_m: Option<f64>,
    trunk_fiber_count: Option<u32>,
    deep_initial_fibers: Option<u32>,
    summary_initial_fibers: Option<u32>,
) -> crate::errors::PeercheckResult<WalkConfig> {
    let mut config = WalkConfig::from_env()?;
    if let Some(v) = threshold_m {
        config.threshold_m = v;
    }
    if let Some(v) = trunk_fiber_count {
        config.trunk_fiber_count = v;
    }
    if let Some(v) = deep_initial_fibers {
        config.deep_initial_fibers = v;
    }
    if let Some(v) = summary_initial_fibers {
        config.summary_initial_fibers = v;
    }
    config.validate()
}

#[cfg(feature = "python")]
fn to_py_json<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let json_str = serde_json::to_string(value)
        .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
    let json_module = py.import("json")?;
    json_module
        .call_method1("loads", (json_str,))
        .map(|o| o.into())
}

#[cfg(feature = "python")]
fn load_and_walk(
    data_dir: &str,
    threshold_m: Option<f64>,
    trunk_fiber_count: Option<u32>,
    summary_initial_fibers: Option<u32>,
) -> PyResult<WalkReport> {
    let config = config_from_args(threshold_m, trunk_fiber_count, None, summary_initial_fibers)?;
    let snapshot = crate::loader::load_snapshot(std::path::Path::new(data_dir))?;
    Ok(walk_order(&snapshot, &config))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (data_dir, threshold_m=None, trunk_fiber_count=None, deep_initial_fibers=None, summary_initial_fibers=None))]
pub fn audit_data_dir(
    py: Python<'_>,
    data_dir: &str,
    threshold_m: Option<f64>,
    trunk_fiber_count: Option<u32>,
    deep_initial_fibers: Option<u32>,
    summary_initial_fibers: Option<u32>,
) -> PyResult<PyObject> {
    let config = config_from_args(
        threshold_m,
        trunk_fiber_count,
        deep_initial_fibers,
        summary_initial_fibers,
    )?;
    let snapshot = crate::loader::load_snapshot(std::path::Path::new(data_dir))?;
    let report = py.allow_threads(|| audit_network(&snapshot, &config));
    to_py_json(py, &report)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (data_dir, threshold_m=None, trunk_fiber_count=None, summary_initial_fibers=None))]
pub fn walk_order_index_map(
    py: Python<'_>,
    data_dir: &str,
    threshold_m: Option<f64>,
    trunk_fiber_count: Option<u32>,
    summary_initial_fibers: Option<u32>,
) -> PyResult<PyObject> {
    let report = load_and_walk(data_dir, threshold_m, trunk_fiber_count, summary_initial_fibers)?;
    to_py_json(py, &report.order_map)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (data_dir, threshold_m=None, trunk_fiber_count=None, summary_initial_fibers=None))]
pub fn walk_paths_map(
    py: Python<'_>,
    data_dir: &str,
    threshold_m: Option<f64>,
    trunk_fiber_count: Option<u32>,
    summary_initial_fibers: Option<u32>,
) -> PyResult<PyObject> {
    let report = load_and_walk(data_dir, threshold_m, trunk_fiber_count, summary_initial_fibers)?;
    to_py_json(py, &report.path_map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
