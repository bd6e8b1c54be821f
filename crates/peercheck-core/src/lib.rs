//! peercheck core library: fiber-network topology audit.
//!
//! Walks a fiber distribution network from its root vaults through NAPs and
//! tie-point branches, checking that every drop carries a fiber color the
//! branch actually delivers and that service-location splice records agree.
//! Built as a Python extension module (`_peercheck_core`) when the `python`
//! feature is enabled; the pure-Rust API is always available.

pub mod audit;
pub mod colors;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod issues;
pub mod loader;
pub mod models;
pub mod nap_spec;
pub mod survey;
pub mod walker;

#[cfg(test)]
mod test_support;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _peercheck_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _peercheck_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Geometry -----------------------------------------------------------
    m.add("THRESHOLD_M", geometry::THRESHOLD_M)?;
    m.add("EARTH_RADIUS_M", geometry::EARTH_RADIUS_M)?;
    m.add_function(wrap_pyfunction!(geometry::haversine, m)?)?;
    m.add_function(wrap_pyfunction!(geometry::py_point_to_segment_distance, m)?)?;

    // -- Colors -------------------------------------------------------------
    m.add_function(wrap_pyfunction!(colors::py_index_to_color, m)?)?;
    m.add_function(wrap_pyfunction!(colors::py_token_to_color, m)?)?;
    m.add_function(wrap_pyfunction!(colors::py_parse_color_set, m)?)?;

    // -- NAP specs ----------------------------------------------------------
    m.add_class::<nap_spec::NapSpec>()?;
    m.add_class::<nap_spec::TubeSpec>()?;
    m.add_class::<nap_spec::TiePoint>()?;
    m.add_function(wrap_pyfunction!(nap_spec::py_resolve_nap_spec, m)?)?;

    // -- Audit entry points -------------------------------------------------
    m.add_function(wrap_pyfunction!(audit::audit_data_dir, m)?)?;
    m.add_function(wrap_pyfunction!(audit::walk_order_index_map, m)?)?;
    m.add_function(wrap_pyfunction!(audit::walk_paths_map, m)?)?;

    Ok(())
}
