//! GeoJSON feature loader.
//!
//! Reads the project's exported layers from one flat directory into a
//! [`NetworkSnapshot`]. Layers are picked by file-name glob; files are read in
//! sorted name order so repeated loads see features in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::errors::{PeercheckError, PeercheckResult};
use crate::models::{DropSegment, Nap, NapProperties, NetworkSnapshot, Point, ServiceLocation, Vault};

pub const DISTRIBUTION_PATTERNS: &[&str] = &[
    "fiber-distribution-aerial*.geojson",
    "fiber-distribution-underground*.geojson",
];
pub const VAULT_PATTERNS: &[&str] = &["*t-3-vault*.geojson"];
pub const NAP_PATTERNS: &[&str] = &["*nap*.geojson"];
pub const DROP_PATTERNS: &[&str] = &["*fiber-drop*.geojson"];
pub const SERVICE_LOCATION_PATTERNS: &[&str] = &["*service-location*.geojson"];

// ---------------------------------------------------------------------------
// Raw GeoJSON shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

impl RawFeature {
    /// First non-empty value among `keys`, as trimmed text.
    fn prop(&self, keys: &[&str]) -> Option<String> {
        let props = self.properties.as_ref()?;
        keys.iter().find_map(|k| value_text(props.get(*k)?))
    }

    fn point(&self) -> Option<Point> {
        let geom = self.geometry.as_ref()?;
        position(&geom.coordinates)
    }

    /// LineString / MultiLineString parts; anything else yields nothing.
    fn line_parts(&self) -> Vec<Vec<Point>> {
        let Some(geom) = self.geometry.as_ref() else {
            return Vec::new();
        };
        match geom.kind.as_str() {
            "LineString" => vec![positions(&geom.coordinates)],
            "MultiLineString" => geom
                .coordinates
                .as_array()
                .map(|parts| parts.iter().map(positions).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `[lon, lat, ...]` -> Point.
fn position(value: &Value) -> Option<Point> {
    let coords = value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()?;
    Point::from_lon_lat(&coords)
}

fn positions(value: &Value) -> Vec<Point> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(position).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// File discovery
// ---------------------------------------------------------------------------

/// `*` matches any run, `?` any single character.
fn glob_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let mut dp = vec![vec![false; p.len() + 1]; t.len() + 1];
    dp[0][0] = true;
    for j in 1..=p.len() {
        if p[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=t.len() {
        for j in 1..=p.len() {
            dp[i][j] = match p[j - 1] {
                '*' => dp[i][j - 1] || dp[i - 1][j],
                '?' => dp[i - 1][j - 1],
                c => c == t[i - 1] && dp[i - 1][j - 1],
            };
        }
    }
    dp[t.len()][p.len()]
}

/// Regular files directly under `dir` whose name matches any pattern, in
/// sorted name order.
pub fn matching_files(dir: &Path, patterns: &[&str]) -> PeercheckResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if patterns.iter().any(|p| glob_match(&name, p)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_features(dir: &Path, patterns: &[&str]) -> PeercheckResult<Vec<RawFeature>> {
    let mut features = Vec::new();
    for path in matching_files(dir, patterns)? {
        let text = fs::read_to_string(&path)?;
        let collection: RawCollection = serde_json::from_str(&text)?;
        debug!(file = %path.display(), features = collection.features.len(), "read layer");
        features.extend(collection.features);
    }
    Ok(features)
}

// ---------------------------------------------------------------------------
// Snapshot loading
// ---------------------------------------------------------------------------

/// Load every layer from `data_dir` and normalize the result.
pub fn load_snapshot(data_dir: &Path) -> PeercheckResult<NetworkSnapshot> {
    if !data_dir.is_dir() {
        return Err(PeercheckError::Load(format!(
            "data directory not found: {}",
            data_dir.display()
        )));
    }
    let mut snapshot = NetworkSnapshot::default();

    for feat in read_features(data_dir, DISTRIBUTION_PATTERNS)? {
        let Some(id) = feat.prop(&["ID"]) else {
            debug!("skipping distribution without ID");
            continue;
        };
        for part in feat.line_parts().into_iter().filter(|p| !p.is_empty()) {
            snapshot.add_distribution_segment(&id, part);
        }
    }

    for feat in read_features(data_dir, VAULT_PATTERNS)? {
        match (feat.prop(&["ID"]), feat.point()) {
            (Some(id), Some(point)) => snapshot.vaults.push(Vault { id, point }),
            _ => debug!("skipping vault without ID or point"),
        }
    }

    for feat in read_features(data_dir, NAP_PATTERNS)? {
        let (Some(id), Some(point)) = (feat.prop(&["ID"]), feat.point()) else {
            debug!("skipping NAP without ID or point");
            continue;
        };
        let props = NapProperties {
            fiber_count: feat.prop(&["Fiber Count"]),
            loose_tubes: feat.prop(&["Loose Tubes", "Loose Tube"]),
            splice_colors: feat.prop(&["Splice Colors", "Splice Color"]),
            tie_points: feat.prop(&["Tie Points", "Tie Point"]),
        };
        snapshot.naps.push(Nap { id, point, props });
    }

    for feat in read_features(data_dir, DROP_PATTERNS)? {
        let Some(id) = feat.prop(&["vetro_id"]) else {
            debug!("skipping drop without vetro_id");
            continue;
        };
        let color = feat.prop(&["Color"]).unwrap_or_default();
        for part in feat.line_parts().into_iter().filter(|p| p.len() >= 2) {
            snapshot.drops.push(DropSegment::new(id.clone(), part, color.clone()));
        }
    }

    for feat in read_features(data_dir, SERVICE_LOCATION_PATTERNS)? {
        let (Some(id), Some(point)) = (feat.prop(&["ID"]), feat.point()) else {
            debug!("skipping service location without ID or point");
            continue;
        };
        snapshot.service_locations.push(ServiceLocation {
            id,
            point,
            splice_raw: feat.prop(&["Splice Colors"]).unwrap_or_default(),
            loose_tube: feat.prop(&["Loose Tube"]).unwrap_or_default(),
        });
    }

    let snapshot = snapshot.normalize();
    info!(
        dir = %data_dir.display(),
        distributions = snapshot.distributions.len(),
        vaults = snapshot.vaults.len(),
        naps = snapshot.naps.len(),
        drops = snapshot.drops.len(),
        service_locations = snapshot.service_locations.len(),
        "loaded network snapshot"
    );
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Service locations handed over by other tools
// ---------------------------------------------------------------------------

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(value_text))
        .unwrap_or_default()
}

fn lat_lon(value: &Value) -> Option<Point> {
    match value.as_array()?.as_slice() {
        [lat, lon] => Some(Point::new(lat.as_f64()?, lon.as_f64()?)),
        _ => None,
    }
}

/// Normalize service locations from either accepted shape:
///
/// - a mapping `id -> {"point" | "coords": [lat, lon], "splice_colors" |
///   "Splice Colors" | "splice code" | "splice": text}`
/// - a list of `[lat, lon, loose_tube, splice, id]` rows
///
/// Malformed entries are skipped. Any other top-level shape is an error.
pub fn service_locations_from_json(value: &Value) -> PeercheckResult<Vec<ServiceLocation>> {
    let mut out = Vec::new();
    match value {
        Value::Object(map) => {
            for (id, data) in map {
                let Some(obj) = data.as_object() else { continue };
                let Some(point) = obj.get("point").or_else(|| obj.get("coords")).and_then(lat_lon) else {
                    continue;
                };
                out.push(ServiceLocation {
                    id: id.clone(),
                    point,
                    splice_raw: text_field(obj, &["splice_colors", "Splice Colors", "splice code", "splice"]),
                    loose_tube: text_field(obj, &["loose_tube", "Loose Tube"]),
                });
            }
        }
        Value::Array(rows) => {
            for row in rows {
                let Some(items) = row.as_array().filter(|r| r.len() >= 5) else {
                    continue;
                };
                let (Some(lat), Some(lon)) = (items[0].as_f64(), items[1].as_f64()) else {
                    continue;
                };
                out.push(ServiceLocation {
                    id: value_text(&items[4]).unwrap_or_default(),
                    point: Point::new(lat, lon),
                    splice_raw: value_text(&items[3]).unwrap_or_default(),
                    loose_tube: value_text(&items[2]).unwrap_or_default(),
                });
            }
        }
        _ => {
            return Err(PeercheckError::Load(
                "service locations must be a mapping or a list of rows".to_string(),
            ))
        }
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
