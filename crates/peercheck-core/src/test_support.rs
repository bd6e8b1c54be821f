//! Small builder for synthetic networks used across the unit tests.

use crate::models::{
    DistributionLine, DropSegment, Nap, NapProperties, NetworkSnapshot, Point, ServiceLocation,
    Vault,
};

pub(crate) const VAULT_ID: &str = "04.AC01.HAR";
pub(crate) const TRUNK_ID: &str = "04.AC01.HAR.DF1.48A";

pub(crate) fn pt(lat: f64, lon: f64) -> Point {
    Point::new(lat, lon)
}

pub(crate) fn tie_props(tie_points: &str) -> NapProperties {
    NapProperties {
        tie_points: Some(tie_points.to_string()),
        ..NapProperties::default()
    }
}

#[derive(Default)]
pub(crate) struct NetworkBuilder {
    snap: NetworkSnapshot,
}

impl NetworkBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Vault at (40.0, -75.0) with a trunk running north from it.
    pub(crate) fn with_trunk() -> Self {
        Self::new()
            .vault(VAULT_ID, 40.0, -75.0)
            .line(TRUNK_ID, &[(40.0, -75.0), (40.001, -75.0), (40.002, -75.0), (40.003, -75.0)])
    }

    pub(crate) fn vault(mut self, id: &str, lat: f64, lon: f64) -> Self {
        self.snap.vaults.push(Vault {
            id: id.to_string(),
            point: pt(lat, lon),
        });
        self
    }

    pub(crate) fn line(mut self, id: &str, vertices: &[(f64, f64)]) -> Self {
        let segment = vertices.iter().map(|&(lat, lon)| pt(lat, lon)).collect();
        self.snap.add_distribution_segment(id, segment);
        self
    }

    pub(crate) fn nap(self, id: &str, lat: f64, lon: f64) -> Self {
        self.nap_with(id, lat, lon, NapProperties::default())
    }

    pub(crate) fn nap_with(mut self, id: &str, lat: f64, lon: f64, props: NapProperties) -> Self {
        self.snap.naps.push(Nap {
            id: id.to_string(),
            point: pt(lat, lon),
            props,
        });
        self
    }

    pub(crate) fn drop_line(mut self, id: &str, from: (f64, f64), to: (f64, f64), color: &str) -> Self {
        self.snap
            .drops
            .push(DropSegment::new(id, vec![pt(from.0, from.1), pt(to.0, to.1)], color));
        self
    }

    pub(crate) fn service_location(mut self, id: &str, lat: f64, lon: f64, splice: &str) -> Self {
        self.snap.service_locations.push(ServiceLocation {
            id: id.to_string(),
            point: pt(lat, lon),
            splice_raw: splice.to_string(),
            loose_tube: String::new(),
        });
        self
    }

    pub(crate) fn build(self) -> NetworkSnapshot {
        self.snap.normalize()
    }
}

pub(crate) fn line_ids(lines: &[&DistributionLine]) -> Vec<String> {
    lines.iter().map(|l| l.id.clone()).collect()
}
