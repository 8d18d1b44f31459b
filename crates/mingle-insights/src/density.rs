use serde::Serialize;

/// Qualitative band a density percentage falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DensityZone {
    Fragmented,
    HealthyGrowth,
    ExceptionalMix,
}

impl DensityZone {
    pub fn for_density(density: f64) -> Self {
        if density < 5.0 {
            DensityZone::Fragmented
        } else if density <= 15.0 {
            DensityZone::HealthyGrowth
        } else {
            DensityZone::ExceptionalMix
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DensityZone::Fragmented => "Fragmented",
            DensityZone::HealthyGrowth => "Healthy Growth",
            DensityZone::ExceptionalMix => "Exceptional Mix",
        }
    }
}

/// Maximum number of undirected pairs among `nodes` people.
pub fn possible_pairs(nodes: i64) -> i64 {
    if nodes < 2 { 0 } else { nodes * (nodes - 1) / 2 }
}

/// `links / C(nodes, 2) * 100`, rounded to two decimals; 0 when fewer than
/// two eligible people exist.
pub fn density_percent(links: i64, nodes: i64) -> f64 {
    let possible = possible_pairs(nodes);
    if possible == 0 {
        return 0.0;
    }
    let raw = links as f64 / possible as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
