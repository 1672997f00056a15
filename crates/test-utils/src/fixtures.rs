//! Common test fixtures for bowser tests.
//!
//! Three small datasets cover the interesting cases: a displacement stack
//! that is shifted by a reference point, a second reference-relative stack,
//! and an amplitude stack with no reference.

use bowser_common::{Catalog, LatLng, LatLonBounds, RasterGroup, XValue};

/// Common locations for testing.
pub mod locations {
    use bowser_common::LatLng;

    /// Center of [`super::BOUNDS`].
    pub const CENTER: LatLng = LatLng { lat: 34.0, lng: -118.0 };

    pub const NORTH_WELL: LatLng = LatLng { lat: 34.3, lng: -118.2 };

    pub const SOUTH_WELL: LatLng = LatLng { lat: 33.7, lng: -117.8 };

    /// Outside every fixture dataset.
    pub const OFFSHORE: LatLng = LatLng { lat: 20.0, lng: -140.0 };
}

/// Footprint shared by every fixture dataset.
pub const BOUNDS: LatLonBounds = LatLonBounds {
    min_lon: -118.5,
    min_lat: 33.5,
    max_lon: -117.5,
    max_lat: 34.5,
};

/// Reference shifts served for the displacement fixture.
pub const REFERENCE_SHIFTS: [f64; 3] = [0.1, 0.2, 0.3];

/// Ifgram-style time axis labels.
pub const DISPLACEMENT_DATES: [&str; 3] = [
    "20160708_20160801",
    "20160708_20160825",
    "20160708_20160918",
];

fn stack(name: &str, len: usize) -> RasterGroup {
    RasterGroup {
        name: name.to_string(),
        file_list: (0..len).map(|i| format!("s3://bowser-test/{name}/{i}.tif")).collect(),
        mask_file_list: Vec::new(),
        mask_min_value: None,
        nodata: None,
        uses_spatial_ref: false,
        algorithm: None,
        latlon_bounds: Some(BOUNDS),
        x_values: (0..len as i64).map(XValue::Index).collect(),
    }
}

/// "displacement": reference-relative, shifted, masked.
pub fn displacement_group() -> RasterGroup {
    let mut group = stack("displacement", DISPLACEMENT_DATES.len());
    group.uses_spatial_ref = true;
    group.algorithm = Some("shift".to_string());
    group.mask_file_list = (0..DISPLACEMENT_DATES.len())
        .map(|i| format!("s3://bowser-test/displacement/mask_{i}.tif"))
        .collect();
    group.mask_min_value = Some(0.1);
    group.nodata = Some(0.0);
    group.x_values = DISPLACEMENT_DATES
        .iter()
        .map(|d| XValue::Label(d.to_string()))
        .collect();
    group
}

/// "velocity": a second reference-relative, shifted stack.
pub fn velocity_group() -> RasterGroup {
    let mut group = stack("velocity", 3);
    group.uses_spatial_ref = true;
    group.algorithm = Some("shift".to_string());
    group
}

/// "amplitude": absolute values, no reference.
pub fn amplitude_group() -> RasterGroup {
    let mut group = stack("amplitude", 4);
    group.algorithm = Some("amplitude".to_string());
    group
}

/// Catalog with all fixture datasets. "amplitude" sorts first.
pub fn sample_catalog() -> Catalog {
    [amplitude_group(), displacement_group(), velocity_group()]
        .into_iter()
        .map(|g| (g.name.clone(), g))
        .collect()
}

/// Catalog with only the given groups.
pub fn catalog_of(groups: impl IntoIterator<Item = RasterGroup>) -> Catalog {
    groups.into_iter().map(|g| (g.name.clone(), g)).collect()
}

pub fn reference_series() -> Vec<Option<f64>> {
    REFERENCE_SHIFTS.iter().copied().map(Some).collect()
}

pub fn default_reference() -> LatLng {
    BOUNDS.center()
}
