//! Geographic positions and bounds.

use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parse a "lon,lat" pair, the order used on the command line and in
    /// query strings.
    pub fn from_lon_lat_str(s: &str) -> Result<Self, PositionParseError> {
        let (lon, lat) = s
            .split_once(',')
            .ok_or_else(|| PositionParseError::InvalidFormat(s.to_string()))?;
        let lng: f64 = lon
            .trim()
            .parse()
            .map_err(|_| PositionParseError::InvalidNumber(lon.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| PositionParseError::InvalidNumber(lat.to_string()))?;
        let position = Self { lat, lng };
        if !position.is_valid() {
            return Err(PositionParseError::OutOfRange(s.to_string()));
        }
        Ok(position)
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Geographic (minLon, minLat, maxLon, maxLat) bounds of a raster group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct LatLonBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl LatLonBounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn contains(&self, position: LatLng) -> bool {
        position.lng >= self.min_lon
            && position.lng <= self.max_lon
            && position.lat >= self.min_lat
            && position.lat <= self.max_lat
    }

    /// Center of the bounds, used as the initial reference location.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

impl From<[f64; 4]> for LatLonBounds {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<LatLonBounds> for [f64; 4] {
    fn from(b: LatLonBounds) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PositionParseError {
    #[error("Invalid position format: {0}. Expected 'lon,lat'")]
    InvalidFormat(String),

    #[error("Invalid number in position: {0}")]
    InvalidNumber(String),

    #[error("Position out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lon_lat() {
        let p = LatLng::from_lon_lat_str("-118.25, 34.05").unwrap();
        assert_eq!(p.lng, -118.25);
        assert_eq!(p.lat, 34.05);
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert!(matches!(
            LatLng::from_lon_lat_str("200,10"),
            Err(PositionParseError::OutOfRange(_))
        ));
        assert!(matches!(
            LatLng::from_lon_lat_str("10"),
            Err(PositionParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_bounds_center_and_contains() {
        let b = LatLonBounds::new(-120.0, 30.0, -110.0, 40.0);
        let c = b.center();
        assert_eq!(c, LatLng::new(35.0, -115.0));
        assert!(b.contains(c));
        assert!(!b.contains(LatLng::new(45.0, -115.0)));
    }
}
