//! Coordinate parsing and reprojection.

use std::sync::LazyLock;

use parkapi_parking_models::{FieldError, ReasonCode};
use regex::Regex;
use serde_json::Value;

static WKT_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*POINT\s*\(\s*([-+]?\d+(?:\.\d+)?)\s+([-+]?\d+(?:\.\d+)?)\s*\)\s*$")
        .unwrap_or_else(|e| panic!("{e}"))
});

/// Parses a WKT point (`"POINT (9.2043 48.4914)"`) into `(lon, lat)`.
///
/// # Errors
///
/// Fails if the string is not a two-dimensional WKT point.
pub fn parse_wkt_point(s: &str) -> Result<(f64, f64), FieldError> {
    let invalid = || {
        FieldError::new(ReasonCode::InvalidFormat, "not a WKT point")
            .with_received(&Value::String(s.to_string()))
    };
    let captures = WKT_POINT_RE.captures(s).ok_or_else(invalid)?;
    let lon = captures[1].parse::<f64>().map_err(|_| invalid())?;
    let lat = captures[2].parse::<f64>().map_err(|_| invalid())?;
    Ok((lon, lat))
}

// WGS84 ellipsoid
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub northern: bool,
}

impl UtmZone {
    /// Zone 32 north, which covers most of Germany (ETRS89/UTM32).
    pub const ZONE_32N: Self = Self {
        number: 32,
        northern: true,
    };

    fn central_meridian(self) -> f64 {
        f64::from(self.number).mul_add(6.0, -183.0).to_radians()
    }

    /// Inverse transverse Mercator projection of `(easting, northing)` in
    /// meters to `(lon, lat)` in degrees.
    #[must_use]
    pub fn to_lon_lat(self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = F * (2.0 - F);
        let ep2 = e2 / (1.0 - e2);
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let x = easting - FALSE_EASTING;
        let y = if self.northern {
            northing
        } else {
            northing - FALSE_NORTHING_SOUTH
        };

        let m = y / K0;
        let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();
        let n1 = A / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
        let t1 = tan_phi1.powi(2);
        let c1 = ep2 * cos_phi1.powi(2);
        let r1 = A * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
        let d = x / (n1 * K0);

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                        - 252.0 * ep2
                        - 3.0 * c1.powi(2))
                        * d.powi(6)
                        / 720.0);

        let lon = self.central_meridian()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        (lon.to_degrees(), lat.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Forward projection, used to check the inverse.
    fn to_utm(zone: UtmZone, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = F * (2.0 - F);
        let ep2 = e2 / (1.0 - e2);
        let phi = lat.to_radians();
        let n = A / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * phi.cos().powi(2);
        let a = phi.cos() * (lon.to_radians() - zone.central_meridian());
        let m = A
            * ((1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e2.powi(2) / 32.0 + 45.0 * e2.powi(3) / 1024.0)
                    * (2.0 * phi).sin()
                + (15.0 * e2.powi(2) / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e2.powi(3) / 3072.0) * (6.0 * phi).sin());
        let easting = K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;
        let northing = K0
            * (m + n
                * phi.tan()
                * (a.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * ep2) * a.powi(6)
                        / 720.0));
        (easting, northing)
    }

    #[test]
    fn parses_wkt_point_as_lon_lat() {
        let (lon, lat) = parse_wkt_point("POINT (9.2043 48.4914)").unwrap();
        assert!((lon - 9.2043).abs() < f64::EPSILON);
        assert!((lat - 48.4914).abs() < f64::EPSILON);
        assert!(parse_wkt_point("POINT (9.2)").is_err());
        assert!(parse_wkt_point("LINESTRING (1 2, 3 4)").is_err());
    }

    #[test]
    fn central_meridian_maps_to_equator_origin() {
        let (lon, lat) = UtmZone::ZONE_32N.to_lon_lat(500_000.0, 0.0);
        assert!((lon - 9.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn inverse_undoes_forward_projection() {
        for (lon, lat) in [(8.4037, 49.0094), (9.9876, 48.3984), (6.5, 51.2), (11.9, 47.5)] {
            let (easting, northing) = to_utm(UtmZone::ZONE_32N, lon, lat);
            let (lon2, lat2) = UtmZone::ZONE_32N.to_lon_lat(easting, northing);
            assert!((lon - lon2).abs() < 1e-5, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-5, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn karlsruhe_lands_in_karlsruhe() {
        let (easting, northing) = to_utm(UtmZone::ZONE_32N, 8.4037, 49.0094);
        assert!((455_000.0..458_000.0).contains(&easting), "{easting}");
        assert!((5_428_000.0..5_431_000.0).contains(&northing), "{northing}");
    }
}
