//! Distance and ETA between a client and a request location

use std::fmt;
use std::str::FromStr;

use crate::error::CoordinateError;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough urban travel time used for estimates
pub const MINUTES_PER_KM: f64 = 3.0;

/// Estimates never promise faster than this
pub const MIN_ETA_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::Longitude(lon));
        }
        Ok(Self { lat, lon })
    }
}

impl FromStr for GeoPoint {
    type Err = CoordinateError;

    /// Parse `"LAT,LON"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || CoordinateError::Format(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(format_err)?;
        let lat: f64 = lat.trim().parse().map_err(|_| format_err())?;
        let lon: f64 = lon.trim().parse().map_err(|_| format_err())?;
        Self::new(lat, lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whole minutes to cover `distance_km`, never below [`MIN_ETA_MINUTES`]
pub fn eta_minutes(distance_km: f64) -> u32 {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return MIN_ETA_MINUTES;
    }
    let minutes = (distance_km * MINUTES_PER_KM).floor();
    if minutes >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (minutes as u32).max(MIN_ETA_MINUTES)
    }
}

/// Distance and ETA shown once a garage has accepted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSummary {
    pub distance_km: f64,
    pub eta_minutes: u32,
}

impl TrackingSummary {
    pub fn between(from: GeoPoint, to: GeoPoint) -> Self {
        let distance_km = haversine_km(from, to);
        Self {
            distance_km,
            eta_minutes: eta_minutes(distance_km),
        }
    }
}

impl fmt::Display for TrackingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.distance_km < 1.0 {
            write!(f, "{:.0} m", self.distance_km * 1000.0)?;
        } else {
            write!(f, "{:.1} km", self.distance_km)?;
        }
        write!(f, ", ~{} min", self.eta_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Tunis to Sousse, about 116 km
        let tunis = GeoPoint::new(36.8065, 10.1815).unwrap();
        let sousse = GeoPoint::new(35.8256, 10.6369).unwrap();
        let d = haversine_km(tunis, sousse);
        assert!((d - 117.0).abs() < 3.0, "got {d}");
        assert!((haversine_km(sousse, tunis) - d).abs() < 1e-9);
        assert_eq!(haversine_km(tunis, tunis), 0.0);
    }

    #[test]
    fn test_eta_has_floor() {
        assert_eq!(eta_minutes(0.0), 5);
        assert_eq!(eta_minutes(1.0), 5);
        assert_eq!(eta_minutes(2.4), 7);
        assert_eq!(eta_minutes(10.0), 30);
        assert_eq!(eta_minutes(f64::NAN), 5);
    }

    #[test]
    fn test_parse_point() {
        let p: GeoPoint = "36.8, 10.18".parse().unwrap();
        assert_eq!(p, GeoPoint { lat: 36.8, lon: 10.18 });

        assert!(matches!(
            "36.8".parse::<GeoPoint>(),
            Err(CoordinateError::Format(_))
        ));
        assert!(matches!(
            "91,0".parse::<GeoPoint>(),
            Err(CoordinateError::Latitude(_))
        ));
        assert!(matches!(
            "0,181".parse::<GeoPoint>(),
            Err(CoordinateError::Longitude(_))
        ));
    }

    #[test]
    fn test_summary_display() {
        let near = TrackingSummary {
            distance_km: 0.42,
            eta_minutes: 5,
        };
        assert_eq!(near.to_string(), "420 m, ~5 min");

        let far = TrackingSummary {
            distance_km: 2.44,
            eta_minutes: 7,
        };
        assert_eq!(far.to_string(), "2.4 km, ~7 min");
    }
}
