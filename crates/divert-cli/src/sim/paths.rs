//! Flight path implementations.

use divert_core::spatial::{bearing, haversine_distance_nm, offset_by_bearing_nm};
use divert_core::Position;

/// Trait for flight path implementations.
pub trait FlightPath: Send + Sync {
    /// Position at time t seconds from start.
    fn position(&self, t: f64) -> Position;

    /// Ground speed in knots.
    fn ground_speed_kts(&self) -> f64;

    /// True once the path end has been reached.
    fn is_complete(&self, t: f64) -> bool;
}

/// Constant-speed cruise along the initial great-circle bearing between two
/// points, stopping at the end point.
pub struct GreatCirclePath {
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub altitude_ft: f64,
    pub speed_kts: f64,
    distance_nm: f64,
    bearing_deg: f64,
}

impl GreatCirclePath {
    pub fn new(start: (f64, f64), end: (f64, f64), altitude_ft: f64, speed_kts: f64) -> Self {
        let distance_nm = haversine_distance_nm(start.0, start.1, end.0, end.1);
        let bearing_deg = bearing(start.0, start.1, end.0, end.1).to_degrees();
        Self {
            start_lat: start.0,
            start_lon: start.1,
            end_lat: end.0,
            end_lon: end.1,
            altitude_ft,
            speed_kts,
            distance_nm,
            bearing_deg,
        }
    }

    pub fn distance_nm(&self) -> f64 {
        self.distance_nm
    }

    fn flown_nm(&self, t: f64) -> f64 {
        (self.speed_kts * t.max(0.0) / 3600.0).min(self.distance_nm)
    }
}

impl FlightPath for GreatCirclePath {
    fn position(&self, t: f64) -> Position {
        let flown = self.flown_nm(t);
        if flown >= self.distance_nm {
            return Position::new(self.end_lat, self.end_lon, self.altitude_ft);
        }
        let (lat, lon) = offset_by_bearing_nm(self.start_lat, self.start_lon, flown, self.bearing_deg);
        Position::new(lat, lon, self.altitude_ft)
    }

    fn ground_speed_kts(&self) -> f64 {
        self.speed_kts
    }

    fn is_complete(&self, t: f64) -> bool {
        self.flown_nm(t) >= self.distance_nm
    }
}
