//! Relay position on its orbit and the resulting propagation delays.

use relaysim_core::{GroundStation, OrbitConfig};

/// Speed of light in vacuum, rounded, in meters per second.
pub const SPEED_OF_LIGHT_M_S: f64 = 3e8;

/// Point in the orbital plane, meters from the Earth's center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Meters along the axis through both stations
    pub x: f64,
    /// Meters perpendicular to the station axis
    pub y: f64,
}

impl Position {
    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Circular relay orbit and the two ground stations beneath it.
///
/// Station A sits at `x = -distance / 2` and station B at `x = +distance / 2`,
/// both on the x axis.
#[derive(Debug, Clone)]
pub struct RelayOrbit {
    radius_m: f64,
    period_s: f64,
    station_distance_m: f64,
}

impl RelayOrbit {
    /// Builds the orbit model from a validated configuration.
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            radius_m: config.orbit_radius_m(),
            period_s: config.orbital_period_s,
            station_distance_m: config.station_distance_m,
        }
    }

    /// Returns the relay position at simulated time `t`.
    pub fn position_at(&self, t: f64) -> Position {
        let angle = 2.0 * std::f64::consts::PI * (t % self.period_s) / self.period_s;
        Position {
            x: self.radius_m * angle.cos(),
            y: self.radius_m * angle.sin(),
        }
    }

    /// Returns the location of a ground station.
    pub fn station_position(&self, station: GroundStation) -> Position {
        let half = self.station_distance_m / 2.0;
        let x = match station {
            GroundStation::A => -half,
            GroundStation::B => half,
        };
        Position { x, y: 0.0 }
    }

    /// One-way propagation delay in seconds between the relay at time `t`
    /// and the given station.
    pub fn propagation_delay(&self, station: GroundStation, t: f64) -> f64 {
        self.position_at(t)
            .distance_to(self.station_position(station))
            / SPEED_OF_LIGHT_M_S
    }
}
