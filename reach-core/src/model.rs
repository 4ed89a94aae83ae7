use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::error::ReachError;

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Biking,
    Driving,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Biking => "biking",
            TravelMode::Driving => "driving",
        }
    }

    pub const fn all() -> &'static [TravelMode] {
        &[TravelMode::Walking, TravelMode::Biking, TravelMode::Driving]
    }

    /// Typical cruising speed used when the user gives none.
    pub fn default_speed_kmh(&self) -> f64 {
        match self {
            TravelMode::Walking => 5.0,
            TravelMode::Biking => 15.0,
            TravelMode::Driving => 60.0,
        }
    }

    /// Parses a mode name, treating anything unrecognised as walking.
    pub fn from_name_lenient(name: &str) -> Self {
        TravelMode::try_from(name).unwrap_or_else(|_| {
            log::debug!("unknown travel mode '{name}', using walking");
            TravelMode::Walking
        })
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TravelMode {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "walking" => Ok(TravelMode::Walking),
            "biking" => Ok(TravelMode::Biking),
            "driving" => Ok(TravelMode::Driving),
            _ => Err(anyhow::anyhow!(
                "Unknown travel mode '{value}'. Supported modes: walking, biking, driving."
            )),
        }
    }
}

/// Whether the traveller may leave the road network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerrainPreference {
    #[default]
    CrossCountry,
    RoadsOnly,
}

impl TerrainPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerrainPreference::CrossCountry => "cross-country",
            TerrainPreference::RoadsOnly => "roads-only",
        }
    }
}

impl fmt::Display for TerrainPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TerrainPreference {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "cross-country" | "crosscountry" => Ok(TerrainPreference::CrossCountry),
            "roads-only" | "roadsonly" => Ok(TerrainPreference::RoadsOnly),
            _ => Err(anyhow::anyhow!(
                "Unknown terrain preference '{value}'. Supported values: cross-country, roads-only."
            )),
        }
    }
}

/// Current conditions at the center point, as reported by the weather service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub snowfall_mm: f64,
    pub observed_at: Option<NaiveDateTime>,
}

/// Everything the engine needs to derive one reachability area.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParameters {
    pub center: GeoPoint,
    pub base_speed_kmh: f64,
    pub duration_minutes: f64,
    pub mode: TravelMode,
    pub terrain: TerrainPreference,
    pub weather: Option<WeatherObservation>,
}

impl RequestParameters {
    pub fn new(center: GeoPoint, base_speed_kmh: f64, duration_minutes: f64, mode: TravelMode) -> Self {
        Self {
            center,
            base_speed_kmh,
            duration_minutes,
            mode,
            terrain: TerrainPreference::default(),
            weather: None,
        }
    }

    pub fn with_terrain(mut self, terrain: TerrainPreference) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn with_weather(mut self, weather: WeatherObservation) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Rejects inputs that would produce meaningless geometry.
    pub fn validate(&self) -> Result<(), ReachError> {
        let GeoPoint { latitude, longitude } = self.center;

        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ReachError::InvalidParameters(format!(
                "center coordinates must be finite, got {}",
                self.center
            )));
        }
        if latitude.abs() >= 90.0 {
            return Err(ReachError::InvalidParameters(format!(
                "center latitude must lie strictly between -90 and 90, got {latitude}"
            )));
        }
        if longitude.abs() > 180.0 {
            return Err(ReachError::InvalidParameters(format!(
                "center longitude must lie within [-180, 180], got {longitude}"
            )));
        }
        if !(self.base_speed_kmh.is_finite() && self.base_speed_kmh > 0.0) {
            return Err(ReachError::InvalidParameters(format!(
                "speed must be a positive number of km/h, got {}",
                self.base_speed_kmh
            )));
        }
        if !(self.duration_minutes.is_finite() && self.duration_minutes > 0.0) {
            return Err(ReachError::InvalidParameters(format!(
                "duration must be a positive number of minutes, got {}",
                self.duration_minutes
            )));
        }
        let distance_km = self.base_speed_kmh * self.duration_minutes / 60.0;
        if !(distance_km.is_finite() && distance_km <= MAX_TRAVEL_DISTANCE_KM) {
            return Err(ReachError::InvalidParameters(format!(
                "travel distance must not exceed {MAX_TRAVEL_DISTANCE_KM} km, got {distance_km} km"
            )));
        }

        Ok(())
    }
}

/// Half the equatorial circumference; nothing on the globe is farther away.
pub const MAX_TRAVEL_DISTANCE_KM: f64 = 20_037.5;

/// Speed and time after weather has been taken into account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveTravel {
    pub effective_speed_kmh: f64,
    pub adjusted_duration_minutes: f64,
    /// Always within [0.3, 1.0].
    pub speed_multiplier: f64,
}

impl EffectiveTravel {
    pub fn distance_km(&self) -> f64 {
        self.effective_speed_kmh * self.adjusted_duration_minutes / 60.0
    }

    /// Range for a time-based isochrone request.
    pub fn time_range_seconds(&self) -> u64 {
        let seconds = if self.speed_multiplier < 1.0 {
            self.adjusted_duration_minutes * 60.0 / self.speed_multiplier
        } else {
            self.adjusted_duration_minutes * 60.0
        };
        seconds.round().max(0.0) as u64
    }

    pub fn is_degraded(&self) -> bool {
        self.speed_multiplier < 1.0
    }
}

/// Axis-aligned extent of a polygon in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// `[[west, north], [east, south]]`, the corner order POI searches expect.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.west, self.north], [self.east, self.south]]
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}
