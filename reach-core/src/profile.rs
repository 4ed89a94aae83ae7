use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::model::{TerrainPreference, TravelMode};

/// Routing profiles understood by openrouteservice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileId {
    FootWalking,
    CyclingRegular,
    CyclingMountain,
    DrivingCar,
}

impl ProfileId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileId::FootWalking => "foot-walking",
            ProfileId::CyclingRegular => "cycling-regular",
            ProfileId::CyclingMountain => "cycling-mountain",
            ProfileId::DrivingCar => "driving-car",
        }
    }

    pub const fn all() -> &'static [ProfileId] {
        &[
            ProfileId::FootWalking,
            ProfileId::CyclingRegular,
            ProfileId::CyclingMountain,
            ProfileId::DrivingCar,
        ]
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProfileId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ProfileId::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == value.trim().to_lowercase())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown routing profile '{value}'. Supported profiles: foot-walking, \
                     cycling-regular, cycling-mountain, driving-car."
                )
            })
    }
}

/// Only cycling distinguishes between staying on roads and going off-road.
pub fn to_profile(mode: TravelMode, terrain: TerrainPreference) -> ProfileId {
    match (mode, terrain) {
        (TravelMode::Walking, _) => ProfileId::FootWalking,
        (TravelMode::Biking, TerrainPreference::RoadsOnly) => ProfileId::CyclingRegular,
        (TravelMode::Biking, TerrainPreference::CrossCountry) => ProfileId::CyclingMountain,
        (TravelMode::Driving, _) => ProfileId::DrivingCar,
    }
}
