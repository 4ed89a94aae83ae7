//! Core library for the `reach` CLI.
//!
//! This crate defines:
//! - The reachability engine: isochrones from openrouteservice, with a
//!   circle fallback and a result cache
//! - Weather-based speed adjustment and the Open-Meteo lookup feeding it
//! - Configuration & credentials handling
//!
//! It is used by `reach-cli`, but can also be embedded in other binaries or services.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod model;
pub mod profile;
pub mod provider;
pub mod result;
pub mod speed;
pub mod weather;

pub use cache::{CacheKey, ResultCache};
pub use config::{Config, engine_from_config};
pub use engine::ReachabilityEngine;
pub use error::ReachError;
pub use model::{
    BoundingBox, EffectiveTravel, GeoPoint, RequestParameters, TerrainPreference, TravelMode,
    WeatherObservation,
};
pub use profile::{ProfileId, to_profile};
pub use provider::{FetchFailure, IsochroneProvider, IsochroneRequest, RangeType};
pub use result::ReachabilityResult;
pub use weather::{OpenMeteoClient, WeatherSource};
