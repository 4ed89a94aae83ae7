use async_trait::async_trait;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug};
use thiserror::Error;

use crate::{config::Config, model::GeoPoint, profile::ProfileId};

pub mod openrouteservice;

pub use openrouteservice::OrsIsochroneClient;

/// How the isochrone range is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeType {
    /// Range in seconds of travel.
    Time,
    /// Range in metres along the network.
    #[default]
    Distance,
}

impl RangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeType::Time => "time",
            RangeType::Distance => "distance",
        }
    }
}

impl std::fmt::Display for RangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RangeType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "time" => Ok(RangeType::Time),
            "distance" => Ok(RangeType::Distance),
            _ => Err(anyhow::anyhow!(
                "Unknown range type '{value}'. Supported range types: time, distance."
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneRequest {
    pub center: GeoPoint,
    pub profile: ProfileId,
    /// Seconds for [`RangeType::Time`], metres for [`RangeType::Distance`].
    pub range: u64,
    pub range_type: RangeType,
}

/// Why an isochrone could not be obtained.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Routing service answered with HTTP status {0}")]
    Http(u16),

    #[error("Unusable response body: {0}")]
    MalformedBody(String),
}

#[async_trait]
pub trait IsochroneProvider: Send + Sync + Debug {
    /// Makes exactly one attempt. On success the collection holds a single
    /// feature with a closed polygon.
    async fn fetch_isochrone(
        &self,
        request: &IsochroneRequest,
    ) -> Result<FeatureCollection, FetchFailure>;
}

/// Construct the openrouteservice client from config.
pub fn isochrone_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn IsochroneProvider>> {
    let api_key = config.routing_api_key()?;

    let client = OrsIsochroneClient::new(api_key)
        .with_base_url(config.routing.base_url.clone())
        .with_timeout(config.routing.timeout());

    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_type_as_str_roundtrip() {
        for rt in [RangeType::Time, RangeType::Distance] {
            assert_eq!(RangeType::try_from(rt.as_str()).unwrap(), rt);
        }
        assert!(RangeType::try_from("isodistance").is_err());
    }

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = isochrone_provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No openrouteservice API key configured"));
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_routing_api_key("KEY".to_string());
        assert!(isochrone_provider_from_config(&cfg).is_ok());
    }

    #[test]
    fn failures_describe_themselves() {
        assert_eq!(FetchFailure::Http(503).to_string(), "Routing service answered with HTTP status 503");
        assert_eq!(FetchFailure::Timeout.to_string(), "Request timed out");
    }
}
