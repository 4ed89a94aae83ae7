use geo::Polygon;
use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    geometry::{self, circle_area_km2, polygon_area_km2, polygon_from_geojson},
    model::{BoundingBox, EffectiveTravel, GeoPoint, RequestParameters},
    speed::describe_weather,
};

/// Property names shared with renderers and exporters.
pub mod props {
    pub const IS_FALLBACK: &str = "isFallback";
    pub const AREA_KM2: &str = "areaKm2";
    pub const SPEED_KMH: &str = "speedKmh";
    pub const DURATION_MINUTES: &str = "durationMinutes";
    pub const MODE: &str = "mode";
    pub const WEATHER_MULTIPLIER: &str = "weatherMultiplier";
    pub const WEATHER_DESCRIPTION: &str = "weatherDescription";
}

/// A GeoJSON FeatureCollection holding one polygon feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReachabilityResult {
    collection: FeatureCollection,
}

impl ReachabilityResult {
    /// Circle of `radius_km` standing in for an isochrone.
    pub(crate) fn fallback(center: GeoPoint, radius_km: f64) -> FeatureCollection {
        let polygon = geometry::circle(center, radius_km, geometry::DEFAULT_POINT_COUNT);
        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::from(&geo::Geometry::Polygon(polygon))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property(props::AREA_KM2, circle_area_km2(radius_km));

        FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }
    }

    /// Stamps request details onto the single feature of `collection`.
    pub(crate) fn annotate(
        mut collection: FeatureCollection,
        is_fallback: bool,
        params: &RequestParameters,
        travel: &EffectiveTravel,
    ) -> Self {
        collection.features.truncate(1);

        if let Some(feature) = collection.features.first_mut() {
            if !is_fallback {
                let area = feature
                    .geometry
                    .as_ref()
                    .and_then(|g| polygon_from_geojson(&g.value))
                    .map(|p| polygon_area_km2(&p));
                if let Some(area) = area {
                    feature.set_property(props::AREA_KM2, area);
                }
            }

            feature.set_property(props::IS_FALLBACK, is_fallback);
            feature.set_property(props::SPEED_KMH, travel.effective_speed_kmh);
            feature.set_property(props::DURATION_MINUTES, travel.adjusted_duration_minutes);
            feature.set_property(props::MODE, params.mode.as_str());

            if let Some(properties) = feature.properties.as_mut() {
                properties.remove(props::WEATHER_MULTIPLIER);
                properties.remove(props::WEATHER_DESCRIPTION);
            }
            if travel.is_degraded() {
                feature.set_property(props::WEATHER_MULTIPLIER, travel.speed_multiplier);
                if let Some(weather) = &params.weather {
                    feature.set_property(props::WEATHER_DESCRIPTION, json!(describe_weather(weather)));
                }
            }
        }

        Self { collection }
    }

    pub fn feature(&self) -> Option<&Feature> {
        self.collection.features.first()
    }

    fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.feature().and_then(|f| f.property(name))
    }

    /// `true` when the polygon is an approximation rather than a travel-time boundary.
    pub fn is_fallback(&self) -> bool {
        self.property(props::IS_FALLBACK)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn area_km2(&self) -> Option<f64> {
        self.property(props::AREA_KM2).and_then(|v| v.as_f64())
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.property(props::SPEED_KMH).and_then(|v| v.as_f64())
    }

    pub fn weather_multiplier(&self) -> Option<f64> {
        self.property(props::WEATHER_MULTIPLIER).and_then(|v| v.as_f64())
    }

    pub fn weather_description(&self) -> Option<&str> {
        self.property(props::WEATHER_DESCRIPTION).and_then(|v| v.as_str())
    }

    pub fn polygon(&self) -> Option<Polygon<f64>> {
        self.feature()
            .and_then(|f| f.geometry.as_ref())
            .and_then(|g| polygon_from_geojson(&g.value))
    }

    /// Exterior ring as `(lng, lat)` pairs, first and last identical.
    pub fn exterior_ring(&self) -> Vec<(f64, f64)> {
        self.polygon()
            .map(|p| p.exterior().coords().map(|c| (c.x, c.y)).collect())
            .unwrap_or_default()
    }

    /// Extent to hand to a POI search.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.polygon().as_ref().and_then(geometry::bounding_box)
    }

    pub fn feature_collection(&self) -> &FeatureCollection {
        &self.collection
    }

    pub fn into_feature_collection(self) -> FeatureCollection {
        self.collection
    }
}
