use log::{debug, info, warn};

use crate::{
    cache::{CacheKey, ResultCache},
    error::ReachError,
    model::{EffectiveTravel, RequestParameters},
    profile::{ProfileId, to_profile},
    provider::{FetchFailure, IsochroneProvider, IsochroneRequest, RangeType},
    result::ReachabilityResult,
    speed,
    weather::WeatherSource,
};

/// Largest distance range openrouteservice accepts, in metres.
pub const MAX_DISTANCE_METERS: f64 = 50_000.0;

/// Turns request parameters into a reachability polygon.
///
/// Asks the isochrone provider first and falls back to a circle of the
/// intended travel distance whenever the provider cannot deliver. Successful
/// provider answers are memoised; fallbacks never are, so a later healthy call
/// replaces them.
#[derive(Debug)]
pub struct ReachabilityEngine {
    provider: Box<dyn IsochroneProvider>,
    cache: ResultCache,
    range_type: RangeType,
}

impl ReachabilityEngine {
    pub fn new(provider: Box<dyn IsochroneProvider>) -> Self {
        Self {
            provider,
            cache: ResultCache::default(),
            range_type: RangeType::default(),
        }
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_range_type(mut self, range_type: RangeType) -> Self {
        self.range_type = range_type;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn range_type(&self) -> RangeType {
        self.range_type
    }

    fn isochrone_request(
        &self,
        params: &RequestParameters,
        travel: &EffectiveTravel,
        profile: ProfileId,
    ) -> IsochroneRequest {
        let range = match self.range_type {
            RangeType::Distance => (travel.distance_km() * 1000.0).min(MAX_DISTANCE_METERS).round() as u64,
            RangeType::Time => travel.time_range_seconds(),
        };

        IsochroneRequest {
            center: params.center,
            profile,
            range,
            range_type: self.range_type,
        }
    }

    /// Never fails because of the provider; only invalid parameters are reported.
    pub async fn generate(&self, params: RequestParameters) -> Result<ReachabilityResult, ReachError> {
        params.validate()?;

        let travel = speed::adjust(
            params.base_speed_kmh,
            params.duration_minutes,
            params.mode,
            params.weather.as_ref(),
        );
        let profile = to_profile(params.mode, params.terrain);
        let request = self.isochrone_request(&params, &travel, profile);
        let key = CacheKey::new(&params, &travel, &request);

        debug!(
            "{} at {:.2} km/h (x{:.2}) for {} min, profile {}, {} range {}",
            params.mode,
            travel.effective_speed_kmh,
            travel.speed_multiplier,
            travel.adjusted_duration_minutes,
            profile,
            request.range_type,
            request.range
        );

        let (collection, is_fallback) = match self.cache.get(&key) {
            Some(cached) => {
                debug!("cache hit for {key}");
                (cached, false)
            }
            None => match self.provider.fetch_isochrone(&request).await {
                Ok(collection) => {
                    self.cache.put(key, collection.clone());
                    (collection, false)
                }
                Err(failure) => {
                    let distance_km = travel.distance_km();
                    warn!(
                        "{}: {failure}; using a {distance_km:.2} km fallback circle",
                        failure_kind(&failure)
                    );
                    (ReachabilityResult::fallback(params.center, distance_km), true)
                }
            },
        };

        let result = ReachabilityResult::annotate(collection, is_fallback, &params, &travel);
        info!(
            "reachability area around {} ready ({}, {:.2} km²)",
            params.center,
            if is_fallback { "fallback circle" } else { "isochrone" },
            result.area_km2().unwrap_or_default()
        );

        Ok(result)
    }

    /// Like [`generate`](Self::generate), first filling in current weather
    /// when the parameters carry none.
    pub async fn generate_with_weather(
        &self,
        mut params: RequestParameters,
        weather: &dyn WeatherSource,
    ) -> Result<ReachabilityResult, ReachError> {
        params.validate()?;

        if params.weather.is_none() {
            params.weather = weather.current(params.center).await;
        }

        self.generate(params).await
    }
}

fn failure_kind(failure: &FetchFailure) -> &'static str {
    match failure {
        FetchFailure::Network(_) => "isochrone service unreachable",
        FetchFailure::Timeout => "isochrone service too slow",
        FetchFailure::Http(_) => "isochrone service refused the request",
        FetchFailure::MalformedBody(_) => "isochrone service sent unusable data",
    }
}
