use async_trait::async_trait;
use geojson::FeatureCollection;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

use crate::geometry::polygon_from_geojson;

use super::{FetchFailure, IsochroneProvider, IsochroneRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const ACCEPT: &str = "application/json, application/geo+json, application/gpx+xml, img/png; charset=utf-8";

/// Client for the openrouteservice `/v2/isochrones/{profile}` endpoint.
#[derive(Debug, Clone)]
pub struct OrsIsochroneClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OrsIsochroneClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, request: &IsochroneRequest) -> String {
        format!(
            "{}/v2/isochrones/{}",
            self.base_url.trim_end_matches('/'),
            request.profile
        )
    }

    /// The JSON document posted to the service.
    pub fn request_body(request: &IsochroneRequest) -> Value {
        json!({
            "locations": [[request.center.longitude, request.center.latitude]],
            "range": [request.range],
            "range_type": request.range_type.as_str(),
        })
    }

    async fn exchange(&self, url: &str, body: &Value) -> Result<(StatusCode, String), FetchFailure> {
        let res = self
            .http
            .post(url)
            .header("Accept", ACCEPT)
            .header("Authorization", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = res.status();
        let text = res.text().await.map_err(classify_transport_error)?;

        Ok((status, text))
    }
}

#[async_trait]
impl IsochroneProvider for OrsIsochroneClient {
    async fn fetch_isochrone(
        &self,
        request: &IsochroneRequest,
    ) -> Result<FeatureCollection, FetchFailure> {
        let url = self.endpoint(request);
        let body = Self::request_body(request);
        debug!("POST {url} {body}");

        let (status, text) = match tokio::time::timeout(self.timeout, self.exchange(&url, &body)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("isochrone request to {url} exceeded {:?}", self.timeout);
                return Err(FetchFailure::Timeout);
            }
        };

        if !status.is_success() {
            warn!(
                "isochrone request failed with status {}: {}",
                status,
                truncate_body(&text)
            );
            return Err(FetchFailure::Http(status.as_u16()));
        }

        parse_isochrone(&text)
    }
}

fn classify_transport_error(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Network(err.to_string())
    }
}

/// Keeps the first feature of the response, provided it carries a usable polygon.
pub(crate) fn parse_isochrone(body: &str) -> Result<FeatureCollection, FetchFailure> {
    if body.trim().is_empty() {
        return Err(FetchFailure::MalformedBody("empty body".to_string()));
    }

    let collection: FeatureCollection = serde_json::from_str(body).map_err(|e| {
        warn!("could not parse isochrone response: {e}. Body: {}", truncate_body(body));
        FetchFailure::MalformedBody(format!("invalid GeoJSON: {e}"))
    })?;

    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| FetchFailure::MalformedBody("response contained no features".to_string()))?;

    let usable = feature
        .geometry
        .as_ref()
        .and_then(|geometry| polygon_from_geojson(&geometry.value))
        .is_some();
    if !usable {
        return Err(FetchFailure::MalformedBody(
            "first feature is not a closed polygon".to_string(),
        ));
    }

    Ok(FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
