//! Current conditions from Open-Meteo, used to slow travellers down.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{cache::BoundedCache, model::{GeoPoint, WeatherObservation}};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CURRENT_FIELDS: &str =
    "temperature_2m,precipitation,rain,showers,snowfall,wind_speed_10m,wind_direction_10m";

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// `None` means no usable observation; callers treat that as fair weather.
    async fn current(&self, location: GeoPoint) -> Option<WeatherObservation>;
}

#[derive(Debug)]
pub struct OpenMeteoClient {
    base_url: String,
    timeout: Duration,
    http: Client,
    cache: BoundedCache<String, WeatherObservation>,
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self::with_options(DEFAULT_BASE_URL.to_string(), DEFAULT_CACHE_TTL)
    }

    pub fn with_options(base_url: String, cache_ttl: Duration) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            http: Client::new(),
            cache: BoundedCache::new(Some(DEFAULT_CACHE_CAPACITY), Some(cache_ttl)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn cache_key(location: GeoPoint) -> String {
        format!("weather-{:.4}-{:.4}", location.latitude, location.longitude)
    }

    async fn fetch(&self, location: GeoPoint) -> anyhow::Result<WeatherObservation> {
        match tokio::time::timeout(self.timeout, self.request(location)).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("no answer within {:?}", self.timeout),
        }
    }

    async fn request(&self, location: GeoPoint) -> anyhow::Result<WeatherObservation> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("Weather API error: {status}");
        }

        let body: OmResponse = res.json().await?;
        Ok(body.current.into())
    }
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn current(&self, location: GeoPoint) -> Option<WeatherObservation> {
        let key = Self::cache_key(location);
        if let Some(hit) = self.cache.get(&key) {
            debug!("weather cache hit for {key}");
            return Some(hit);
        }

        match self.fetch(location).await {
            Ok(observation) => {
                self.cache.put(key, observation.clone());
                Some(observation)
            }
            Err(e) => {
                warn!("Error fetching weather data for {location}: {e:#}");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: OmCurrent,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    #[serde(default)]
    time: Option<String>,
    temperature_2m: f64,
    #[serde(default)]
    precipitation: Option<f64>,
    #[serde(default)]
    snowfall: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
}

impl From<OmCurrent> for WeatherObservation {
    fn from(current: OmCurrent) -> Self {
        WeatherObservation {
            temperature_c: current.temperature_2m,
            wind_speed_kmh: current.wind_speed_10m.unwrap_or(0.0),
            precipitation_mm: current.precipitation.unwrap_or(0.0),
            snowfall_mm: current.snowfall.unwrap_or(0.0),
            observed_at: current.time.as_deref().and_then(parse_local_time),
        }
    }
}

/// Open-Meteo reports ISO 8601 local times without seconds, e.g. `2024-01-15T14:30`.
fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    const CURRENT: &str = r#"{
        "latitude": 49.2, "longitude": 8.12,
        "current_units": {"temperature_2m": "°C"},
        "current": {
            "time": "2024-01-15T14:30", "interval": 900,
            "temperature_2m": -2.5, "precipitation": 0.4, "rain": 0.0, "showers": 0.0,
            "snowfall": 0.28, "wind_speed_10m": 14.2, "wind_direction_10m": 250
        }
    }"#;

    /// Serves every incoming connection with the same response and counts them.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}/v1/forecast"), hits)
    }

    #[test]
    fn parses_current_block() {
        let parsed: OmResponse = serde_json::from_str(CURRENT).unwrap();
        let observation = WeatherObservation::from(parsed.current);

        assert_eq!(observation.temperature_c, -2.5);
        assert_eq!(observation.precipitation_mm, 0.4);
        assert_eq!(observation.snowfall_mm, 0.28);
        assert_eq!(observation.wind_speed_kmh, 14.2);

        let at = observation.observed_at.expect("time parsed");
        assert_eq!((at.year(), at.month(), at.day()), (2024, 1, 15));
        assert_eq!((at.hour(), at.minute()), (14, 30));
    }

    #[test]
    fn missing_optional_fields_default_to_zero() {
        let parsed: OmResponse =
            serde_json::from_str(r#"{"current": {"temperature_2m": 21.0}}"#).unwrap();
        let observation = WeatherObservation::from(parsed.current);
        assert_eq!(observation.precipitation_mm, 0.0);
        assert_eq!(observation.snowfall_mm, 0.0);
        assert_eq!(observation.wind_speed_kmh, 0.0);
        assert!(observation.observed_at.is_none());
    }

    #[test]
    fn cache_key_rounds_to_four_decimals() {
        assert_eq!(
            OpenMeteoClient::cache_key(GeoPoint::new(49.198312, 8.117249)),
            "weather-49.1983-8.1172"
        );
    }

    #[tokio::test]
    async fn repeated_lookups_are_served_from_cache() {
        let (base_url, hits) = serve("200 OK", CURRENT).await;
        let client = OpenMeteoClient::with_options(base_url, DEFAULT_CACHE_TTL);
        let point = GeoPoint::new(49.1983, 8.1172);

        let first = client.current(point).await.expect("weather");
        let second = client.current(GeoPoint::new(49.19831, 8.11719)).await.expect("weather");

        assert_eq!(first, second);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_mean_no_weather() {
        let (base_url, _hits) = serve("500 Internal Server Error", "{}").await;
        let client = OpenMeteoClient::with_options(base_url, DEFAULT_CACHE_TTL);
        assert!(client.current(GeoPoint::new(49.1983, 8.1172)).await.is_none());

        let (base_url, _hits) = serve("200 OK", r#"{"hourly": {}}"#).await;
        let client = OpenMeteoClient::with_options(base_url, DEFAULT_CACHE_TTL);
        assert!(client.current(GeoPoint::new(49.1983, 8.1172)).await.is_none());
    }

    #[tokio::test]
    async fn silent_server_means_no_weather() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client =
            OpenMeteoClient::with_options(format!("http://{addr}/v1/forecast"), DEFAULT_CACHE_TTL)
                .with_timeout(Duration::from_millis(100));
        let lookup = tokio::time::timeout(
            Duration::from_secs(2),
            client.current(GeoPoint::new(49.1983, 8.1172)),
        )
        .await;
        assert!(matches!(lookup, Ok(None)), "{lookup:?}");
    }

    #[tokio::test]
    async fn weather_cache_is_bounded() {
        let (base_url, hits) = serve("200 OK", CURRENT).await;
        let client = OpenMeteoClient::with_options(base_url, DEFAULT_CACHE_TTL);

        for i in 0..DEFAULT_CACHE_CAPACITY + 3 {
            let point = GeoPoint::new(10.0 + i as f64 * 0.01, 8.0);
            assert!(client.current(point).await.is_some());
        }
        assert_eq!(client.cache.len(), DEFAULT_CACHE_CAPACITY);
        assert_eq!(hits.load(Ordering::SeqCst), DEFAULT_CACHE_CAPACITY + 3);

        // The oldest location was evicted and has to be fetched again.
        client.current(GeoPoint::new(10.0, 8.0)).await.expect("weather");
        assert_eq!(hits.load(Ordering::SeqCst), DEFAULT_CACHE_CAPACITY + 4);
    }
}
