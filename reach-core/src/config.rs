use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cache::{DEFAULT_RESULT_CAPACITY, ResultCache},
    engine::ReachabilityEngine,
    provider::{self, RangeType, openrouteservice},
    weather::{self, OpenMeteoClient},
};

/// Environment variable that overrides the stored routing API key.
pub const API_KEY_ENV: &str = "ORS_API_KEY";

/// Settings for the isochrone service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub range_type: RangeType,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: openrouteservice::DEFAULT_BASE_URL.to_string(),
            timeout_secs: openrouteservice::DEFAULT_TIMEOUT.as_secs(),
            range_type: RangeType::default(),
        }
    }
}

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 0 disables the bound.
    pub capacity: usize,
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RESULT_CAPACITY,
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    pub base_url: String,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: weather::DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: weather::DEFAULT_CACHE_TTL.as_secs(),
            timeout_secs: weather::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [routing]
/// api_key = "..."
/// range_type = "distance"
///
/// [cache]
/// capacity = 256
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub routing: RoutingConfig,
    pub cache: CacheConfig,
    pub weather: WeatherConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    /// `ORS_API_KEY` takes precedence over the stored key.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;

        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                cfg.set_routing_api_key(key);
            }
        }

        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "reach", "reach-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_routing_api_key(&mut self, api_key: String) {
        self.routing.api_key = Some(api_key);
    }

    /// Returns the routing API key or an error explaining how to set one.
    pub fn routing_api_key(&self) -> Result<String> {
        self.routing
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No openrouteservice API key configured.\n\
                     Hint: run `reach configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn result_cache(&self) -> ResultCache {
        ResultCache::new(
            Some(self.cache.capacity),
            self.cache.ttl_secs.map(Duration::from_secs),
        )
    }

    /// Open-Meteo client, or `None` when weather lookups are switched off.
    pub fn weather_client(&self) -> Option<OpenMeteoClient> {
        self.weather.enabled.then(|| {
            OpenMeteoClient::with_options(
                self.weather.base_url.clone(),
                Duration::from_secs(self.weather.cache_ttl_secs),
            )
            .with_timeout(Duration::from_secs(self.weather.timeout_secs))
        })
    }
}

/// Engine wired to openrouteservice with the configured cache and range type.
pub fn engine_from_config(config: &Config) -> Result<ReachabilityEngine> {
    let provider = provider::isochrone_provider_from_config(config)?;

    Ok(ReachabilityEngine::new(provider)
        .with_cache(config.result_cache())
        .with_range_type(config.routing.range_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.routing.timeout(), Duration::from_secs(20));
        assert_eq!(cfg.routing.range_type, RangeType::Distance);
        assert_eq!(cfg.routing.base_url, "https://api.openrouteservice.org");
        assert_eq!(cfg.cache.capacity, 256);
        assert_eq!(cfg.weather.cache_ttl_secs, 30 * 60);
        assert_eq!(cfg.weather.timeout_secs, 10);
        assert!(cfg.weather.enabled);
    }

    #[test]
    fn routing_api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.routing_api_key().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No openrouteservice API key configured"));
        assert!(msg.contains("Hint: run `reach configure`"));

        let mut blank = Config::default();
        blank.set_routing_api_key("   ".into());
        assert!(blank.routing_api_key().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
            [routing]
            api_key = "KEY"
            range_type = "time"

            [cache]
            ttl_secs = 600
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.routing_api_key().unwrap(), "KEY");
        assert_eq!(cfg.routing.range_type, RangeType::Time);
        assert_eq!(cfg.routing.timeout_secs, 20);
        assert_eq!(cfg.cache.capacity, 256);
        assert_eq!(cfg.cache.ttl_secs, Some(600));
        assert!(cfg.weather.enabled);
    }

    #[test]
    fn invalid_range_type_is_rejected() {
        let err = Config::from_toml("[routing]\nrange_type = \"isodistance\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = env::temp_dir().join(format!("reach-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_routing_api_key("SECRET".into());
        cfg.routing.range_type = RangeType::Time;
        cfg.weather.enabled = false;
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded.routing_api_key().unwrap(), "SECRET");
        assert_eq!(loaded.routing.range_type, RangeType::Time);
        assert!(loaded.weather_client().is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = env::temp_dir().join("reach-config-does-not-exist").join("config.toml");
        let cfg = Config::load_from(&path).expect("defaults");
        assert!(cfg.routing.api_key.is_none());
    }

    #[test]
    fn engine_needs_api_key() {
        let mut cfg = Config::default();
        assert!(engine_from_config(&cfg).is_err());

        cfg.set_routing_api_key("KEY".into());
        cfg.routing.range_type = RangeType::Time;
        let engine = engine_from_config(&cfg).expect("engine");
        assert_eq!(engine.range_type(), RangeType::Time);
    }
}
