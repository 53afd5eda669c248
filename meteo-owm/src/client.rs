//! OpenWeatherMap client implementation.
//!
//! One GET per fetch against the current-weather endpoint with
//! `q`/`appid`/`units` query parameters. No internal retry; failures map to
//! the shared error taxonomy and the caller decides what to do.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use async_trait::async_trait;

use meteo_core::constants::{DEFAULT_TIMEOUT_SECONDS, METRIC_UNITS, OPENWEATHER_BASE_URL};
use meteo_core::error::{MeteoError, Result};
use meteo_core::traits::WeatherProvider;
use meteo_core::types::{CityKey, WeatherReport};

/// OpenWeatherMap client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    /// Current-weather endpoint URL
    pub base_url: String,
    /// API key (`appid` query parameter)
    pub api_key: String,
    /// Units system, "metric" for Celsius and m/s
    pub units: String,
    /// Optional response language (e.g. "fr")
    pub lang: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl OpenWeatherConfig {
    /// Creates a configuration with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENWEATHER_BASE_URL.into(),
            api_key: api_key.into(),
            units: METRIC_UNITS.into(),
            lang: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Overrides the endpoint URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Requests localized condition descriptions.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// OpenWeatherMap HTTP client.
pub struct OpenWeatherClient {
    config: OpenWeatherConfig,
    http_client: reqwest::Client,
}

impl OpenWeatherClient {
    /// Creates a new client with the given config.
    pub fn with_config(config: OpenWeatherConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn fetch(&self, city: &CityKey) -> Result<WeatherReport> {
        let mut query: Vec<(&str, &str)> = vec![
            ("q", city.as_str()),
            ("appid", &self.config.api_key),
            ("units", &self.config.units),
        ];
        if let Some(lang) = &self.config.lang {
            query.push(("lang", lang));
        }

        let response = self
            .http_client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| MeteoError::ProviderUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(%city, "Provider does not know this city");
            return Err(MeteoError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            warn!(%city, %status, "Provider request failed");
            return Err(MeteoError::ProviderUnavailable {
                reason: format!("HTTP {}", status),
            });
        }

        let raw: RawWeatherResponse =
            response
                .json()
                .await
                .map_err(|e| MeteoError::MalformedResponse {
                    city: city.to_string(),
                    reason: e.to_string(),
                })?;

        let report = raw.into_report(city)?;
        debug!(%city, temperature_c = report.temperature_c, "Fetched current weather");
        Ok(report)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════
// Every field is optional at the serde level so a 200 with a hole in it maps
// to MalformedResponse naming the missing field, not a deserialize error.

#[derive(Debug, Deserialize)]
struct RawWeatherResponse {
    name: Option<String>,
    main: Option<RawMain>,
    weather: Option<Vec<RawCondition>>,
    wind: Option<RawWind>,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWind {
    speed: Option<f64>,
}

impl RawWeatherResponse {
    fn into_report(self, city: &CityKey) -> Result<WeatherReport> {
        let malformed = |reason: &str| MeteoError::MalformedResponse {
            city: city.to_string(),
            reason: reason.to_string(),
        };

        let name = self.name.ok_or_else(|| malformed("missing field `name`"))?;
        let main = self.main.ok_or_else(|| malformed("missing field `main`"))?;
        let temp = main
            .temp
            .ok_or_else(|| malformed("missing field `main.temp`"))?;
        let humidity = main
            .humidity
            .ok_or_else(|| malformed("missing field `main.humidity`"))?;
        let description = self
            .weather
            .and_then(|w| w.into_iter().next())
            .and_then(|c| c.description)
            .ok_or_else(|| malformed("missing field `weather[0].description`"))?;
        let speed = self
            .wind
            .and_then(|w| w.speed)
            .ok_or_else(|| malformed("missing field `wind.speed`"))?;

        if !(0.0..=100.0).contains(&humidity) {
            return Err(malformed("`main.humidity` out of range"));
        }

        Ok(WeatherReport {
            city: name,
            temperature_c: temp,
            description,
            humidity_pct: humidity.round() as u8,
            wind_speed_ms: speed,
        })
    }
}
