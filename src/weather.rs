//! Open-Meteo forecast source.
//!
//! One request per run fetches current conditions, the hourly forecast and a
//! daily outlook for five days. Times in the response are local to the
//! forecast location (`timezone=auto`) and carry no offset.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::config::WeatherConfig;
use crate::error::Error;
use crate::DEFAULT_TIMEOUT_SECS;

/// Forecast endpoint.
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Days of forecast requested.
pub const FORECAST_DAYS: u32 = 5;

const CURRENT_FIELDS: &str = "is_day,temperature_2m,weather_code,wind_speed_10m,wind_direction_10m,precipitation_probability";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,wind_speed_10m,precipitation_probability";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max,sunrise,sunset";

const SOURCE: &str = "Open-Meteo forecast";

/// Full forecast response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forecast {
    /// Conditions right now
    pub current: Current,
    /// Hour-by-hour forecast starting at local midnight today
    pub hourly: Hourly,
    /// Day-by-day forecast starting today
    pub daily: Daily,
}

/// Current conditions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Current {
    /// Local time of the observation (`YYYY-MM-DDTHH:MM`)
    pub time: String,
    /// 1 during daylight
    pub is_day: u8,
    /// Air temperature, °C
    pub temperature_2m: f64,
    /// WMO weather code
    pub weather_code: u8,
    /// Wind speed, km/h
    pub wind_speed_10m: f64,
    /// Direction the wind comes from, degrees
    pub wind_direction_10m: f64,
    /// Chance of precipitation, percent
    pub precipitation_probability: Option<u8>,
}

/// Hourly series, index-aligned with `time`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hourly {
    /// Local wall-clock hours (`YYYY-MM-DDTHH:MM`)
    pub time: Vec<String>,
    /// Temperature in °C
    pub temperature_2m: Vec<f64>,
    /// WMO weather code
    pub weather_code: Vec<u8>,
    /// Wind speed in km/h
    pub wind_speed_10m: Vec<f64>,
    /// Chance of precipitation in percent
    pub precipitation_probability: Vec<Option<u8>>,
}

/// Daily series, index-aligned with `time`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Daily {
    /// Local dates (`YYYY-MM-DD`)
    pub time: Vec<String>,
    /// Dominant WMO weather code of the day
    pub weather_code: Vec<u8>,
    /// Daily high in °C
    pub temperature_2m_max: Vec<f64>,
    /// Daily low in °C
    pub temperature_2m_min: Vec<f64>,
    /// Highest hourly chance of precipitation in percent
    pub precipitation_probability_max: Vec<Option<u8>>,
    /// Local sunrise time
    pub sunrise: Vec<String>,
    /// Local sunset time
    pub sunset: Vec<String>,
}

/// One column of the hourly strip.
#[derive(Debug, Clone, PartialEq)]
pub struct HourForecast {
    /// Start of the hour, local time
    pub time: NaiveDateTime,
    /// Temperature in °C
    pub temperature: f64,
    /// WMO weather code
    pub weather_code: u8,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Chance of precipitation in percent
    pub precipitation: Option<u8>,
}

/// One column of the daily outlook.
#[derive(Debug, Clone, PartialEq)]
pub struct DayForecast {
    /// Local date
    pub date: NaiveDate,
    /// Dominant WMO weather code
    pub weather_code: u8,
    /// Daily low in °C
    pub temperature_min: f64,
    /// Daily high in °C
    pub temperature_max: f64,
    /// Highest chance of precipitation in percent
    pub precipitation: Option<u8>,
}

impl Forecast {
    /// Parse a forecast response body.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let forecast: Forecast = serde_json::from_str(json).map_err(|e| Error::schema(SOURCE, e))?;
        forecast.validate()?;
        Ok(forecast)
    }

    fn validate(&self) -> Result<(), Error> {
        let h = &self.hourly;
        let hourly_ok = [
            h.temperature_2m.len(),
            h.weather_code.len(),
            h.wind_speed_10m.len(),
            h.precipitation_probability.len(),
        ]
        .iter()
        .all(|&len| len == h.time.len());

        let d = &self.daily;
        let daily_ok = [
            d.weather_code.len(),
            d.temperature_2m_max.len(),
            d.temperature_2m_min.len(),
            d.precipitation_probability_max.len(),
            d.sunrise.len(),
            d.sunset.len(),
        ]
        .iter()
        .all(|&len| len == d.time.len());

        if !hourly_ok || !daily_ok {
            return Err(Error::schema(SOURCE, "series lengths differ"));
        }
        if d.time.is_empty() {
            return Err(Error::schema(SOURCE, "daily series is empty"));
        }
        Ok(())
    }

    /// Local time of the current observation.
    pub fn current_time(&self) -> Result<NaiveDateTime, Error> {
        parse_local_time(&self.current.time)
    }

    /// The next `count` whole hours after the current observation.
    ///
    /// Continues into the following day; stops early at the end of the series.
    pub fn next_hours(&self, count: usize) -> Result<Vec<HourForecast>, Error> {
        let now = self.current_time()?;
        let h = &self.hourly;

        let mut hours = Vec::with_capacity(count);
        for (i, time) in h.time.iter().enumerate() {
            let time = parse_local_time(time)?;
            if time <= now {
                continue;
            }
            hours.push(HourForecast {
                time,
                temperature: h.temperature_2m[i],
                weather_code: h.weather_code[i],
                wind_speed: h.wind_speed_10m[i],
                precipitation: h.precipitation_probability[i],
            });
            if hours.len() == count {
                break;
            }
        }
        Ok(hours)
    }

    /// The first `count` days of the outlook, starting today.
    pub fn days(&self, count: usize) -> Result<Vec<DayForecast>, Error> {
        let d = &self.daily;
        d.time
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, date)| {
                Ok(DayForecast {
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                        .map_err(|e| Error::schema(SOURCE, format!("date '{}': {}", date, e)))?,
                    weather_code: d.weather_code[i],
                    temperature_min: d.temperature_2m_min[i],
                    temperature_max: d.temperature_2m_max[i],
                    precipitation: d.precipitation_probability_max[i],
                })
            })
            .collect()
    }

    /// Today's sunrise and sunset as `HH:MM`.
    pub fn sun_times(&self) -> Result<(String, String), Error> {
        let sunrise = format_time(&self.daily.sunrise[0])?;
        let sunset = format_time(&self.daily.sunset[0])?;
        Ok((sunrise, sunset))
    }
}

/// Open-Meteo client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    /// Client for the public Open-Meteo API.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: FORECAST_URL.to_string(),
        }
    }

    /// Set a custom endpoint (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the forecast for a location.
    pub async fn fetch(&self, location: &WeatherConfig) -> Result<Forecast, Error> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let forecast_days = FORECAST_DAYS.to_string();

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("hourly", HOURLY_FIELDS),
                ("daily", DAILY_FIELDS),
                ("timezone", "auto"),
                ("forecast_days", forecast_days.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let body = response.text().await?;
        Forecast::from_json(&body)
    }
}

fn parse_local_time(value: &str) -> Result<NaiveDateTime, Error> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| Error::schema(SOURCE, format!("time '{}': {}", value, e)))
}

/// `HH:MM` part of a local ISO timestamp.
///
/// ```
/// use oepl_dashboard::weather::format_time;
///
/// assert_eq!(format_time("2024-03-11T06:32").unwrap(), "06:32");
/// ```
pub fn format_time(value: &str) -> Result<String, Error> {
    Ok(parse_local_time(value)?.format("%H:%M").to_string())
}

/// Short text for a WMO weather code.
///
/// Codes 0-2 have night variants.
pub fn condition_label(code: u8, is_day: bool) -> &'static str {
    match (code, is_day) {
        (0, false) => "Clear night",
        (1, false) => "Mostly clear",
        (2, false) => "Cloudy night",
        (0, true) => "Sunny",
        (1, true) => "Mostly sunny",
        (2, true) => "Partly cloudy",
        (3, _) => "Overcast",
        (45, _) => "Fog",
        (48, _) => "Rime fog",
        (51 | 53 | 55, _) => "Drizzle",
        (56 | 57, _) => "Frz. drizzle",
        (61, _) => "Light rain",
        (63, _) => "Rain",
        (65, _) => "Heavy rain",
        (66 | 67, _) => "Frz. rain",
        (71 | 73 | 75, _) => "Snow",
        (77, _) => "Snow grains",
        (80..=82, _) => "Showers",
        (85 | 86, _) => "Snow showers",
        (95, _) => "Thunder",
        (96 | 99, _) => "Thunder/hail",
        _ => "?",
    }
}

/// Eight-point compass name for a wind direction in degrees.
///
/// ```
/// use oepl_dashboard::weather::compass;
///
/// assert_eq!(compass(0.0), "N");
/// assert_eq!(compass(250.0), "W");
/// assert_eq!(compass(350.0), "N");
/// ```
pub fn compass(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = (degrees.rem_euclid(360.0) / 45.0).round() as usize % POINTS.len();
    POINTS[index]
}
