//! Dashboard configuration.
//!
//! Settings come from an optional YAML file; every key can be overridden by an
//! environment variable. Environment variables win over the file.
//!
//! # Example Config (YAML)
//!
//! ```yaml
//! access_point: "192.168.1.50"
//! mac: "0000021EC9EC743A"
//! timezone: "Europe/Berlin"
//! skip_upload: false
//! output_dir: "./current"
//!
//! caldav:
//!   url: "https://cloud.example.com/remote.php/dav"
//!   username: "me"
//!   password: "secret"
//!   calendars:
//!     - name: "Personal"
//!       color: 2
//!     - name: "Work"
//!       color: 4
//!
//! weather:
//!   latitude: 52.52
//!   longitude: 13.41
//!
//! fonts:
//!   header: "10x20"
//!   calendar: "6x10"
//!   weather: "7x13"
//! ```
//!
//! # Environment Overrides
//!
//! | Variable | Key |
//! |----------|-----|
//! | `ACCESSPOINTIP` | `access_point` |
//! | `MAC` | `mac` |
//! | `TIMEZONE` | `timezone` |
//! | `SKIPUPLOAD` | `skip_upload` |
//! | `OUTPUT_DIR` | `output_dir` |
//! | `CALDAV_URL`, `CAL_USERNAME`, `CAL_PASSWORD` | `caldav.*` |
//! | `CALENDAR_NAME`, `CALENDAR_COLOR` | `caldav.calendars` (comma lists) |
//! | `LATITUDE`, `LONGITUDE` | `weather.*` |
//! | `HEADER_FONT`, `CALENDAR_FONT`, `WEATHER_FONT` | `fonts.*` |

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::canvas::MAX_COLOR_TAG;
use crate::error::Error;

/// Default JPEG output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./current";

/// Default header font.
pub const DEFAULT_HEADER_FONT: &str = "10x20";

/// Default agenda font.
pub const DEFAULT_CALENDAR_FONT: &str = "6x10";

/// Default weather font.
pub const DEFAULT_WEATHER_FONT: &str = "7x13";

/// Validated dashboard configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Access point host, optionally with port
    pub access_point: String,
    /// MAC of the tag to render for
    pub mac: String,
    /// Zone used for "today" and event display
    pub timezone: Tz,
    /// Render and save, but do not upload
    pub skip_upload: bool,
    /// Where the JPEG is written
    pub output_dir: PathBuf,
    /// Calendar source
    pub caldav: CalDavConfig,
    /// Forecast location
    pub weather: WeatherConfig,
    /// Font names
    pub fonts: FontConfig,
}

/// CalDAV account and the calendars to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalDavConfig {
    /// Entry URL (principal discovery starts here)
    pub url: String,
    /// Basic-auth user
    pub username: String,
    /// Basic-auth password
    pub password: String,
    /// Calendars to query, matched by display name
    pub calendars: Vec<CalendarConfig>,
}

/// One calendar to display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarConfig {
    /// Display name on the server
    pub name: String,
    /// Color tag (0-5)
    pub color: u8,
}

/// Forecast location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherConfig {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Monospace font names for each panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontConfig {
    /// Header date
    pub header: String,
    /// Agenda weekday names and titles
    pub calendar: String,
    /// Weather panel text
    pub weather: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_HEADER_FONT.to_string(),
            calendar: DEFAULT_CALENDAR_FONT.to_string(),
            weather: DEFAULT_WEATHER_FONT.to_string(),
        }
    }
}

// File shape: every key optional so the environment can supply it.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    access_point: Option<String>,
    mac: Option<String>,
    timezone: Option<String>,
    skip_upload: Option<bool>,
    output_dir: Option<PathBuf>,
    caldav: RawCalDav,
    weather: RawWeather,
    fonts: RawFonts,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCalDav {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    calendars: Vec<CalendarConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawWeather {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawFonts {
    header: Option<String>,
    calendar: Option<String>,
    weather: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file (if given) and the process
    /// environment.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load(Some("config.yaml"))?;
    /// ```
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, Error> {
        let content = match path {
            Some(path) => std::fs::read_to_string(path.as_ref()).map_err(|e| {
                Error::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.as_ref().display(),
                    e
                ))
            })?,
            None => String::new(),
        };
        Self::from_yaml_with_env(&content, |key| std::env::var(key).ok())
    }

    /// Parse YAML and apply overrides from `lookup`.
    ///
    /// `lookup` maps an environment variable name to its value.
    ///
    /// # Example
    ///
    /// ```
    /// use oepl_dashboard::config::Config;
    ///
    /// let yaml = r#"
    /// access_point: "192.168.1.50"
    /// mac: "0000021EC9EC743A"
    /// timezone: "Europe/Berlin"
    /// caldav:
    ///   url: "https://dav.example.com/"
    ///   username: "me"
    ///   password: "secret"
    /// weather:
    ///   latitude: 52.52
    ///   longitude: 13.41
    /// "#;
    ///
    /// let config = Config::from_yaml_with_env(yaml, |key| match key {
    ///     "SKIPUPLOAD" => Some("true".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert!(config.skip_upload);
    /// assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
    /// ```
    pub fn from_yaml_with_env<F>(yaml: &str, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = if yaml.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))?
        };

        let access_point = required(lookup("ACCESSPOINTIP").or(raw.access_point), "access_point")?;
        let mac = required(lookup("MAC").or(raw.mac), "mac")?;

        let timezone = required(lookup("TIMEZONE").or(raw.timezone), "timezone")?;
        let timezone: Tz = timezone
            .parse()
            .map_err(|_| Error::Config(format!("Unknown timezone '{}'", timezone)))?;

        let skip_upload = match lookup("SKIPUPLOAD") {
            Some(value) => parse_bool("SKIPUPLOAD", &value)?,
            None => raw.skip_upload.unwrap_or(false),
        };

        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .or(raw.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let calendars = match (lookup("CALENDAR_NAME"), lookup("CALENDAR_COLOR")) {
            (None, None) => raw.caldav.calendars,
            (names, colors) => zip_calendars(
                names.as_deref().unwrap_or_default(),
                colors.as_deref().unwrap_or_default(),
            )?,
        };
        for calendar in &calendars {
            if calendar.color > MAX_COLOR_TAG {
                return Err(Error::Config(format!(
                    "Calendar '{}' has color {}, expected 0-{}",
                    calendar.name, calendar.color, MAX_COLOR_TAG
                )));
            }
        }

        let caldav = CalDavConfig {
            url: required(lookup("CALDAV_URL").or(raw.caldav.url), "caldav.url")?,
            username: required(
                lookup("CAL_USERNAME").or(raw.caldav.username),
                "caldav.username",
            )?,
            password: required(
                lookup("CAL_PASSWORD").or(raw.caldav.password),
                "caldav.password",
            )?,
            calendars,
        };

        let weather = WeatherConfig {
            latitude: coordinate(lookup("LATITUDE"), raw.weather.latitude, "LATITUDE")?,
            longitude: coordinate(lookup("LONGITUDE"), raw.weather.longitude, "LONGITUDE")?,
        };

        let defaults = FontConfig::default();
        let fonts = FontConfig {
            header: lookup("HEADER_FONT")
                .or(raw.fonts.header)
                .unwrap_or(defaults.header),
            calendar: lookup("CALENDAR_FONT")
                .or(raw.fonts.calendar)
                .unwrap_or(defaults.calendar),
            weather: lookup("WEATHER_FONT")
                .or(raw.fonts.weather)
                .unwrap_or(defaults.weather),
        };

        Ok(Self {
            access_point,
            mac,
            timezone,
            skip_upload,
            output_dir,
            caldav,
            weather,
            fonts,
        })
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("Missing required setting '{}'", key))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

fn coordinate(env: Option<String>, file: Option<f64>, key: &str) -> Result<f64, Error> {
    let value = match env {
        Some(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, v)))?,
        None => file.ok_or_else(|| {
            Error::Config(format!("Missing required setting '{}'", key.to_lowercase()))
        })?,
    };
    if !value.is_finite() {
        return Err(Error::Config(format!("{} must be finite", key)));
    }
    Ok(value)
}

/// Pair the comma lists `CALENDAR_NAME` and `CALENDAR_COLOR`.
fn zip_calendars(names: &str, colors: &str) -> Result<Vec<CalendarConfig>, Error> {
    let names: Vec<&str> = split_list(names);
    let colors: Vec<&str> = split_list(colors);

    if names.len() != colors.len() {
        return Err(Error::Config(format!(
            "CALENDAR_NAME lists {} calendars but CALENDAR_COLOR lists {} colors",
            names.len(),
            colors.len()
        )));
    }

    names
        .into_iter()
        .zip(colors)
        .map(|(name, color)| {
            let color = color.parse::<u8>().map_err(|_| {
                Error::Config(format!("Invalid color '{}' for calendar '{}'", color, name))
            })?;
            Ok(CalendarConfig {
                name: name.to_string(),
                color,
            })
        })
        .collect()
}

fn split_list(value: &str) -> Vec<&str> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const FULL_YAML: &str = r#"
access_point: "192.168.1.50"
mac: "0000021EC9EC743A"
timezone: "Europe/Berlin"
output_dir: "/tmp/oepl"
caldav:
  url: "https://dav.example.com/"
  username: "me"
  password: "secret"
  calendars:
    - name: "Personal"
      color: 2
    - name: "Work"
      color: 4
weather:
  latitude: 52.52
  longitude: 13.41
fonts:
  header: "9x18"
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_full_yaml() {
        let config = Config::from_yaml_with_env(FULL_YAML, no_env).unwrap();
        assert_eq!(config.access_point, "192.168.1.50");
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert!(!config.skip_upload);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/oepl"));
        assert_eq!(config.caldav.calendars.len(), 2);
        assert_eq!(config.fonts.header, "9x18");
        assert_eq!(config.fonts.calendar, DEFAULT_CALENDAR_FONT);
    }

    #[test]
    fn test_env_overrides_file() {
        let lookup = env(&[
            ("MAC", "00000000AABBCCDD"),
            ("SKIPUPLOAD", "True"),
            ("LATITUDE", "48.1"),
            ("CALENDAR_NAME", "Family, Sports"),
            ("CALENDAR_COLOR", "1,5"),
        ]);
        let config = Config::from_yaml_with_env(FULL_YAML, lookup).unwrap();
        assert_eq!(config.mac, "00000000AABBCCDD");
        assert!(config.skip_upload);
        assert_eq!(config.weather.latitude, 48.1);
        assert_eq!(config.weather.longitude, 13.41);
        assert_eq!(
            config.caldav.calendars,
            vec![
                CalendarConfig {
                    name: "Family".into(),
                    color: 1
                },
                CalendarConfig {
                    name: "Sports".into(),
                    color: 5
                },
            ]
        );
    }

    #[test]
    fn test_environment_only() {
        let lookup = env(&[
            ("ACCESSPOINTIP", "10.0.0.2"),
            ("MAC", "AA"),
            ("TIMEZONE", "UTC"),
            ("CALDAV_URL", "https://dav/"),
            ("CAL_USERNAME", "u"),
            ("CAL_PASSWORD", "p"),
            ("LATITUDE", "0"),
            ("LONGITUDE", "0"),
        ]);
        let config = Config::from_yaml_with_env("", lookup).unwrap();
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(config.caldav.calendars.is_empty());
        assert_eq!(config.fonts, FontConfig::default());
    }

    #[test]
    fn test_missing_required_key() {
        let err = Config::from_yaml_with_env("mac: AA", no_env).unwrap_err();
        assert!(err.to_string().contains("access_point"));
    }

    #[test]
    fn test_invalid_timezone() {
        let err =
            Config::from_yaml_with_env(FULL_YAML, env(&[("TIMEZONE", "Mars/Olympus")])).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn test_calendar_list_length_mismatch() {
        let lookup = env(&[("CALENDAR_NAME", "A,B"), ("CALENDAR_COLOR", "1")]);
        let err = Config::from_yaml_with_env(FULL_YAML, lookup).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_color_out_of_range() {
        let lookup = env(&[("CALENDAR_NAME", "A"), ("CALENDAR_COLOR", "6")]);
        assert!(Config::from_yaml_with_env(FULL_YAML, lookup).is_err());

        let lookup = env(&[("CALENDAR_NAME", "A"), ("CALENDAR_COLOR", "red")]);
        assert!(Config::from_yaml_with_env(FULL_YAML, lookup).is_err());
    }

    #[test]
    fn test_bad_bool_and_number() {
        let err =
            Config::from_yaml_with_env(FULL_YAML, env(&[("SKIPUPLOAD", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("SKIPUPLOAD"));

        let err =
            Config::from_yaml_with_env(FULL_YAML, env(&[("LONGITUDE", "east")])).unwrap_err();
        assert!(err.to_string().contains("LONGITUDE"));
    }

    #[test]
    fn test_unknown_yaml_key_rejected() {
        let yaml = format!("{}\nrefresh: 5\n", FULL_YAML);
        assert!(Config::from_yaml_with_env(&yaml, no_env).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_YAML.as_bytes()).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.caldav.url, "https://dav.example.com/");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.yaml"))).unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }
}
