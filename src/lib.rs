//! # oepl-dashboard
//!
//! Daily calendar and weather dashboard for [OpenEPaperLink](https://openepaperlink.de)
//! e-paper tags.
//!
//! A run fetches the tag inventory from the access point, the events of the
//! configured CalDAV calendars and an Open-Meteo forecast, renders a
//! three-color image sized for the tag, saves it as JPEG and uploads it to
//! the access point.
//!
//! ## Layout
//!
//! The agenda shows today and tomorrow side by side on an hour grid. Up to
//! three all-day events per day get their own lane above midnight; timed
//! events are placed by start and end time, and two overlapping events share
//! the column half and half. See [`layout`] for the rules.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oepl_dashboard::{config::Config, dashboard};
//!
//! # async fn example() -> Result<(), oepl_dashboard::Error> {
//! let config = Config::load(Some("config.yaml"))?;
//! let now = chrono::Utc::now().with_timezone(&config.timezone);
//!
//! dashboard::run(&config, now).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Access Point Endpoints
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/current/tagDB.json` | GET | Known tags and their hardware types |
//! | `/tagtypes/XX.json` | GET | Resolution and colors of hardware type `XX` |
//! | `/imgupload` | POST | Multipart image upload (`dither`, `mac`, `file`) |
//!
//! ## Color Tags
//!
//! Calendars are drawn in one of six color tags: 0 white, 1 black, 2 accent
//! (red or yellow, depending on the tag), and 3-5 the same three inks
//! dithered with white.

pub mod agenda_view;
pub mod caldav;
pub mod canvas;
pub mod client;
pub mod config;
pub mod dashboard;
mod error;
pub mod event;
pub mod inventory;
pub mod layout;
pub mod render;
pub mod text;
pub mod weather;
pub mod weather_view;

pub use client::AccessPoint;
pub use config::Config;
pub use dashboard::{run, RunReport};
pub use error::Error;
pub use event::{CalendarEvent, EventTime};
pub use layout::{Column, DayWindow, Half, LayoutBlock};

/// Timeout for every HTTP request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
