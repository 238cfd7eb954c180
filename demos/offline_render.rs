//! Render a dashboard from built-in sample data, without any network access.
//!
//! ```text
//! cargo run --example offline_render -- ./current
//! ```

use std::path::PathBuf;

use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Europe::Berlin;
use oepl_dashboard::config::FontConfig;
use oepl_dashboard::dashboard::{render_jpeg, write_image};
use oepl_dashboard::inventory::DisplayInfo;
use oepl_dashboard::render::{DashboardData, Fonts};
use oepl_dashboard::weather::Forecast;
use oepl_dashboard::{CalendarEvent, DayWindow, Error};

const SAMPLE_FORECAST: &str = r#"{
    "current": {
        "time": "2024-03-11T09:15", "is_day": 1, "temperature_2m": 8.3,
        "weather_code": 2, "wind_speed_10m": 11.5, "wind_direction_10m": 230,
        "precipitation_probability": 15
    },
    "hourly": {
        "time": ["2024-03-11T09:00", "2024-03-11T10:00", "2024-03-11T11:00", "2024-03-11T12:00",
                 "2024-03-11T13:00", "2024-03-11T14:00", "2024-03-11T15:00", "2024-03-11T16:00"],
        "temperature_2m": [8.0, 8.9, 9.8, 10.5, 11.1, 11.4, 11.0, 10.2],
        "weather_code": [2, 2, 3, 3, 61, 61, 3, 2],
        "wind_speed_10m": [11.0, 12.0, 13.5, 14.0, 15.2, 14.8, 13.0, 11.9],
        "precipitation_probability": [15, 20, 35, 40, 70, 65, 30, 10]
    },
    "daily": {
        "time": ["2024-03-11", "2024-03-12", "2024-03-13", "2024-03-14"],
        "weather_code": [61, 3, 0, 80],
        "temperature_2m_max": [11.4, 9.8, 13.0, 10.1],
        "temperature_2m_min": [4.1, 3.0, 2.2, 5.5],
        "precipitation_probability_max": [70, 35, 0, 60],
        "sunrise": ["2024-03-11T06:32", "2024-03-12T06:30", "2024-03-13T06:28", "2024-03-14T06:26"],
        "sunset": ["2024-03-11T18:07", "2024-03-12T18:09", "2024-03-13T18:11", "2024-03-14T18:12"]
    }
}"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./current"));

    let now = Utc::now().with_timezone(&Berlin);
    let today = now.date_naive();
    let tomorrow = today + Duration::days(1);
    let at = |day: chrono::NaiveDate, h: u32, m: u32| {
        Berlin
            .from_local_datetime(&day.and_hms_opt(h, m, 0).unwrap_or_default())
            .earliest()
            .unwrap_or(now)
    };

    let events = vec![
        CalendarEvent::all_day(today, today + Duration::days(3), "Conference", 5),
        CalendarEvent::all_day(tomorrow, tomorrow + Duration::days(1), "Bin collection", 1),
        CalendarEvent::timed(at(today, 9, 0), at(today, 10, 0), "Standup", 2),
        CalendarEvent::timed(at(today, 9, 30), at(today, 10, 30), "Design review", 4),
        CalendarEvent::timed(at(today, 14, 0), at(today, 15, 0), "1:1 with a very long title", 3),
        CalendarEvent::timed(at(today, 22, 0), at(tomorrow, 1, 30), "Night shift", 1),
        CalendarEvent::timed(at(tomorrow, 12, 0), at(tomorrow, 13, 0), "Lunch", 0),
    ];

    let forecast = Forecast::from_json(SAMPLE_FORECAST)?;
    let display = DisplayInfo {
        hw_type: 0x2E,
        width: 800,
        height: 480,
        accent: Some([255, 0, 0]),
    };
    let fonts = Fonts::from_config(&FontConfig::default())?;

    let data = DashboardData {
        date: today,
        window: DayWindow::new(today),
        events: &events,
        forecast: &forecast,
    };

    let jpeg = render_jpeg(&display, &data, &fonts)?;
    let path = write_image(&output_dir, "demo", &jpeg).await?;
    println!("Wrote {}", path.display());

    Ok(())
}
