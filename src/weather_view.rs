//! Weather panel: current conditions, the next hours and a four-day outlook.
//!
//! The panel is split into three equal sections separated by 2px lines.
//! Vertical positions inside a section are given for a 144px section (the
//! 800x480 layout) and scaled to the actual section height.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

use crate::canvas::{infallible, Canvas, TriColor};
use crate::error::Error;
use crate::render::{draw_text, draw_text_centered, text_width, Fonts};
use crate::text::shorten;
use crate::weather::{compass, condition_label, DayForecast, Forecast, HourForecast};

/// Columns in the hourly strip.
pub const HOURLY_COLUMNS: usize = 7;

/// Columns in the daily outlook.
pub const DAILY_COLUMNS: usize = 4;

/// Section height the offsets below are designed for.
const REFERENCE_SECTION: i32 = 144;

/// Left edge of the current-conditions text.
const CURRENT_TEXT_X: i32 = 150;

const DOT_STEP: usize = 7;

struct Section {
    top: i32,
    height: i32,
}

impl Section {
    fn y(&self, offset: i32) -> i32 {
        self.top + offset * self.height / REFERENCE_SECTION
    }
}

/// Draw the weather panel into a canvas of `size`.
pub fn render_weather(forecast: &Forecast, size: Size, fonts: &Fonts) -> Result<Canvas, Error> {
    let mut canvas = Canvas::new(size.width, size.height);
    let width = size.width as i32;
    let section_height = (size.height / 3) as i32;

    let separator = PrimitiveStyle::with_fill(TriColor::Black);
    for y in [section_height, 2 * section_height] {
        infallible(
            Rectangle::new(Point::new(0, y), Size::new(size.width, 2))
                .into_styled(separator)
                .draw(&mut canvas),
        );
    }

    let section = |i: i32| Section {
        top: i * section_height,
        height: section_height,
    };

    draw_current(&mut canvas, forecast, &section(0), fonts)?;
    draw_hourly(&mut canvas, &forecast.next_hours(HOURLY_COLUMNS)?, &section(1), width, fonts);
    draw_daily(&mut canvas, &forecast.days(DAILY_COLUMNS)?, &section(2), width, fonts);

    Ok(canvas)
}

fn draw_current(
    canvas: &mut Canvas,
    forecast: &Forecast,
    section: &Section,
    fonts: &Fonts,
) -> Result<(), Error> {
    let current = &forecast.current;
    let large = fonts.header;
    let body = fonts.weather;

    let label = condition_label(current.weather_code, current.is_day == 1);
    let label = shorten(label, (CURRENT_TEXT_X - 20) as u32, |s| text_width(s, large));
    draw_text(canvas, &label, Point::new(10, section.y(15)), large);

    draw_text(
        canvas,
        &format!("{:.1}°C", current.temperature_2m),
        Point::new(CURRENT_TEXT_X, section.y(15)),
        large,
    );
    draw_text(
        canvas,
        &format!(
            "Wind: {:.1} km/h {}",
            current.wind_speed_10m,
            compass(current.wind_direction_10m)
        ),
        Point::new(CURRENT_TEXT_X, section.y(50)),
        body,
    );
    draw_text(
        canvas,
        &format!("Precipitation: {}", percent(current.precipitation_probability)),
        Point::new(CURRENT_TEXT_X, section.y(75)),
        body,
    );

    let (sunrise, sunset) = forecast.sun_times()?;
    draw_text(
        canvas,
        &format!("Sunrise: {} | Sunset: {}", sunrise, sunset),
        Point::new(CURRENT_TEXT_X, section.y(100)),
        body,
    );
    Ok(())
}

fn draw_hourly(
    canvas: &mut Canvas,
    hours: &[HourForecast],
    section: &Section,
    width: i32,
    fonts: &Fonts,
) {
    let font = fonts.weather;
    let column_width = width / HOURLY_COLUMNS as i32;

    for i in 1..HOURLY_COLUMNS as i32 {
        canvas.dotted_vline(
            i * column_width,
            section.top,
            section.top + section.height,
            DOT_STEP,
        );
    }

    // the hourly strip hugs the separator above it
    let top = Section {
        top: section.top - 2,
        height: section.height,
    };
    for (i, hour) in hours.iter().enumerate() {
        let x = i as i32 * column_width + column_width / 2;
        let fit = |s: &str| shorten(s, (column_width - 4).max(0) as u32, |t| text_width(t, font));

        let lines = [
            (10, hour.time.format("%H:%M").to_string()),
            (45, fit(condition_label(hour.weather_code, true))),
            (90, format!("{:.1}°C", hour.temperature)),
            (110, format!("{:.0} km/h", hour.wind_speed)),
            (130, percent(hour.precipitation)),
        ];
        for (offset, text) in lines {
            draw_text_centered(canvas, &text, Point::new(x, top.y(offset)), font);
        }
    }
}

fn draw_daily(
    canvas: &mut Canvas,
    days: &[DayForecast],
    section: &Section,
    width: i32,
    fonts: &Fonts,
) {
    let font = fonts.weather;
    let column_width = width / DAILY_COLUMNS as i32;

    for i in 1..DAILY_COLUMNS as i32 {
        canvas.dotted_vline(
            i * column_width,
            section.top,
            section.top + section.height,
            DOT_STEP,
        );
    }

    let top = Section {
        top: section.top + 5,
        height: section.height,
    };
    for (i, day) in days.iter().enumerate() {
        let x = i as i32 * column_width + column_width / 2;
        let fit = |s: &str| shorten(s, (column_width - 4).max(0) as u32, |t| text_width(t, font));

        let lines = [
            (10, day.date.format("%a %d.%m").to_string()),
            (50, fit(condition_label(day.weather_code, true))),
            (
                95,
                fit(&format!(
                    "{:.1}°C-{:.1}°C",
                    day.temperature_min, day.temperature_max
                )),
            ),
            (120, format!("Precip: {}", percent(day.precipitation))),
        ];
        for (offset, text) in lines {
            draw_text_centered(canvas, &text, Point::new(x, top.y(offset)), font);
        }
    }
}

fn percent(value: Option<u8>) -> String {
    match value {
        Some(v) => format!("{}%", v),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontConfig;

    const FORECAST: &str = r#"{
        "current": {
            "time": "2024-03-11T22:15", "is_day": 0, "temperature_2m": 6.4,
            "weather_code": 3, "wind_speed_10m": 14.2, "wind_direction_10m": 251,
            "precipitation_probability": 20
        },
        "hourly": {
            "time": ["2024-03-11T22:00", "2024-03-11T23:00", "2024-03-12T00:00"],
            "temperature_2m": [6.5, 6.1, 5.8],
            "weather_code": [3, 61, 61],
            "wind_speed_10m": [14.0, 13.1, 12.0],
            "precipitation_probability": [20, 60, null]
        },
        "daily": {
            "time": ["2024-03-11", "2024-03-12", "2024-03-13", "2024-03-14", "2024-03-15"],
            "weather_code": [61, 3, 0, 1, 2],
            "temperature_2m_max": [11.2, 9.8, 12.0, 13.5, 10.0],
            "temperature_2m_min": [4.1, 3.0, 2.5, 5.0, 4.4],
            "precipitation_probability_max": [80, 35, 0, 5, 10],
            "sunrise": ["2024-03-11T06:32", "2024-03-12T06:30", "2024-03-13T06:28", "2024-03-14T06:26", "2024-03-15T06:24"],
            "sunset": ["2024-03-11T18:07", "2024-03-12T18:09", "2024-03-13T18:11", "2024-03-14T18:12", "2024-03-15T18:14"]
        }
    }"#;

    fn fonts() -> Fonts {
        Fonts::from_config(&FontConfig::default()).unwrap()
    }

    #[test]
    fn test_render_weather_sections() {
        let forecast = Forecast::from_json(FORECAST).unwrap();
        let canvas = render_weather(&forecast, Size::new(500, 432), &fonts()).unwrap();

        // 2px separators
        assert_eq!(canvas.pixel(5, 144), Some(TriColor::Black));
        assert_eq!(canvas.pixel(5, 145), Some(TriColor::Black));
        assert_eq!(canvas.pixel(5, 288), Some(TriColor::Black));
        // dotted divider between the first two hourly columns
        assert_eq!(canvas.pixel(71, 151), Some(TriColor::Black));
        assert_eq!(canvas.pixel(71, 152), Some(TriColor::White));
        // dotted divider in the daily outlook
        assert_eq!(canvas.pixel(125, 288 + 14), Some(TriColor::Black));
    }

    #[test]
    fn test_render_weather_small_panel() {
        let forecast = Forecast::from_json(FORECAST).unwrap();
        let canvas = render_weather(&forecast, Size::new(185, 116), &fonts()).unwrap();
        assert_eq!(canvas.width(), 185);
    }

    #[test]
    fn test_section_scaling() {
        let section = Section {
            top: 100,
            height: 72,
        };
        assert_eq!(section.y(0), 100);
        assert_eq!(section.y(144), 172);
        assert_eq!(section.y(50), 125);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(Some(40)), "40%");
        assert_eq!(percent(None), "-");
    }
}
