//! Dashboard rendering.
//!
//! The dashboard is composed of three panels drawn on their own canvases and
//! pasted onto a canvas the size of the tag:
//!
//! ```text
//! +----------------------+-----------+
//! | header (date)        |           |
//! +----------------------+  agenda   |
//! |                      |  (today,  |
//! | weather              | tomorrow) |
//! |                      |           |
//! +----------------------+-----------+
//! ```
//!
//! For an 800x480 tag the header is 500x48, the agenda 300x480 and the
//! weather panel 500x432.
//!
//! Text uses the ISO-8859-1 monospace fonts of embedded-graphics, picked by
//! name (`"6x10"`, `"10x20"`, ...).

use chrono::NaiveDate;
use embedded_graphics::mono_font::{iso_8859_1, MonoFont, MonoTextStyle};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::renderer::TextRenderer;
use embedded_graphics::text::{Baseline, Text};

use crate::agenda_view::render_agenda;
use crate::canvas::{infallible, Canvas, Fill, TriColor};
use crate::config::FontConfig;
use crate::error::Error;
use crate::event::CalendarEvent;
use crate::layout::DayWindow;
use crate::weather::Forecast;
use crate::weather_view::render_weather;

/// Header background: accent dithered with white.
pub const HEADER_FILL: u8 = 5;

/// Corner radius of the header box.
pub const HEADER_RADIUS: u32 = 10;

/// Date format in the header.
pub const HEADER_DATE_FORMAT: &str = "%d.%m.%Y";

/// Font name → font table.
const FONTS: &[(&str, &MonoFont<'static>)] = &[
    ("4x6", &iso_8859_1::FONT_4X6),
    ("5x7", &iso_8859_1::FONT_5X7),
    ("5x8", &iso_8859_1::FONT_5X8),
    ("6x9", &iso_8859_1::FONT_6X9),
    ("6x10", &iso_8859_1::FONT_6X10),
    ("6x12", &iso_8859_1::FONT_6X12),
    ("6x13", &iso_8859_1::FONT_6X13),
    ("6x13-bold", &iso_8859_1::FONT_6X13_BOLD),
    ("7x13", &iso_8859_1::FONT_7X13),
    ("7x13-bold", &iso_8859_1::FONT_7X13_BOLD),
    ("7x14", &iso_8859_1::FONT_7X14),
    ("7x14-bold", &iso_8859_1::FONT_7X14_BOLD),
    ("8x13", &iso_8859_1::FONT_8X13),
    ("8x13-bold", &iso_8859_1::FONT_8X13_BOLD),
    ("9x15", &iso_8859_1::FONT_9X15),
    ("9x15-bold", &iso_8859_1::FONT_9X15_BOLD),
    ("9x18", &iso_8859_1::FONT_9X18),
    ("9x18-bold", &iso_8859_1::FONT_9X18_BOLD),
    ("10x20", &iso_8859_1::FONT_10X20),
];

/// Look up a monospace font by name.
///
/// ```
/// use oepl_dashboard::render::font_by_name;
///
/// assert_eq!(font_by_name("10x20").unwrap().character_size.height, 20);
/// assert!(font_by_name("Arial").is_err());
/// ```
pub fn font_by_name(name: &str) -> Result<&'static MonoFont<'static>, Error> {
    let wanted = name.trim().to_ascii_lowercase();
    FONTS
        .iter()
        .find(|(font_name, _)| *font_name == wanted)
        .map(|(_, font)| *font)
        .ok_or_else(|| {
            let known: Vec<&str> = FONTS.iter().map(|(n, _)| *n).collect();
            Error::Config(format!(
                "Unknown font '{}', expected one of {}",
                name,
                known.join(", ")
            ))
        })
}

/// Resolved fonts for the three panels.
#[derive(Clone, Copy)]
pub struct Fonts {
    /// Header date and current-conditions headline
    pub header: &'static MonoFont<'static>,
    /// Weekday names and event titles
    pub calendar: &'static MonoFont<'static>,
    /// Weather details
    pub weather: &'static MonoFont<'static>,
}

impl Fonts {
    /// Resolve the configured font names.
    pub fn from_config(config: &FontConfig) -> Result<Self, Error> {
        Ok(Self {
            header: font_by_name(&config.header)?,
            calendar: font_by_name(&config.calendar)?,
            weather: font_by_name(&config.weather)?,
        })
    }
}

impl std::fmt::Debug for Fonts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = |font: &MonoFont<'_>| {
            format!(
                "{}x{}",
                font.character_size.width, font.character_size.height
            )
        };
        f.debug_struct("Fonts")
            .field("header", &size(self.header))
            .field("calendar", &size(self.calendar))
            .field("weather", &size(self.weather))
            .finish()
    }
}

fn style(font: &'static MonoFont<'static>) -> MonoTextStyle<'static, TriColor> {
    MonoTextStyle::new(font, TriColor::Black)
}

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str, font: &'static MonoFont<'static>) -> u32 {
    style(font)
        .measure_string(text, Point::zero(), Baseline::Top)
        .bounding_box
        .size
        .width
}

/// Draw black text with its top-left corner at `top_left`.
pub fn draw_text(canvas: &mut Canvas, text: &str, top_left: Point, font: &'static MonoFont<'static>) {
    let text = Text::with_baseline(text, top_left, style(font), Baseline::Top);
    infallible(text.draw(canvas));
}

/// Draw black text centered on `center`, horizontally and vertically.
pub fn draw_text_centered(
    canvas: &mut Canvas,
    text: &str,
    center: Point,
    font: &'static MonoFont<'static>,
) {
    let width = text_width(text, font) as i32;
    let height = font.character_size.height as i32;
    draw_text(
        canvas,
        text,
        center - Point::new(width / 2, height / 2),
        font,
    );
}

/// Where each panel goes on the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardGeometry {
    /// Date header, top left
    pub header: Rectangle,
    /// Agenda, full height on the right
    pub calendar: Rectangle,
    /// Weather panel below the header
    pub weather: Rectangle,
}

impl DashboardGeometry {
    /// Split a `width` x `height` tag into panels.
    ///
    /// ```
    /// use embedded_graphics::prelude::*;
    /// use oepl_dashboard::render::DashboardGeometry;
    ///
    /// let geometry = DashboardGeometry::for_display(800, 480);
    /// assert_eq!(geometry.header.size, Size::new(500, 48));
    /// assert_eq!(geometry.calendar.top_left, Point::new(500, 0));
    /// assert_eq!(geometry.weather.size, Size::new(500, 432));
    /// ```
    pub fn for_display(width: u32, height: u32) -> Self {
        let left_width = width * 5 / 8;
        let header_height = height / 10;

        Self {
            header: Rectangle::new(Point::zero(), Size::new(left_width, header_height)),
            calendar: Rectangle::new(
                Point::new(left_width as i32, 0),
                Size::new(width - left_width, height),
            ),
            weather: Rectangle::new(
                Point::new(0, header_height as i32),
                Size::new(left_width, height - header_height),
            ),
        }
    }
}

/// Header panel: the date on a dithered rounded box.
pub fn render_header(date: NaiveDate, size: Size, font: &'static MonoFont<'static>) -> Canvas {
    let mut canvas = Canvas::new(size.width, size.height);
    let right = size.width as i32 - 1;
    let bottom = size.height as i32 - 1;

    canvas.rounded_block(
        Point::new(1, 1),
        Point::new(right, bottom),
        HEADER_RADIUS,
        Fill::from_tag(HEADER_FILL),
        2,
    );

    let label = date.format(HEADER_DATE_FORMAT).to_string();
    let y = (size.height as i32 - font.character_size.height as i32) / 2;
    draw_text(&mut canvas, &label, Point::new(15, y.max(0)), font);

    canvas
}

/// Everything a dashboard shows.
#[derive(Debug, Clone, Copy)]
pub struct DashboardData<'a> {
    /// Date in the header
    pub date: NaiveDate,
    /// Agenda columns
    pub window: DayWindow,
    /// Events of all configured calendars
    pub events: &'a [CalendarEvent],
    /// Weather forecast
    pub forecast: &'a Forecast,
}

/// Render the whole dashboard for a `width` x `height` tag.
pub fn render_dashboard(
    width: u32,
    height: u32,
    data: &DashboardData<'_>,
    fonts: &Fonts,
) -> Result<Canvas, Error> {
    let geometry = DashboardGeometry::for_display(width, height);
    let mut canvas = Canvas::new(width, height);

    tracing::info!("Drawing Date");
    let header = render_header(data.date, geometry.header.size, fonts.header);
    paste(&mut canvas, &header, geometry.header);

    tracing::info!("Drawing calendar");
    let agenda = render_agenda(data.events, &data.window, geometry.calendar.size, fonts.calendar);
    paste(&mut canvas, &agenda, geometry.calendar);

    tracing::info!("Drawing weather");
    let weather = render_weather(data.forecast, geometry.weather.size, fonts)?;
    paste(&mut canvas, &weather, geometry.weather);

    Ok(canvas)
}

fn paste(canvas: &mut Canvas, panel: &Canvas, area: Rectangle) {
    canvas.paste(panel, area.top_left.x, area.top_left.y);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_lookup_is_case_insensitive() {
        let font = font_by_name(" 6X10 ").unwrap();
        assert_eq!(font.character_size, Size::new(6, 10));
    }

    #[test]
    fn test_unknown_font_lists_known_names() {
        let err = font_by_name("Comic Sans").unwrap_err();
        assert!(err.to_string().contains("10x20"));
    }

    #[test]
    fn test_text_width_is_monospace() {
        let font = font_by_name("6x10").unwrap();
        assert_eq!(text_width("Lunch", font), 30);
        assert_eq!(text_width("", font), 0);
        assert_eq!(text_width("ü°", font), 12);
    }

    #[test]
    fn test_default_fonts_resolve() {
        assert!(Fonts::from_config(&FontConfig::default()).is_ok());
    }

    #[test]
    fn test_geometry_small_tag() {
        let geometry = DashboardGeometry::for_display(296, 128);
        assert_eq!(geometry.header.size, Size::new(185, 12));
        assert_eq!(geometry.calendar.size, Size::new(111, 128));
        assert_eq!(geometry.weather.top_left, Point::new(0, 12));
    }

    #[test]
    fn test_header_has_outline_and_dithered_fill() {
        let font = font_by_name("10x20").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let header = render_header(date, Size::new(500, 48), font);

        // outline runs along the top edge
        assert_eq!(header.pixel(250, 1), Some(TriColor::Black));
        // 1px margin stays white
        assert_eq!(header.pixel(250, 0), Some(TriColor::White));
        // inside, right of the text: checkerboard of accent and white
        let a = header.pixel(400, 10).unwrap();
        let b = header.pixel(401, 10).unwrap();
        assert_ne!(a, b);
        assert!(a == TriColor::Accent || b == TriColor::Accent);
    }
}
