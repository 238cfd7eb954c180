//! Two-day agenda layout.
//!
//! The agenda shows "today" and "tomorrow" side by side on an hour grid.
//! Grid row 0 holds the weekday names, rows 1-3 hold up to three all-day
//! lanes, and timed events start at row 3 (midnight) with one row per hour.
//!
//! Layout happens in three steps:
//!
//! 1. [`segment_events`] splits multi-day events into single-day segments.
//!    Only a two-day window is ever shown, so events longer than two days
//!    are cut down to their first two days.
//! 2. [`DayWindow::column_for`] assigns each segment to a column and drops
//!    segments outside the window.
//! 3. [`layout`] places all-day segments into lanes and timed segments on the
//!    hour grid. Timed segments that overlap a neighbour (in start order) get
//!    half the column, alternating left and right.
//!
//! The overlap pass only compares neighbours in start order, so three events
//! overlapping at the same time do not get three slots: the third re-uses a
//! half that is already taken.
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, TimeZone};
//! use chrono_tz::Europe::Berlin;
//! use oepl_dashboard::event::CalendarEvent;
//! use oepl_dashboard::layout::{layout, Column, DayWindow, Half};
//!
//! let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
//! let at = |h, m| Berlin.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap();
//!
//! let events = vec![
//!     CalendarEvent::timed(at(9, 0), at(10, 0), "Standup", 1),
//!     CalendarEvent::timed(at(9, 30), at(10, 30), "Interview", 2),
//! ];
//!
//! let blocks = layout(&events, &DayWindow::new(today));
//! assert_eq!(blocks[0].half, Half::Left);
//! assert_eq!(blocks[1].half, Half::Right);
//! assert!(blocks.iter().all(|b| b.column == Column::Today));
//! ```

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::event::{CalendarEvent, EventTime};
use crate::text;

/// Grid rows above midnight (weekday header and all-day lanes).
pub const RESERVED_ROWS: f32 = 3.0;

/// Maximum all-day lanes per column.
pub const ALL_DAY_LANES: usize = 3;

/// Horizontal text padding inside a block, in pixels.
pub const TITLE_PADDING: u32 = 20;

/// Which day column a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Left column
    Today,
    /// Right column
    Tomorrow,
}

impl Column {
    /// Zero-based column index.
    pub fn index(self) -> u32 {
        match self {
            Column::Today => 0,
            Column::Tomorrow => 1,
        }
    }
}

/// Horizontal extent of a block within its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    /// Whole column width
    Full,
    /// Left half of the column
    Left,
    /// Right half of the column
    Right,
}

impl Half {
    fn flip(self) -> Self {
        match self {
            Half::Left => Half::Right,
            _ => Half::Left,
        }
    }
}

/// Kind of event a block was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// All-day lane
    AllDay,
    /// Timed event on the hour grid
    Timed,
}

/// A positioned block on the agenda grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBlock {
    /// Day column
    pub column: Column,
    /// All-day lane or timed block
    pub kind: BlockKind,
    /// Vertical extent `(start, end)` in grid units
    pub span: (f32, f32),
    /// Horizontal extent within the column
    pub half: Half,
    /// Title, shortened by [`fit_titles`] to the space available
    pub title: String,
    /// Calendar color tag
    pub color: u8,
}

impl LayoutBlock {
    /// Width available for the title in a column of `column_width` pixels.
    pub fn title_width(&self, column_width: u32) -> u32 {
        let width = match self.half {
            Half::Full => column_width,
            Half::Left | Half::Right => column_width / 2,
        };
        width.saturating_sub(TITLE_PADDING)
    }
}

/// The two days shown on the agenda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// First column
    pub today: NaiveDate,
    /// Second column
    pub tomorrow: NaiveDate,
}

impl DayWindow {
    /// Window starting on `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            tomorrow: today + Days::new(1),
        }
    }

    /// Column for a segment on `date`, or `None` if the date is outside the window.
    pub fn column_for(&self, date: NaiveDate) -> Option<Column> {
        if date == self.today {
            Some(Column::Today)
        } else if date == self.tomorrow {
            Some(Column::Tomorrow)
        } else {
            None
        }
    }
}

/// Single-day piece of a timed event.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSegment {
    /// Segment start
    pub start: DateTime<Tz>,
    /// Segment end, on the same calendar day as `start`
    pub end: DateTime<Tz>,
    /// Event title
    pub title: String,
    /// Color tag
    pub color: u8,
}

/// Single-day piece of an all-day event.
#[derive(Debug, Clone, PartialEq)]
pub struct AllDaySegment {
    /// The day covered
    pub day: NaiveDate,
    /// Event title
    pub title: String,
    /// Color tag
    pub color: u8,
}

/// Output of [`segment_events`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segments {
    /// Timed segments, in input order
    pub timed: Vec<TimedSegment>,
    /// All-day segments, in input order
    pub all_day: Vec<AllDaySegment>,
}

/// Split events into single-day segments.
///
/// Multi-day events become exactly two segments (first and second day);
/// anything beyond the second day is dropped.
pub fn segment_events(events: &[CalendarEvent]) -> Segments {
    let mut segments = Segments::default();

    for event in events {
        match (event.start, event.end) {
            (EventTime::DateTime(start), EventTime::DateTime(end)) => {
                segment_timed(start, end, event, &mut segments.timed);
            }
            (EventTime::Date(start), EventTime::Date(end)) => {
                segment_all_day(start, end, event, &mut segments.all_day);
            }
            _ => {
                tracing::warn!("Skipping '{}': mixed date and date-time bounds", event.title);
            }
        }
    }

    segments
}

fn segment_timed(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    event: &CalendarEvent,
    out: &mut Vec<TimedSegment>,
) {
    let tz = start.timezone();
    let first_day = start.date_naive();
    let second_day = first_day + Days::new(1);
    let first_day_end = end_of_day(first_day, &tz);

    let segment = |start, end| TimedSegment {
        start,
        end,
        title: event.title.clone(),
        color: event.color,
    };

    if end <= first_day_end + Duration::seconds(1) {
        // Single day; an end at the next midnight is drawn up to end of day
        out.push(segment(start, end.min(first_day_end)));
        return;
    }

    out.push(segment(start, first_day_end));
    out.push(segment(
        start_of_day(second_day, &tz),
        end.min(end_of_day(second_day, &tz)),
    ));
}

fn segment_all_day(
    start: NaiveDate,
    end: NaiveDate,
    event: &CalendarEvent,
    out: &mut Vec<AllDaySegment>,
) {
    // DTEND is exclusive
    let last_day = end.pred_opt().filter(|d| *d >= start).unwrap_or(start);

    out.push(AllDaySegment {
        day: start,
        title: event.title.clone(),
        color: event.color,
    });
    if last_day != start {
        out.push(AllDaySegment {
            day: start + Days::new(1),
            title: event.title.clone(),
            color: event.color,
        });
    }
}

/// First instant of `date` in `tz`.
///
/// Zones that skip midnight for DST resolve to the first valid instant after
/// the gap.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let mut local = date.and_time(NaiveTime::MIN);
    loop {
        if let Some(dt) = tz.from_local_datetime(&local).earliest() {
            return dt;
        }
        local += Duration::minutes(15);
    }
}

/// Last second of `date` in `tz`.
pub fn end_of_day(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    start_of_day(date + Days::new(1), tz) - Duration::seconds(1)
}

/// Vertical grid offset of an instant: `hour + minute / 60 + 3`.
pub fn grid_offset(time: &DateTime<Tz>) -> f32 {
    time.hour() as f32 + time.minute() as f32 / 60.0 + RESERVED_ROWS
}

/// Lay out events for the two-day window.
///
/// All-day blocks come first (in lane order), followed by timed blocks in
/// start order. Titles are not shortened; see [`fit_titles`].
pub fn layout(events: &[CalendarEvent], window: &DayWindow) -> Vec<LayoutBlock> {
    let segments = segment_events(events);
    let mut blocks = place_all_day(&segments.all_day, window);
    blocks.extend(place_timed(&segments.timed, window));
    blocks
}

/// Put all-day segments into lanes, first come first served per column.
pub fn place_all_day(segments: &[AllDaySegment], window: &DayWindow) -> Vec<LayoutBlock> {
    let mut used = [0usize; 2];
    let mut blocks = Vec::new();

    for segment in segments {
        let Some(column) = window.column_for(segment.day) else {
            continue;
        };
        let lane = &mut used[column.index() as usize];
        if *lane >= ALL_DAY_LANES {
            tracing::debug!("No free all-day lane for '{}'", segment.title);
            continue;
        }
        *lane += 1;

        let row = *lane as f32;
        blocks.push(LayoutBlock {
            column,
            kind: BlockKind::AllDay,
            span: (row, row + 1.0),
            half: Half::Full,
            title: segment.title.clone(),
            color: segment.color,
        });
    }

    blocks
}

/// Place timed segments on the hour grid and resolve overlaps.
///
/// Segments are stably sorted by start. A segment that overlaps its
/// predecessor or successor takes the half the left/right cursor points at,
/// and the cursor flips. Other segments take the full column and leave the
/// cursor alone.
pub fn place_timed(segments: &[TimedSegment], window: &DayWindow) -> Vec<LayoutBlock> {
    let mut visible: Vec<(Column, &TimedSegment)> = segments
        .iter()
        .filter_map(|s| window.column_for(s.start.date_naive()).map(|c| (c, s)))
        .collect();
    visible.sort_by_key(|(_, s)| s.start);

    let mut cursor = Half::Left;
    let mut blocks = Vec::with_capacity(visible.len());

    for (i, (column, segment)) in visible.iter().enumerate() {
        let overlaps_previous = i > 0 && visible[i - 1].1.end > segment.start;
        let overlaps_next = visible
            .get(i + 1)
            .is_some_and(|(_, next)| segment.end > next.start);

        let half = if overlaps_previous || overlaps_next {
            let half = cursor;
            cursor = cursor.flip();
            half
        } else {
            Half::Full
        };

        blocks.push(LayoutBlock {
            column: *column,
            kind: BlockKind::Timed,
            span: (grid_offset(&segment.start), grid_offset(&segment.end)),
            half,
            title: segment.title.clone(),
            color: segment.color,
        });
    }

    blocks
}

/// Shorten every block title to the width its block offers.
pub fn fit_titles<F>(blocks: &mut [LayoutBlock], column_width: u32, measure: F)
where
    F: Fn(&str) -> u32,
{
    for block in blocks {
        let width = block.title_width(column_width);
        block.title = text::shorten(&block.title, width, &measure);
    }
}
