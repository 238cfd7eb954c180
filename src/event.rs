//! Calendar events as the layout engine sees them.
//!
//! Events come out of CalDAV as iCalendar text. Each `VEVENT` is turned into
//! a [`CalendarEvent`] whose bounds are either plain dates (all-day events) or
//! instants already converted into the dashboard's timezone.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::{CalendarDateTime, DatePerhapsTime};

use crate::error::Error;

/// Start or end of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Date-only bound (all-day events)
    Date(NaiveDate),
    /// Instant in the display timezone (timed events)
    DateTime(DateTime<Tz>),
}

/// A calendar event ready for layout.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Event start
    pub start: EventTime,
    /// Event end (exclusive for all-day events)
    pub end: EventTime,
    /// Display name (`SUMMARY`)
    pub title: String,
    /// Color tag of the calendar the event came from (0-5)
    pub color: u8,
}

impl CalendarEvent {
    /// Create a timed event.
    pub fn timed(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        title: impl Into<String>,
        color: u8,
    ) -> Self {
        Self {
            start: EventTime::DateTime(start),
            end: EventTime::DateTime(end),
            title: title.into(),
            color,
        }
    }

    /// Create an all-day event. `end` is exclusive, as in iCalendar.
    pub fn all_day(start: NaiveDate, end: NaiveDate, title: impl Into<String>, color: u8) -> Self {
        Self {
            start: EventTime::Date(start),
            end: EventTime::Date(end),
            title: title.into(),
            color,
        }
    }

    /// Whether the event has date-only bounds.
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }
}

/// Parse every `VEVENT` in an iCalendar document.
///
/// Events that cannot be interpreted are logged and skipped; they never
/// abort the run.
pub fn parse_events(ics: &str, color: u8, tz: Tz) -> Vec<CalendarEvent> {
    let unfolded = unfold(ics);
    let calendar = match read_calendar(&unfolded) {
        Ok(calendar) => calendar,
        Err(e) => {
            tracing::warn!("Skipping unparseable calendar resource: {}", e);
            return Vec::new();
        }
    };

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(|vevent| match parse_vevent(vevent, color, tz) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Error processing event: {}", e);
                None
            }
        })
        .collect()
}

/// Convert a single `VEVENT` component.
pub fn parse_vevent(vevent: &Component<'_>, color: u8, tz: Tz) -> Result<CalendarEvent, Error> {
    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string().replace('\n', " "))
        .unwrap_or_default();

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| Error::Event(format!("'{}' has no DTSTART", title)))?;
    let start = DatePerhapsTime::try_from(dtstart)
        .map_err(|_| Error::Event(format!("'{}' has a malformed DTSTART", title)))?;
    let start = to_event_time(start, tz)?;

    let end = match vevent.find_prop("DTEND") {
        Some(dtend) => {
            let end = DatePerhapsTime::try_from(dtend)
                .map_err(|_| Error::Event(format!("'{}' has a malformed DTEND", title)))?;
            to_event_time(end, tz)?
        }
        // RFC 5545: a date-only event without DTEND lasts one day,
        // a timed one ends when it starts
        None => match start {
            EventTime::Date(d) => EventTime::Date(d + Days::new(1)),
            EventTime::DateTime(_) => start,
        },
    };

    match (&start, &end) {
        (EventTime::Date(_), EventTime::Date(_))
        | (EventTime::DateTime(_), EventTime::DateTime(_)) => {}
        _ => {
            return Err(Error::Event(format!(
                "'{}' mixes date and date-time bounds",
                title
            )))
        }
    }

    Ok(CalendarEvent {
        start,
        end,
        title,
        color,
    })
}

fn to_event_time(value: DatePerhapsTime, tz: Tz) -> Result<EventTime, Error> {
    let instant = match value {
        DatePerhapsTime::Date(d) => return Ok(EventTime::Date(d)),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt.with_timezone(&tz),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => localize(naive, tz)?,
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(source_tz) => localize(date_time, source_tz)?.with_timezone(&tz),
                Err(_) => {
                    tracing::debug!("Unknown TZID '{}', assuming {}", tzid, tz);
                    localize(date_time, tz)?
                }
            }
        }
    };
    Ok(EventTime::DateTime(instant))
}

/// Pin a wall-clock time to a zone. Ambiguous times take the earlier
/// instant; times inside a DST gap are rejected.
fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>, Error> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::Event(format!("{} does not exist in {}", naive, tz)))
}
