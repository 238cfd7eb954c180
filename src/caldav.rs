//! CalDAV calendar source.
//!
//! Discovery walks the usual chain of WebDAV properties:
//!
//! 1. `current-user-principal` on the configured URL (Depth 0)
//! 2. `calendar-home-set` on the principal (Depth 0)
//! 3. `displayname` + `resourcetype` of every collection in the home set (Depth 1)
//!
//! Events are then fetched per calendar with a `calendar-query` REPORT
//! restricted to a time range, with recurrences expanded by the server.
//!
//! Response parsing is kept in pure functions over the multistatus XML so it
//! can be tested without a server. Elements are matched by local name; the
//! namespace prefixes servers choose vary too much to rely on.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::{Method, Url};

use crate::config::{CalDavConfig, CalendarConfig};
use crate::error::Error;
use crate::event::{parse_events, CalendarEvent};
use crate::DEFAULT_TIMEOUT_SECS;

const PRINCIPAL_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:current-user-principal/>
  </d:prop>
</d:propfind>"#;

const HOME_SET_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <c:calendar-home-set/>
  </d:prop>
</d:propfind>"#;

const COLLECTIONS_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:displayname/>
    <d:resourcetype/>
  </d:prop>
</d:propfind>"#;

/// A calendar collection found in the home set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCollection {
    /// Absolute URL of the collection
    pub url: String,
    /// Display name
    pub name: String,
}

/// Async CalDAV client with basic auth.
#[derive(Debug, Clone)]
pub struct CalDavClient {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl CalDavClient {
    /// Create a client for an account.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create a client from the `caldav` config section.
    pub fn from_config(config: &CalDavConfig) -> Self {
        Self::new(&config.url, &config.username, &config.password)
    }

    /// Find all calendar collections of the current user.
    pub async fn discover_calendars(&self) -> Result<Vec<CalendarCollection>, Error> {
        let body = self.propfind(&self.url, "0", PRINCIPAL_BODY).await?;
        let principal = match parse_href_property(&body, "current-user-principal")? {
            Some(href) => resolve_href(&self.url, &href)?,
            None => self.url.clone(),
        };
        tracing::debug!("CalDAV principal: {}", principal);

        let body = self.propfind(&principal, "0", HOME_SET_BODY).await?;
        let home = match parse_href_property(&body, "calendar-home-set")? {
            Some(href) => resolve_href(&principal, &href)?,
            None => principal,
        };
        tracing::debug!("CalDAV calendar home: {}", home);

        let body = self.propfind(&home, "1", COLLECTIONS_BODY).await?;
        parse_calendar_collections(&body)?
            .into_iter()
            .map(|(href, name)| {
                Ok(CalendarCollection {
                    url: resolve_href(&home, &href)?,
                    name,
                })
            })
            .collect()
    }

    /// Fetch the iCalendar resources of one calendar that touch `[start, end]`.
    pub async fn fetch_resources(
        &self,
        calendar: &CalendarCollection,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, Error> {
        let body = calendar_query_body(start, end);
        let response = self.request("REPORT", &calendar.url, "1", body).await?;
        parse_calendar_data(&response)
    }

    /// Fetch events of the configured calendars in `[start, end]`.
    ///
    /// Configured calendars that do not exist on the server are logged and
    /// skipped. Each event gets the color of the calendar it came from.
    pub async fn fetch_events(
        &self,
        calendars: &[CalendarConfig],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: Tz,
    ) -> Result<Vec<CalendarEvent>, Error> {
        let discovered = self.discover_calendars().await?;
        tracing::debug!("Found {} calendar collections", discovered.len());

        let mut events = Vec::new();
        for (collection, color) in match_calendars(calendars, &discovered) {
            let resources = self.fetch_resources(collection, start, end).await?;
            tracing::debug!(
                "Calendar '{}': {} resources",
                collection.name,
                resources.len()
            );
            for ics in &resources {
                events.extend(parse_events(ics, color, tz));
            }
        }

        Ok(events)
    }

    async fn propfind(&self, url: &str, depth: &str, body: &str) -> Result<String, Error> {
        self.request("PROPFIND", url, depth, body.to_string()).await
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        depth: &str,
        body: String,
    ) -> Result<String, Error> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| Error::Request(format!("Invalid method {}: {}", method, e)))?;
        tracing::debug!("{} {} (Depth {})", method, url, depth);

        let response = self
            .http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", depth)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        Ok(response.text().await?)
    }
}

/// Pair configured calendars with discovered collections by display name.
pub fn match_calendars<'a>(
    configured: &[CalendarConfig],
    discovered: &'a [CalendarCollection],
) -> Vec<(&'a CalendarCollection, u8)> {
    configured
        .iter()
        .filter_map(|wanted| {
            let found = discovered.iter().find(|c| c.name == wanted.name);
            if found.is_none() {
                tracing::warn!("Calendar '{}' not found.", wanted.name);
            }
            found.map(|c| (c, wanted.color))
        })
        .collect()
}

/// CalDAV UTC timestamp, e.g. `20240311T000000Z`.
pub fn format_caldav_time(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn calendar_query_body(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let start = format_caldav_time(start);
    let end = format_caldav_time(end);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:getetag/>
    <c:calendar-data>
      <c:expand start="{start}" end="{end}"/>
    </c:calendar-data>
  </d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VEVENT">
        <c:time-range start="{start}" end="{end}"/>
      </c:comp-filter>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#
    )
}

/// Resolve a (usually path-only) href against the URL it was returned for.
pub fn resolve_href(base: &str, href: &str) -> Result<String, Error> {
    let base = Url::parse(base).map_err(|e| Error::Config(format!("Invalid URL '{}': {}", base, e)))?;
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| Error::schema("CalDAV href", format!("'{}': {}", href, e)))
}

fn parse_multistatus(xml: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse(xml).map_err(|e| Error::schema("CalDAV multistatus", e))
}

fn local<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// The `href` inside a property such as `current-user-principal`.
///
/// Returns `None` when the server does not report the property.
pub fn parse_href_property(xml: &str, property: &str) -> Result<Option<String>, Error> {
    let doc = parse_multistatus(xml)?;
    let href = doc
        .descendants()
        .filter(|n| local(*n, property))
        .flat_map(|prop| prop.descendants())
        .find(|n| local(*n, "href"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(href)
}

/// `(href, displayname)` of every calendar collection in a Depth 1 listing.
///
/// Responses whose `resourcetype` does not contain `calendar` (the home set
/// itself, address books, inboxes) are left out. Calendars without a display
/// name are named after the last path segment of their href.
pub fn parse_calendar_collections(xml: &str) -> Result<Vec<(String, String)>, Error> {
    let doc = parse_multistatus(xml)?;
    let mut calendars = Vec::new();

    for response in doc.descendants().filter(|n| local(*n, "response")) {
        let Some(href) = response
            .children()
            .find(|n| local(*n, "href"))
            .and_then(|n| n.text())
            .map(str::trim)
        else {
            continue;
        };

        let is_calendar = response
            .descendants()
            .filter(|n| local(*n, "resourcetype"))
            .flat_map(|rt| rt.children())
            .any(|n| local(n, "calendar"));
        if !is_calendar {
            continue;
        }

        let name = response
            .descendants()
            .find(|n| local(*n, "displayname"))
            .and_then(|n| n.text())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                href.trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or(href)
                    .to_string()
            });

        calendars.push((href.to_string(), name));
    }

    Ok(calendars)
}

/// Every `calendar-data` payload in a REPORT response.
pub fn parse_calendar_data(xml: &str) -> Result<Vec<String>, Error> {
    let doc = parse_multistatus(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| local(*n, "calendar-data"))
        .filter_map(|n| n.text())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PRINCIPAL_RESPONSE: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/remote.php/dav/</d:href>
    <d:propstat>
      <d:prop>
        <d:current-user-principal><d:href>/remote.php/dav/principals/users/me/</d:href></d:current-user-principal>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    const MISSING_PROPERTY: &str = r#"<?xml version="1.0"?>
<multistatus xmlns="DAV:">
  <response>
    <href>/dav/</href>
    <propstat>
      <prop><current-user-principal/></prop>
      <status>HTTP/1.1 404 Not Found</status>
    </propstat>
  </response>
</multistatus>"#;

    const COLLECTIONS: &str = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/cal/me/</D:href>
    <D:propstat><D:prop>
      <D:displayname>Home</D:displayname>
      <D:resourcetype><D:collection/></D:resourcetype>
    </D:prop></D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/me/personal/</D:href>
    <D:propstat><D:prop>
      <D:displayname>Personal</D:displayname>
      <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
    </D:prop></D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/me/work-2/</D:href>
    <D:propstat><D:prop>
      <D:displayname/>
      <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
    </D:prop></D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/me/inbox/</D:href>
    <D:propstat><D:prop>
      <D:displayname>Inbox</D:displayname>
      <D:resourcetype><D:collection/><C:schedule-inbox/></D:resourcetype>
    </D:prop></D:propstat>
  </D:response>
</D:multistatus>"#;

    const REPORT: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/cal/me/personal/a.ics</d:href>
    <d:propstat><d:prop>
      <d:getetag>"1"</d:getetag>
      <cal:calendar-data>BEGIN:VCALENDAR&#13;
VERSION:2.0&#13;
END:VCALENDAR&#13;
</cal:calendar-data>
    </d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/me/personal/b.ics</d:href>
    <d:propstat><d:prop><d:getetag>"2"</d:getetag></d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn test_parse_principal_href() {
        assert_eq!(
            parse_href_property(PRINCIPAL_RESPONSE, "current-user-principal").unwrap(),
            Some("/remote.php/dav/principals/users/me/".to_string())
        );
    }

    #[test]
    fn test_missing_property_falls_back() {
        assert_eq!(
            parse_href_property(MISSING_PROPERTY, "current-user-principal").unwrap(),
            None
        );
        assert_eq!(
            parse_href_property(PRINCIPAL_RESPONSE, "calendar-home-set").unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_calendar_collections() {
        let calendars = parse_calendar_collections(COLLECTIONS).unwrap();
        assert_eq!(
            calendars,
            vec![
                ("/cal/me/personal/".to_string(), "Personal".to_string()),
                ("/cal/me/work-2/".to_string(), "work-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_calendar_data() {
        let data = parse_calendar_data(REPORT).unwrap();
        assert_eq!(data.len(), 1);
        assert!(data[0].starts_with("BEGIN:VCALENDAR"));
    }

    #[test]
    fn test_invalid_xml_is_schema_error() {
        let err = parse_calendar_data("<multistatus").unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(
            resolve_href("https://dav.example.com/remote.php/dav", "/cal/me/").unwrap(),
            "https://dav.example.com/cal/me/"
        );
        assert_eq!(
            resolve_href("https://dav.example.com/", "https://other.example.com/x/").unwrap(),
            "https://other.example.com/x/"
        );
        assert!(resolve_href("not a url", "/x").is_err());
    }

    #[test]
    fn test_format_caldav_time() {
        let t = Utc.with_ymd_and_hms(2024, 3, 11, 23, 5, 9).unwrap();
        assert_eq!(format_caldav_time(t), "20240311T230509Z");
    }

    #[test]
    fn test_query_body_has_range_and_expand() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 13, 22, 59, 59).unwrap();
        let body = calendar_query_body(start, end);
        assert!(body.contains(r#"<c:time-range start="20240310T230000Z" end="20240313T225959Z"/>"#));
        assert!(body.contains(r#"<c:expand start="20240310T230000Z""#));
        assert!(roxmltree::Document::parse(&body).is_ok());
    }

    #[test]
    fn test_match_calendars_by_name() {
        let discovered = vec![
            CalendarCollection {
                url: "https://dav/a/".into(),
                name: "Work".into(),
            },
            CalendarCollection {
                url: "https://dav/b/".into(),
                name: "Personal".into(),
            },
        ];
        let configured = vec![
            CalendarConfig {
                name: "Personal".into(),
                color: 2,
            },
            CalendarConfig {
                name: "Missing".into(),
                color: 1,
            },
            CalendarConfig {
                name: "Work".into(),
                color: 4,
            },
        ];

        let matched: Vec<(&str, u8)> = match_calendars(&configured, &discovered)
            .into_iter()
            .map(|(c, color)| (c.name.as_str(), color))
            .collect();
        assert_eq!(matched, vec![("Personal", 2), ("Work", 4)]);
    }
}
