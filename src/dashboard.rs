//! One dashboard run: fetch, lay out, render, save, upload.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::caldav::CalDavClient;
use crate::client::{AccessPoint, UPLOAD_PATH};
use crate::config::Config;
use crate::error::Error;
use crate::inventory::DisplayInfo;
use crate::layout::{end_of_day, start_of_day, DayWindow};
use crate::render::{render_dashboard, DashboardData, Fonts};
use crate::weather::WeatherClient;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Where the JPEG was written
    pub image_path: PathBuf,
    /// Whether the access point accepted the upload
    pub uploaded: bool,
}

/// Render the dashboard for the configured tag and push it to the access point.
///
/// `now` decides which days the agenda shows. Network failures are fatal;
/// an upload rejected by the access point is logged and reported through
/// [`RunReport::uploaded`].
///
/// # Example
///
/// ```rust,no_run
/// use oepl_dashboard::{config::Config, dashboard};
///
/// # async fn example() -> Result<(), oepl_dashboard::Error> {
/// let config = Config::load(Some("config.yaml"))?;
/// let now = chrono::Utc::now().with_timezone(&config.timezone);
///
/// let report = dashboard::run(&config, now).await?;
/// println!("{} (uploaded: {})", report.image_path.display(), report.uploaded);
/// # Ok(())
/// # }
/// ```
pub async fn run(config: &Config, now: DateTime<Tz>) -> Result<RunReport, Error> {
    let fonts = Fonts::from_config(&config.fonts)?;

    let ap = AccessPoint::new(&config.access_point);
    let inventory = ap.fetch_inventory().await?;
    let display = *inventory.display_for(&config.mac)?;
    tracing::info!("Generating image for tag {}", config.mac);

    let today = now.date_naive();
    let window = DayWindow::new(today);

    let (start, end) = query_range(today, &config.timezone);
    let caldav = CalDavClient::from_config(&config.caldav);
    let events = caldav
        .fetch_events(&config.caldav.calendars, start, end, config.timezone)
        .await?;
    tracing::debug!("Fetched {} events", events.len());

    let forecast = WeatherClient::new().fetch(&config.weather).await?;

    let data = DashboardData {
        date: today,
        window,
        events: &events,
        forecast: &forecast,
    };
    let jpeg = render_jpeg(&display, &data, &fonts)?;

    let image_path = write_image(&config.output_dir, &config.mac, &jpeg).await?;

    let uploaded = if config.skip_upload {
        tracing::info!("Upload skipped");
        false
    } else {
        upload(&ap, &config.mac, jpeg).await?
    };

    Ok(RunReport {
        image_path,
        uploaded,
    })
}

/// Render and JPEG-encode a dashboard for a display.
pub fn render_jpeg(
    display: &DisplayInfo,
    data: &DashboardData<'_>,
    fonts: &Fonts,
) -> Result<Vec<u8>, Error> {
    let canvas = render_dashboard(display.width, display.height, data, fonts)?;
    canvas.encode_jpeg(&display.palette())
}

/// CalDAV query range: start of `today` to the end of the day after tomorrow.
pub fn query_range(today: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(today, tz);
    let end = end_of_day(today + Days::new(2), tz);
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

/// `<output_dir>/<mac>.jpg`
pub fn image_path(output_dir: &Path, mac: &str) -> PathBuf {
    output_dir.join(format!("{}.jpg", mac))
}

/// Write the JPEG, creating the output directory if needed.
pub async fn write_image(output_dir: &Path, mac: &str, jpeg: &[u8]) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        Error::Io(format!(
            "Failed to create output dir '{}': {}",
            output_dir.display(),
            e
        ))
    })?;

    let path = image_path(output_dir, mac);
    tracing::info!("Exporting image to {}", path.display());
    tokio::fs::write(&path, jpeg)
        .await
        .map_err(|e| Error::Io(format!("Failed to write '{}': {}", path.display(), e)))?;

    Ok(path)
}

/// Upload, treating a rejection by the access point as non-fatal.
async fn upload(ap: &AccessPoint, mac: &str, jpeg: Vec<u8>) -> Result<bool, Error> {
    tracing::info!("Uploading to {}{}", ap.base_url(), UPLOAD_PATH);
    match ap.upload_image(mac, jpeg).await {
        Ok(()) => Ok(true),
        Err(Error::Api { status, body }) => {
            tracing::error!("Failed to upload the image (status {}): {}", status, body);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Read one full HTTP request, then answer `500`.
    async fn reject_once(listener: TcpListener) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&request) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  content-length: 4\r\nconnection: close\r\n\r\nfull",
            )
            .await
            .unwrap();
        let _ = socket.shutdown().await;
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let length = headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        });
        match length {
            Some(len) => request.len() >= header_end + 4 + len,
            None => request.ends_with(b"0\r\n\r\n"),
        }
    }

    #[test]
    fn test_query_range_covers_three_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let (start, end) = query_range(today, &chrono_tz::Europe::Berlin);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 13, 22, 59, 59).unwrap());
    }

    #[test]
    fn test_image_path() {
        assert_eq!(
            image_path(Path::new("./current"), "0000021EC9EC743A"),
            PathBuf::from("./current/0000021EC9EC743A.jpg")
        );
    }

    #[tokio::test]
    async fn test_write_image_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("current");

        let path = write_image(&output, "AABB", &[0xFF, 0xD8, 0xFF, 0xD9])
            .await
            .unwrap();

        assert_eq!(path, output.join("AABB.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[tokio::test]
    async fn test_upload_rejected_by_access_point_is_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(reject_once(listener));

        let ap = AccessPoint::new(addr.to_string())
            .with_http_client(reqwest::Client::builder().no_proxy().build().unwrap());
        let uploaded = upload(&ap, "AABB", vec![0xFF, 0xD8, 0xFF, 0xD9])
            .await
            .unwrap();

        assert!(!uploaded);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_connection_error_is_fatal() {
        let ap = AccessPoint::new("127.0.0.1:1");
        let err = upload(&ap, "AABB", vec![0xFF]).await.unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }
}
