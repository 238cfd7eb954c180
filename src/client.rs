//! OpenEPaperLink access point client.

use std::time::Duration;

use reqwest::multipart::{Form, Part};

use crate::error::Error;
use crate::inventory::{hardware_file_name, TagInventory};
use crate::DEFAULT_TIMEOUT_SECS;

/// Tag database path on the access point.
pub const TAG_DB_PATH: &str = "/current/tagDB.json";

/// Directory of hardware type documents.
pub const TAG_TYPES_PATH: &str = "/tagtypes";

/// Image upload endpoint.
pub const UPLOAD_PATH: &str = "/imgupload";

/// HTTP client for one access point.
///
/// # Example
///
/// ```rust,no_run
/// use oepl_dashboard::client::AccessPoint;
///
/// # async fn example() -> Result<(), oepl_dashboard::Error> {
/// let ap = AccessPoint::new("192.168.1.50");
///
/// let inventory = ap.fetch_inventory().await?;
/// let display = inventory.display_for("0000021EC9EC743A")?;
/// println!("{}x{}", display.width, display.height);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AccessPoint {
    http: reqwest::Client,
    base_url: String,
}

impl AccessPoint {
    /// Create a client for an access point given as `host[:port]`.
    ///
    /// A host that already carries a scheme is used as is.
    ///
    /// ```
    /// use oepl_dashboard::client::AccessPoint;
    ///
    /// assert_eq!(AccessPoint::new("10.0.0.2").base_url(), "http://10.0.0.2");
    /// assert_eq!(AccessPoint::new("https://ap.lan/").base_url(), "https://ap.lan");
    /// ```
    pub fn new(host: impl AsRef<str>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let host = host.as_ref().trim_end_matches('/');
        let base_url = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };

        Self { http, base_url }
    }

    /// Set a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the tag database and the metadata of every hardware type in it.
    pub async fn fetch_inventory(&self) -> Result<TagInventory, Error> {
        let tag_db = self.get_text(TAG_DB_PATH).await?;
        let mut inventory = TagInventory::from_tag_db(&tag_db)?;
        tracing::debug!("Access point knows {} display tags", inventory.len());

        for hw_type in inventory.hardware_types() {
            let path = format!("{}/{}", TAG_TYPES_PATH, hardware_file_name(hw_type));
            let json = self.get_text(&path).await?;
            inventory.add_hardware_type(hw_type, &json)?;
        }

        Ok(inventory)
    }

    /// Upload a JPEG for a tag.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] if the access point cannot be reached,
    /// [`Error::Api`] if it answers with a non-success status.
    pub async fn upload_image(&self, mac: &str, jpeg: Vec<u8>) -> Result<(), Error> {
        let url = self.url(UPLOAD_PATH);
        let form = upload_form(mac, jpeg)?;

        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        tracing::info!("Image uploaded for tag {}", mac);
        Ok(())
    }

    async fn get_text(&self, path: &str) -> Result<String, Error> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        Ok(response.text().await?)
    }
}

/// Multipart body for `/imgupload`: no dithering on the AP side.
fn upload_form(mac: &str, jpeg: Vec<u8>) -> Result<Form, Error> {
    let file = Part::bytes(jpeg)
        .file_name(format!("{}.jpg", mac))
        .mime_str("image/jpeg")?;

    Ok(Form::new()
        .text("dither", "0")
        .text("mac", mac.to_string())
        .part("file", file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(
            AccessPoint::new("192.168.1.50:8080").base_url(),
            "http://192.168.1.50:8080"
        );
        assert_eq!(AccessPoint::new("ap.lan/").base_url(), "http://ap.lan");
        assert_eq!(
            AccessPoint::new("http://ap.lan").base_url(),
            "http://ap.lan"
        );
    }

    #[test]
    fn test_endpoint_urls() {
        let ap = AccessPoint::new("10.0.0.2");
        assert_eq!(ap.url(TAG_DB_PATH), "http://10.0.0.2/current/tagDB.json");
        assert_eq!(ap.url(UPLOAD_PATH), "http://10.0.0.2/imgupload");
    }

    #[test]
    fn test_builder_pattern() {
        let ap = AccessPoint::new("10.0.0.2")
            .with_base_url("http://localhost:8080")
            .with_http_client(reqwest::Client::new());

        assert_eq!(ap.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_upload_form_builds() {
        assert!(upload_form("0000021EC9EC743A", vec![0xFF, 0xD8, 0xFF]).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_access_point_is_request_error() {
        let ap = AccessPoint::new("127.0.0.1:1");
        let err = ap.fetch_inventory().await.unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }
}
