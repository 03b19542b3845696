//! Authenticated HTTP session against the parent portal.
//!
//! The portal is a classic PHP site: the first page load sets a session
//! cookie, the login form validates it, and every later request rides on the
//! same cookie. [`PortalSession`] keeps that cookie in a `reqwest` cookie store.

use crate::config::PortalConfig;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// Login form endpoint, relative to the portal base URL.
pub const LOGIN_PATH: &str = "loginvalidate_portal.php";
/// Journal choice page; carries the journal primary key.
pub const JOURNAL_CHOICE_PATH: &str = "schriftkeuze.php";
/// Service endpoint that renders a journal page.
pub const SERVICE_PATH: &str = "portal-service.php";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid portal URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Authenticated page fetching.
///
/// Paths are relative to the portal base URL; absolute URLs are used as-is.
/// Pages come back decoded using the charset the portal declares.
pub trait SessionProvider {
    /// Log in with the given form fields.
    async fn authenticate(&self, credentials: &BTreeMap<String, String>)
    -> Result<(), SessionError>;

    /// GET a page.
    async fn fetch(&self, path: &str) -> Result<String, SessionError>;

    /// POST a form and return the page it answers with.
    async fn fetch_form(&self, path: &str, form: &[(&str, &str)]) -> Result<String, SessionError>;

    /// GET a binary resource such as a gallery photo.
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, SessionError>;
}

/// `reqwest`-backed session with a cookie jar.
#[derive(Debug, Clone)]
pub struct PortalSession {
    client: reqwest::Client,
    base_url: Url,
    site_number: String,
}

impl PortalSession {
    pub fn new(portal: &PortalConfig) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&portal.base_url)?,
            site_number: portal.site_number.clone(),
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, SessionError> {
        Ok(self.base_url.join(path)?)
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, SessionError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl SessionProvider for PortalSession {
    #[instrument(level = "info", skip_all, fields(site = %self.site_number))]
    async fn authenticate(
        &self,
        credentials: &BTreeMap<String, String>,
    ) -> Result<(), SessionError> {
        // The landing page hands out the session cookie the login checks.
        debug!("Opening portal landing page");
        self.fetch(&self.site_number).await?;

        info!(
            username = credentials.get("username").map(String::as_str).unwrap_or(""),
            "Logging in"
        );
        let url = self.resolve(LOGIN_PATH)?;
        let response = self.client.post(url).form(credentials).send().await?;
        Self::check(response)?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, path: &str) -> Result<String, SessionError> {
        let url = self.resolve(path)?;
        let response = Self::check(self.client.get(url).send().await?)?;
        let page = response.text().await?;
        debug!(bytes = page.len(), "Fetched");
        Ok(page)
    }

    #[instrument(level = "debug", skip(self, form))]
    async fn fetch_form(&self, path: &str, form: &[(&str, &str)]) -> Result<String, SessionError> {
        let url = self.resolve(path)?;
        let response = Self::check(self.client.post(url).form(form).send().await?)?;
        let page = response.text().await?;
        debug!(bytes = page.len(), "Posted form");
        Ok(page)
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, SessionError> {
        let url = self.resolve(path)?;
        let response = Self::check(self.client.get(url).send().await?)?;
        let body = response.bytes().await?.to_vec();
        debug!(bytes = body.len(), "Downloaded");
        Ok(body)
    }
}
