//! Browser capability used by the crawl
//!
//! The crawl core never talks to an automation API directly. It drives a
//! [`Page`] obtained from a [`BrowserLauncher`], which covers navigation,
//! element queries, and the session-shaping hooks (cookies, viewport, user
//! agent, proxy credentials, interception).
//!
//! The default implementation, [`HttpLauncher`], fetches documents with
//! reqwest and answers element queries with scraper.

mod document;
mod http;
mod session;
#[cfg(test)]
pub(crate) mod testing;
mod validator;

pub use document::{Document, Element};
pub use http::{HttpLauncher, HttpPage};
pub use session::{
    prepare_page, proxy_credentials, random_user_agent, ProxyCredentials, ProxySession, Viewport,
    NAVIGATION_TIMEOUT, USER_AGENTS,
};
pub use validator::{find_working_browser, MAX_PROXY_ATTEMPTS, VALIDATION_TIMEOUT};

use crate::cache::RequestInterceptor;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the browser capability
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out")]
    NavigationTimeout { url: String },

    #[error("Fetch of {url} was aborted by the interceptor")]
    Aborted { url: String },

    #[error("Timed out waiting for selector '{selector}'")]
    WaitTimeout { selector: String },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("No document loaded")]
    NotLoaded,

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// A single browser tab
///
/// Query methods take `&self` so a page can be inspected while shared; anything
/// that changes the session or the loaded document takes `&mut self`.
#[async_trait]
pub trait Page: Send + Sync {
    /// Loads `url`, following redirects, within `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// The URL of the loaded document after redirects
    fn url(&self) -> String;

    /// Raw markup of the loaded document
    async fn content(&self) -> BrowserResult<String>;

    /// First element matching `selector`, if any
    async fn query(&self, selector: &str) -> BrowserResult<Option<Element>>;

    /// All elements matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Element>>;

    /// Waits until `selector` matches, failing with [`BrowserError::WaitTimeout`]
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<Element>;

    /// Removes every cookie stored for the host of `url`
    async fn clear_cookies(&mut self, _url: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn set_viewport(&mut self, _viewport: Viewport) -> BrowserResult<()> {
        Ok(())
    }

    async fn set_user_agent(&mut self, _user_agent: &str) -> BrowserResult<()> {
        Ok(())
    }

    /// Authenticates the network session against the proxy
    async fn authenticate(&mut self, _credentials: &ProxyCredentials) -> BrowserResult<()> {
        Ok(())
    }

    /// Routes every fetch of this page through `interceptor`
    fn set_interceptor(&mut self, _interceptor: RequestInterceptor) {}
}

/// Creates pages bound to a proxy session
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, session: &ProxySession) -> BrowserResult<Box<dyn Page>>;
}

/// A launched page together with the proxy session it is bound to
pub struct ActiveBrowser {
    pub page: Box<dyn Page>,
    pub session: ProxySession,
}

impl std::fmt::Debug for ActiveBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveBrowser")
            .field("url", &self.page.url())
            .field("session", &self.session)
            .finish()
    }
}
