//! Proxy sessions and page preparation

use crate::browser::{BrowserResult, Page};
use crate::config::{ProxySettings, SessionInput};
use rand::Rng;
use std::time::Duration;

/// Navigation timeout for crawl pages
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(200);

/// Desktop user agents a page may present
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Identity under which the proxy pins an exit address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySession {
    id: String,
}

impl ProxySession {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// A fresh session with a random identifier
    pub fn random() -> Self {
        Self::new(format!("BOOKING_{}", rand::random::<u64>()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Username and password presented to the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// Browser window size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// 1024x768 plus up to 99 extra pixels on each axis
    pub fn randomized() -> Self {
        let mut rng = rand::rng();
        Self {
            width: 1024 + rng.random_range(0..100),
            height: 768 + rng.random_range(0..100),
        }
    }
}

pub fn random_user_agent() -> &'static str {
    let index = rand::rng().random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Builds the proxy username that pins `session` within the configured groups
pub fn proxy_credentials(proxy: &ProxySettings, session: &ProxySession) -> ProxyCredentials {
    let username = if proxy.groups.is_empty() {
        format!("session-{}", session.id())
    } else {
        format!("groups-{},session-{}", proxy.groups.join("+"), session.id())
    };

    ProxyCredentials {
        username,
        password: proxy.password.clone(),
    }
}

/// Shapes a freshly launched page before its first navigation
///
/// Authenticates against the proxy, picks a user agent, clears cookies for
/// the target site and randomizes the viewport.
pub async fn prepare_page(
    page: &mut dyn Page,
    input: &SessionInput,
    session: &ProxySession,
) -> BrowserResult<()> {
    let credentials = proxy_credentials(&input.proxy, session);
    tracing::debug!("Preparing page for proxy session {}", session.id());

    page.authenticate(&credentials).await?;
    page.set_user_agent(random_user_agent()).await?;
    page.clear_cookies(&input.site_url).await?;
    page.set_viewport(Viewport::randomized()).await?;
    Ok(())
}
