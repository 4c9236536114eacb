//! Proxy validation
//!
//! Before the crawl starts the operator can ask for a proxy session proven to
//! serve the real search page. A session is accepted when the start URL loads
//! and the loaded URL still carries the requested sort order; a redirect that
//! drops it means the exit address is being served a blocking page.

use crate::browser::{prepare_page, ActiveBrowser, BrowserLauncher, ProxySession};
use crate::config::SessionInput;
use crate::url::search_start_url;
use crate::SweepError;
use std::time::Duration;

/// Sessions tried before giving up
pub const MAX_PROXY_ATTEMPTS: u32 = 1000;

/// Navigation timeout for each validation attempt
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Finds a browser whose proxy session loads the start page intact
///
/// Each attempt launches a fresh session. The final attempt is accepted as
/// long as navigation succeeds, whatever URL it lands on.
///
/// # Arguments
///
/// * `launcher` - Creates a page per attempted session
/// * `input` - Crawl input; provides the start URL and sort order
/// * `max_attempts` - Number of sessions to try
///
/// # Returns
///
/// * `Ok(ActiveBrowser)` - The accepted page and its session
/// * `Err(SweepError::NoWorkingProxy)` - Every attempt failed to navigate
pub async fn find_working_browser(
    launcher: &dyn BrowserLauncher,
    input: &SessionInput,
    max_attempts: u32,
) -> Result<ActiveBrowser, SweepError> {
    let start_url = search_start_url(input);

    for attempt in 1..=max_attempts {
        let session = ProxySession::random();
        tracing::info!("Testing proxy session {} (attempt {})", session.id(), attempt);

        let mut page = match launcher.launch(&session).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to launch browser: {}", e);
                continue;
            }
        };

        if let Err(e) = prepare_page(page.as_mut(), input, &session).await {
            tracing::warn!("Failed to prepare page: {}", e);
            continue;
        }

        if let Err(e) = page.navigate(&start_url, VALIDATION_TIMEOUT).await {
            tracing::info!("Invalid proxy, retrying: {}", e);
            continue;
        }

        if page.url().contains(&input.sort_by) || attempt == max_attempts {
            tracing::info!("Valid proxy found: {}", session.id());
            return Ok(ActiveBrowser { page, session });
        }

        tracing::info!("Invalid proxy, retrying");
    }

    Err(SweepError::NoWorkingProxy {
        attempts: max_attempts,
    })
}
