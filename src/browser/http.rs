//! reqwest-backed page
//!
//! Fetches documents over HTTP through the configured proxy and answers
//! element queries against the fetched markup. There is no script execution,
//! so waiting on a selector is a single check of the loaded document.

use crate::browser::{
    BrowserError, BrowserLauncher, BrowserResult, Document, Element, Page, ProxyCredentials,
    ProxySession, Viewport,
};
use crate::cache::{InterceptDecision, RequestInterceptor};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;

/// Launches [`HttpPage`]s that share one interception policy
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    proxy_url: Option<String>,
    interceptor: RequestInterceptor,
}

impl HttpLauncher {
    /// # Arguments
    ///
    /// * `proxy_url` - Proxy every page connects through, `None` for direct
    /// * `interceptor` - Policy installed on every launched page
    pub fn new(proxy_url: Option<String>, interceptor: RequestInterceptor) -> Self {
        Self {
            proxy_url,
            interceptor,
        }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self, session: &ProxySession) -> BrowserResult<Box<dyn Page>> {
        tracing::debug!("Launching page for session {}", session.id());
        let mut page = HttpPage::new(self.proxy_url.clone());
        page.set_interceptor(self.interceptor.clone());
        Ok(Box::new(page))
    }
}

/// A single HTTP "tab"
#[derive(Debug, Default)]
pub struct HttpPage {
    proxy_url: Option<String>,
    credentials: Option<ProxyCredentials>,
    user_agent: Option<String>,
    viewport: Option<Viewport>,
    interceptor: Option<RequestInterceptor>,
    document: Option<Document>,
}

impl HttpPage {
    pub fn new(proxy_url: Option<String>) -> Self {
        Self {
            proxy_url,
            ..Self::default()
        }
    }

    fn build_client(&self, timeout: Duration) -> BrowserResult<Client> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        if let Some(viewport) = self.viewport {
            let mut headers = HeaderMap::new();
            headers.insert("viewport-width", HeaderValue::from(viewport.width));
            builder = builder.default_headers(headers);
        }

        if let Some(proxy_url) = &self.proxy_url {
            let mut proxy = Proxy::all(proxy_url.as_str())?;
            if let Some(credentials) = &self.credentials {
                proxy = proxy.basic_auth(&credentials.username, &credentials.password);
            }
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }

    fn document(&self) -> BrowserResult<&Document> {
        self.document.as_ref().ok_or(BrowserError::NotLoaded)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> BrowserResult<Document> {
        let client = self.build_client(timeout)?;
        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                BrowserError::NavigationTimeout {
                    url: url.to_string(),
                }
            } else {
                BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if let Some(interceptor) = &self.interceptor {
            interceptor.on_response(&final_url, status.as_u16(), &headers, &body);
        }

        Ok(Document::new(
            final_url,
            String::from_utf8_lossy(&body).into_owned(),
        ))
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let decision = match &self.interceptor {
            Some(interceptor) => interceptor.on_request(url),
            None => InterceptDecision::Continue,
        };

        let document = match decision {
            InterceptDecision::Abort => {
                return Err(BrowserError::Aborted {
                    url: url.to_string(),
                })
            }
            InterceptDecision::Respond(cached) => {
                Document::new(url, String::from_utf8_lossy(&cached.body).into_owned())
            }
            InterceptDecision::Continue => self.fetch(url, timeout).await?,
        };

        tracing::trace!("Loaded {}", document.url());
        self.document = Some(document);
        Ok(())
    }

    fn url(&self) -> String {
        self.document
            .as_ref()
            .map(|document| document.url().to_string())
            .unwrap_or_else(|| "about:blank".to_string())
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.document()?.html().to_string())
    }

    async fn query(&self, selector: &str) -> BrowserResult<Option<Element>> {
        self.document()?.select_first(selector)
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<Element>> {
        self.document()?.select(selector)
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> BrowserResult<Element> {
        self.document()?
            .select_first(selector)?
            .ok_or_else(|| BrowserError::WaitTimeout {
                selector: selector.to_string(),
            })
    }

    async fn clear_cookies(&mut self, url: &str) -> BrowserResult<()> {
        // Each navigation builds a fresh client, so no cookie outlives a fetch
        tracing::trace!("Cookies cleared for {}", url);
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> BrowserResult<()> {
        self.viewport = Some(viewport);
        Ok(())
    }

    async fn set_user_agent(&mut self, user_agent: &str) -> BrowserResult<()> {
        self.user_agent = Some(user_agent.to_string());
        Ok(())
    }

    async fn authenticate(&mut self, credentials: &ProxyCredentials) -> BrowserResult<()> {
        self.credentials = Some(credentials.clone());
        Ok(())
    }

    fn set_interceptor(&mut self, interceptor: RequestInterceptor) {
        self.interceptor = Some(interceptor);
    }
}
