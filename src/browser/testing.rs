//! In-memory pages for unit tests

use crate::browser::{
    BrowserError, BrowserLauncher, BrowserResult, Document, Element, Page, ProxySession,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maps a requested URL to `(final_url, html)`, `None` meaning a failed navigation
pub type Routes = Arc<dyn Fn(&str) -> Option<(String, String)> + Send + Sync>;

pub struct FixturePage {
    routes: Routes,
    document: Option<Document>,
}

impl FixturePage {
    pub fn new(routes: Routes) -> Self {
        Self {
            routes,
            document: None,
        }
    }

    /// A page with `html` already loaded from `url`
    pub fn loaded(url: &str, html: &str) -> Self {
        Self {
            routes: Arc::new(|_: &str| None::<(String, String)>),
            document: Some(Document::new(url, html)),
        }
    }

    fn document(&self) -> BrowserResult<&Document> {
        self.document.as_ref().ok_or(BrowserError::NotLoaded)
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        match (self.routes)(url) {
            Some((final_url, html)) => {
                self.document = Some(Document::new(final_url, html));
                Ok(())
            }
            None => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "connection reset".to_string(),
            }),
        }
    }

    fn url(&self) -> String {
        self.document
            .as_ref()
            .map(|document| document.url().to_string())
            .unwrap_or_default()
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
        self.query(selector)
            .await?
            .ok_or_else(|| BrowserError::WaitTimeout {
                selector: selector.to_string(),
            })
    }
}

/// Launches [`FixturePage`]s over shared routes and counts launches
pub struct FixtureLauncher {
    routes: Routes,
    launches: AtomicUsize,
}

impl FixtureLauncher {
    pub fn new(routes: Routes) -> Self {
        Self {
            routes,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FixtureLauncher {
    async fn launch(&self, _session: &ProxySession) -> BrowserResult<Box<dyn Page>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixturePage::new(self.routes.clone())))
    }
}
