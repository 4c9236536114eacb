//! Page classification and enqueuing
//!
//! Every loaded page first passes an authenticity gate: the page must show
//! the configured currency and, for seeded crawls, must not have been
//! redirected to a shorter URL. A page failing the gate was served through a
//! bad proxy session; the worker retires its browser and re-queues the page
//! under a fresh key.
//!
//! Detail pages then produce at most one record. Search-result pages converge
//! the configured filters, discover pagination once per result set and, once
//! converged, either emit summary items (simple mode) or queue the hotels'
//! detail pages.

use crate::browser::Page;
use crate::config::SessionInput;
use crate::crawler::filters::{
    filter_requests, is_filtered, is_price_band_set, is_property_type_set, price_band_request,
    property_type_request,
};
use crate::crawler::pagination::{
    first_ordinal, pagination_requests, COUNT_ERROR_KEY, PAGE_LINK_SELECTOR, RANGE_SELECTOR,
};
use crate::crawler::{CrawlRequest, RequestLabel};
use crate::extract::{
    aggregate_rating, structured_data, DetailExtractor, JsonLdDetailExtractor, ListExtractor,
    PageSnapshot, SelectorListExtractor,
};
use crate::state::CrawlProgress;
use crate::storage::{Dataset, KeyValueStore, RequestQueue, SqliteStorage};
use crate::url::{build_search_url, normalize_child_link, resolve_href};
use crate::SweepError;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const CURRENCY_SELECTOR: &str = r#"input[name="selected_currency"]"#;
pub const OCCUPANCY_SELECTOR: &str = ".hprt-occupancy-occupancy-info";
pub const DETAIL_LINK_SELECTOR: &str = ".hotel_name_link";

/// Key of the last list page extracted in simple mode
pub const LIST_PAGE_KEY: &str = "page.html";

const DETAIL_WAIT: Duration = Duration::from_secs(120);
const PAGINATION_WAIT: Duration = Duration::from_secs(60);

/// What the worker should do with its browser after a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was processed; keep the browser
    Done,
    /// The page was served through a bad session; drop the browser and
    /// re-run the request
    Retire { reason: String },
}

/// Shared state every worker classifies pages against
#[derive(Clone)]
pub struct CrawlContext {
    pub input: Arc<SessionInput>,
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub progress: Arc<Mutex<CrawlProgress>>,
    pub detail_extractor: Arc<dyn DetailExtractor>,
    pub list_extractor: Arc<dyn ListExtractor>,
}

impl CrawlContext {
    /// A context with the default extractors and empty progress
    pub fn new(input: Arc<SessionInput>, storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self {
            input,
            storage,
            progress: Arc::new(Mutex::new(CrawlProgress::new())),
            detail_extractor: Arc::new(JsonLdDetailExtractor),
            list_extractor: Arc::new(SelectorListExtractor::default()),
        }
    }

    pub fn with_progress(mut self, progress: CrawlProgress) -> Self {
        self.progress = Arc::new(Mutex::new(progress));
        self
    }

    pub fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>, SweepError> {
        self.storage
            .lock()
            .map_err(|_| SweepError::Storage("storage lock poisoned".to_string()))
    }

    pub fn progress(&self) -> Result<MutexGuard<'_, CrawlProgress>, SweepError> {
        self.progress
            .lock()
            .map_err(|_| SweepError::Storage("progress lock poisoned".to_string()))
    }

    pub fn enqueue(&self, request: &CrawlRequest, forefront: bool) -> Result<bool, SweepError> {
        Ok(self.storage()?.add_request(request, forefront)?)
    }

    pub fn push_records(&self, records: &[serde_json::Value]) -> Result<(), SweepError> {
        Ok(self.storage()?.push_records(records)?)
    }

    pub fn set_value(&self, key: &str, value: &[u8], content_type: &str) -> Result<(), SweepError> {
        Ok(self.storage()?.set_value(key, value, content_type)?)
    }
}

/// Convergence of a search-result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// Generic filters were requested and none is applied yet
    pub setting_filters: bool,
    /// The configured price band is not applied yet
    pub setting_price_band: bool,
    /// The configured property type is not applied yet
    pub setting_property_type: bool,
    /// The URL is already a paginated sibling (`offset` marker)
    pub paginated: bool,
}

impl PageState {
    /// # Errors
    ///
    /// A configured price band on a page without a price filter group fails
    /// with [`SweepError::MissingElement`].
    pub fn evaluate(page: &PageSnapshot, input: &SessionInput) -> Result<Self, SweepError> {
        let setting_filters = input.use_filters && !is_filtered(page)?;
        let setting_price_band = match input.min_max_price {
            Some(band) => !is_price_band_set(page, band)?,
            None => false,
        };
        let setting_property_type = match &input.property_type {
            Some(property_type) => !is_property_type_set(page, property_type)?,
            None => false,
        };

        Ok(Self {
            setting_filters,
            setting_price_band,
            setting_property_type,
            paginated: page.url().contains("offset"),
        })
    }

    /// True when every configured filter is applied
    pub fn enqueuing_ready(&self) -> bool {
        !(self.setting_filters || self.setting_price_band || self.setting_property_type)
    }
}

/// Classifies the page loaded for `request` and records what it yields
///
/// # Returns
///
/// * `Ok(PageOutcome::Retire { .. })` - The page was tainted; nothing was
///   recorded
/// * `Ok(PageOutcome::Done)` - The page was processed (possibly dropped)
/// * `Err(_)` - The page should be retried by the queue
pub async fn handle_page(
    ctx: &CrawlContext,
    page: &dyn Page,
    request: &CrawlRequest,
) -> Result<PageOutcome, SweepError> {
    let input = ctx.input.as_ref();
    tracing::info!("Open url ({}): {}", request.label, page.url());

    if input.is_seeded() && page.url().len() < request.url.len() {
        return Ok(retire(format!("Redirected to {}", page.url())));
    }

    let currency = page
        .query(CURRENCY_SELECTOR)
        .await?
        .and_then(|element| element.attr("value").map(|value| value.trim().to_string()));
    if currency.as_deref() != Some(input.currency.as_str()) {
        return Ok(retire(format!(
            "Wrong currency: {}",
            currency.as_deref().unwrap_or("none")
        )));
    }

    match request.label {
        RequestLabel::Detail { order } => handle_detail(ctx, page, order).await,
        RequestLabel::Start | RequestLabel::Page => handle_list(ctx, page).await,
    }
}

fn retire(reason: String) -> PageOutcome {
    tracing::warn!("{}, re-enqueuing", reason);
    PageOutcome::Retire { reason }
}

async fn handle_detail(
    ctx: &CrawlContext,
    page: &dyn Page,
    order: Option<u32>,
) -> Result<PageOutcome, SweepError> {
    let input = ctx.input.as_ref();

    if let Err(e) = page.wait_for_selector(OCCUPANCY_SELECTOR, DETAIL_WAIT).await {
        tracing::info!("Occupancy info not found: {}", e);
    }

    let snapshot = PageSnapshot::capture(page).await?;
    if !input.is_seeded() && !snapshot.url().contains("label") {
        return Ok(retire("Detail page lost its session label".to_string()));
    }

    let Some(structured) = structured_data(&snapshot) else {
        tracing::debug!("No structured data on {}, skipping", snapshot.url());
        return Ok(PageOutcome::Done);
    };

    if let Some(rating) = aggregate_rating(&structured) {
        if rating <= input.min_score {
            tracing::debug!("Rating {} of {} is below threshold", rating, snapshot.url());
            return Ok(PageOutcome::Done);
        }
    }

    tracing::info!("Extracting detail...");
    let record = ctx
        .detail_extractor
        .extract(&snapshot, &structured, input, order)?;
    ctx.push_records(&[record])?;
    tracing::info!("Detail extracted");

    Ok(PageOutcome::Done)
}

async fn handle_list(ctx: &CrawlContext, page: &dyn Page) -> Result<PageOutcome, SweepError> {
    let input = ctx.input.as_ref();
    let snapshot = PageSnapshot::capture(page).await?;
    let state = PageState::evaluate(&snapshot, input)?;

    if !input.is_seeded() && !snapshot.url().contains(&input.sort_by) {
        return Ok(retire("Result page lost its sort order".to_string()));
    }

    let wants_pagination =
        input.max_pages.is_none() || input.min_max_price.is_some() || input.property_type.is_some();
    if state.enqueuing_ready() && wants_pagination && !state.paginated {
        enqueue_pagination(ctx, page, &snapshot).await?;
    }

    if state.setting_property_type {
        if let Some(property_type) = &input.property_type {
            tracing::info!("Enqueuing property type page...");
            match property_type_request(&snapshot, property_type, input) {
                Ok(Some(request)) => {
                    ctx.enqueue(&request, false)?;
                }
                Ok(None) => tracing::debug!("No '{}' filter on page", property_type),
                Err(e) => tracing::warn!("Failed to enqueue property type page: {}", e),
            }
        }
    } else if state.setting_price_band {
        if let Some(band) = input.min_max_price {
            tracing::info!("Enqueuing min-max price page...");
            match price_band_request(&snapshot, band, input) {
                Ok(Some(request)) => {
                    ctx.enqueue(&request, false)?;
                }
                Ok(None) => tracing::debug!("Price filter {} has no link", band),
                Err(e) => tracing::warn!("Failed to enqueue price page: {}", e),
            }
        }
    }

    if state.setting_filters {
        tracing::info!("Enqueuing filtered pages...");
        match filter_requests(&snapshot, input) {
            Ok(requests) => {
                for request in &requests {
                    ctx.enqueue(request, false)?;
                }
            }
            Err(e) => tracing::warn!("Failed to enqueue filter pages: {}", e),
        }
    }

    if state.enqueuing_ready() {
        if input.simple {
            extract_list(ctx, &snapshot)?;
        } else {
            enqueue_details(ctx, &snapshot)?;
        }
    }

    Ok(PageOutcome::Done)
}

async fn enqueue_pagination(
    ctx: &CrawlContext,
    page: &dyn Page,
    snapshot: &PageSnapshot,
) -> Result<(), SweepError> {
    tracing::info!("Enqueuing pagination pages...");

    let requests = match page.wait_for_selector(PAGE_LINK_SELECTOR, PAGINATION_WAIT).await {
        Ok(_) => pagination_requests(snapshot, &ctx.input),
        Err(e) => Err(e.into()),
    };

    match requests {
        Ok(requests) => {
            for request in &requests {
                ctx.enqueue(request, false)?;
            }
        }
        Err(e) => {
            tracing::info!("Pagination not found: {}", e);
            ctx.set_value(COUNT_ERROR_KEY, snapshot.html().as_bytes(), "text/html")?;
        }
    }
    Ok(())
}

/// Simple mode: emit the page's summary items not emitted before
fn extract_list(ctx: &CrawlContext, snapshot: &PageSnapshot) -> Result<(), SweepError> {
    let input = ctx.input.as_ref();
    tracing::info!("Extracting data...");
    ctx.set_value(LIST_PAGE_KEY, snapshot.html().as_bytes(), "text/html")?;

    let mut items = ctx.list_extractor.extract(snapshot, input)?;
    tracing::info!("Found {} results", items.len());
    for item in &mut items {
        item.url = build_search_url(&item.url, input);
    }

    let fresh = ctx.progress()?.retain_new(items, |item| item.name.as_str());
    if fresh.is_empty() {
        return Ok(());
    }

    let records = fresh
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    ctx.push_records(&records)
}

/// Queues every hotel on the page ahead of everything pending
fn enqueue_details(ctx: &CrawlContext, snapshot: &PageSnapshot) -> Result<(), SweepError> {
    let input = ctx.input.as_ref();
    tracing::info!("Enqueuing detail pages...");

    let first = snapshot
        .select_first(RANGE_SELECTOR)?
        .and_then(|range| first_ordinal(range.text()));
    let first = first.unwrap_or_else(|| {
        tracing::warn!("No result range on {}, numbering from 1", snapshot.url());
        1
    });

    for (index, link) in (0u32..).zip(snapshot.select(DETAIL_LINK_SELECTOR)?.iter()) {
        let Some(href) = link.href() else {
            continue;
        };
        let url = normalize_child_link(&resolve_href(snapshot.url(), href)?, "&", input);
        let key = match link.text() {
            "" => url.clone(),
            text => text.to_string(),
        };

        let request = CrawlRequest::new(
            url,
            RequestLabel::Detail {
                order: Some(first.saturating_add(index)),
            },
        )
        .with_key(key);
        ctx.enqueue(&request, true)?;
    }
    Ok(())
}
