//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a miniature listing site and run the
//! full crawl cycle end-to-end over real HTTP.

use hotel_sweep::browser::HttpLauncher;
use hotel_sweep::cache::{RequestInterceptor, ResponseCache};
use hotel_sweep::config::{load_config, resolve, CrawlTarget, PriceBand, SessionInput};
use hotel_sweep::crawler::{seed_queue, CrawlContext, CrawlDriver, CrawlSummary};
use hotel_sweep::state::RequestState;
use hotel_sweep::storage::{Dataset, RequestQueue, SqliteStorage};
use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CURRENCY_USD: &str = r#"<input type="hidden" name="selected_currency" value="USD" />"#;

/// Search input pointed at the mock server
fn test_input(server: &MockServer, query: &str) -> SessionInput {
    let mut input = SessionInput::search(query);
    input.site_url = server.uri();
    input.max_concurrency = 2;
    input.max_request_retries = 1;
    input
}

fn seeded_input(server: &MockServer, paths: &[&str]) -> SessionInput {
    let urls = paths
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    let mut input = SessionInput::seeded(urls);
    input.site_url = server.uri();
    input.max_concurrency = 2;
    input.max_request_retries = 1;
    input
}

/// Seeds `storage` from `input` and runs the crawl over plain HTTP
async fn crawl(input: SessionInput, mut storage: SqliteStorage) -> (CrawlSummary, Vec<Value>) {
    seed_queue(&mut storage, &input).expect("Failed to seed queue");

    let cache = Arc::new(ResponseCache::new(input.cache_responses));
    let launcher = HttpLauncher::new(None, RequestInterceptor::new(cache));
    let storage = Arc::new(Mutex::new(storage));
    let ctx = CrawlContext::new(Arc::new(input), Arc::clone(&storage));

    let summary = CrawlDriver::new(ctx, Arc::new(launcher), CancellationToken::new())
        .with_idle_wait(Duration::from_millis(10))
        .run()
        .await
        .expect("Crawl failed");

    let records = storage.lock().unwrap().records().unwrap();
    (summary, records)
}

fn results_page(count: u32) -> String {
    format!(
        r#"<html><body>{}
        <div class="sr_header"><h1>Paris: {} properties found</h1></div>
        <ol class="bui-pagination__list">
            <li><a aria-current="page" href="/searchresults.html?ss=Paris">1</a></li>
            <li><a href="/searchresults.html?ss=Paris&order=bayesian_review_score&rows=20&offset=20">2</a></li>
        </ol>
        <div class="bui-pagination__info">Showing 1 - 20</div>
        <a class="hotel_name_link" href="/hotel/fr/nord.html?label=gen173">Hotel du Nord</a>
        <a class="hotel_name_link" href="/hotel/fr/marais.html?label=gen173#availability">Le Marais</a>
        </body></html>"#,
        CURRENCY_USD, count
    )
}

fn hotel_page(name: &str, rating: &str) -> String {
    format!(
        r#"<html><head><script type="application/ld+json">
        {{"@type": "Hotel", "name": "{}", "aggregateRating": {{"ratingValue": {}, "reviewCount": 120}}}}
        </script></head><body>{}
        <div class="hprt-occupancy-occupancy-info">2 adults</div>
        </body></html>"#,
        name, rating, CURRENCY_USD
    )
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_search_crawl() {
    let mock_server = MockServer::start().await;

    // Every list page shows the same two hotels
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(60)))
        .expect(4)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hotel/fr/nord.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Hotel du Nord", "7.9")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/hotel/fr/marais.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(hotel_page("Le Marais", "8.5")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut input = test_input(&mock_server, "Paris");
    input.min_score = 8.0;

    let storage = SqliteStorage::new_in_memory().unwrap();
    let (summary, records) = crawl(input, storage).await;

    // Start page + three paginated pages + two detail pages
    assert_eq!(summary.handled, 6);
    assert_eq!(summary.failed, 0);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Le Marais");
    assert_eq!(records[0]["rating"], 8.5);
    assert_eq!(records[0]["currency"], "USD");
    assert!(records[0]["order"].is_u64());

    let url = records[0]["url"].as_str().unwrap();
    assert!(url.contains("label=gen173"));
    assert!(url.contains("selected_currency=USD"));
    assert!(!url.contains('#'));
}

#[tokio::test]
async fn test_seeded_hotel_url_skips_search() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(60)))
        .expect(0)
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/hotel/fr/marais.html", hotel_page("Le Marais", "9.0")).await;

    let input = seeded_input(&mock_server, &["/hotel/fr/marais.html"]);
    let storage = SqliteStorage::new_in_memory().unwrap();
    let (summary, records) = crawl(input, storage).await;

    assert_eq!(summary.handled, 1);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Le Marais");
    assert!(records[0]["order"].is_null());
}

#[tokio::test]
async fn test_wrong_currency_is_retried_once() {
    let mock_server = MockServer::start().await;

    // The first response comes through a session that was served euros
    Mock::given(method("GET"))
        .and(path("/hotel/fr/marais.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><input name="selected_currency" value="EUR" /></html>"#,
        ))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/hotel/fr/marais.html", hotel_page("Le Marais", "9.0")).await;

    let input = seeded_input(&mock_server, &["/hotel/fr/marais.html"]);
    let storage = SqliteStorage::new_in_memory().unwrap();
    let (summary, records) = crawl(input, storage).await;

    // The tainted original and its fresh-key copy
    assert_eq!(summary.handled, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Le Marais");
}

#[tokio::test]
async fn test_failing_url_is_recorded_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hotel/fr/broken.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let input = seeded_input(&mock_server, &["/hotel/fr/broken.html"]);
    let storage = SqliteStorage::new_in_memory().unwrap();
    let (summary, records) = crawl(input, storage).await;

    assert_eq!(summary.handled, 0);
    assert_eq!(summary.failed, 1);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["succeeded"], false);
    assert!(records[0]["url"]
        .as_str()
        .unwrap()
        .contains("/hotel/fr/broken.html"));

    let errors = records[0]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().contains("HTTP 503"));
}

#[tokio::test]
async fn test_simple_mode_emits_list_items() {
    let mock_server = MockServer::start().await;

    let html = format!(
        r#"<html><body>{}
        <div class="sr_item">
            <span class="sr-hotel__name">Hotel du Nord</span>
            <a class="hotel_name_link" href="/hotel/fr/nord.html">x</a>
            <div class="bui-review-score__badge">7.9</div>
        </div>
        <div class="sr_item">
            <span class="sr-hotel__name">Le Marais</span>
            <a class="hotel_name_link" href="/hotel/fr/marais.html">x</a>
        </div>
        </body></html>"#,
        CURRENCY_USD
    );
    mount_page(&mock_server, "/searchresults.html", html).await;

    let mut input = test_input(&mock_server, "Paris");
    input.simple = true;
    input.max_pages = Some(2);

    let storage = SqliteStorage::new_in_memory().unwrap();
    let (summary, records) = crawl(input, storage).await;

    // Start page and two seeded sibling pages, each listing the same hotels
    assert_eq!(summary.handled, 3);
    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Hotel du Nord", "Le Marais"]);
    assert_eq!(records[0]["rating"], 7.9);
}

#[tokio::test]
async fn test_interrupted_queue_resumes() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/hotel/fr/marais.html", hotel_page("Le Marais", "9.0")).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sweep.db");
    let input = seeded_input(&mock_server, &["/hotel/fr/marais.html"]);

    // A previous process took the request and died before settling it
    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        seed_queue(&mut storage, &input).unwrap();
        let request = storage.fetch_next().unwrap().unwrap();
        assert_eq!(
            storage.request_state(&request.unique_key).unwrap(),
            Some(RequestState::InProgress)
        );
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let (summary, records) = crawl(input, storage).await;

    assert_eq!(summary.handled, 1);
    assert_eq!(records.len(), 1);
}

#[test]
fn test_config_file_resolves_to_input() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"
[search]
query = "Paris"
check-in = "09-14-2026"
check-out = "09/16/2026"
currency = "eur"
min-score = "8.0"

[filters]
min-max-price = "100-150"

[crawler]
max-pages = 2
max-concurrency = 3

[proxy]
groups = ["RESIDENTIAL"]
password = "secret"

[output]
database-path = "sweep.db"
"#
    )
    .unwrap();

    let config = load_config(file.path()).expect("Failed to load config");
    let input = resolve(&config).expect("Failed to resolve config");

    assert_eq!(
        input.target,
        CrawlTarget::Search {
            query: "Paris".to_string(),
            dest_type: "city".to_string()
        }
    );
    assert_eq!(input.currency, "EUR");
    assert_eq!(input.min_score, 8.0);
    assert_eq!(input.min_max_price, Some(PriceBand::From100To150));
    assert_eq!(input.max_pages, Some(2));
    assert_eq!(input.max_concurrency, 3);
    assert_eq!(input.proxy.groups, vec!["RESIDENTIAL".to_string()]);
    assert_eq!(input.stay.as_ref().map(|s| s.check_out.day.as_str()), Some("16"));
}
