use crate::config::types::{
    Config, CrawlTarget, PriceBand, ProxySettings, SessionInput, StayDate, StayDates,
    DEFAULT_SORT_BY,
};
use crate::ConfigError;
use url::Url;

/// Environment variable consulted when the proxy password is not in the config
pub const PROXY_PASSWORD_ENV: &str = "PROXY_PASSWORD";

/// Validates the configuration and resolves it into the immutable crawl input
pub fn resolve(config: &Config) -> Result<SessionInput, ConfigError> {
    let target = resolve_target(config)?;

    let Some(proxy) = &config.proxy else {
        return Err(ConfigError::Validation(
            "a [proxy] section is required, the crawler cannot run without a proxy".to_string(),
        ));
    };

    let property_type = match config.filters.property_type.trim() {
        "" | "none" => None,
        other => Some(other.to_string()),
    };

    if config.filters.use_filters && property_type.is_some() {
        return Err(ConfigError::Validation(
            "property-type and use-filters cannot be used at the same time".to_string(),
        ));
    }

    let min_max_price = match config.filters.min_max_price.trim() {
        "" | "none" => None,
        band => Some(band.parse::<PriceBand>()?),
    };

    let stay = resolve_stay(
        config.search.check_in.as_deref(),
        config.search.check_out.as_deref(),
    )?;

    let currency = config.search.currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(format!(
            "currency must be a three-letter code, got '{}'",
            config.search.currency
        )));
    }

    if config.crawler.max_concurrency < 1 || config.crawler.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.crawler.max_concurrency
        )));
    }

    Url::parse(&config.crawler.site_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-url: {}", e)))?;
    Url::parse(&proxy.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy url: {}", e)))?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    let password = match &proxy.password {
        Some(password) => password.clone(),
        None => std::env::var(PROXY_PASSWORD_ENV).unwrap_or_else(|_| {
            tracing::warn!("No proxy password configured and {} is unset", PROXY_PASSWORD_ENV);
            String::new()
        }),
    };

    let sort_by = config
        .search
        .sort_by
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SORT_BY)
        .to_string();

    Ok(SessionInput {
        target,
        stay,
        currency,
        language: config.search.language.clone().filter(|l| !l.is_empty()),
        adults: config.search.adults,
        children: config.search.children,
        rooms: config.search.rooms,
        sort_by,
        min_score: config.search.min_score.unwrap_or(0.0),
        property_type,
        min_max_price,
        use_filters: config.filters.use_filters,
        max_pages: config.crawler.max_pages.filter(|pages| *pages > 0),
        simple: config.crawler.simple,
        cache_responses: config.crawler.cache_responses,
        test_proxy: config.crawler.test_proxy,
        max_concurrency: config.crawler.max_concurrency as usize,
        max_request_retries: config.crawler.max_request_retries,
        site_url: config.crawler.site_url.trim_end_matches('/').to_string(),
        proxy: ProxySettings {
            url: proxy.url.clone(),
            groups: proxy.groups.clone(),
            password,
        },
    })
}

/// Exactly one of `query` and `start-urls` must be given
fn resolve_target(config: &Config) -> Result<CrawlTarget, ConfigError> {
    let query = config
        .search
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    match (query, config.search.start_urls.is_empty()) {
        (None, true) => Err(ConfigError::Validation(
            "missing search query or start-urls".to_string(),
        )),
        (Some(_), false) => Err(ConfigError::Validation(
            "search query and start-urls cannot be used together".to_string(),
        )),
        (Some(query), true) => Ok(CrawlTarget::Search {
            query: query.to_string(),
            dest_type: config
                .search
                .dest_type
                .clone()
                .unwrap_or_else(|| "city".to_string()),
        }),
        (None, false) => {
            for start_url in &config.search.start_urls {
                Url::parse(start_url).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", start_url, e))
                })?;
            }
            Ok(CrawlTarget::StartUrls(config.search.start_urls.clone()))
        }
    }
}

/// Dates only take effect when both ends of the stay are given
fn resolve_stay(
    check_in: Option<&str>,
    check_out: Option<&str>,
) -> Result<Option<StayDates>, ConfigError> {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => Ok(Some(StayDates {
            check_in: check_in.parse::<StayDate>()?,
            check_out: check_out.parse::<StayDate>()?,
        })),
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("Only one of check-in/check-out is set, ignoring stay dates");
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}
