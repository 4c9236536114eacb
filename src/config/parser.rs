use crate::config::types::{Config, SessionInput};
use crate::config::validation::resolve;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Only the TOML shape is checked here; pass the result to [`resolve`] to
/// validate it into a [`SessionInput`].
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use hotel_sweep::config::load_config;
///
/// let config = load_config(Path::new("sweep.toml")).unwrap();
/// println!("Currency: {}", config.search.currency);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between crawl runs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration, resolves it into session input and hashes the file
///
/// The input is resolved exactly once, so environment lookups and their
/// warnings happen a single time per run.
pub fn load_config_with_hash(
    path: &Path,
) -> Result<(Config, SessionInput, String), ConfigError> {
    let config = load_config(path)?;
    let input = resolve(&config)?;
    let hash = compute_config_hash(path)?;
    Ok((config, input, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[search]
query = "paris"
currency = "EUR"
language = "en_gb"
adults = 2
rooms = 1
min-score = "8.5"

[filters]
min-max-price = "100-150"

[crawler]
max-concurrency = 2
simple = true

[proxy]
groups = ["RESIDENTIAL"]
password = "secret"

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.search.query.as_deref(), Some("paris"));
        assert_eq!(config.search.min_score, Some(8.5));
        assert_eq!(config.filters.property_type, "none");
        assert_eq!(config.crawler.max_concurrency, 2);
        assert!(config.crawler.simple);
        assert!(config.crawler.cache_responses);
    }

    #[test]
    fn test_numeric_min_score() {
        let config_content = r#"
[search]
query = "rome"
min-score = 7

[proxy]

[output]
database-path = "./test.db"
"#;
        let config = parse_config(config_content).unwrap();
        assert_eq!(config.search.min_score, Some(7.0));
    }

    #[test]
    fn test_non_numeric_min_score() {
        let config_content = r#"
[search]
query = "rome"
min-score = "great"

[proxy]

[output]
database-path = "./test.db"
"#;
        assert!(matches!(
            parse_config(config_content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/sweep.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_without_proxy() {
        let config_content = r#"
[search]
query = "paris"

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();
        assert!(config.proxy.is_none());

        let result = load_config_with_hash(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_with_hash_resolves_input() {
        let config_content = r#"
[search]
query = "lisbon"
currency = "EUR"

[proxy]
password = "secret"

[output]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let (config, input, hash) = load_config_with_hash(file.path()).unwrap();

        assert_eq!(config.search.query.as_deref(), Some("lisbon"));
        assert_eq!(input.currency, "EUR");
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }
}
