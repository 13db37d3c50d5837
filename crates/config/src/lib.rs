//! srcquery Configuration Management
//!
//! Loads client options from `queryoptions.txt`.
//!
//! # Format
//!
//! ```text
//! # Per-query timeout in seconds
//! timeout = 2.5
//! mastertimeout = 5
//! masterservers = 208.64.200.117:27011, 208.64.200.118:27011
//! preferredmaster = 0
//! region = europe
//! maxpages = 4
//! filter.appid = 440
//! filter.dedicated = true
//! ```
//!
//! Unknown keys and unparsable values are logged and ignored; the option
//! keeps its default.

use srcquery_core::{QueryError, Region, Result};
use srcquery_network::{ClientConfig, DEFAULT_MASTER_SERVERS};
use srcquery_protocol::{Filter, FilterValue};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// File read by [`QueryOptions::load_default`]
pub const DEFAULT_OPTIONS_FILE: &str = "queryoptions.txt";

/// Client options from `queryoptions.txt`
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Per-query timeout (from "timeout" option, seconds)
    pub timeout: Duration,
    /// Per-master-server timeout (from "mastertimeout" option, seconds)
    pub master_timeout: Duration,
    /// Master server endpoints (from "masterservers" option, comma list)
    pub master_servers: Vec<String>,
    /// Starting master server index (from "preferredmaster" option)
    pub preferred_master: usize,
    /// Directory region (from "region" option, name or number)
    pub region: Region,
    /// Directory page limit (from "maxpages" option)
    pub max_pages: usize,
    /// Directory filter (from "filter.<key>" options)
    pub filter: Filter,
}

impl Default for QueryOptions {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            timeout: defaults.query_timeout,
            master_timeout: defaults.master_timeout,
            master_servers: DEFAULT_MASTER_SERVERS.iter().map(|s| s.to_string()).collect(),
            preferred_master: defaults.preferred_master,
            region: defaults.region,
            max_pages: defaults.max_pages,
            filter: Filter::new(),
        }
    }
}

impl QueryOptions {
    /// Load options from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        tracing::debug!("Loaded options from {}", path.display());
        Self::parse(&content)
    }

    /// Load `queryoptions.txt` from the working directory
    ///
    /// A missing file yields the defaults.
    pub fn load_default() -> Result<Self> {
        if Path::new(DEFAULT_OPTIONS_FILE).exists() {
            Self::load(DEFAULT_OPTIONS_FILE)
        } else {
            tracing::debug!("No {} found, using defaults", DEFAULT_OPTIONS_FILE);
            Ok(Self::default())
        }
    }

    /// Parse `queryoptions.txt` content
    pub fn parse(content: &str) -> Result<Self> {
        let mut options = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => options.parse_option(key.trim(), value.trim()),
                None => tracing::warn!("Ignoring malformed option line: {}", line),
            }
        }

        options.to_client_config().validate().map_err(QueryError::Config)?;
        Ok(options)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        if let Some(filter_key) = key.strip_prefix("filter.") {
            if filter_key.is_empty() {
                tracing::warn!("Ignoring filter option without a key");
            } else {
                self.filter.set(filter_key, parse_filter_value(value));
            }
            return;
        }

        match key.to_lowercase().as_str() {
            "timeout" => {
                if let Some(secs) = parse_or_warn(key, value) {
                    self.timeout = secs_to_duration(key, secs).unwrap_or(self.timeout);
                }
            }
            "mastertimeout" => {
                if let Some(secs) = parse_or_warn(key, value) {
                    self.master_timeout =
                        secs_to_duration(key, secs).unwrap_or(self.master_timeout);
                }
            }
            "masterservers" => {
                self.master_servers = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "preferredmaster" => {
                self.preferred_master = parse_or_warn(key, value).unwrap_or(self.preferred_master);
            }
            "region" => match Region::from_name(value) {
                Some(region) => self.region = region,
                None => tracing::warn!("Unknown region '{}', keeping {:?}", value, self.region),
            },
            "maxpages" => {
                self.max_pages = parse_or_warn(key, value).unwrap_or(self.max_pages);
            }
            _ => {
                tracing::debug!("Unknown option: {} = {}", key, value);
            }
        }
    }

    /// Runtime configuration for the query clients
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            query_timeout: self.timeout,
            master_timeout: self.master_timeout,
            master_servers: self.master_servers.clone(),
            preferred_master: self.preferred_master,
            region: self.region,
            max_pages: self.max_pages,
        }
    }

    pub fn into_client_config(self) -> ClientConfig {
        self.to_client_config()
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Query options:");
        tracing::info!("  Timeout: {:?}", self.timeout);
        tracing::info!("  Master timeout: {:?}", self.master_timeout);
        for (i, server) in self.master_servers.iter().enumerate() {
            let marker = if i == self.preferred_master { " (preferred)" } else { "" };
            tracing::info!("  Master {}: {}{}", i, server, marker);
        }
        tracing::info!("  Region: {:?}", self.region);
        tracing::info!("  Max pages: {}", self.max_pages);
        if !self.filter.is_empty() {
            let keys: Vec<&str> = self.filter.keys().collect();
            tracing::info!("  Filter keys: {}", keys.join(", "));
        }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}', keeping default", key, value);
            None
        }
    }
}

fn secs_to_duration(key: &str, secs: f64) -> Option<Duration> {
    let duration = Duration::try_from_secs_f64(secs).ok();
    if duration.is_none() {
        tracing::warn!("Invalid duration for {}: {}, keeping default", key, secs);
    }
    duration
}

/// Parse a filter option value
///
/// Integers and booleans keep their type; everything else is text.
pub fn parse_filter_value(value: &str) -> FilterValue {
    if let Ok(n) = value.parse::<i64>() {
        return FilterValue::Int(n);
    }
    match value.to_lowercase().as_str() {
        "true" => FilterValue::Bool(true),
        "false" => FilterValue::Bool(false),
        _ => FilterValue::Text(value.to_string()),
    }
}
