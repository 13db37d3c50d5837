//! # Client Configuration
//!
//! Runtime options for the query and directory clients.
//!
//! # Example
//!
//! ```rust
//! use srcquery_network::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig {
//!     query_timeout: Duration::from_secs(1),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use srcquery_core::Region;
use std::time::Duration;

/// Well-known Source master servers
pub const DEFAULT_MASTER_SERVERS: [&str; 4] = [
    "68.177.101.62:27011",
    "69.28.158.131:27011",
    "208.64.200.117:27011",
    "208.64.200.118:27011",
];

/// Client configuration options
///
/// # Default Values
///
/// - 3-second server query timeout
/// - 5-second master server timeout per endpoint
/// - The four well-known master servers, starting from the third
/// - Region `USWest`
/// - At most 8 pages for a full directory listing
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for one info/players/rules/ping query
    ///
    /// # Default
    /// 3 seconds
    ///
    /// # Notes
    /// - Covers the challenge round trip as well for players and rules
    /// - Covers every fragment of a split response
    pub query_timeout: Duration,

    /// Deadline for one master server attempt
    ///
    /// # Default
    /// 5 seconds
    ///
    /// # Notes
    /// - A full failure takes `master_timeout * master_servers.len()`
    pub master_timeout: Duration,

    /// Master server endpoints, tried in order (circular) on timeout
    ///
    /// # Default
    /// [`DEFAULT_MASTER_SERVERS`]
    pub master_servers: Vec<String>,

    /// Index of the endpoint the first directory query starts from
    ///
    /// # Default
    /// 2
    pub preferred_master: usize,

    /// Region byte sent with directory queries
    ///
    /// # Default
    /// `Region::USWest`
    pub region: Region,

    /// Upper bound on pages fetched by a full directory listing
    ///
    /// # Default
    /// 8
    pub max_pages: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(3),
            master_timeout: Duration::from_secs(5),
            master_servers: DEFAULT_MASTER_SERVERS.iter().map(|s| s.to_string()).collect(),
            preferred_master: 2,
            region: Region::USWest,
            max_pages: 8,
        }
    }
}

impl ClientConfig {
    /// Validate the configuration
    ///
    /// # Checks
    /// - Timeouts must be non-zero
    /// - At least one master server, none empty
    /// - `preferred_master` must index into `master_servers`
    /// - `max_pages` must be > 0
    pub fn validate(&self) -> Result<(), String> {
        if self.query_timeout.is_zero() {
            return Err("query_timeout must be > 0".to_string());
        }

        if self.master_timeout.is_zero() {
            return Err("master_timeout must be > 0".to_string());
        }

        if self.master_servers.is_empty() {
            return Err("at least one master server is required".to_string());
        }

        if self.master_servers.iter().any(|s| s.trim().is_empty()) {
            return Err("master server addresses must not be empty".to_string());
        }

        if self.preferred_master >= self.master_servers.len() {
            return Err(format!(
                "preferred_master {} out of range for {} master servers",
                self.preferred_master,
                self.master_servers.len()
            ));
        }

        if self.max_pages == 0 {
            return Err("max_pages must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.master_servers.len(), 4);
        assert_eq!(config.preferred_master, 2);
        assert_eq!(config.region, Region::USWest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_preferred_master() {
        let mut config = ClientConfig::default();
        config.preferred_master = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_master_servers() {
        let mut config = ClientConfig::default();
        config.master_servers.clear();
        config.preferred_master = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = ClientConfig::default();
        config.query_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
