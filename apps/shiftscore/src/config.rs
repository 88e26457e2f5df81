//! Server configuration.

use shiftscore_core::cache::DEFAULT_CACHE_SIZE;
use std::net::{Ipv4Addr, SocketAddr};

/// Default listen address for `shiftscore serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:9330";

/// Settings for the HTTP service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Maximum number of cached metric results.
    pub cache_size: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 9330)),
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}
