#![allow(clippy::must_use_candidate)]

//! Configuration for the chorus chat client
//!
//! A single TOML file names the provider targets a user can talk to, the
//! default generation settings, HTTP timeouts, and log output.

mod env;
pub mod generation;
pub mod http;
mod loader;
pub mod log;
pub mod provider;

use indexmap::IndexMap;
use serde::Deserialize;

pub use generation::*;
pub use http::*;
pub use log::*;
pub use provider::*;

/// Top-level chorus configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider targets keyed by label
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Default generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Log output settings
    #[serde(default)]
    pub log: LogConfig,
}
