//! Service configuration, extracted once from the environment at startup and
//! passed explicitly to every component that needs it.

use crate::web::query::Sort;
use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Page sizes the search page offers.
pub const ALLOWED_LIMITS: [u32; 3] = [10, 25, 50];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL of the search and topic APIs.
    #[serde(default = "default_api_router_url")]
    pub api_router_url: String,
    #[serde(default = "default_renderer_url")]
    pub renderer_url: String,
    #[serde(default, deserialize_with = "optional_string")]
    pub service_auth_token: Option<String>,
    #[serde(default)]
    pub is_publishing: bool,
    /// Absent means refresh caches once at startup only.
    #[serde(default, deserialize_with = "optional_duration")]
    pub cache_update_interval: Option<Duration>,
    #[serde(default)]
    pub enable_census_topic_filter_option: bool,
    #[serde(default = "default_census_topic_id", deserialize_with = "string")]
    pub census_topic_id: String,
    #[serde(default)]
    pub enable_new_navbar: bool,
    #[serde(default = "default_languages", deserialize_with = "string_list")]
    pub supported_languages: Vec<String>,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_sort")]
    pub default_sort: String,
    #[serde(default = "default_topic_api_timeout", deserialize_with = "duration")]
    pub topic_api_timeout: Duration,
    #[serde(default = "default_shutdown_timeout", deserialize_with = "duration")]
    pub shutdown_timeout: Duration,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_port() -> u16 {
    25000
}

fn default_api_router_url() -> String {
    "http://localhost:23200/v1".to_owned()
}

fn default_renderer_url() -> String {
    "http://localhost:20010".to_owned()
}

fn default_census_topic_id() -> String {
    "4445".to_owned()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_owned(), "cy".to_owned()]
}

fn default_limit() -> u32 {
    10
}

fn default_sort() -> String {
    "relevance".to_owned()
}

fn default_topic_api_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment.extract().context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !ALLOWED_LIMITS.contains(&self.default_limit) {
            anyhow::bail!(
                "DEFAULT_LIMIT must be one of {ALLOWED_LIMITS:?}, got {}",
                self.default_limit
            );
        }
        if Sort::parse(&self.default_sort).is_none() {
            anyhow::bail!(
                "DEFAULT_SORT must be one of {:?}, got '{}'",
                Sort::ALL.map(Sort::as_str),
                self.default_sort
            );
        }
        if self.supported_languages.is_empty() {
            anyhow::bail!("SUPPORTED_LANGUAGES must name at least one language");
        }
        url::Url::parse(&self.api_router_url).context("API_ROUTER_URL is not a valid URL")?;
        url::Url::parse(&self.renderer_url).context("RENDERER_URL is not a valid URL")?;
        Ok(())
    }
}

/// Env values are typed by figment, so numeric-looking strings arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

fn optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_string)
        .filter(|s| !s.is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrString {
    List(Vec<String>),
    Str(String),
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => items,
        ListOrString::Str(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
    })
}

/// Parse a duration such as `30s`, `10m` or `1h`. Bare numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let parsed = DurationParser::with_all_time_units()
        .parse(s.trim())
        .map_err(|e| format!("invalid duration '{s}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{s}': {e}"))
}

fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    match Scalar::deserialize(deserializer)? {
        Scalar::Int(n) if n >= 0 => Ok(Duration::from_secs(n as u64)),
        other => parse_duration(&other.into_string()).map_err(serde::de::Error::custom),
    }
}

fn optional_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Int(n)) if n >= 0 => Ok(Some(Duration::from_secs(n as u64))),
        Some(other) => parse_duration(&other.into_string())
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
