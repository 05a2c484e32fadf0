//! Process configuration (spec §6 "Config keys"), loaded the way the teacher's
//! `examples/ticketing/src/config.rs` does: one field per environment variable, an
//! explicit parse-or-default for each, no configuration-framework macro magic.
//!
//! Keys are `POLYGO_`-prefixed with `.` mapped to `_` (`redis.host` →
//! `POLYGO_REDIS_HOST`), per spec §6.

use std::collections::HashSet;
use std::env;

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (built from `POLYGO_REDIS_HOST`).
    pub redis_url: String,
    /// Storyblok CDN read token.
    pub storyblok_token: String,
    /// Storyblok management OAuth token.
    pub storyblok_oauth: String,
    /// Storyblok space id.
    pub storyblok_space: String,
    /// Storyblok CDN API base.
    pub storyblok_cdn_base: String,
    /// Storyblok management API base.
    pub storyblok_mapi_base: String,
    /// Source language code recipes are authored in (original_source: `"it"`).
    pub source_language: String,
    /// Target language codes the pipeline translates into (spec §9: not a hardcoded
    /// literal `2`).
    pub target_languages: Vec<String>,
    /// The closed unit set the skip predicate never sends to the translation backend
    /// (spec §4.2 "extension point").
    pub recognized_units: HashSet<String>,
    /// `Ingest.NewStories` RPC port (default 8070).
    pub rpc_ingest_port: u16,
    /// `Translate.Translate` RPC port (default 8090).
    pub rpc_translate_port: u16,
    /// HTTP trigger/health edge port.
    pub http_port: u16,
    /// PersistStage's outbound CMS write rate limit, requests/second.
    pub persist_rate_limit_per_sec: u32,
    /// Retry bound for CMS transient errors (spec §7: "up to a small bound (3)").
    pub cms_retry_bound: u32,
    /// Google Cloud Translate v2 API key. Empty selects the deterministic
    /// [`polygo_translate::EchoTranslator`] backend instead (local runs, CI).
    pub google_translate_api_key: String,
}

impl Config {
    /// Load configuration from the process environment, defaulting any key not set.
    #[must_use]
    pub fn from_env() -> Self {
        Config {
            redis_url: env_or("POLYGO_REDIS_HOST", "redis://127.0.0.1:6379"),
            storyblok_token: env_or("POLYGO_STORYBLOK_TOKEN", ""),
            storyblok_oauth: env_or("POLYGO_STORYBLOK_OAUTH", ""),
            storyblok_space: env_or("POLYGO_STORYBLOK_SPACE", ""),
            storyblok_cdn_base: env_or("POLYGO_STORYBLOK_CDN_BASE", "https://api.storyblok.com"),
            storyblok_mapi_base: env_or("POLYGO_STORYBLOK_MAPI_BASE", "https://mapi.storyblok.com"),
            source_language: env_or("POLYGO_SOURCE_LANGUAGE", "it"),
            target_languages: env_list("POLYGO_TARGET_LANGUAGES", &["en", "fr"]),
            recognized_units: env_list("POLYGO_RECOGNIZED_UNITS", &["gr", "kg", "ml", "lt"]).into_iter().collect(),
            rpc_ingest_port: env_parsed("POLYGO_RPC_INGEST_PORT", 8070),
            rpc_translate_port: env_parsed("POLYGO_RPC_TRANSLATE_PORT", 8090),
            http_port: env_parsed("POLYGO_HTTP_PORT", 8080),
            persist_rate_limit_per_sec: env_parsed("POLYGO_PERSIST_RATE_LIMIT", 3),
            cms_retry_bound: env_parsed("POLYGO_CMS_RETRY_BOUND", 3),
            google_translate_api_key: env_or("POLYGO_GOOGLE_TRANSLATE_API_KEY", ""),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_splits_on_commas_and_trims() {
        assert_eq!(env_list("POLYGO_TEST_UNSET_LIST_XYZ", &["en", "fr"]), vec!["en", "fr"]);
    }

    #[test]
    fn env_parsed_falls_back_on_missing_or_invalid() {
        let value: u16 = env_parsed("POLYGO_TEST_UNSET_PORT_XYZ", 8080);
        assert_eq!(value, 8080);
    }
}
