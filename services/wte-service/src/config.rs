use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::google::DEFAULT_GOOGLE_MAPS_BASE_URL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_LANGUAGE: &str = "zh-TW";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub google_maps_api_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub google_maps_base_url: String,
    pub gemini_base_url: String,
    pub language: String,
}

impl ServiceConfig {
    /// Reads the process environment after loading `.env` when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |var: &str| -> Result<String> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{var} must be set (environment or .env)"))
        };
        let or_default =
            |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_owned());

        let bind_raw = or_default("WTE_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("WTE_BIND_ADDR is not a socket address: {bind_raw}"))?;

        Ok(Self {
            bind_addr,
            google_maps_api_key: require("GOOGLE_MAPS_API_KEY")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: or_default("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            google_maps_base_url: or_default("GOOGLE_MAPS_BASE_URL", DEFAULT_GOOGLE_MAPS_BASE_URL),
            gemini_base_url: or_default("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            language: or_default("WTE_LANGUAGE", DEFAULT_LANGUAGE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServiceConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServiceConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = config_from(&[("GOOGLE_MAPS_API_KEY", "g"), ("GEMINI_API_KEY", "m")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.language, "zh-TW");
        assert_eq!(config.google_maps_base_url, DEFAULT_GOOGLE_MAPS_BASE_URL);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = config_from(&[("GOOGLE_MAPS_API_KEY", "g")]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(config_from(&[("GOOGLE_MAPS_API_KEY", " "), ("GEMINI_API_KEY", "m")]).is_err());
    }

    #[test]
    fn overrides_are_honoured() {
        let config = config_from(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("GEMINI_API_KEY", "m"),
            ("WTE_BIND_ADDR", "127.0.0.1:8081"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("WTE_LANGUAGE", "en"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.language, "en");
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let err = config_from(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("GEMINI_API_KEY", "m"),
            ("WTE_BIND_ADDR", "localhost"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("WTE_BIND_ADDR"));
    }
}
