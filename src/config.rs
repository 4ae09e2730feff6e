// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/stats.toml";

pub const ENV_CONFIG_PATH: &str = "STATS_CONFIG_PATH";
pub const ENV_DECIMAL_PLACES: &str = "STATS_DECIMAL_PLACES";
pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";
pub const ENV_DEV_LOG: &str = "STATS_DEV_LOG";

/// Largest scale a `rust_decimal::Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Round `/statistics` decimals half-up to this many places.
    /// `None` keeps whatever precision the decimal type holds.
    pub decimal_places: Option<u32>,
    /// Expose `/metrics`.
    pub debug_routes: bool,
    /// Install the compact dev tracing subscriber.
    pub dev_log: bool,
}

impl ServiceConfig {
    /// Load using env var + fallbacks:
    /// 1) $STATS_CONFIG_PATH (must exist)
    /// 2) config/stats.toml (optional)
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top of whichever file was read.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from_file(&default)?
                } else {
                    warn!(path = DEFAULT_CONFIG_PATH, "no config file, using built-in defaults");
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(ENV_DECIMAL_PLACES) {
            let places = parse_places(&raw)?;
            if places != self.decimal_places {
                info!(from = ?self.decimal_places, to = ?places, "{ENV_DECIMAL_PLACES} overrides decimal_places");
            }
            self.decimal_places = places;
        }
        if let Some(on) = env_flag(ENV_DEBUG_ROUTES) {
            self.debug_routes = on;
        }
        if let Some(on) = env_flag(ENV_DEV_LOG) {
            self.dev_log = on;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if let Some(p) = self.decimal_places {
            if p > MAX_DECIMAL_PLACES {
                bail!("decimal_places must be <= {MAX_DECIMAL_PLACES}, got {p}");
            }
        }
        Ok(())
    }
}

fn parse_places(raw: &str) -> Result<Option<u32>> {
    let t = raw.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    t.parse::<u32>()
        .map(Some)
        .with_context(|| format!("{ENV_DECIMAL_PLACES} is not a number: {t:?}"))
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    let on = parse_flag(&raw).unwrap_or_else(|| {
        warn!(var = name, value = %raw, "unrecognised boolean, treating as off");
        false
    });
    Some(on)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
