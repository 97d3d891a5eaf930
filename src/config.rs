use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::error::AppError;
use crate::ui::ChartMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_periodicity")]
    pub periodicity: String,
    #[serde(default = "default_history_bars")]
    pub history_bars: usize,
    #[serde(default = "default_price_type")]
    pub price_type: String,
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_app_session_id")]
    pub app_session_id: String,
    #[serde(skip)]
    pub web_api_id: String,
    #[serde(skip)]
    pub web_api_key: String,
    #[serde(skip)]
    pub web_api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub refresh_rate_ms: u64,
    #[serde(default)]
    pub chart_mode: ChartMode,
    pub visible_bars: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 500,
            chart_mode: ChartMode::Candles,
            visible_bars: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_symbol() -> String {
    "EURUSD".to_string()
}

fn default_periodicity() -> String {
    "M1".to_string()
}

fn default_history_bars() -> usize {
    1000
}

fn default_price_type() -> String {
    "bid".to_string()
}

fn default_device_id() -> String {
    "fxview".to_string()
}

fn default_app_session_id() -> String {
    "QuotesSession".to_string()
}

/// Parse an FXOpen periodicity code (e.g. "S1", "M1", "H4", "D1", "W1", "MN1") into milliseconds.
pub fn parse_periodicity_ms(s: &str) -> Result<i64> {
    let s = s.trim();
    let (unit_ms, num_str): (i64, &str) = if let Some(rest) = s.strip_prefix("MN") {
        (30 * 86_400_000, rest)
    } else {
        let mut chars = s.chars();
        let unit = match chars.next() {
            Some('S') => 1_000,
            Some('M') => 60_000,
            Some('H') => 3_600_000,
            Some('D') => 86_400_000,
            Some('W') => 7 * 86_400_000,
            Some(c) => bail!(
                "invalid periodicity '{}': unsupported unit '{}', expected one of S/M/H/D/W/MN",
                s,
                c
            ),
            None => bail!("invalid periodicity '': expected format like 'M1'"),
        };
        (unit, chars.as_str())
    };

    let n: i64 = num_str.parse().with_context(|| {
        format!(
            "invalid periodicity '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n <= 0 {
        bail!("invalid periodicity '{}': quantity must be > 0", s);
    }

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid periodicity '{}': value is too large", s))
}

impl FeedConfig {
    pub fn interval_ms(&self) -> Result<i64> {
        parse_periodicity_ms(&self.periodicity)
    }
}

/// Look up every name with `lookup`, failing once with all missing names.
pub fn require_vars<const N: usize, F>(names: [&str; N], lookup: F) -> Result<[String; N]>
where
    F: Fn(&str) -> Option<String>,
{
    let values = names.map(|name| lookup(name).filter(|v| !v.trim().is_empty()));
    let missing: Vec<&str> = names
        .iter()
        .zip(values.iter())
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "missing in .env or environment: {}",
            missing.join(", ")
        ))
        .into());
    }
    Ok(values.map(Option::unwrap_or_default))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config/default.toml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_str = std::fs::read_to_string(config_path)
            .map_err(AppError::Io)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        if let Ok(url) = std::env::var("FEED_URL") {
            if !url.trim().is_empty() {
                config.feed.url = url;
            }
        }
        if config.feed.url.trim().is_empty() {
            bail!("feed.url is empty and FEED_URL is not set");
        }

        let [id, key, secret] =
            require_vars(["WEB_API_ID", "WEB_API_KEY", "WEB_API_SECRET"], |name| {
                std::env::var(name).ok()
            })?;
        config.feed.web_api_id = id;
        config.feed.web_api_key = key;
        config.feed.web_api_secret = secret;

        config
            .feed
            .interval_ms()
            .context("feed.periodicity is invalid")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let toml_str = r#"
[feed]
url = "wss://marginalttlivewebapi.fxopen.net:3000"
symbol = "EURUSD"
periodicity = "M1"
history_bars = 500

[ui]
refresh_rate_ms = 250
chart_mode = "line"
visible_bars = 120

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.feed.symbol, "EURUSD");
        assert_eq!(config.feed.history_bars, 500);
        assert_eq!(config.feed.price_type, "bid");
        assert_eq!(config.ui.chart_mode, ChartMode::Line);
        assert_eq!(config.ui.visible_bars, 120);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[feed]\n").unwrap();
        assert_eq!(config.feed.symbol, "EURUSD");
        assert_eq!(config.feed.periodicity, "M1");
        assert_eq!(config.feed.history_bars, 1000);
        assert_eq!(config.ui.refresh_rate_ms, 500);
        assert_eq!(config.ui.chart_mode, ChartMode::Candles);
        assert_eq!(config.logging.level, "info");
    }
}
