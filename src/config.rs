//! Process-wide configuration.
//!
//! Resolved once at startup from `ALUMNIUM_*` environment variables, with CLI
//! overrides applied on top. Every value has a fallback.

use crate::engine::{Model, DEFAULT_MODEL};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8013";
pub const DEFAULT_CHROMEDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_APPIUM_SERVER: &str = "http://localhost:4723";
pub const DEFAULT_IOS_DEVICE_NAME: &str = "iPhone 16";
pub const DEFAULT_IOS_PLATFORM_VERSION: &str = "18.4";
/// Default bound on a single engine or driver call (5 minutes)
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 300;
/// Maximum allowed call timeout (1 hour)
pub const MAX_CALL_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Browser (chromedriver) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub chrome_args: Vec<String>,
}

/// iOS (Appium XCUITest) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IosSettings {
    pub appium_server: String,
    pub device_name: String,
    pub platform_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Model bound to every newly started driver.
    pub model: Model,
    /// Base URL of the automation engine server.
    pub engine_url: String,
    pub browser: BrowserSettings,
    pub ios: IosSettings,
    /// Upper bound for each call into a driver or engine.
    pub call_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: Model::default(),
            engine_url: DEFAULT_SERVER_URL.to_string(),
            browser: BrowserSettings {
                webdriver_url: DEFAULT_CHROMEDRIVER_URL.to_string(),
                chrome_args: Vec::new(),
            },
            ios: IosSettings {
                appium_server: DEFAULT_APPIUM_SERVER.to_string(),
                device_name: DEFAULT_IOS_DEVICE_NAME.to_string(),
                platform_version: DEFAULT_IOS_PLATFORM_VERSION.to_string(),
            },
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Settings::default();

        let model = parse_model(get("ALUMNIUM_MODEL").as_deref().unwrap_or(DEFAULT_MODEL))?;

        let call_timeout = match get("ALUMNIUM_MCP_CALL_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => defaults.call_timeout,
        };

        let chrome_args = get("ALUMNIUM_CHROME_ARGS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            model,
            engine_url: get("ALUMNIUM_SERVER_URL").unwrap_or(defaults.engine_url),
            browser: BrowserSettings {
                webdriver_url: get("ALUMNIUM_CHROMEDRIVER_URL")
                    .unwrap_or(defaults.browser.webdriver_url),
                chrome_args,
            },
            ios: IosSettings {
                appium_server: get("ALUMNIUM_APPIUM_SERVER").unwrap_or(defaults.ios.appium_server),
                device_name: get("ALUMNIUM_IOS_DEVICE_NAME").unwrap_or(defaults.ios.device_name),
                platform_version: get("ALUMNIUM_IOS_PLATFORM_VERSION")
                    .unwrap_or(defaults.ios.platform_version),
            },
            call_timeout,
        })
    }

    pub fn with_model(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.model = parse_model(raw)?;
        Ok(self)
    }

    pub fn with_call_timeout_secs(mut self, secs: u64) -> Result<Self, ConfigError> {
        self.call_timeout = parse_timeout(&secs.to_string())?;
        Ok(self)
    }
}

fn parse_model(raw: &str) -> Result<Model, ConfigError> {
    raw.parse().map_err(|reason| ConfigError::Invalid {
        var: "ALUMNIUM_MODEL",
        reason,
    })
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "ALUMNIUM_MCP_CALL_TIMEOUT_SECS",
        reason,
    };
    let secs: u64 = raw
        .parse()
        .map_err(|_| invalid(format!("not a number of seconds: {raw}")))?;
    if secs == 0 || secs > MAX_CALL_TIMEOUT_SECS {
        return Err(invalid(format!(
            "must be between 1 and {MAX_CALL_TIMEOUT_SECS}, got {secs}"
        )));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Provider;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_fallbacks() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model.to_string(), DEFAULT_MODEL);
        assert_eq!(settings.ios.device_name, "iPhone 16");
        assert_eq!(settings.ios.platform_version, "18.4");
        assert_eq!(settings.ios.appium_server, "http://localhost:4723");
    }

    #[test]
    fn environment_overrides_apply() {
        let settings = Settings::from_lookup(lookup(&[
            ("ALUMNIUM_MODEL", "openai/gpt-4.1"),
            ("ALUMNIUM_IOS_DEVICE_NAME", "iPhone 15 Pro"),
            ("ALUMNIUM_CHROME_ARGS", "--headless=new, --no-sandbox,"),
            ("ALUMNIUM_MCP_CALL_TIMEOUT_SECS", "42"),
        ]))
        .unwrap();
        assert_eq!(settings.model.provider, Provider::Openai);
        assert_eq!(settings.model.name, "gpt-4.1");
        assert_eq!(settings.ios.device_name, "iPhone 15 Pro");
        assert_eq!(settings.browser.chrome_args, vec!["--headless=new", "--no-sandbox"]);
        assert_eq!(settings.call_timeout, Duration::from_secs(42));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = Settings::from_lookup(lookup(&[("ALUMNIUM_SERVER_URL", "  ")])).unwrap();
        assert_eq!(settings.engine_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(Settings::from_lookup(lookup(&[("ALUMNIUM_MODEL", "nobody/else")])).is_err());
        assert!(
            Settings::from_lookup(lookup(&[("ALUMNIUM_MCP_CALL_TIMEOUT_SECS", "soon")])).is_err()
        );
        assert!(Settings::default().with_call_timeout_secs(0).is_err());
    }
}
