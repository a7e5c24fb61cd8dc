//! Centralized runtime constants and monitor configuration.
//!
//! Tunable intervals and interface name prefixes are collected here so they
//! can be found and adjusted in a single place rather than scattered across
//! modules.

use std::time::Duration;

use crate::core::counters::LinkClassifier;

/// Interval at which the monitor samples interface counters (seconds).
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Suffix appended to unit strings of per-second readings.
pub const RATE_SUFFIX: &str = "/s";

/// Bytes per kilobyte. Units are decimal, matching file-size conventions.
pub const BYTES_PER_KB: i64 = 1000;

/// Wifi interface name prefixes on Apple platforms.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub const DEFAULT_WIFI_PREFIXES: &[&str] = &["en"];
/// Cellular (WWAN) interface name prefixes on Apple platforms.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub const DEFAULT_CELLULAR_PREFIXES: &[&str] = &["pdp_ip"];

/// Wifi interface name prefixes (`wlan0`, `wlp2s0`, ...).
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub const DEFAULT_WIFI_PREFIXES: &[&str] = &["wl"];
/// Cellular (WWAN) interface name prefixes (`wwan0`, `rmnet_data0`, ...).
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub const DEFAULT_CELLULAR_PREFIXES: &[&str] = &["wwan", "rmnet"];

const ENV_TICK_MS: &str = "NETFLOWS_TICK_MS";
const ENV_WIFI_PREFIXES: &str = "NETFLOWS_WIFI_PREFIXES";
const ENV_CELLULAR_PREFIXES: &str = "NETFLOWS_CELLULAR_PREFIXES";

/// Settings for a [`crate::TrafficMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Period of the sampling tick. Also the default wait window for pulls.
    pub tick_interval: Duration,
    /// How interface names map to link classes.
    pub classifier: LinkClassifier,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(TICK_INTERVAL_SECS),
            classifier: LinkClassifier::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_wifi_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier.wifi_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cellular_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier.cellular_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Defaults overridden by `NETFLOWS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Invalid values are logged and ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TICK_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.tick_interval = Duration::from_millis(ms),
                _ => tracing::warn!("Ignoring invalid {ENV_TICK_MS}={raw:?}"),
            }
        }
        if let Some(raw) = lookup(ENV_WIFI_PREFIXES) {
            match parse_prefix_list(&raw) {
                Some(prefixes) => self.classifier.wifi_prefixes = prefixes,
                None => tracing::warn!("Ignoring empty {ENV_WIFI_PREFIXES}"),
            }
        }
        if let Some(raw) = lookup(ENV_CELLULAR_PREFIXES) {
            match parse_prefix_list(&raw) {
                Some(prefixes) => self.classifier.cellular_prefixes = prefixes,
                None => tracing::warn!("Ignoring empty {ENV_CELLULAR_PREFIXES}"),
            }
        }
        self
    }
}

fn parse_prefix_list(raw: &str) -> Option<Vec<String>> {
    let prefixes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();
    (!prefixes.is_empty()).then_some(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_tick_is_one_second() {
        assert_eq!(MonitorConfig::default().tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_all_constants_positive() {
        const _: () = assert!(TICK_INTERVAL_SECS > 0);
        const _: () = assert!(BYTES_PER_KB > 0);
        assert!(!DEFAULT_WIFI_PREFIXES.is_empty());
        assert!(!DEFAULT_CELLULAR_PREFIXES.is_empty());
    }

    #[test]
    fn test_overrides_apply_tick_and_prefixes() {
        let config = MonitorConfig::default().apply_overrides(lookup(&[
            ("NETFLOWS_TICK_MS", "250"),
            ("NETFLOWS_WIFI_PREFIXES", "wlan, wlp"),
            ("NETFLOWS_CELLULAR_PREFIXES", "usb"),
        ]));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.classifier.wifi_prefixes, vec!["wlan", "wlp"]);
        assert_eq!(config.classifier.cellular_prefixes, vec!["usb"]);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let config = MonitorConfig::default().apply_overrides(lookup(&[
            ("NETFLOWS_TICK_MS", "0"),
            ("NETFLOWS_WIFI_PREFIXES", " , "),
        ]));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_builder_replaces_prefixes() {
        let config = MonitorConfig::default()
            .with_wifi_prefixes(["wifi"])
            .with_cellular_prefixes(vec![String::from("cell")]);
        assert_eq!(config.classifier.wifi_prefixes, vec!["wifi"]);
        assert_eq!(config.classifier.cellular_prefixes, vec!["cell"]);
    }
}
