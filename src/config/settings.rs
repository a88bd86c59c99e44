use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{ConfigError, Result};

pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
            ignore: Vec::new(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl WatchConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quiet_period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "quiet_period_ms".to_string(),
                value: self.quiet_period_ms.to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "event_buffer".to_string(),
                value: self.event_buffer.to_string(),
            });
        }
        self.ignore_set().map(|_| ())
    }

    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::new(&self.ignore)
    }
}

/// Root-relative glob patterns whose events never reach the coalescer.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<glob::Pattern>,
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| {
                glob::Pattern::new(raw).map_err(|_| ConfigError::InvalidValue {
                    key: "ignore".to_string(),
                    value: raw.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_ignored(&self, relative: &Path) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, options))
    }
}

fn default_quiet_period_ms() -> u64 {
    DEFAULT_QUIET_PERIOD_MS
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::{ConfigError, WatchConfig};

    #[test]
    fn defaults_to_half_second_quiet_period() {
        let config: WatchConfig = toml::from_str("").expect("parse empty config");
        assert_eq!(config.quiet_period(), Duration::from_millis(500));
        assert!(config.ignore.is_empty());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_zero_quiet_period() {
        let config: WatchConfig = toml::from_str("quiet_period_ms = 0").expect("parse config");
        let err = config.validate().expect_err("zero quiet period is invalid");
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "quiet_period_ms"));
    }

    #[test]
    fn ignore_patterns_match_relative_paths() {
        let config: WatchConfig =
            toml::from_str("ignore = [\"*.swp\", \"target/**\"]").expect("parse config");
        let ignore = config.ignore_set().expect("compile patterns");
        assert!(ignore.is_ignored(Path::new(".notes.txt.swp")));
        assert!(ignore.is_ignored(Path::new("target/debug/build.log")));
        assert!(!ignore.is_ignored(Path::new("src/lib.rs")));
    }

    #[test]
    fn invalid_ignore_pattern_is_reported() {
        let config: WatchConfig = toml::from_str("ignore = [\"[\"]").expect("parse config");
        assert!(config.validate().is_err());
    }
}
