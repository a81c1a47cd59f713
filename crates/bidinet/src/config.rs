use std::env;
use std::path::PathBuf;

use bidinet_core::DEFAULT_MAX_TRACKED_REQUESTS;
use serde::Deserialize;

use crate::BidiNetError;

pub const ENV_MAX_TOTAL_DATA_SIZE: &str = "BIDINET_MAX_TOTAL_DATA_SIZE";
pub const ENV_EVENT_LOG_PATH: &str = "BIDINET_EVENT_LOG_PATH";
pub const ENV_EVENT_LOG_FLUSH_EVERY: &str = "BIDINET_EVENT_LOG_FLUSH_EVERY";

pub const DEFAULT_MAX_TOTAL_DATA_SIZE: u64 = 200_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub data: DataConfig,
    pub events: EventsConfig,
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Ceiling on retained collected bytes across every collector.
    pub max_total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    pub log_path: Option<PathBuf>,
    pub log_flush_every: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub max_tracked_requests: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            max_total_size: DEFAULT_MAX_TOTAL_DATA_SIZE,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_flush_every: 1,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_tracked_requests: DEFAULT_MAX_TRACKED_REQUESTS,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, BidiNetError> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| BidiNetError::InvalidConfig(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BidiNetError> {
        if self.data.max_total_size == 0 {
            return Err(BidiNetError::InvalidConfig(
                "data.max_total_size must be greater than zero".to_string(),
            ));
        }
        if self.events.log_flush_every == 0 {
            return Err(BidiNetError::InvalidConfig(
                "events.log_flush_every must be greater than zero".to_string(),
            ));
        }
        if self
            .events
            .log_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(BidiNetError::InvalidConfig(
                "events.log_path must not be empty".to_string(),
            ));
        }
        if self.lifecycle.max_tracked_requests == 0 {
            return Err(BidiNetError::InvalidConfig(
                "lifecycle.max_tracked_requests must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies `BIDINET_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, BidiNetError> {
        self.with_overrides_from(|name| env::var(name))
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, BidiNetError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        if let Some(max_total_size) = parse_nonzero_u64(&lookup, ENV_MAX_TOTAL_DATA_SIZE)? {
            self.data.max_total_size = max_total_size;
        }
        if let Some(path) = read_trimmed(&lookup, ENV_EVENT_LOG_PATH)? {
            self.events.log_path = Some(PathBuf::from(path));
        }
        if let Some(flush_every) = parse_nonzero_u64(&lookup, ENV_EVENT_LOG_FLUSH_EVERY)? {
            self.events.log_flush_every = usize::try_from(flush_every).map_err(|_| {
                BidiNetError::InvalidConfig(format!("{ENV_EVENT_LOG_FLUSH_EVERY} is too large"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn read_trimmed<F>(lookup: &F, name: &str) -> Result<Option<String>, BidiNetError>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(raw) => {
            let value = raw.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(BidiNetError::InvalidConfig(format!(
            "{name} must be valid UTF-8"
        ))),
    }
}

fn parse_nonzero_u64<F>(lookup: &F, name: &str) -> Result<Option<u64>, BidiNetError>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    let Some(value) = read_trimmed(lookup, name)? else {
        return Ok(None);
    };
    let parsed = value.parse::<u64>().map_err(|error| {
        BidiNetError::InvalidConfig(format!("{name} must be a positive integer: {error}"))
    })?;
    if parsed == 0 {
        return Err(BidiNetError::InvalidConfig(format!(
            "{name} must be greater than zero"
        )));
    }
    Ok(Some(parsed))
}
