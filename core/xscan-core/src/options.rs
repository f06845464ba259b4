//! Scanner options and the per-query runtime state handed to hosted readers.
//!
//! Options resolve in three layers: built-in defaults, an optional JSON file,
//! then `XSCAN_*` environment variables.

use crate::error::{XscanError, XscanResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_BATCH_SIZE: &str = "XSCAN_BATCH_SIZE";
pub const ENV_TIME_ZONE: &str = "XSCAN_TIME_ZONE";
pub const ENV_TRACE_PARAMETERS: &str = "XSCAN_TRACE_PARAMETERS";

const DEFAULT_BATCH_SIZE: usize = 4096;

/// 스캐너 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerOptions {
    /// Preferred rows per block requested from the hosted reader
    pub batch_size: usize,
    /// Session time zone forwarded to the hosted reader
    pub time_zone: String,
    /// Log the (redacted) parameter map at construction
    pub trace_parameters: bool,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            time_zone: "UTC".to_string(),
            trace_parameters: false,
        }
    }
}

impl ScannerOptions {
    /// Defaults overridden by the environment.
    pub fn from_env() -> XscanResult<Self> {
        Self::default().with_env_overrides()
    }

    /// JSON file overridden by the environment.
    pub fn load(path: &Path) -> XscanResult<Self> {
        let content = fs::read_to_string(path)?;
        let options: ScannerOptions = serde_json::from_str(&content)?;
        options.with_env_overrides()
    }

    pub fn save(&self, path: &Path) -> XscanResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn with_env_overrides(mut self) -> XscanResult<Self> {
        if let Ok(value) = env::var(ENV_BATCH_SIZE) {
            self.batch_size = value.parse().map_err(|_| {
                XscanError::Config(format!("{ENV_BATCH_SIZE}: '{value}' is not a row count"))
            })?;
        }
        if let Ok(value) = env::var(ENV_TIME_ZONE) {
            self.time_zone = value;
        }
        if let Ok(value) = env::var(ENV_TRACE_PARAMETERS) {
            self.trace_parameters = parse_bool(&value).ok_or_else(|| {
                XscanError::Config(format!("{ENV_TRACE_PARAMETERS}: '{value}' is not a bool"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> XscanResult<()> {
        if self.batch_size == 0 {
            return Err(XscanError::Config("batch_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Runtime state for one query.
    pub fn runtime_state(&self, query_id: impl Into<String>) -> RuntimeState {
        RuntimeState {
            query_id: query_id.into(),
            batch_size: self.batch_size,
            time_zone: self.time_zone.clone(),
            trace_parameters: self.trace_parameters,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Per-query execution state passed to `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub query_id: String,
    pub batch_size: usize,
    pub time_zone: String,
    pub trace_parameters: bool,
}

impl Default for RuntimeState {
    fn default() -> Self {
        ScannerOptions::default().runtime_state("")
    }
}
