use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Upper bound for a single `ask` round trip.
    #[serde(default = "default_ask_timeout_ms")]
    pub ask_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_callers")]
    pub callers: usize,
    #[serde(default = "default_messages_per_caller")]
    pub messages_per_caller: usize,
}

impl AgentSettings {
    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.ask_timeout_ms)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            ask_timeout_ms: default_ask_timeout_ms(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            callers: default_callers(),
            messages_per_caller: default_messages_per_caller(),
        }
    }
}

fn default_ask_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_callers() -> usize {
    10
}

fn default_messages_per_caller() -> usize {
    100
}
