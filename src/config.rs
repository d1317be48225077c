use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{parse_bool_flag, stream_url_for_server};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const STREAM_PATH: &str = "/api/rlm/stream";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,
    pub stream_url: String,
    pub enable_sub_llm: bool,
    pub connect_timeout: Duration,
    pub working_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let server_url = std::env::var("RLMSCOPE_SERVER_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let stream_url = std::env::var("RLMSCOPE_STREAM_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| stream_url_for_server(&server_url, STREAM_PATH));
        let enable_sub_llm = std::env::var("RLMSCOPE_SUB_LLM")
            .ok()
            .and_then(parse_bool_flag)
            .unwrap_or(true);
        let connect_timeout_secs = std::env::var("RLMSCOPE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|v| v.clamp(1, 120))
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            server_url,
            stream_url,
            enable_sub_llm,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            bail!(
                "Invalid RLMSCOPE_SERVER_URL '{}': expected http:// or https:// URL",
                self.server_url
            );
        }

        if !self.stream_url.starts_with("ws://") && !self.stream_url.starts_with("wss://") {
            bail!(
                "Invalid RLMSCOPE_STREAM_URL '{}': expected ws:// or wss:// URL",
                self.stream_url
            );
        }

        if self.connect_timeout.is_zero() {
            bail!("Connect timeout must be at least one second");
        }

        Ok(())
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api{path}", self.server_url)
    }
}
