//! Runtime configuration for pgdock.
//!
//! Resolution order: **env var > `~/.pgdock/config` file > hardcoded default**.
//!
//! ```text
//! Field              Env Var                   Config Key        Default
//! ────────────────── ───────────────────────── ───────────────── ────────
//! pgdock_dir         PGDOCK_DIR                -                 ~/.pgdock
//! image_family       PGDOCK_IMAGE              image             postgres
//! docker_bin         PGDOCK_DOCKER             docker            docker
//! restart_timeout    PGDOCK_RESTART_TIMEOUT    restart_timeout   120s
//! stop_timeout       PGDOCK_STOP_TIMEOUT       stop_timeout      10s
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

/// Image repository used when nothing else is configured.
pub const DEFAULT_IMAGE_FAMILY: &str = "postgres";

#[derive(Debug, Clone)]
pub struct Config {
    /// State directory (`~/.pgdock` by default). Holds `config` and `logs/`.
    pub pgdock_dir: PathBuf,
    /// Image repository pulled and run (`PGDOCK_IMAGE`; default "postgres").
    pub image_family: String,
    /// Docker CLI executable (`PGDOCK_DOCKER`; default "docker").
    pub docker_bin: String,
    /// Grace period for restarting an existing container (`PGDOCK_RESTART_TIMEOUT` seconds; default 120).
    pub restart_timeout: Duration,
    /// Grace period for stopping a container (`PGDOCK_STOP_TIMEOUT` seconds; default 10).
    pub stop_timeout: Duration,
}

impl Config {
    /// Load config from env vars, the config file, and hardcoded defaults.
    pub fn load() -> Result<Self> {
        Self::load_with_env(|k| env::var(k).ok())
    }

    fn load_with_env(get_env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let dir = get_env("PGDOCK_DIR")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_pgdock_dir(get_env("HOME")));
        let mut cfg = Self::defaults(&dir);

        let config_file = dir.join("config");
        if config_file.exists() {
            parse_config_file(&config_file, |key, value| cfg.apply_file_entry(key, value))?;
        }

        cfg.apply_env_overrides(get_env);
        Ok(cfg)
    }

    pub fn defaults(pgdock_dir: &Path) -> Self {
        Self {
            pgdock_dir: pgdock_dir.to_path_buf(),
            image_family: DEFAULT_IMAGE_FAMILY.to_string(),
            docker_bin: "docker".to_string(),
            restart_timeout: Duration::from_secs(120),
            stop_timeout: Duration::from_secs(10),
        }
    }

    /// Directory for the structured event log.
    pub fn logs_dir(&self) -> PathBuf {
        self.pgdock_dir.join("logs")
    }

    fn apply_file_entry(&mut self, key: &str, value: &str) {
        match key {
            "image" => self.image_family = value.to_string(),
            "docker" => self.docker_bin = value.to_string(),
            "restart_timeout" => {
                if let Ok(n) = value.parse::<u64>() {
                    self.restart_timeout = Duration::from_secs(n);
                }
            }
            "stop_timeout" => {
                if let Ok(n) = value.parse::<u64>() {
                    self.stop_timeout = Duration::from_secs(n);
                }
            }
            _ => {}
        }
    }

    fn apply_env_overrides(&mut self, get_env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get_env("PGDOCK_IMAGE").filter(|v| !v.is_empty()) {
            self.image_family = v;
        }
        if let Some(v) = get_env("PGDOCK_DOCKER").filter(|v| !v.is_empty()) {
            self.docker_bin = v;
        }
        if let Some(v) = get_env("PGDOCK_RESTART_TIMEOUT") {
            if let Ok(n) = v.parse::<u64>() {
                self.restart_timeout = Duration::from_secs(n);
            }
        }
        if let Some(v) = get_env("PGDOCK_STOP_TIMEOUT") {
            if let Ok(n) = v.parse::<u64>() {
                self.stop_timeout = Duration::from_secs(n);
            }
        }
    }
}

fn default_pgdock_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => PathBuf::from(home).join(".pgdock"),
        None => PathBuf::from(".pgdock"),
    }
}

/// Parse a `key=value` config file, calling `f` for each entry.
///
/// Lines starting with `#` and empty lines are skipped.
fn parse_config_file(path: &Path, mut f: impl FnMut(&str, &str)) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            f(k.trim(), v.trim());
        }
    }
    Ok(())
}
