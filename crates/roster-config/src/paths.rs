use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn home_subdir(kind: &str) -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_else(|| ".".into());
    PathBuf::from(home).join(kind).join("roster")
}

pub fn get_config_dir() -> PathBuf {
    home_subdir(".config")
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

pub fn get_cache_dir() -> PathBuf {
    home_subdir(".cache")
}

pub fn get_log_path() -> PathBuf {
    get_cache_dir().join("log").join("daemon.log")
}

pub fn get_daemon_record_path() -> PathBuf {
    get_cache_dir().join("daemon.toml")
}

/// What a running daemon leaves behind so clients can find it: its pid and
/// the address it actually bound, which may differ from the configured one
/// (e.g. port 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRecord {
    pub pid: u32,
    pub listen_addr: String,
}

impl DaemonRecord {
    pub fn for_current_process(listen_addr: impl Into<String>) -> Self {
        Self {
            pid: std::process::id(),
            listen_addr: listen_addr.into(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    /// Missing or unreadable records read as `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    pub fn remove(path: &Path) {
        let _ = std::fs::remove_file(path);
    }

    pub fn is_alive(&self) -> bool {
        is_process_running(self.pid)
    }
}

/// The record of the daemon serving this user, if its process still exists.
pub fn running_daemon() -> Option<DaemonRecord> {
    DaemonRecord::read(&get_daemon_record_path()).filter(DaemonRecord::is_alive)
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    false
}
