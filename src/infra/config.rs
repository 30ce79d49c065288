use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::infra::runtime::limits::{ExecLimits, DEFAULT_SCRIPT_TIMEOUT};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mode: String, // "stdio" or "server"
    pub port: u16,
    pub deprecate_rest: bool,
    /// Capability configuration directory (holds `mcp-config.yaml`).
    pub config_dir: PathBuf,
    pub script_timeout_secs: u64,
    pub server_name: Option<String>,
    pub server_version: Option<String>,
}

/// Optional TOML settings file named by `GATEWAY_SETTINGS`. Same keys as
/// the environment, lower-cased; the environment wins.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub mode: Option<String>,
    pub port: Option<u16>,
    pub deprecate_rest: Option<bool>,
    pub config_dir: Option<PathBuf>,
    pub script_timeout_secs: Option<u64>,
    pub server_name: Option<String>,
    pub server_version: Option<String>,
}

impl FileSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing settings file {}", path.display()))
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self::layered(FileSettings::default())
    }

    pub fn from_env_and_toml() -> anyhow::Result<Self> {
        let file = match env_nonempty("GATEWAY_SETTINGS") {
            Some(path) => FileSettings::load(Path::new(&path))?,
            None => FileSettings::default(),
        };
        Ok(Self::layered(file))
    }

    fn layered(file: FileSettings) -> Self {
        let mode = env_nonempty("MODE")
            .or(file.mode)
            .unwrap_or_else(|| "stdio".into());
        let port = env_nonempty("PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .or(file.port)
            .unwrap_or(8080);
        let deprecate_rest = match std::env::var("DEPRECATE_REST") {
            Ok(v) => !v.is_empty(),
            Err(_) => file.deprecate_rest.unwrap_or(false),
        };
        let config_dir = env_nonempty("CONFIG_DIR")
            .map(PathBuf::from)
            .or(file.config_dir)
            .unwrap_or_else(|| PathBuf::from("./config"));
        let script_timeout_secs = env_nonempty("SCRIPT_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .or(file.script_timeout_secs)
            .unwrap_or(DEFAULT_SCRIPT_TIMEOUT.as_secs());

        Self {
            mode,
            port,
            deprecate_rest,
            config_dir,
            script_timeout_secs,
            server_name: env_nonempty("SERVER_NAME").or(file.server_name),
            server_version: env_nonempty("SERVER_VERSION").or(file.server_version),
        }
    }

    pub fn is_stdio(&self) -> bool {
        self.mode == "stdio"
    }

    pub fn exec_limits(&self) -> ExecLimits {
        ExecLimits::from_secs(self.script_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 8] = [
        "MODE",
        "PORT",
        "DEPRECATE_REST",
        "CONFIG_DIR",
        "SCRIPT_TIMEOUT_SECS",
        "SERVER_NAME",
        "SERVER_VERSION",
        "GATEWAY_SETTINGS",
    ];

    fn clear_env() {
        for k in KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn defaults_to_stdio_8080_and_rest_enabled() {
        clear_env();
        let cfg = Config::from_env();
        assert_eq!(cfg.mode, "stdio");
        assert!(cfg.is_stdio());
        assert_eq!(cfg.port, 8080);
        assert!(!cfg.deprecate_rest);
        assert_eq!(cfg.config_dir, PathBuf::from("./config"));
        assert_eq!(cfg.exec_limits(), ExecLimits::default());
        assert!(cfg.server_name.is_none());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        clear_env();
        std::env::set_var("MODE", "server");
        std::env::set_var("PORT", "9090");
        std::env::set_var("DEPRECATE_REST", "1");
        std::env::set_var("CONFIG_DIR", "/srv/caps");
        std::env::set_var("SCRIPT_TIMEOUT_SECS", "5");
        std::env::set_var("SERVER_NAME", "caps");
        let cfg = Config::from_env();
        assert_eq!(cfg.mode, "server");
        assert_eq!(cfg.port, 9090);
        assert!(cfg.deprecate_rest);
        assert_eq!(cfg.config_dir, PathBuf::from("/srv/caps"));
        assert_eq!(cfg.exec_limits().timeout.as_secs(), 5);
        assert_eq!(cfg.server_name.as_deref(), Some("caps"));
        clear_env();
    }

    #[test]
    #[serial]
    fn toml_fills_gaps_and_env_wins() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "mode = \"server\"\nport = 7000\nconfig_dir = \"/etc/caps\"\nserver_version = \"9.9\"\n",
        )
        .unwrap();
        std::env::set_var("GATEWAY_SETTINGS", &path);
        std::env::set_var("PORT", "7100");
        let cfg = Config::from_env_and_toml().unwrap();
        assert_eq!(cfg.mode, "server");
        assert_eq!(cfg.port, 7100);
        assert_eq!(cfg.config_dir, PathBuf::from("/etc/caps"));
        assert_eq!(cfg.server_version.as_deref(), Some("9.9"));
        clear_env();
    }

    #[test]
    #[serial]
    fn unreadable_or_unknown_settings_are_errors() {
        clear_env();
        std::env::set_var("GATEWAY_SETTINGS", "/definitely/not/here.toml");
        assert!(Config::from_env_and_toml().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        std::env::set_var("GATEWAY_SETTINGS", &path);
        assert!(Config::from_env_and_toml().is_err());
        clear_env();
    }
}
