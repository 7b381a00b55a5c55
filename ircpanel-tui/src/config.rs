//! Configuration for ircpanel.
//!
//! Config file lives at `~/.config/ircpanel/config.toml`. Nothing is
//! written back; the panel keeps no state between runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ircpanel_core::ConsoleOrder;
use serde::Deserialize;

/// IRC server used when nothing else is configured.
pub const DEFAULT_SERVER: &str = "irc.libera.chat:6667";

/// User configuration (config.toml).
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Server address (host:port).
    pub server: Option<String>,
    /// Nickname prefilled in the username field.
    pub nick: Option<String>,
    /// Channel prefilled in the channel field.
    pub channel: Option<String>,
    /// Use TLS (auto-detected from :6697, but can force).
    pub tls: Option<bool>,
    /// Skip TLS certificate verification.
    pub tls_insecure: Option<bool>,
    /// `newest-first` (latest line on top) or `oldest-first`.
    pub console_order: Option<ConsoleOrder>,
    /// Give up on a connect attempt after this many seconds.
    pub connect_timeout_secs: Option<u64>,
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ircpanel")
}

fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default log file location.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ircpanel")
        .join("ircpanel.log")
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => return c,
                    Err(e) => tracing::warn!("bad config file {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("can't read {}: {e}", path.display()),
            }
        }
        Self::default()
    }
}

/// Effective settings after merging CLI args > config file > defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub server: String,
    pub nick: String,
    pub channel: String,
    pub tls: bool,
    pub tls_insecure: bool,
    pub console_order: ConsoleOrder,
    pub connect_timeout: Option<Duration>,
}

impl Resolved {
    pub fn merge(cli: &super::Cli, config: &Config) -> Self {
        let server = cli
            .server
            .clone()
            .or_else(|| config.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());

        // Ensure server has a port; default to 6667 (plain) if missing
        let server = if server.contains(':') {
            server
        } else {
            format!("{server}:6667")
        };

        let nick = cli
            .nick
            .clone()
            .or_else(|| config.nick.clone())
            .unwrap_or_default();
        let channel = cli
            .channel
            .clone()
            .or_else(|| config.channel.clone())
            .unwrap_or_default();

        let tls = cli.tls || config.tls.unwrap_or(false) || server.ends_with(":6697");
        let tls_insecure = cli.tls_insecure || config.tls_insecure.unwrap_or(false);

        let console_order = if cli.oldest_first {
            ConsoleOrder::OldestFirst
        } else {
            config.console_order.unwrap_or_default()
        };

        let connect_timeout = cli
            .connect_timeout
            .or(config.connect_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            server,
            nick,
            channel,
            tls,
            tls_insecure,
            console_order,
            connect_timeout,
        }
    }
}
