//! Configuration loading.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `config.json` in the config directory
//! 3. `ASCIIFARM_*` environment variables
//! 4. command-line arguments ([`CommandLine`])

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::constants::MAX_FRAME_SIZE;
use crate::socket::Address;

/// Positional keyword requesting to join the world.
pub const JOIN_KEYWORD: &str = "join";

/// Positional keyword selecting the default TCP address.
pub const INET_KEYWORD: &str = "inet";

/// Configuration for the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server address.
    pub address: Address,
    /// Display name; the account name is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ask the server to join the world on connect.
    pub join: bool,
    /// Send the old `["name", ...]` handshake instead of `auth`.
    pub legacy_handshake: bool,
    /// Largest incoming frame accepted, in bytes.
    pub max_frame_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: Address::default(),
            name: None,
            join: false,
            legacy_handshake: false,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// `ASCIIFARM_CONFIG_DIR` overrides the platform config dir
    /// (`~/.config/asciifarm` on Linux). The directory is not created.
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = env::var("ASCIIFARM_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("asciifarm"))
    }

    /// Loads configuration from file, with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_dir(&Self::config_dir()?);
        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Reads `config.json` from `dir`, falling back to defaults.
    ///
    /// A missing file is normal; an unreadable one is logged and ignored.
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join("config.json");
        if !path.exists() {
            return Self::default();
        }
        match Self::read_file(&path) {
            Ok(config) => {
                log::debug!("[Config] Loaded {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("[Config] Ignoring {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `ASCIIFARM_ADDRESS`, `ASCIIFARM_NAME` and
    /// `ASCIIFARM_MAX_FRAME_SIZE`, looked up through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(address) = lookup("ASCIIFARM_ADDRESS") {
            self.address = address
                .parse()
                .context("Invalid ASCIIFARM_ADDRESS")?;
        }

        if let Some(name) = lookup("ASCIIFARM_NAME") {
            if !name.is_empty() {
                self.name = Some(name);
            }
        }

        if let Some(max) = lookup("ASCIIFARM_MAX_FRAME_SIZE") {
            self.max_frame_size = max
                .parse()
                .context("Invalid ASCIIFARM_MAX_FRAME_SIZE")?;
        }

        Ok(())
    }

    /// Apply command-line arguments on top of everything else.
    pub fn apply_command_line(&mut self, cli: CommandLine) {
        if let Some(name) = cli.name {
            self.name = Some(name);
        }
        if cli.join {
            self.join = true;
        }
        if cli.legacy_handshake {
            self.legacy_handshake = true;
        }
        if let Some(max) = cli.max_frame_size {
            self.max_frame_size = max;
        }

        match (cli.address, cli.inet) {
            (Some(address), inet) => {
                if inet {
                    log::warn!("[Config] --address {address} overrides the inet keyword");
                }
                self.address = address;
            }
            (None, true) => self.address = Address::default_inet(),
            (None, false) => {}
        }
    }
}

/// Settings taken from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// First positional that is not a keyword.
    pub name: Option<String>,
    /// `join` keyword was present.
    pub join: bool,
    /// `inet` keyword was present.
    pub inet: bool,
    /// Explicit `--address`.
    pub address: Option<Address>,
    /// `--legacy` flag.
    pub legacy_handshake: bool,
    /// `--max-frame-size` flag.
    pub max_frame_size: Option<u32>,
}

impl CommandLine {
    /// Sort positional tokens into keywords and the display name.
    ///
    /// `join` and `inet` are recognized anywhere. The first other token
    /// is the name; later ones are ignored with a warning.
    pub fn from_positionals<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut cli = Self::default();
        for token in tokens {
            match token.as_ref() {
                JOIN_KEYWORD => cli.join = true,
                INET_KEYWORD => cli.inet = true,
                other if cli.name.is_none() => cli.name = Some(other.to_string()),
                other => log::warn!("[Config] Ignoring extra argument {other:?}"),
            }
        }
        cli
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address, Address::Abstract("rustifarm".to_string()));
        assert_eq!(config.name, None);
        assert!(!config.join);
        assert!(!config.legacy_handshake);
        assert_eq!(config.max_frame_size, MAX_FRAME_SIZE);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::load_from_dir(dir.path()), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"address": "inet:farm.example:9021", "join": true}"#,
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path());
        assert_eq!(config.address, Address::Inet("farm.example:9021".to_string()));
        assert!(config.join);
        assert_eq!(config.max_frame_size, MAX_FRAME_SIZE);
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{not json").unwrap();
        assert_eq!(Config::load_from_dir(dir.path()), Config::default());

        fs::write(dir.path().join("config.json"), r#"{"address": "udp:x"}"#).unwrap();
        assert_eq!(Config::load_from_dir(dir.path()), Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[
                ("ASCIIFARM_ADDRESS", "unix:/run/farm.sock"),
                ("ASCIIFARM_NAME", "carol"),
                ("ASCIIFARM_MAX_FRAME_SIZE", "1024"),
            ]))
            .unwrap();

        assert_eq!(config.address, Address::Unix(PathBuf::from("/run/farm.sock")));
        assert_eq!(config.name.as_deref(), Some("carol"));
        assert_eq!(config.max_frame_size, 1024);
    }

    #[test]
    fn test_env_empty_name_ignored() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[("ASCIIFARM_NAME", "")]))
            .unwrap();
        assert_eq!(config.name, None);
    }

    #[test]
    fn test_env_invalid_values_rejected() {
        let mut config = Config::default();
        assert!(config
            .apply_env_overrides(lookup(&[("ASCIIFARM_ADDRESS", "nowhere")]))
            .is_err());
        assert!(config
            .apply_env_overrides(lookup(&[("ASCIIFARM_MAX_FRAME_SIZE", "big")]))
            .is_err());
    }

    #[test]
    fn test_positionals_name_and_keywords() {
        let cli = CommandLine::from_positionals(&["alice", "join"]);
        assert_eq!(cli.name.as_deref(), Some("alice"));
        assert!(cli.join);
        assert!(!cli.inet);

        let cli = CommandLine::from_positionals(&["inet", "join", "bob"]);
        assert_eq!(cli.name.as_deref(), Some("bob"));
        assert!(cli.join);
        assert!(cli.inet);
    }

    #[test]
    fn test_positionals_empty() {
        let cli = CommandLine::from_positionals::<&str>(&[]);
        assert_eq!(cli, CommandLine::default());
    }

    #[test]
    fn test_positionals_extra_ignored() {
        let cli = CommandLine::from_positionals(&["alice", "bob"]);
        assert_eq!(cli.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_command_line_inet_keyword() {
        let mut config = Config::default();
        config.apply_command_line(CommandLine::from_positionals(&["inet"]));
        assert_eq!(config.address, Address::default_inet());
    }

    #[test]
    fn test_command_line_address_beats_inet() {
        let mut config = Config::default();
        config.apply_command_line(CommandLine {
            inet: true,
            address: Some("unix:/tmp/x.sock".parse().unwrap()),
            ..CommandLine::default()
        });
        assert_eq!(config.address, Address::Unix(PathBuf::from("/tmp/x.sock")));
    }

    #[test]
    fn test_command_line_overrides_env() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[("ASCIIFARM_NAME", "carol")]))
            .unwrap();
        config.apply_command_line(CommandLine {
            name: Some("dave".to_string()),
            legacy_handshake: true,
            max_frame_size: Some(64),
            ..CommandLine::default()
        });
        assert_eq!(config.name.as_deref(), Some("dave"));
        assert!(config.legacy_handshake);
        assert_eq!(config.max_frame_size, 64);
    }
}
