//! Server address grammar.
//!
//! Addresses are written `TYPE:VALUE`, the same grammar the asciifarm
//! server accepts for its `--address` flag:
//!
//! - `abstract:rustifarm` - Linux abstract-namespace Unix socket
//! - `unix:/run/asciifarm.sock` - filesystem Unix socket
//! - `inet:localhost:9021` - TCP host and port

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ABSTRACT_NAME, DEFAULT_INET_ADDRESS};

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Address {
    /// Abstract-namespace Unix socket, named without the leading NUL.
    Abstract(String),
    /// Unix socket bound to a filesystem path.
    Unix(PathBuf),
    /// TCP `host:port`.
    Inet(String),
}

impl Address {
    /// The server's default abstract socket.
    pub fn default_abstract() -> Self {
        Self::Abstract(DEFAULT_ABSTRACT_NAME.to_string())
    }

    /// The TCP address selected by the `inet` token.
    pub fn default_inet() -> Self {
        Self::Inet(DEFAULT_INET_ADDRESS.to_string())
    }

    /// Short name of the address type, as written before the colon.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Abstract(_) => "abstract",
            Self::Unix(_) => "unix",
            Self::Inet(_) => "inet",
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::default_abstract()
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        let (kind, value) = text
            .split_once(':')
            .ok_or_else(|| anyhow!("Address must look like TYPE:VALUE, got {text:?}"))?;

        if value.is_empty() {
            bail!("Address {text:?} has an empty {kind} value");
        }

        match kind {
            "abstract" => Ok(Self::Abstract(value.to_string())),
            "unix" => Ok(Self::Unix(PathBuf::from(value))),
            "inet" => {
                let (host, port) = value
                    .rsplit_once(':')
                    .ok_or_else(|| anyhow!("inet address needs host:port, got {value:?}"))?;
                if host.is_empty() {
                    bail!("inet address {value:?} has no host");
                }
                port.parse::<u16>()
                    .map_err(|e| anyhow!("inet address {value:?} has invalid port: {e}"))?;
                Ok(Self::Inet(value.to_string()))
            }
            other => bail!("Invalid address type {other:?} (expected inet, unix or abstract)"),
        }
    }
}

impl TryFrom<String> for Address {
    type Error = anyhow::Error;

    fn try_from(text: String) -> Result<Self> {
        text.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abstract(name) => write!(f, "abstract:{name}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Inet(addr) => write!(f, "inet:{addr}"),
        }
    }
}
