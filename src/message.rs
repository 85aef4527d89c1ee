//! Outgoing message shapes.
//!
//! The server expects every message as a two-element JSON array,
//! `[tag, body]`. Only the shapes the client actually sends are modelled:
//!
//! | tag    | body                                          |
//! |--------|-----------------------------------------------|
//! | `name` | display name (legacy handshake)               |
//! | `auth` | `{"name": ..., "join": bool, "type": "guest"}`|
//! | `chat` | one input line, newline stripped              |

use anyhow::Result;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// Account type carried in the `auth` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    /// Unauthenticated display name.
    Guest,
}

/// Body of the `auth` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthBody {
    /// Display name.
    pub name: String,
    /// Whether to join the world, not just chat.
    pub join: bool,
    /// Account type.
    #[serde(rename = "type")]
    pub kind: AuthKind,
}

/// A message sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    /// Legacy handshake: `["name", name]`.
    Name(String),
    /// Handshake: `["auth", {name, join, type}]`.
    Auth(AuthBody),
    /// Chat line: `["chat", text]`.
    Chat(String),
}

impl OutgoingMessage {
    /// Guest `auth` handshake for `name`.
    pub fn guest_auth(name: impl Into<String>, join: bool) -> Self {
        Self::Auth(AuthBody {
            name: name.into(),
            join,
            kind: AuthKind::Guest,
        })
    }

    /// Chat message for one input line, with any trailing line ending removed.
    pub fn chat(line: &str) -> Self {
        let text = line.strip_suffix('\n').unwrap_or(line);
        let text = text.strip_suffix('\r').unwrap_or(text);
        Self::Chat(text.to_string())
    }

    /// The tag in the first array slot.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Auth(_) => "auth",
            Self::Chat(_) => "chat",
        }
    }

    /// Serialize to the UTF-8 JSON payload of a frame.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for OutgoingMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.tag())?;
        match self {
            Self::Name(name) => tuple.serialize_element(name)?,
            Self::Auth(body) => tuple.serialize_element(body)?,
            Self::Chat(text) => tuple.serialize_element(text)?,
        }
        tuple.end()
    }
}
