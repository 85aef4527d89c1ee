//! asciifarm-client - command-line chat client for asciifarm servers.
//!
//! Connects to a server over a Unix-domain or TCP socket, authenticates
//! with a display name, forwards typed lines as chat messages and prints
//! whatever the server sends.
//!
//! # Modules
//!
//! - [`socket`] - Addresses, connections and the length-prefixed frame codec
//! - [`message`] - Outgoing message shapes
//! - [`session`] - The listener/forwarder pair driving one connection
//! - [`identity`] - Display-name resolution
//! - [`config`] - Configuration loading

pub mod config;
pub mod constants;
pub mod identity;
pub mod message;
pub mod session;
pub mod socket;

// Re-export commonly used types
pub use config::{CommandLine, Config};
pub use message::OutgoingMessage;
pub use session::{Session, SessionEnd};
pub use socket::Address;
