//! Socket transport for client↔server communication.
//!
//! One connection per process, Unix-domain or TCP, carrying
//! length-prefixed frames in both directions.
//!
//! # Architecture
//!
//! ```text
//! Client Process                        asciifarm server
//! ┌──────────────────┐                ┌──────────────────┐
//! │ Session          │                │                  │
//! │  write half ─────┼── frames ─────►│  StreamConnection│
//! │  FrameReader ◄───┼── frames ──────┤  per connection  │
//! └──────────────────┘                └──────────────────┘
//! ```
//!
//! # Wire Protocol
//!
//! Length-prefixed frames: `[u32 BE length][payload]`
//!
//! See [`framing`] for the codec and [`address`] for the address grammar.

pub mod address;
pub mod connection;
pub mod framing;

pub use address::Address;
pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use framing::{FrameReader, Incoming};
