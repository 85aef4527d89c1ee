//! Application-wide constants for asciifarm-client.
//!
//! Centralizes the wire-protocol limits and default connection targets so
//! they are discoverable in one place.
//!
//! # Categories
//!
//! - **Framing**: header size and read chunking
//! - **Targets**: default server addresses

// ============================================================================
// Framing
// ============================================================================

/// Size of the big-endian length header that precedes every frame.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest single read issued while accumulating a frame.
pub const RECV_CHUNK_SIZE: usize = 4096;

/// Default cap on the declared length of an incoming frame (16 MB).
///
/// The server never sends anything close to this; a larger header means
/// the stream is corrupt or the peer is not an asciifarm server.
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// ============================================================================
// Targets
// ============================================================================

/// Abstract-namespace socket name the server listens on by default.
pub const DEFAULT_ABSTRACT_NAME: &str = "rustifarm";

/// TCP address selected by the `inet` token.
pub const DEFAULT_INET_ADDRESS: &str = "localhost:9021";

/// Notice printed when the server closes the connection.
pub const CONNECTION_CLOSED_NOTICE: &str = "Connection closed by server";
