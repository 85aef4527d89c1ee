//! Opening the single server connection.
//!
//! A [`Connection`] is either a Unix or a TCP stream. The session only
//! ever needs one read half and one write half, so both kinds are split
//! into boxed halves with the same type.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};

use super::address::Address;

/// Read half of a connection.
pub type ConnectionReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of a connection.
pub type ConnectionWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open stream to the server.
#[derive(Debug)]
pub enum Connection {
    /// Unix-domain stream (filesystem or abstract).
    Unix(UnixStream),
    /// TCP stream.
    Tcp(TcpStream),
}

impl Connection {
    /// Connect to `address`. No timeout is applied.
    ///
    /// # Errors
    ///
    /// Returns an error naming the address if the connect fails.
    pub async fn connect(address: &Address) -> Result<Self> {
        let conn = match address {
            Address::Abstract(name) => Self::Unix(connect_abstract(name)?),
            Address::Unix(path) => Self::Unix(UnixStream::connect(path).await?),
            Address::Inet(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                Self::Tcp(stream)
            }
        };
        Ok(conn)
    }

    /// Split into independently owned read and write halves.
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        match self {
            Self::Unix(stream) => {
                let (reader, writer) = stream.into_split();
                (Box::new(reader), Box::new(writer))
            }
            Self::Tcp(stream) => {
                let (reader, writer) = stream.into_split();
                (Box::new(reader), Box::new(writer))
            }
        }
    }
}

/// Connect to `address`, attaching the address to any error.
pub async fn open(address: &Address) -> Result<Connection> {
    let conn = Connection::connect(address)
        .await
        .with_context(|| format!("Failed to connect to {address}"))?;
    log::info!("[Socket] Connected to {address}");
    Ok(conn)
}

#[cfg(target_os = "linux")]
fn connect_abstract(name: &str) -> Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

    // Local connect completes immediately, so the blocking call is fine here.
    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    let stream = StdUnixStream::connect_addr(&addr)?;
    stream.set_nonblocking(true)?;
    Ok(UnixStream::from_std(stream)?)
}

#[cfg(not(target_os = "linux"))]
fn connect_abstract(name: &str) -> Result<UnixStream> {
    anyhow::bail!("Abstract socket {name:?} requires Linux; use a unix: or inet: address")
}
