//! Datagram transport to the fixed destination.
//!
//! A packet counts as sent only when the transport accepts every byte of it.
//! A partial write is reported as [`StreamError::ShortWrite`]; nothing here
//! retries.

use std::net::SocketAddr;
use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, info};

use crate::{Result, StreamError};

/// Outbound, connectionless datagram channel to one destination.
#[async_trait::async_trait]
pub trait DatagramTransport: Send + Sync + 'static {
    /// Hand one datagram to the transport.
    ///
    /// Returns the number of bytes the transport accepted, which may be less
    /// than `datagram.len()`.
    async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<usize>;

    /// Destination address, if the transport has one.
    fn destination(&self) -> Option<SocketAddr> {
        None
    }
}

/// Send one datagram, treating anything but a full write as failure.
pub async fn send_packet<T>(transport: &T, datagram: &[u8]) -> Result<()>
where
    T: DatagramTransport + ?Sized,
{
    let written = transport.send_datagram(datagram).await?;
    if written != datagram.len() {
        return Err(StreamError::short_write(datagram.len(), written));
    }
    Ok(())
}

/// UDP socket bound to an ephemeral local port, sending to a fixed address.
///
/// The socket is left unconnected so ICMP errors from an absent receiver
/// do not surface as send failures on later packets.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpTransport {
    /// Resolve `host:port` and open a socket of the matching address family.
    pub async fn open(host: &str, port: u16) -> Result<Self> {
        let destination = lookup_host((host, port))
            .await
            .map_err(|e| StreamError::socket_error(format!("resolve {}:{}", host, port), e))?
            .next()
            .ok_or_else(|| {
                StreamError::socket_error(
                    format!("resolve {}:{}", host, port),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
                )
            })?;

        Self::with_destination(destination).await
    }

    /// Open a socket sending to an already resolved address.
    pub async fn with_destination(destination: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if destination.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| StreamError::socket_error("bind datagram socket", e))?;

        debug!("Bound datagram socket {:?}", socket.local_addr().ok());
        info!("Datagram transport ready, destination {}", destination);

        Ok(Self { socket, destination })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|e| StreamError::socket_error("query local address", e))
    }
}

#[async_trait::async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_datagram(&self, datagram: &[u8]) -> std::io::Result<usize> {
        self.socket.send_to(datagram, self.destination).await
    }

    fn destination(&self) -> Option<SocketAddr> {
        Some(self.destination)
    }
}
