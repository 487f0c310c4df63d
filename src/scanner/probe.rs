use log::debug;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::{io::AsyncWriteExt, net::TcpStream, time};

/// One connection attempt against one socket.
///
/// Implementations must treat every failure as a closed port and must not
/// retry; the scanner calls `probe` exactly once per port.
pub trait Probe: Send + Sync {
    /// Returns `true` when `socket` accepted the connection.
    fn probe(&self, socket: SocketAddr) -> impl Future<Output = bool> + Send;
}

/// Full TCP handshake with a timeout. The stream is shut down as soon as it
/// connects; no data is exchanged.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Performs the connection to the socket with timeout
    async fn connect(&self, socket: SocketAddr) -> std::io::Result<TcpStream> {
        time::timeout(self.timeout, TcpStream::connect(socket)).await?
    }
}

impl Probe for TcpProbe {
    fn probe(&self, socket: SocketAddr) -> impl Future<Output = bool> + Send {
        async move {
            match self.connect(socket).await {
                Ok(mut tcp_stream) => {
                    debug!("Connection was successful, shutting down stream {socket}");
                    if let Err(e) = tcp_stream.shutdown().await {
                        debug!("Shutdown stream error {e}");
                    }
                    true
                }
                Err(e) => {
                    debug!("{socket} closed: {e}");
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Probe, TcpProbe};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let socket = listener.local_addr().unwrap();

        assert!(TcpProbe::new(TIMEOUT).probe(socket).await);
    }

    #[tokio::test]
    async fn refused_port_is_closed() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let socket = listener.local_addr().unwrap();
        drop(listener);

        assert!(!TcpProbe::new(TIMEOUT).probe(socket).await);
    }

    #[tokio::test]
    #[ignore = "needs a network where TEST-NET-3 is unroutable"]
    async fn unreachable_address_is_closed_within_timeout() {
        let socket: SocketAddr = "203.0.113.1:443".parse().unwrap();
        let probe = TcpProbe::new(Duration::from_millis(50));

        let started = std::time::Instant::now();
        assert!(!probe.probe(socket).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
