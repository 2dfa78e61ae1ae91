use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::udp::UdpFramed;
use tracing::{debug, info, warn};

use crate::codec::DnsCodec;
use crate::errors::DnsError;
use crate::message::{Request, Response};
use crate::parsers::decode_header;

/// How long an exchange waits for the reply
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

impl Request {
    /// Send the request over UDP and wait for the matching reply.
    ///
    /// Replies from other peers or carrying another ID are skipped. The
    /// whole round trip is bounded by `deadline`; there is no retry.
    pub async fn exchange(self, deadline: Duration) -> Result<Response, DnsError> {
        let destination = self.destination();
        let bind_addr: SocketAddr = if destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let sock = UdpSocket::bind(bind_addr).await?;
        debug!("Bound exchange socket on {}", sock.local_addr()?);

        let mut framed = UdpFramed::new(sock, DnsCodec::new());

        match timeout(deadline, self.round_trip(&mut framed)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("No reply from {} within {:?}", destination, deadline);
                Err(DnsError::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no reply from {} within {:?}", destination, deadline),
                )))
            }
        }
    }

    /// Blocking variant of [`Request::exchange`] for callers without a runtime
    pub fn exchange_blocking(self, deadline: Duration) -> Result<Response, DnsError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(self.exchange(deadline))
    }

    async fn round_trip(&self, framed: &mut UdpFramed<DnsCodec>) -> Result<Response, DnsError> {
        let destination = self.destination();

        framed.send((self, destination)).await?;
        info!(
            "Sent query ID {} for {:?} to {}",
            self.id(),
            self.domains(),
            destination
        );

        while let Some(frame) = framed.next().await {
            let (datagram, source) = frame?;

            if source != destination {
                warn!(
                    "Ignoring {} byte datagram from unexpected peer {}",
                    datagram.len(),
                    source
                );
                continue;
            }

            let header = decode_header(&datagram)?;
            if header.id != self.id() {
                warn!(
                    "Ignoring reply with ID {} while waiting for {}",
                    header.id,
                    self.id()
                );
                continue;
            }

            let response = Response::parse(datagram)?;
            info!(
                "Received {} bytes from {} with {} answers",
                response.raw().len(),
                source,
                response.answers().len()
            );
            return Ok(response);
        }

        Err(DnsError::Transport(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "socket closed before a reply arrived",
        )))
    }
}
