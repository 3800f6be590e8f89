//! Lock-step transfer engine shared by client and server.
//!
//! A transfer is a sequence of exchanges: send a packet, wait for the one
//! response that advances the transfer, retransmit the exact same bytes on
//! timeout. [`Sender`] drives the DATA side of an exchange and [`Receiver`]
//! the ACK side; which role runs where depends on the request direction.

mod receiver;
mod sender;

pub(crate) use receiver::Receiver;
pub(crate) use sender::Sender;

use async_io::Async;
use bytes::Bytes;
use log::trace;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::packet::{Packet, MAX_PACKET_SIZE};
use crate::utils::io_timeout_at;

/// Retransmission parameters of a transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferConfig {
    /// How long to wait for a response before retransmitting.
    pub retry_timeout: Duration,
    /// Total number of sends of a packet, the first included. A value of
    /// zero behaves like one; the initial send always happens.
    pub max_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            retry_timeout: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

/// One side of a transfer: a socket plus the remote identity.
///
/// The remote starts out as just the address the request was sent to. The
/// first datagram that advances the transfer locks the peer to its source
/// address and port; from then on datagrams from anyone else are dropped
/// without affecting the transfer.
pub(crate) struct Link {
    socket: Async<UdpSocket>,
    target: SocketAddr,
    peer: Option<SocketAddr>,
    config: TransferConfig,
    recv_buf: Vec<u8>,
}

impl Link {
    /// Creates a link on a fresh ephemeral socket, for the client side.
    pub(crate) fn bind(
        target: SocketAddr,
        config: TransferConfig,
    ) -> Result<Self> {
        let addr: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = Async::<UdpSocket>::bind(addr).map_err(Error::Bind)?;

        Ok(Link {
            socket,
            target,
            peer: None,
            config,
            recv_buf: vec![0u8; MAX_PACKET_SIZE],
        })
    }

    /// Creates a link on a fresh socket already locked to `peer`, for the
    /// server side answering a request.
    pub(crate) fn connected(
        peer: SocketAddr,
        config: TransferConfig,
    ) -> Result<Self> {
        let mut link = Link::bind(peer, config)?;
        link.peer = Some(peer);
        Ok(link)
    }

    /// Sends `outgoing` and waits until `accept` recognizes a response.
    ///
    /// On timeout the same bytes are retransmitted, up to the configured
    /// number of sends in total. Datagrams from a foreign source, datagrams
    /// that fail to decode and packets `accept` rejects are all dropped
    /// without resetting the timeout. A decodable ERROR packet from the
    /// peer aborts the transfer.
    pub(crate) async fn exchange<T>(
        &mut self,
        outgoing: &Bytes,
        mut accept: impl FnMut(&Packet) -> Option<T>,
    ) -> Result<T> {
        // A zero budget still sends once.
        let budget = self.config.max_retries.max(1);
        let mut sends_left = budget;

        loop {
            self.socket.send_to(outgoing, self.target).await?;
            sends_left -= 1;

            let deadline = Instant::now() + self.config.retry_timeout;

            loop {
                let received = io_timeout_at(
                    deadline,
                    self.socket.recv_from(&mut self.recv_buf),
                )
                .await;

                let (len, from) = match received {
                    Ok(x) => x,
                    Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                        if sends_left == 0 {
                            return Err(Error::NoResponse(
                                self.target,
                                budget,
                            ));
                        }
                        trace!(
                            "Timeout waiting for {}, retransmitting",
                            self.target
                        );
                        break;
                    }
                    Err(e) => return Err(e.into()),
                };

                if let Some(peer) = self.peer {
                    if from != peer {
                        trace!("Ignoring datagram from {}", from);
                        continue;
                    }
                }

                let packet = match Packet::decode(&self.recv_buf[..len]) {
                    Ok(packet) => packet,
                    Err(e) => {
                        trace!("Ignoring bad datagram from {}: {}", from, e);
                        continue;
                    }
                };

                if let Packet::Error(code, msg) = packet {
                    return Err(Error::Peer(code, msg));
                }

                if let Some(value) = accept(&packet) {
                    // First accepted response fixes the peer identity.
                    self.peer = Some(from);
                    self.target = from;
                    return Ok(value);
                }

                trace!("Ignoring unexpected packet from {}", from);
            }
        }
    }

    /// Sends a packet no response is expected for.
    pub(crate) async fn send(&self, data: &[u8]) -> Result<()> {
        self.socket.send_to(data, self.target).await?;
        Ok(())
    }

    /// Best-effort send of a terminal packet.
    pub(crate) async fn send_final(&self, packet: &Packet) {
        if let Err(e) = self.send(&packet.to_bytes()).await {
            trace!("Failed to send final packet to {}: {}", self.target, e);
        }
    }
}
