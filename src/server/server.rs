use async_io::Async;
use async_lock::Mutex;
use futures_util::future::FutureExt;
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::trace;
use std::collections::HashSet;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::{IoProvider, Mode, ModeReader, ModeWriter};
use crate::packet::{ErrorCode, Packet, RwReq, MAX_PACKET_SIZE};
use crate::transfer::{Link, Receiver, Sender, TransferConfig};

/// TFTP server.
///
/// Listens for read and write requests and serves each transfer from its
/// own ephemeral socket. All transfers and the listener run cooperatively
/// inside [`serve`](Self::serve); nothing is spawned.
pub struct TftpServer<P>
where
    P: IoProvider,
{
    pub(crate) socket: Option<Async<UdpSocket>>,
    pub(crate) provider: Arc<Mutex<P>>,
    pub(crate) config: TransferConfig,
    pub(crate) reqs_in_progress: HashSet<SocketAddr>,
}

/// Results of the futures multiplexed by `serve`.
enum FutResults {
    /// A datagram arrived on the request socket.
    RecvReq(Result<(usize, SocketAddr)>, Vec<u8>, Async<UdpSocket>),
    /// A transfer finished.
    ReqFinished(SocketAddr, Result<()>),
}

impl<P> TftpServer<P>
where
    P: IoProvider + 'static,
{
    /// Returns the listening socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let socket =
            self.socket.as_ref().expect("tftp not initialized correctly");
        Ok(socket.get_ref().local_addr()?)
    }

    /// Consumes and starts the server.
    pub async fn serve(mut self) -> Result<()> {
        let mut futs = FuturesUnordered::new();
        let buf = vec![0u8; MAX_PACKET_SIZE];
        let socket =
            self.socket.take().expect("tftp not initialized correctly");

        futs.push(recv_req(socket, buf).boxed());

        while let Some(res) = futs.next().await {
            match res {
                FutResults::RecvReq(res, buf, socket) => {
                    let (len, peer) = res?;

                    if let Some(fut) = self.dispatch(peer, &buf[..len]) {
                        futs.push(fut);
                    }

                    // Await the next request
                    futs.push(recv_req(socket, buf).boxed());
                }
                FutResults::ReqFinished(peer, res) => {
                    if let Err(e) = res {
                        trace!("Request failed (peer: {}): {}", peer, e);
                    }
                    self.reqs_in_progress.remove(&peer);
                }
            }
        }

        Ok(())
    }

    /// Turns a raw datagram on the request socket into a transfer future.
    ///
    /// Non-request packets, undecodable datagrams and repeated requests
    /// from a peer that is already being served are dropped.
    fn dispatch(
        &mut self,
        peer: SocketAddr,
        data: &[u8],
    ) -> Option<futures_util::future::BoxFuture<'static, FutResults>> {
        let packet = match Packet::decode(data) {
            Ok(packet @ Packet::Rrq(_)) | Ok(packet @ Packet::Wrq(_)) => {
                packet
            }
            Ok(_) => {
                trace!("Ignoring non-request packet from {}", peer);
                return None;
            }
            Err(e) => {
                trace!("Ignoring bad datagram from {}: {}", peer, e);
                return None;
            }
        };

        if !self.reqs_in_progress.insert(peer) {
            trace!("Ignoring repeated request from {}", peer);
            return None;
        }

        let provider = Arc::clone(&self.provider);
        let config = self.config;

        match packet {
            Packet::Rrq(req) => {
                trace!("RRQ received (peer: {}, req: {:?})", peer, req);
                Some(
                    async move {
                        let res =
                            serve_rrq(provider, peer, req, config).await;
                        FutResults::ReqFinished(peer, res)
                    }
                    .boxed(),
                )
            }
            Packet::Wrq(req) => {
                trace!("WRQ received (peer: {}, req: {:?})", peer, req);
                Some(
                    async move {
                        let res =
                            serve_wrq(provider, peer, req, config).await;
                        FutResults::ReqFinished(peer, res)
                    }
                    .boxed(),
                )
            }
            _ => None,
        }
    }
}

async fn recv_req(socket: Async<UdpSocket>, mut buf: Vec<u8>) -> FutResults {
    let res = socket.recv_from(&mut buf).await.map_err(Into::into);
    FutResults::RecvReq(res, buf, socket)
}

/// Checks the request mode, answering the peer with an error on failure.
async fn parse_mode(link: &Link, req: &RwReq) -> Result<Mode> {
    match req.mode.parse() {
        Ok(mode) => Ok(mode),
        Err(e) => {
            link.send_final(&Packet::error(
                ErrorCode::AccessViolation,
                "invalid path or mode",
            ))
            .await;
            Err(e)
        }
    }
}

async fn serve_rrq<P>(
    provider: Arc<Mutex<P>>,
    peer: SocketAddr,
    req: RwReq,
    config: TransferConfig,
) -> Result<()>
where
    P: IoProvider,
{
    let link = Link::connected(peer, config)?;
    let mode = parse_mode(&link, &req).await?;

    let reader = match provider
        .lock()
        .await
        .open_reader(&req.filename, mode)
        .await
    {
        Ok(reader) => reader,
        Err(e) => {
            link.send_final(&Packet::error(e.error_code(), &e.to_string()))
                .await;
            return Err(Error::Open(req.filename, e));
        }
    };

    Sender::new(link, ModeReader::new(reader, mode)).run().await
}

async fn serve_wrq<P>(
    provider: Arc<Mutex<P>>,
    peer: SocketAddr,
    req: RwReq,
    config: TransferConfig,
) -> Result<()>
where
    P: IoProvider,
{
    let link = Link::connected(peer, config)?;
    let mode = parse_mode(&link, &req).await?;

    let writer = match provider
        .lock()
        .await
        .open_writer(&req.filename, mode)
        .await
    {
        Ok(writer) => writer,
        Err(e) => {
            link.send_final(&Packet::error(e.error_code(), &e.to_string()))
                .await;
            return Err(Error::Open(req.filename, e));
        }
    };

    // The transfer starts by acknowledging the request itself.
    let ack = Packet::Ack(0).to_bytes();
    Receiver::new(link, ModeWriter::new(writer, mode)).run(ack).await
}
