#![cfg(test)]

mod retry;

use async_executor::Executor;
use async_io::Async;
use futures_lite::future::block_on;
use std::fs;
use std::future::Future;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::packet::{Packet, MAX_PACKET_SIZE};
use crate::server::TftpServerBuilder;
use crate::utils::io_timeout;

pub(crate) fn with_executor<F, Fut>(f: F)
where
    F: FnOnce(Arc<Executor<'static>>) -> Fut,
    Fut: Future<Output = ()>,
{
    let ex = Arc::new(Executor::new());
    block_on(ex.run(f(ex.clone())));
}

/// Starts a file server on a random localhost port and detaches it.
pub(crate) async fn start_server(
    ex: &Arc<Executor<'static>>,
    dir: &Path,
    retry_timeout: Duration,
    max_retries: u32,
) -> SocketAddr {
    let tftpd = TftpServerBuilder::with_dir(dir)
        .unwrap()
        .bind("127.0.0.1:0".parse().unwrap())
        .retry_timeout(retry_timeout)
        .max_retries(max_retries)
        .build()
        .await
        .unwrap();
    let addr = tftpd.listen_addr().unwrap();

    ex.spawn(async move {
        tftpd.serve().await.unwrap();
    })
    .detach();

    addr
}

pub(crate) fn bind_localhost() -> Async<UdpSocket> {
    Async::<UdpSocket>::bind(([127, 0, 0, 1], 0)).unwrap()
}

/// Receives one packet, failing the test instead of hanging.
pub(crate) async fn recv_packet(
    socket: &Async<UdpSocket>,
) -> (Packet, SocketAddr) {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let (len, from) =
        io_timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for a packet");
    (Packet::decode(&buf[..len]).unwrap(), from)
}

pub(crate) async fn recv_raw(socket: &Async<UdpSocket>) -> Vec<u8> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let (len, _) =
        io_timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for a packet");
    buf[..len].to_vec()
}

pub(crate) fn write_file(dir: &Path, name: &str, content: &[u8]) {
    fs::write(dir.join(name), content).unwrap();
}
