use async_io::Async;
use async_lock::Mutex;
use std::collections::HashSet;
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::server::TftpServer;
use crate::error::{Error, Result};
use crate::io::{DirProvider, IoProvider};
use crate::transfer::TransferConfig;

/// Builder of [`TftpServer`].
pub struct TftpServerBuilder<P>
where
    P: IoProvider,
{
    provider: P,
    addr: SocketAddr,
    socket: Option<Async<UdpSocket>>,
    config: TransferConfig,
}

impl TftpServerBuilder<DirProvider> {
    /// Creates a builder that serves files from `dir`.
    pub fn with_dir<D>(dir: D) -> Result<TftpServerBuilder<DirProvider>>
    where
        D: AsRef<Path>,
    {
        Ok(TftpServerBuilder::with_provider(DirProvider::new(dir)?))
    }
}

impl<P> TftpServerBuilder<P>
where
    P: IoProvider,
{
    /// Creates a builder around a custom I/O provider.
    pub fn with_provider(provider: P) -> Self {
        TftpServerBuilder {
            provider,
            addr: ([0, 0, 0, 0], 69).into(),
            socket: None,
            config: TransferConfig::default(),
        }
    }

    /// Sets the listening address.
    ///
    /// Default: `0.0.0.0:69`.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Uses an already bound socket instead of binding one.
    ///
    /// Useful for a random port; read it back with
    /// [`TftpServer::listen_addr`].
    pub fn socket(mut self, socket: Async<UdpSocket>) -> Self {
        self.socket = Some(socket);
        self
    }

    /// Sets the response timeout before a packet is retransmitted.
    ///
    /// Default: 1 second.
    pub fn retry_timeout(mut self, dur: Duration) -> Self {
        self.config.retry_timeout = dur;
        self
    }

    /// Sets the total number of sends of an unanswered packet.
    ///
    /// Default: 5.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Builds the server.
    pub async fn build(self) -> Result<TftpServer<P>> {
        let socket = match self.socket {
            Some(socket) => socket,
            None => {
                Async::<UdpSocket>::bind(self.addr).map_err(Error::Bind)?
            }
        };

        Ok(TftpServer {
            socket: Some(socket),
            provider: Arc::new(Mutex::new(self.provider)),
            config: self.config,
            reqs_in_progress: HashSet::new(),
        })
    }
}
