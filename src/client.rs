//! TFTP client.

use futures_io::{AsyncRead, AsyncWrite};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;
use crate::io::{Mode, ModeReader, ModeWriter};
use crate::packet::{Packet, RwReq};
use crate::transfer::{Link, Receiver, Sender, TransferConfig};

/// Client for fetching from and pushing to a TFTP server.
///
/// Each transfer uses a fresh ephemeral socket, so a client value can be
/// reused for any number of sequential transfers.
///
/// # Example
///
/// ```ignore
/// let client = TftpClient::new("127.0.0.1:69".parse()?);
/// let mut buf = Vec::new();
/// client.get("motd.txt", Mode::Netascii, &mut buf).await?;
/// ```
pub struct TftpClient {
    server_addr: SocketAddr,
    config: TransferConfig,
}

impl TftpClient {
    /// Creates a client for the server listening at `server_addr`.
    pub fn new(server_addr: SocketAddr) -> Self {
        TftpClient {
            server_addr,
            config: TransferConfig::default(),
        }
    }

    /// Sets the response timeout before a packet is retransmitted.
    pub fn retry_timeout(mut self, dur: Duration) -> Self {
        self.config.retry_timeout = dur;
        self
    }

    /// Sets the total number of sends of an unanswered packet.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Fetches `filename` from the server into `writer`.
    ///
    /// In netascii mode `writer` receives the decoded local form of the
    /// data.
    pub async fn get<W>(
        &self,
        filename: &str,
        mode: Mode,
        writer: W,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let link = Link::bind(self.server_addr, self.config)?;
        let rrq = Packet::Rrq(Self::request(filename, mode)).to_bytes();
        let writer = ModeWriter::new(writer, mode);

        Receiver::new(link, writer).run(rrq).await
    }

    /// Pushes the contents of `reader` to the server as `filename`.
    ///
    /// In netascii mode the data is encoded onto the wire; `reader` is
    /// consumed in its local form.
    pub async fn put<R>(
        &self,
        filename: &str,
        mode: Mode,
        reader: R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut link = Link::bind(self.server_addr, self.config)?;
        let wrq = Packet::Wrq(Self::request(filename, mode)).to_bytes();

        // The transfer proper starts once the server acknowledges the
        // request with block 0.
        link.exchange(&wrq, |packet| match packet {
            Packet::Ack(0) => Some(()),
            _ => None,
        })
        .await?;

        let reader = ModeReader::new(reader, mode);
        Sender::new(link, reader).run().await
    }

    fn request(filename: &str, mode: Mode) -> RwReq {
        RwReq {
            filename: filename.to_owned(),
            mode: mode.to_str().to_owned(),
            opts: Vec::new(),
        }
    }
}
