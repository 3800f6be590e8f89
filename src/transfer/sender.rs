use futures_io::AsyncRead;
use futures_util::io::AsyncReadExt;
use log::trace;

use crate::error::Result;
use crate::packet::{ErrorCode, Packet, BLOCK_SIZE};
use crate::transfer::Link;

/// Serves the DATA half of a transfer from a local byte stream.
///
/// Runs on the server for read requests and on the client for `put`.
pub(crate) struct Sender<R> {
    link: Link,
    reader: R,
}

impl<R> Sender<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(link: Link, reader: R) -> Self {
        Sender { link, reader }
    }

    /// Sends the stream block by block until a short block is acknowledged.
    pub(crate) async fn run(mut self) -> Result<()> {
        let mut block_id: u16 = 0;
        let mut buf = vec![0u8; BLOCK_SIZE];

        loop {
            let len = match self.read_block(&mut buf).await {
                Ok(len) => len,
                Err(e) => {
                    self.link
                        .send_final(&Packet::error(
                            ErrorCode::FileNotFound,
                            "invalid path",
                        ))
                        .await;
                    return Err(e.into());
                }
            };

            block_id = block_id.wrapping_add(1);
            trace!("Sending block {} ({} bytes)", block_id, len);

            let data = Packet::Data(block_id, buf[..len].to_vec()).to_bytes();
            self.link
                .exchange(&data, |packet| match packet {
                    Packet::Ack(block) if *block == block_id => Some(()),
                    _ => None,
                })
                .await?;

            // A short block is the end-of-transfer marker.
            if len < BLOCK_SIZE {
                return Ok(());
            }
        }
    }

    /// Reads until `buf` is full or the stream ends.
    ///
    /// Short reads from the underlying stream must not produce short DATA
    /// blocks mid-transfer, so reads are repeated up to the block size.
    async fn read_block(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut len = 0;

        while len < buf.len() {
            let n = self.reader.read(&mut buf[len..]).await?;
            if n == 0 {
                break;
            }
            len += n;
        }

        Ok(len)
    }
}
