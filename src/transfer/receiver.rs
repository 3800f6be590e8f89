use bytes::Bytes;
use futures_io::AsyncWrite;
use futures_util::io::AsyncWriteExt;
use log::trace;

use crate::error::Result;
use crate::packet::{ErrorCode, Packet, BLOCK_SIZE};
use crate::transfer::Link;

/// Serves the ACK half of a transfer into a local byte stream.
///
/// Runs on the server for write requests and on the client for `get`. The
/// exchange that requests the first block differs between the two (a RRQ
/// on the client, ACK 0 on the server), so the caller passes the initial
/// packet in encoded form.
pub(crate) struct Receiver<W> {
    link: Link,
    writer: W,
}

impl<W> Receiver<W>
where
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(link: Link, writer: W) -> Self {
        Receiver { link, writer }
    }

    /// Acknowledges blocks until a short one arrives, writing payloads to
    /// the stream in order.
    pub(crate) async fn run(mut self, initial: Bytes) -> Result<()> {
        let mut outgoing = initial;
        let mut block_id: u16 = 0;

        loop {
            let expected = block_id.wrapping_add(1);

            let data = self
                .link
                .exchange(&outgoing, |packet| match packet {
                    Packet::Data(block, data) if *block == expected => {
                        Some(data.clone())
                    }
                    _ => None,
                })
                .await?;

            block_id = expected;
            trace!("Received block {} ({} bytes)", block_id, data.len());

            if !data.is_empty() {
                if let Err(e) = self.writer.write_all(&data).await {
                    self.link
                        .send_final(&Packet::error(
                            ErrorCode::FileNotFound,
                            "invalid path",
                        ))
                        .await;
                    return Err(e.into());
                }
            }

            let ack = Packet::Ack(block_id).to_bytes();

            if data.len() < BLOCK_SIZE {
                // Final ack. If it gets lost the peer retransmits into the
                // void; dallying is out of scope.
                self.link.send(&ack).await?;
                self.writer.close().await?;
                return Ok(());
            }

            outgoing = ack;
        }
    }
}
