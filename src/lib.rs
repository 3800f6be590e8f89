//! Async TFTP client and server engine.
//!
//! Implements [RFC 1350] - The TFTP Protocol (Revision 2) - over UDP:
//!
//! * Client side: fetch (`GET`/RRQ) and push (`PUT`/WRQ) transfers.
//! * Server side: serves read and write requests for multiple clients
//!   concurrently from a single cooperative event loop.
//! * `octet` and `netascii` transfer modes, with a stateful netascii
//!   transcoder that is correct across arbitrary buffer-boundary splits.
//! * Lock-step retransmission with a per-packet timeout and a fixed retry
//!   budget; byte-identical resends.
//!
//! The implementation is executor agnostic: sockets and timers come from
//! [`async-io`], file streams from [`blocking`], so it runs under any
//! executor that polls its futures.
//!
//! Option negotiation (RFC 2347) is parsed but intentionally not acted
//! upon; transfers always use the fixed 512-byte block size.
//!
//! # Example
//!
//! ```ignore
//! use tftpkit::server::TftpServerBuilder;
//! use tftpkit::Result;
//!
//! fn main() -> Result<()> {
//!     futures_lite::future::block_on(async {
//!         let tftpd = TftpServerBuilder::with_dir("/srv/tftp")?.build().await?;
//!         tftpd.serve().await?;
//!         Ok(())
//!     })
//! }
//! ```
//!
//! [RFC 1350]: https://tools.ietf.org/html/rfc1350
//! [`async-io`]: https://docs.rs/async-io
//! [`blocking`]: https://docs.rs/blocking

pub mod client;
pub mod io;
pub mod server;

/// Packet definitions that are needed in public API.
pub mod packet;

mod error;
mod netascii;
mod parse;
mod tests;
mod transfer;
mod utils;

pub use crate::error::*;
pub use crate::netascii::{NetasciiReader, NetasciiWriter};
pub use crate::transfer::TransferConfig;

/// Re-export of `async_trait::async_trait`.
pub use async_trait::async_trait;
