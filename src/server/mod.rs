//! TFTP server.

mod builder;
#[allow(clippy::module_inception)]
mod server;

pub use builder::TftpServerBuilder;
pub use server::TftpServer;
