//! Local I/O: transfer modes and the provider that opens byte streams
//! for transfers.

use async_trait::async_trait;
use blocking::{unblock, Unblock};
use futures_io::{AsyncRead, AsyncWrite};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::netascii::{NetasciiReader, NetasciiWriter};

/// TFTP transfer mode.
///
/// The RFC also defines `mail`, which this crate rejects like any other
/// unknown mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Netascii,
    Octet,
}

impl Mode {
    pub fn to_str(self) -> &'static str {
        match self {
            Mode::Netascii => "netascii",
            Mode::Octet => "octet",
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "netascii" => Ok(Mode::Netascii),
            "octet" => Ok(Mode::Octet),
            _ => Err(Error::InvalidMode),
        }
    }
}

/// Why a provider refused to open a stream.
///
/// `InvalidPath` becomes an AccessViolation on the wire, `FileNotFound`
/// the error code of the same name.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OpenError {
    #[error("invalid path or mode")]
    InvalidPath,

    #[error("file not found")]
    FileNotFound,
}

impl OpenError {
    pub(crate) fn error_code(self) -> crate::packet::ErrorCode {
        match self {
            OpenError::InvalidPath => {
                crate::packet::ErrorCode::AccessViolation
            }
            OpenError::FileNotFound => crate::packet::ErrorCode::FileNotFound,
        }
    }
}

/// Supplies byte streams for the local side of a transfer.
///
/// The engine layers netascii transcoding on top of the returned streams
/// itself; implementors only deal in raw bytes, but receive the mode in
/// case it matters to them.
#[async_trait]
pub trait IoProvider: Send {
    type Reader: AsyncRead + Unpin + Send + 'static;
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Open a stream serving a read request.
    async fn open_reader(
        &mut self,
        filename: &str,
        mode: Mode,
    ) -> Result<Self::Reader, OpenError>;

    /// Open a stream accepting a write request.
    async fn open_writer(
        &mut self,
        filename: &str,
        mode: Mode,
    ) -> Result<Self::Writer, OpenError>;
}

/// Provider that serves files under a single directory.
pub struct DirProvider {
    dir: PathBuf,
}

impl DirProvider {
    /// Create a provider rooted at `dir`.
    pub fn new<P>(dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = fs::canonicalize(dir.as_ref())?;

        if !dir.is_dir() {
            return Err(Error::NotDir(dir));
        }

        log::info!("TFTP directory: {}", dir.display());

        Ok(DirProvider { dir })
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, OpenError> {
        // Reject directory traversal before touching the file system.
        if filename.contains("..") {
            return Err(OpenError::InvalidPath);
        }

        Ok(self.dir.join(filename))
    }
}

/// Denied access is an access violation on the wire; anything else the
/// file system refuses counts as the file not being there.
fn open_error(e: io::Error) -> OpenError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => OpenError::InvalidPath,
        _ => OpenError::FileNotFound,
    }
}

#[async_trait]
impl IoProvider for DirProvider {
    type Reader = Unblock<fs::File>;
    type Writer = Unblock<fs::File>;

    async fn open_reader(
        &mut self,
        filename: &str,
        _mode: Mode,
    ) -> Result<Self::Reader, OpenError> {
        let path = self.resolve(filename)?;

        let file = unblock(move || {
            let meta = fs::metadata(&path)?;
            if !meta.is_file() {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            fs::File::open(&path)
        })
        .await
        .map_err(open_error)?;

        Ok(Unblock::new(file))
    }

    async fn open_writer(
        &mut self,
        filename: &str,
        _mode: Mode,
    ) -> Result<Self::Writer, OpenError> {
        let path = self.resolve(filename)?;

        let file = unblock(move || fs::File::create(&path))
            .await
            .map_err(open_error)?;

        Ok(Unblock::new(file))
    }
}

/// Reader with the transfer-mode filter applied.
pub(crate) enum ModeReader<R> {
    Octet(R),
    Netascii(NetasciiReader<R>),
}

impl<R> ModeReader<R> {
    pub(crate) fn new(inner: R, mode: Mode) -> Self {
        match mode {
            Mode::Octet => ModeReader::Octet(inner),
            Mode::Netascii => ModeReader::Netascii(NetasciiReader::new(inner)),
        }
    }
}

impl<R> AsyncRead for ModeReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ModeReader::Octet(r) => Pin::new(r).poll_read(cx, buf),
            ModeReader::Netascii(r) => Pin::new(r).poll_read(cx, buf),
        }
    }
}

/// Writer with the transfer-mode filter applied.
pub(crate) enum ModeWriter<W> {
    Octet(W),
    Netascii(NetasciiWriter<W>),
}

impl<W> ModeWriter<W> {
    pub(crate) fn new(inner: W, mode: Mode) -> Self {
        match mode {
            Mode::Octet => ModeWriter::Octet(inner),
            Mode::Netascii => ModeWriter::Netascii(NetasciiWriter::new(inner)),
        }
    }
}

impl<W> AsyncWrite for ModeWriter<W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ModeWriter::Octet(w) => Pin::new(w).poll_write(cx, buf),
            ModeWriter::Netascii(w) => Pin::new(w).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ModeWriter::Octet(w) => Pin::new(w).poll_flush(cx),
            ModeWriter::Netascii(w) => Pin::new(w).poll_flush(cx),
        }
    }

    fn poll_close(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ModeWriter::Octet(w) => Pin::new(w).poll_close(cx),
            ModeWriter::Netascii(w) => Pin::new(w).poll_close(cx),
        }
    }
}
