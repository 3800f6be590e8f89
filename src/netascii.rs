//! Stateful netascii transcoding filters.
//!
//! TFTP's netascii mode puts CR LF line endings on the wire and escapes a
//! literal CR as CR NUL. Transfers read and write in chunks of arbitrary
//! size, so a pair can straddle a chunk boundary; both filters keep the
//! split byte as carried-over state instead of operating on whole buffers.

use bytes::{Buf, BytesMut};
use futures_io::{AsyncRead, AsyncWrite};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

const CHUNK_SIZE: usize = 512;

/// Encodes a local byte stream into netascii while it is being read.
///
/// Every native `\n` becomes `\r\n` and every native `\r` becomes `\r\0`.
/// The second byte of an expansion is buffered, so the output is correct
/// even when the caller reads one byte at a time.
pub struct NetasciiReader<R> {
    inner: R,
    pending: Option<u8>,
    chunk: Box<[u8]>,
    pos: usize,
    len: usize,
    eof: bool,
}

impl<R> NetasciiReader<R> {
    pub fn new(inner: R) -> Self {
        NetasciiReader {
            inner,
            pending: None,
            chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            eof: false,
        }
    }

    /// Unwraps the filter, dropping any buffered state.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> AsyncRead for NetasciiReader<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let mut filled = 0;

        while filled < buf.len() {
            if let Some(byte) = this.pending.take() {
                buf[filled] = byte;
                filled += 1;
                continue;
            }

            if this.pos == this.len {
                if this.eof {
                    break;
                }

                match Pin::new(&mut this.inner)
                    .poll_read(cx, &mut this.chunk)
                {
                    Poll::Ready(Ok(0)) => {
                        this.eof = true;
                        break;
                    }
                    Poll::Ready(Ok(n)) => {
                        this.pos = 0;
                        this.len = n;
                    }
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending if filled > 0 => break,
                    Poll::Pending => return Poll::Pending,
                }

                continue;
            }

            let byte = this.chunk[this.pos];
            this.pos += 1;

            match byte {
                b'\n' => {
                    buf[filled] = b'\r';
                    this.pending = Some(b'\n');
                }
                b'\r' => {
                    buf[filled] = b'\r';
                    this.pending = Some(0);
                }
                other => buf[filled] = other,
            }
            filled += 1;
        }

        Poll::Ready(Ok(filled))
    }
}

/// Decodes a netascii stream back into local bytes while it is being
/// written.
///
/// A trailing `\r` cannot be interpreted until the next byte arrives, so
/// it is held as pending state; `close` flushes it verbatim if the stream
/// ends on it.
pub struct NetasciiWriter<W> {
    inner: W,
    pending_cr: bool,
    staged: BytesMut,
    reported: usize,
}

impl<W> NetasciiWriter<W> {
    pub fn new(inner: W) -> Self {
        NetasciiWriter {
            inner,
            pending_cr: false,
            staged: BytesMut::new(),
            reported: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn stage(&mut self, buf: &[u8]) {
        self.staged.reserve(buf.len() + 1);

        for &byte in buf {
            match byte {
                b'\r' => {
                    if self.pending_cr {
                        // CR CR: the first one was a literal CR
                        self.staged.extend_from_slice(b"\r");
                    }
                    self.pending_cr = true;
                }
                b'\n' => {
                    // CR LF collapses to the local newline; a bare LF
                    // passes through
                    self.pending_cr = false;
                    self.staged.extend_from_slice(b"\n");
                }
                0 => {
                    if self.pending_cr {
                        // CR NUL unescapes to a literal CR
                        self.staged.extend_from_slice(b"\r");
                        self.pending_cr = false;
                    } else {
                        self.staged.extend_from_slice(&[0]);
                    }
                }
                other => {
                    if self.pending_cr {
                        self.staged.extend_from_slice(b"\r");
                        self.pending_cr = false;
                    }
                    self.staged.extend_from_slice(&[other]);
                }
            }
        }
    }

    fn poll_drain(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>>
    where
        W: AsyncWrite + Unpin,
    {
        while !self.staged.is_empty() {
            match Pin::new(&mut self.inner).poll_write(cx, &self.staged[..]) {
                Poll::Ready(Ok(0)) => {
                    return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                }
                Poll::Ready(Ok(n)) => self.staged.advance(n),
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }

        Poll::Ready(Ok(()))
    }
}

impl<W> AsyncWrite for NetasciiWriter<W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        // Transcode the whole input up front; if draining returns Pending
        // the staged bytes are kept and the next poll resumes the drain
        // without re-transcoding.
        if this.staged.is_empty() {
            this.stage(buf);
            this.reported = buf.len();
        }

        match this.poll_drain(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(this.reported)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        match this.poll_drain(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut this.inner).poll_flush(cx),
            other => other,
        }
    }

    fn poll_close(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.pending_cr {
            this.staged.extend_from_slice(b"\r");
            this.pending_cr = false;
        }

        match this.poll_drain(cx) {
            Poll::Ready(Ok(())) => Pin::new(&mut this.inner).poll_close(cx),
            other => other,
        }
    }
}
