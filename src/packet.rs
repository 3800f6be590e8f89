use bytes::{BufMut, Bytes, BytesMut};
use num_derive::FromPrimitive;

use crate::error::DecodeError;

/// Fixed DATA payload size (RFC 1350). A shorter payload marks the end of
/// the transfer.
pub const BLOCK_SIZE: usize = 512;

/// Largest inbound datagram the engine accepts.
pub const MAX_PACKET_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub(crate) enum PacketType {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

/// TFTP error codes (RFC 1350, appendix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum ErrorCode {
    Undefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileAlreadyExists = 6,
    NoSuchUser = 7,
}

/// Read or write request body.
///
/// `mode` is kept as the raw wire string; it is interpreted (and validated,
/// case-insensitively) by the I/O layer, not by the codec. Option pairs are
/// decoded in order and re-encoded verbatim, but otherwise unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RwReq {
    pub filename: String,
    pub mode: String,
    pub opts: Vec<(String, String)>,
}

/// A decoded TFTP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq(RwReq),
    Wrq(RwReq),
    Data(u16, Vec<u8>),
    Ack(u16),
    Error(u16, String),
}

impl Packet {
    /// Decodes a packet from raw bytes.
    pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
        crate::parse::parse_packet(data)
    }

    /// Builds an ERROR packet from a typed error code.
    pub fn error(code: ErrorCode, msg: &str) -> Packet {
        Packet::Error(code as u16, msg.to_owned())
    }

    /// Encodes the packet into `buf`.
    ///
    /// Encoding never fails for well-formed in-memory values.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Packet::Rrq(req) => {
                buf.put_u16(PacketType::Rrq as u16);
                encode_rw_req(req, buf);
            }
            Packet::Wrq(req) => {
                buf.put_u16(PacketType::Wrq as u16);
                encode_rw_req(req, buf);
            }
            Packet::Data(block, data) => {
                buf.put_u16(PacketType::Data as u16);
                buf.put_u16(*block);
                buf.put_slice(data);
            }
            Packet::Ack(block) => {
                buf.put_u16(PacketType::Ack as u16);
                buf.put_u16(*block);
            }
            Packet::Error(code, msg) => {
                buf.put_u16(PacketType::Error as u16);
                buf.put_u16(*code);
                buf.put_slice(msg.as_bytes());
                buf.put_u8(0);
            }
        }
    }

    /// Encodes the packet into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

fn encode_rw_req(req: &RwReq, buf: &mut BytesMut) {
    buf.put_slice(req.filename.as_bytes());
    buf.put_u8(0);
    buf.put_slice(req.mode.as_bytes());
    buf.put_u8(0);

    for (name, value) in &req.opts {
        buf.put_slice(name.as_bytes());
        buf.put_u8(0);
        buf.put_slice(value.as_bytes());
        buf.put_u8(0);
    }
}
