use nom::bytes::complete::{tag, take_till};
use nom::combinator::{map_res, rest};
use nom::multi::many0;
use nom::number::complete::be_u16;
use nom::sequence::tuple;
use nom::IResult;
use num_traits::FromPrimitive;
use std::str;

use crate::error::DecodeError;
use crate::packet::*;

pub(crate) fn parse_packet(input: &[u8]) -> Result<Packet, DecodeError> {
    if input.len() < 2 {
        return Err(DecodeError::TruncatedInput);
    }

    let opcode = u16::from_be_bytes([input[0], input[1]]);
    let body = &input[2..];

    let packet_type = PacketType::from_u16(opcode)
        .ok_or(DecodeError::UnknownOpcode(opcode))?;

    let (remaining, packet) = match packet_type {
        PacketType::Rrq => parse_rrq(body)?,
        PacketType::Wrq => parse_wrq(body)?,
        PacketType::Data => parse_data(body)?,
        PacketType::Ack => parse_ack(body)?,
        PacketType::Error => parse_error(body)?,
    };

    if remaining.is_empty() {
        Ok(packet)
    } else {
        Err(DecodeError::TrailingData)
    }
}

fn nul_str(input: &[u8]) -> IResult<&[u8], &str> {
    map_res(
        tuple((take_till(|c| c == b'\0'), tag(b"\0"))),
        |(s, _): (&[u8], _)| str::from_utf8(s),
    )(input)
}

fn parse_rw_req(input: &[u8]) -> IResult<&[u8], RwReq> {
    let (input, (filename, mode, opts)) = tuple((
        nul_str,
        nul_str,
        many0(tuple((nul_str, nul_str))),
    ))(input)?;

    Ok((
        input,
        RwReq {
            filename: filename.to_owned(),
            mode: mode.to_owned(),
            opts: opts
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
        },
    ))
}

fn parse_rrq(input: &[u8]) -> Result<(&[u8], Packet), DecodeError> {
    let (input, req) = parse_rw_req(input)?;
    Ok((input, Packet::Rrq(req)))
}

fn parse_wrq(input: &[u8]) -> Result<(&[u8], Packet), DecodeError> {
    let (input, req) = parse_rw_req(input)?;
    Ok((input, Packet::Wrq(req)))
}

fn parse_data(input: &[u8]) -> Result<(&[u8], Packet), DecodeError> {
    let (input, (block, data)) = tuple((be_u16, rest))(input)?;

    // A DATA payload is bounded by the fixed block size.
    if data.len() > BLOCK_SIZE {
        return Err(DecodeError::TrailingData);
    }

    Ok((input, Packet::Data(block, data.to_vec())))
}

fn parse_ack(input: &[u8]) -> Result<(&[u8], Packet), DecodeError> {
    let (input, block) = be_u16(input)?;
    Ok((input, Packet::Ack(block)))
}

fn parse_error(input: &[u8]) -> Result<(&[u8], Packet), DecodeError> {
    let (input, (code, msg)) = tuple((be_u16, nul_str))(input)?;
    Ok((input, Packet::Error(code, msg.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_rrq() {
        let packet = Packet::decode(b"\x00\x01abc\0netascii\0");
        assert_eq!(
            packet,
            Ok(Packet::Rrq(RwReq {
                filename: "abc".to_string(),
                mode: "netascii".to_string(),
                opts: Vec::new(),
            }))
        );
        assert_eq!(
            packet.unwrap().to_bytes(),
            b"\x00\x01abc\0netascii\0".to_vec()
        );

        // mode case is preserved on the wire
        let packet = Packet::decode(b"\x00\x01abc\0netascII\0");
        assert_eq!(
            packet,
            Ok(Packet::Rrq(RwReq {
                filename: "abc".to_string(),
                mode: "netascII".to_string(),
                opts: Vec::new(),
            }))
        );

        let packet = Packet::decode(b"\x00\x01abc\0netascii");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::decode(b"\x00\x01abc\0");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::decode(
            b"\x00\x01abc\0netascii\0blksize\0123\0timeout\03\0tsize\05556\0",
        );
        assert_eq!(
            packet,
            Ok(Packet::Rrq(RwReq {
                filename: "abc".to_string(),
                mode: "netascii".to_string(),
                opts: vec![
                    ("blksize".to_string(), "123".to_string()),
                    ("timeout".to_string(), "3".to_string()),
                    ("tsize".to_string(), "5556".to_string()),
                ],
            }))
        );
        assert_eq!(
            packet.unwrap().to_bytes(),
            b"\x00\x01abc\0netascii\0blksize\0123\0timeout\03\0tsize\05556\0"
                .to_vec()
        );

        // odd trailing option string with no matching value
        let packet = Packet::decode(b"\x00\x01abc\0octet\0blksize\0");
        assert_eq!(packet, Err(DecodeError::TrailingData));

        // empty filename and mode are valid at the codec level
        let packet = Packet::decode(b"\x00\x01\0\0");
        assert_eq!(
            packet,
            Ok(Packet::Rrq(RwReq {
                filename: String::new(),
                mode: String::new(),
                opts: Vec::new(),
            }))
        );
    }

    #[test]
    fn check_wrq() {
        let packet = Packet::decode(b"\x00\x02abc\0octet\0");
        assert_eq!(
            packet,
            Ok(Packet::Wrq(RwReq {
                filename: "abc".to_string(),
                mode: "octet".to_string(),
                opts: Vec::new(),
            }))
        );
        assert_eq!(packet.unwrap().to_bytes(), b"\x00\x02abc\0octet\0".to_vec());

        let packet = Packet::decode(b"\x00\x02abc\0octet");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));
    }

    #[test]
    fn check_data() {
        let packet = Packet::decode(b"\x00\x03\x00\x09abcde");
        assert_eq!(packet, Ok(Packet::Data(9, b"abcde".to_vec())));
        assert_eq!(
            packet.unwrap().to_bytes(),
            b"\x00\x03\x00\x09abcde".to_vec()
        );

        let packet = Packet::decode(b"\x00\x03\x00\x09");
        assert_eq!(packet, Ok(Packet::Data(9, Vec::new())));
        assert_eq!(packet.unwrap().to_bytes(), b"\x00\x03\x00\x09".to_vec());

        // shorter than the 4-byte header
        let packet = Packet::decode(b"\x00\x03\x00");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        // full block round-trips
        let mut buf = b"\x00\x03\x00\x01".to_vec();
        buf.extend_from_slice(&[0xAA; BLOCK_SIZE]);
        let packet = Packet::decode(&buf);
        assert_eq!(packet, Ok(Packet::Data(1, vec![0xAA; BLOCK_SIZE])));
        assert_eq!(packet.unwrap().to_bytes(), buf);

        // payload longer than a block is rejected
        let mut buf = b"\x00\x03\x00\x01".to_vec();
        buf.extend_from_slice(&[0xAA; BLOCK_SIZE + 1]);
        assert_eq!(Packet::decode(&buf), Err(DecodeError::TrailingData));
    }

    #[test]
    fn check_ack() {
        let packet = Packet::decode(b"\x00\x04\x00\x09");
        assert_eq!(packet, Ok(Packet::Ack(9)));
        assert_eq!(packet.unwrap().to_bytes(), b"\x00\x04\x00\x09".to_vec());

        let packet = Packet::decode(b"\x00\x04\x00");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::decode(b"\x00\x04\x00\x07a");
        assert_eq!(packet, Err(DecodeError::TrailingData));
    }

    #[test]
    fn check_error() {
        let packet = Packet::decode(b"\x00\x05\x00\x08msg\0");
        assert_eq!(packet, Ok(Packet::Error(8, "msg".to_string())));
        assert_eq!(packet.unwrap().to_bytes(), b"\x00\x05\x00\x08msg\0".to_vec());

        let packet = Packet::decode(b"\x00\x05\x00\x08msg\0more");
        assert_eq!(packet, Err(DecodeError::TrailingData));

        let packet = Packet::decode(b"\x00\x05\x00\x08msg");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::decode(b"\x00\x05\x00\x08");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::error(ErrorCode::AccessViolation, "denied");
        assert_eq!(packet.to_bytes(), b"\x00\x05\x00\x02denied\0".to_vec());
    }

    #[test]
    fn check_packet() {
        let packet = Packet::decode(b"\x00\x06");
        assert_eq!(packet, Err(DecodeError::UnknownOpcode(6)));

        let packet = Packet::decode(b"\x00\x00ab");
        assert_eq!(packet, Err(DecodeError::UnknownOpcode(0)));

        let packet = Packet::decode(b"\x00");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));

        let packet = Packet::decode(b"");
        assert_eq!(packet, Err(DecodeError::TruncatedInput));
    }
}
