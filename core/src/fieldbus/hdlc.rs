//! HDLC byte framing with CRC-16/CCITT.
//!
//! Frames are delimited by FLAG bytes. FLAG or ESCAPE bytes occurring in
//! the content are escaped as `ESCAPE, byte ^ ESCAPE_MASK`. The CRC is
//! the reflected CCITT polynomial (poly 0x1021, init 0xFFFF, no final
//! xor) appended big-endian before escaping.

use thiserror::Error;

pub const FLAG: u8 = 0x7E;
pub const ESCAPE: u8 = 0x7D;
pub const ESCAPE_MASK: u8 = 0x20;

/// Frames longer than this after unescaping are rejected.
pub const MAX_FRAME_LENGTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HdlcError {
    #[error("bare flag inside frame body")]
    Flag,
    #[error("frame carries a checksum but no content")]
    Empty,
    #[error("frame too short to carry a checksum")]
    NoCrc,
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    BadCrc { expected: u16, actual: u16 },
    #[error("frame exceeds {MAX_FRAME_LENGTH} bytes")]
    TooLong,
    #[error("no data between flags")]
    NoData,
}

/// Reflected CRC-16/CCITT (poly 0x1021 reversed, init 0xFFFF, xor-out 0).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x8408;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Escape content bytes; FLAG and ESCAPE are masked.
pub fn escape(data: &[u8], out: &mut Vec<u8>) {
    for &byte in data {
        if byte == FLAG || byte == ESCAPE {
            out.push(ESCAPE);
            out.push(byte ^ ESCAPE_MASK);
        } else {
            out.push(byte);
        }
    }
}

/// Undo `escape`. Stops with an error on a bare FLAG.
pub fn unescape(data: &[u8]) -> Result<Vec<u8>, HdlcError> {
    let mut out = Vec::with_capacity(data.len());
    let mut escaping = false;
    for &byte in data {
        if byte == FLAG {
            return Err(HdlcError::Flag);
        }
        if escaping {
            out.push(byte ^ ESCAPE_MASK);
            escaping = false;
        } else if byte == ESCAPE {
            escaping = true;
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}

/// Encode content into a complete frame: FLAG, escaped content and CRC,
/// FLAG.
pub fn encode(content: &[u8]) -> Vec<u8> {
    let crc = crc16(content);
    let mut framed = Vec::with_capacity(content.len() + 4);
    framed.push(FLAG);
    escape(content, &mut framed);
    escape(&crc.to_be_bytes(), &mut framed);
    framed.push(FLAG);
    framed
}

/// Decode the bytes captured between two FLAG bytes into verified
/// content.
pub fn decode(body: &[u8]) -> Result<Vec<u8>, HdlcError> {
    if body.len() > MAX_FRAME_LENGTH {
        return Err(HdlcError::TooLong);
    }
    if body.is_empty() {
        return Err(HdlcError::NoData);
    }
    if body.len() < 2 {
        return Err(HdlcError::NoCrc);
    }
    if body.len() == 2 {
        return Err(HdlcError::Empty);
    }
    let unescaped = unescape(body)?;
    if unescaped.len() < 3 {
        return Err(HdlcError::Empty);
    }
    let (content, crc_bytes) = unescaped.split_at(unescaped.len() - 2);
    let expected = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
    let actual = crc16(content);
    if actual != expected {
        return Err(HdlcError::BadCrc { expected, actual });
    }
    Ok(content.to_vec())
}
