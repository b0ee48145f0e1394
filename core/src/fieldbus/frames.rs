//! Frame types on the field bus.
//!
//! Layout inside HDLC framing, big-endian:
//! `[address:1][version:1][type:1][payload:N]` with the CRC appended by
//! the framer.

use crate::core::id::ObjectId;

pub const FRAME_VERSION: u8 = 11;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Unknown = 0,
    Awk = 1,
    Nak = 2,
    Ign = 3,
    Beacon = 4,
    Outputs = 16,
    Inputs = 32,
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            1 => FrameType::Awk,
            2 => FrameType::Nak,
            3 => FrameType::Ign,
            4 => FrameType::Beacon,
            16 => FrameType::Outputs,
            32 => FrameType::Inputs,
            _ => FrameType::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceAddress {
    Unknown = 0x00,
    Tfib1 = 0x08,
    Controller = 0xFF,
}

impl From<u8> for DeviceAddress {
    fn from(value: u8) -> Self {
        match value {
            0x08 => DeviceAddress::Tfib1,
            0xFF => DeviceAddress::Controller,
            _ => DeviceAddress::Unknown,
        }
    }
}

/// Field-output vector toward the bus interface board.
///
/// Payload: one header byte (bit 7 = transfer-relay flag, remaining bits
/// reserved), then one byte per six outputs packing booleans into bits
/// 64, 32, 16, 4, 2 and 1 (bits 128 and 8 unused), outputs in ascending
/// identifier order.
pub struct OutputStateFrame {
    pub address: DeviceAddress,
    pub transfer: bool,
    pub states: Vec<bool>,
}

const OUTPUT_BITS: [u8; 6] = [64, 32, 16, 4, 2, 1];

impl OutputStateFrame {
    pub fn new(address: DeviceAddress, states: Vec<bool>, transfer: bool) -> Self {
        Self {
            address,
            transfer,
            states,
        }
    }

    /// Header plus payload, ready for the HDLC framer.
    pub fn content(&self) -> Vec<u8> {
        let packed = self.states.len().div_ceil(6);
        let mut content = Vec::with_capacity(3 + 1 + packed);
        content.push(self.address as u8);
        content.push(FRAME_VERSION);
        content.push(FrameType::Outputs as u8);
        content.push(if self.transfer { 0x80 } else { 0x00 });
        for chunk in self.states.chunks(6) {
            let mut byte = 0u8;
            for (state, bit) in chunk.iter().zip(OUTPUT_BITS) {
                if *state {
                    byte |= bit;
                }
            }
            content.push(byte);
        }
        content
    }

    /// Recover the output vector from a payload; `count` trims the
    /// trailing unused bit positions of the last byte.
    pub fn unpack(payload: &[u8], count: usize) -> Vec<bool> {
        let mut states = Vec::with_capacity(count);
        for byte in payload.iter().skip(1) {
            for bit in OUTPUT_BITS {
                if states.len() == count {
                    return states;
                }
                states.push(byte & bit != 0);
            }
        }
        states.truncate(count);
        states
    }

    /// Transfer-relay flag from a payload header byte.
    pub fn unpack_transfer(payload: &[u8]) -> bool {
        payload.first().is_some_and(|b| b & 0x80 != 0)
    }
}

/// Detector/preemption input states from the bus interface board. The
/// payload is a raw bitfield: slot 1 in bit 0 of byte 0.
pub struct InputStateFrame {
    pub address: DeviceAddress,
    pub bitfield: Vec<u8>,
}

impl InputStateFrame {
    pub fn new(address: DeviceAddress, bitfield: Vec<u8>) -> Self {
        Self { address, bitfield }
    }

    pub fn content(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(3 + self.bitfield.len());
        content.push(self.address as u8);
        content.push(FRAME_VERSION);
        content.push(FrameType::Inputs as u8);
        content.extend_from_slice(&self.bitfield);
        content
    }

    pub fn slot(&self, slot: ObjectId) -> bool {
        let index = (slot as usize).saturating_sub(1);
        self.bitfield
            .get(index / 8)
            .is_some_and(|byte| byte >> (index % 8) & 1 == 1)
    }
}

/// A received frame after CRC verification and header split.
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    pub address: DeviceAddress,
    pub version: u8,
    pub frame_type: FrameType,
    pub payload: Vec<u8>,
}

impl DecodedFrame {
    /// Split verified frame content into header and payload. Content
    /// shorter than a header decodes as an UNKNOWN frame with an empty
    /// payload.
    pub fn parse(content: &[u8]) -> Self {
        if content.len() < 3 {
            return Self {
                address: content.first().copied().map(DeviceAddress::from).unwrap_or(DeviceAddress::Unknown),
                version: 0,
                frame_type: FrameType::Unknown,
                payload: Vec::new(),
            };
        }
        Self {
            address: DeviceAddress::from(content[0]),
            version: content[1],
            frame_type: FrameType::from(content[2]),
            payload: content[3..].to_vec(),
        }
    }
}
