//! Septentrio Binary Format (SBF) blocks.
//!
//! Wire format (all fields little-endian):
//! ```text
//! ┌────────────┬──────────┬──────────┬────────────┬──────────────────────┐
//! │ Sync (2B)  │ CRC (2B) │ ID (2B)  │ Length (2B)│ Body                 │
//! │ 0x24 0x40  │          │ num|rev  │ total size │ (Length - 8 bytes)   │
//! │ "$@"       │          │          │            │                      │
//! └────────────┴──────────┴──────────┴────────────┴──────────────────────┘
//! ```
//!
//! ID bits 0..=12 carry the block number and bits 13..=15 the revision.
//! Length covers the whole block and is always a multiple of 4. The CRC is
//! CRC-16/CCITT over ID, Length and Body.

use bytes::{BufMut, Bytes, BytesMut};

use crate::decoder::Scan;
use crate::error::{FrameError, Result};
use crate::message::{DecodedMessage, Encoding};

/// Sync marker: "$@" (0x24 0x40).
pub const SYNC: [u8; 2] = *b"$@";

/// Header: sync (2) + CRC (2) + ID (2) + length (2) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest block number representable in the ID field.
pub const MAX_BLOCK_NUMBER: u16 = 0x1FFF;

/// Largest revision representable in the ID field.
pub const MAX_REVISION: u8 = 0x07;

const MAX_WIRE_LEN: usize = 0xFFFC;

/// CRC-16/CCITT (XMODEM variant: poly 0x1021, init 0, no reflection).
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in bytes {
        crc ^= u16::from(b) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Identifier string for a block number and revision, e.g. `4007.2`.
pub fn block_identifier(number: u16, revision: u8) -> String {
    format!("{number}.{revision}")
}

/// Parsed fixed header of an SBF block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub crc: u16,
    pub id: u16,
    pub length: u16,
}

impl BlockHeader {
    /// Read the header from the first [`HEADER_SIZE`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE || bytes[..2] != SYNC {
            return None;
        }
        Some(Self {
            crc: u16::from_le_bytes([bytes[2], bytes[3]]),
            id: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    pub fn number(&self) -> u16 {
        self.id & MAX_BLOCK_NUMBER
    }

    pub fn revision(&self) -> u8 {
        (self.id >> 13) as u8
    }

    pub fn identifier(&self) -> String {
        block_identifier(self.number(), self.revision())
    }
}

/// Encode a block into the wire format, padding the body to a 4-byte boundary.
pub fn encode_block(number: u16, revision: u8, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if number > MAX_BLOCK_NUMBER || revision > MAX_REVISION {
        return Err(FrameError::InvalidBlockId { number, revision });
    }
    let unpadded = HEADER_SIZE + body.len();
    let total = unpadded.div_ceil(4) * 4;
    if total > MAX_WIRE_LEN {
        return Err(FrameError::BlockTooLarge {
            size: total,
            max: MAX_WIRE_LEN,
        });
    }

    let id = number | (u16::from(revision) << 13);
    let mut covered = BytesMut::with_capacity(total - 4);
    covered.put_u16_le(id);
    covered.put_u16_le(total as u16);
    covered.put_slice(body);
    covered.put_bytes(0, total - unpadded);

    dst.reserve(total);
    dst.put_slice(&SYNC);
    dst.put_u16_le(crc16(&covered));
    dst.put_slice(&covered);
    Ok(())
}

/// Check the CRC of a complete block.
pub fn verify(block: &[u8]) -> Result<()> {
    let header = BlockHeader::parse(block).ok_or(FrameError::Malformed("no SBF header"))?;
    let length = usize::from(header.length);
    if length < HEADER_SIZE || block.len() < length {
        return Err(FrameError::Malformed("SBF length exceeds block"));
    }
    let computed = crc16(&block[4..length]);
    if computed != header.crc {
        return Err(FrameError::CrcMismatch {
            computed,
            received: header.crc,
        });
    }
    Ok(())
}

/// Scan a candidate block at the start of `buf` (which begins with the sync marker).
pub(crate) fn scan(buf: &[u8], max_len: usize) -> Scan {
    let Some(header) = BlockHeader::parse(buf) else {
        return Scan::Incomplete;
    };
    let length = usize::from(header.length);
    if length < HEADER_SIZE || length % 4 != 0 || length > max_len {
        return Scan::Unparseable;
    }
    if buf.len() < length {
        return Scan::Incomplete;
    }

    let block = &buf[..length];
    let message = DecodedMessage {
        identifier: header.identifier(),
        payload: Bytes::copy_from_slice(block),
        encoding: Encoding::Binary,
        valid: verify(block).is_ok(),
    };
    Scan::Frame {
        message,
        frame_len: length,
    }
}
