//! Incremental decoding of a GNSS receiver byte stream.
//!
//! Two encodings share the stream and are told apart by their first bytes:
//! - SBF blocks: sync `$@`, CRC-16/CCITT, block ID with revision, length
//! - NMEA sentences: `$`, tag, comma fields, `*hh` XOR checksum, `\r\n`
//!
//! [`FrameDecoder`] accepts bytes in arbitrary chunks and yields
//! [`DecodedMessage`]s in wire order, resynchronizing after corruption.

#[cfg(feature = "async")]
pub mod codec;
pub mod decoder;
pub mod error;
pub mod message;
pub mod nmea;
pub mod sbf;

#[cfg(feature = "async")]
pub use codec::ReceiverCodec;
pub use decoder::{
    DecoderConfig, Drain, FrameDecoder, DEFAULT_MAX_BLOCK_LEN, DEFAULT_MAX_SENTENCE_LEN,
};
pub use error::{FrameError, Result};
pub use message::{DecodedMessage, Encoding};
pub use nmea::encode_sentence;
pub use sbf::{encode_block, BlockHeader};
