use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::message::DecodedMessage;
use crate::{nmea, sbf};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Default cap on an ASCII sentence, terminator excluded.
pub const DEFAULT_MAX_SENTENCE_LEN: usize = 1024;

/// Default cap on an SBF block, header included.
pub const DEFAULT_MAX_BLOCK_LEN: usize = 16 * 1024;

/// Outcome of looking at the candidate frame at the front of the buffer.
#[derive(Debug)]
pub(crate) enum Scan {
    /// More bytes are needed before anything can be decided.
    Incomplete,
    /// Not a frame; drop the leading byte and rescan.
    Unparseable,
    /// A complete frame of `frame_len` bytes, valid or not.
    Frame {
        message: DecodedMessage,
        frame_len: usize,
    },
}

/// Limits applied while scanning candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Longest accepted ASCII sentence, terminator excluded.
    pub max_sentence_len: usize,
    /// Longest accepted SBF block, header included.
    pub max_block_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_sentence_len: DEFAULT_MAX_SENTENCE_LEN,
            max_block_len: DEFAULT_MAX_BLOCK_LEN,
        }
    }
}

/// Incremental decoder for a mixed SBF / NMEA byte stream.
///
/// Bytes are appended with [`extend`](Self::extend) in whatever chunks the
/// transport delivers; frames split across chunks are reassembled. Every
/// candidate starts at a `$`: a following `@` selects SBF framing, anything
/// else NMEA framing. Invalid frames are still returned (with `valid == false`),
/// after which exactly one byte is discarded and scanning resumes, so a
/// corrupted frame costs at most its own bytes.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    config: DecoderConfig,
}

impl FrameDecoder {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit limits.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Decode the next frame from buffered bytes.
    ///
    /// Returns `None` when the buffer holds no complete frame; the partial
    /// candidate stays buffered for the next call.
    pub fn next_message(&mut self) -> Option<DecodedMessage> {
        loop {
            match self.buf.iter().position(|&b| b == nmea::START) {
                None => {
                    if !self.buf.is_empty() {
                        trace!(dropped = self.buf.len(), "no frame start in buffer");
                        self.buf.clear();
                    }
                    return None;
                }
                Some(0) => {}
                Some(skip) => {
                    trace!(dropped = skip, "skipped bytes before frame start");
                    self.buf.advance(skip);
                }
            }

            if self.buf.len() < 2 {
                return None;
            }

            let scan = if self.buf[1] == sbf::SYNC[1] {
                sbf::scan(&self.buf, self.config.max_block_len)
            } else {
                nmea::scan(&self.buf, self.config.max_sentence_len)
            };

            match scan {
                Scan::Incomplete => return None,
                Scan::Unparseable => {
                    self.buf.advance(1);
                }
                Scan::Frame { message, frame_len } => {
                    if message.valid {
                        self.buf.advance(frame_len);
                    } else {
                        trace!(identifier = %message.identifier, "invalid frame, resyncing");
                        self.buf.advance(1);
                    }
                    return Some(message);
                }
            }
        }
    }

    /// Iterate over every frame decodable from the bytes buffered so far.
    ///
    /// The iterator ends when the buffer runs dry; after more bytes are
    /// appended a new drain picks up where the last one stopped.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain { decoder: self }
    }

    /// Append `chunk` and collect every frame it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<DecodedMessage> {
        self.extend(chunk);
        self.drain().collect()
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Forget any buffered partial frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`FrameDecoder::drain`].
pub struct Drain<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Drain<'_> {
    type Item = DecodedMessage;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_message()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::message::Encoding;
    use crate::nmea::encode_sentence;
    use crate::sbf::encode_block;

    const GGA: &str = "GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,";

    fn block(number: u16, revision: u8, body: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_block(number, revision, body, &mut wire).unwrap();
        wire.to_vec()
    }

    fn sentence(body: &str) -> Vec<u8> {
        encode_sentence(body).unwrap().into_bytes()
    }

    fn identifiers(messages: &[DecodedMessage]) -> Vec<(&str, bool)> {
        messages
            .iter()
            .map(|m| (m.identifier.as_str(), m.valid))
            .collect()
    }

    #[test]
    fn decodes_valid_sentence() {
        let mut decoder = FrameDecoder::new();
        let messages = decoder.decode(&sentence(GGA));
        assert_eq!(identifiers(&messages), vec![("GPGGA", true)]);
        assert_eq!(messages[0].encoding, Encoding::Ascii);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn flipped_payload_byte_is_invalid() {
        let mut wire = sentence(GGA);
        wire[10] = if wire[10] == b'1' { b'2' } else { b'1' };
        let mut decoder = FrameDecoder::new();
        let messages = decoder.decode(&wire);
        assert_eq!(identifiers(&messages), vec![("GPGGA", false)]);
    }

    #[test]
    fn decodes_valid_block() {
        let wire = block(4007, 2, &[7u8; 88]);
        let mut decoder = FrameDecoder::new();
        let messages = decoder.decode(&wire);
        assert_eq!(identifiers(&messages), vec![("4007.2", true)]);
        assert_eq!(messages[0].payload.as_ref(), wire.as_slice());
    }

    #[test]
    fn truncated_block_waits_for_remainder() {
        let wire = block(4007, 2, &[7u8; 88]);
        let (head, tail) = wire.split_at(37);
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode(head).is_empty());
        assert_eq!(decoder.buffered_len(), head.len());
        let messages = decoder.decode(tail);
        assert_eq!(identifiers(&messages), vec![("4007.2", true)]);
    }

    #[test]
    fn interleaved_encodings_in_wire_order() {
        let mut wire = sentence(GGA);
        wire.extend(block(4007, 2, b"pvt geodetic"));
        wire.extend(sentence("GPRMC,092750.000,A,5321.6802,N,00630.3372,W,0.02,31.66,280511,,,A"));
        wire.extend(block(5914, 0, b"receiver time"));

        let mut decoder = FrameDecoder::new();
        let messages = decoder.decode(&wire);
        assert_eq!(
            identifiers(&messages),
            vec![("GPGGA", true), ("4007.2", true), ("GPRMC", true), ("5914.0", true)]
        );
    }

    #[test]
    fn corrupt_byte_before_sync_is_skipped() {
        let mut wire = vec![0xA5];
        wire.extend(block(4007, 2, b"after noise"));
        let mut decoder = FrameDecoder::new();
        assert_eq!(identifiers(&decoder.decode(&wire)), vec![("4007.2", true)]);
    }

    #[test]
    fn stray_dollar_before_sync_is_skipped() {
        let mut wire = b"$".to_vec();
        wire.extend(block(4007, 2, b"after noise"));
        wire.extend(b"$$");
        wire.extend(sentence(GGA));
        let mut decoder = FrameDecoder::new();
        assert_eq!(
            identifiers(&decoder.decode(&wire)),
            vec![("4007.2", true), ("GPGGA", true)]
        );
    }

    #[test]
    fn bad_crc_block_then_valid_frame() {
        let mut bad = block(4007, 2, b"will be corrupted");
        let last = bad.len() - 1;
        bad[last] ^= 0x5A;
        let mut wire = bad;
        wire.extend(sentence(GGA));

        let mut decoder = FrameDecoder::new();
        let messages = decoder.decode(&wire);
        assert_eq!(
            messages.first().map(|m| (m.identifier.as_str(), m.valid)),
            Some(("4007.2", false))
        );
        assert_eq!(
            messages.last().map(|m| (m.identifier.as_str(), m.valid)),
            Some(("GPGGA", true))
        );
    }

    #[test]
    fn sync_inside_corrupted_body_is_recovered() {
        let inner = block(5914, 0, b"inner block");
        let mut outer = block(4007, 2, &inner);
        outer[2] ^= 0xFF;
        let mut wire = outer;
        wire.extend(sentence(GGA));

        let mut decoder = FrameDecoder::new();
        let valid: Vec<_> = decoder
            .decode(&wire)
            .into_iter()
            .filter(|m| m.valid)
            .map(|m| m.identifier)
            .collect();
        assert_eq!(valid, vec!["5914.0".to_string(), "GPGGA".to_string()]);
    }

    #[test]
    fn truncated_sentence_followed_by_complete_one() {
        let full = sentence(GGA);
        let mut wire = full[..20].to_vec();
        wire.extend(&full);
        let mut decoder = FrameDecoder::new();
        assert_eq!(identifiers(&decoder.decode(&wire)), vec![("GPGGA", true)]);
    }

    #[test]
    fn garbage_without_start_is_dropped() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode(b"\x00\x01noise\r\n").is_empty());
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn drain_resumes_after_more_bytes() {
        let mut wire = sentence(GGA);
        wire.extend(sentence("GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1"));
        let split = wire.len() - 5;

        let mut decoder = FrameDecoder::new();
        decoder.extend(&wire[..split]);
        assert_eq!(decoder.drain().count(), 1);
        assert_eq!(decoder.drain().count(), 0);
        decoder.extend(&wire[split..]);
        let rest: Vec<_> = decoder.drain().collect();
        assert_eq!(identifiers(&rest), vec![("GPGSA", true)]);
    }

    #[test]
    fn clear_discards_partial_frame() {
        let wire = block(4007, 2, &[1u8; 40]);
        let mut decoder = FrameDecoder::new();
        decoder.extend(&wire[..20]);
        decoder.clear();
        assert_eq!(decoder.buffered_len(), 0);
        assert!(decoder.decode(&wire[20..]).is_empty());
    }

    #[test]
    fn oversized_block_length_is_skipped() {
        let config = DecoderConfig {
            max_block_len: 64,
            ..DecoderConfig::default()
        };
        let mut wire = block(4027, 0, &[0u8; 120]);
        wire.extend(sentence(GGA));
        let mut decoder = FrameDecoder::with_config(config);
        let messages = decoder.decode(&wire);
        assert_eq!(identifiers(&messages), vec![("GPGGA", true)]);
    }
}
