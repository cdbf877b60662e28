//! `tokio_util` codec over [`FrameDecoder`] for async hosts.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::decoder::{DecoderConfig, FrameDecoder};
use crate::error::FrameError;
use crate::message::DecodedMessage;

/// Decodes receiver frames from a `FramedRead`.
///
/// Every byte handed in by the framework moves into the inner decoder, so the
/// framework buffer is always empty between calls and end-of-stream never
/// reports leftover bytes.
#[derive(Debug, Default)]
pub struct ReceiverCodec {
    decoder: FrameDecoder,
}

impl ReceiverCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(config),
        }
    }
}

impl Decoder for ReceiverCodec {
    type Item = DecodedMessage;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let chunk = src.split();
            self.decoder.extend(&chunk);
        }
        Ok(self.decoder.next_message())
    }
}
