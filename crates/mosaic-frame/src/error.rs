/// Errors that can occur while encoding or validating receiver frames.
///
/// Validation failures never escape [`FrameDecoder`](crate::FrameDecoder);
/// it reports them as messages with `valid == false` and resynchronizes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The NMEA checksum does not match the sentence contents.
    #[error("NMEA checksum mismatch (computed {computed:02X}, received {received:02X})")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The sentence does not end in `*hh`.
    #[error("NMEA sentence has no checksum")]
    MissingChecksum,

    /// The SBF block CRC does not match the block contents.
    #[error("SBF CRC mismatch (computed {computed:#06x}, received {received:#06x})")]
    CrcMismatch { computed: u16, received: u16 },

    /// The bytes are not a frame of the expected kind.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// The block number or revision does not fit the SBF ID field.
    #[error("invalid SBF block id {number} revision {revision}")]
    InvalidBlockId { number: u16, revision: u8 },

    /// The encoded block would not fit the 16-bit length field.
    #[error("SBF block too large ({size} bytes, max {max})")]
    BlockTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading the stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
