use bytes::Bytes;

/// Which framing rule produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// An SBF block.
    Binary,
    /// An NMEA-style ASCII sentence.
    Ascii,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::Ascii => "ascii",
        }
    }
}

/// One frame cut from the receiver stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Sentence tag (`GPGGA`) or SBF block number and revision (`4007.2`).
    pub identifier: String,
    /// The whole frame: sentence without line terminator, or block with header.
    pub payload: Bytes,
    pub encoding: Encoding,
    /// Whether the checksum or CRC matched.
    pub valid: bool,
}

impl DecodedMessage {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The sentence text for ASCII frames.
    pub fn as_str(&self) -> Option<&str> {
        match self.encoding {
            Encoding::Ascii => std::str::from_utf8(&self.payload).ok(),
            Encoding::Binary => None,
        }
    }

    /// Comma-separated fields of an ASCII sentence, identifier first, with the
    /// leading `$` and trailing `*hh` removed. Empty for binary frames.
    pub fn fields(&self) -> Vec<&str> {
        let Some(text) = self.as_str() else {
            return Vec::new();
        };
        let text = text.strip_prefix('$').unwrap_or(text);
        let body = match text.rfind('*') {
            Some(star) if star + 3 == text.len() => &text[..star],
            _ => text,
        };
        body.split(',').collect()
    }
}
