//! NMEA 0183 style ASCII sentences.
//!
//! ```text
//! $GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76\r\n
//!  └───┘ └──────────────────── fields ──────────────────────────────┘ └┘
//!  identifier                                                    checksum
//! ```
//!
//! The checksum is the XOR of every byte between `$` and `*`.

use bytes::Bytes;

use crate::decoder::Scan;
use crate::error::{FrameError, Result};
use crate::message::{DecodedMessage, Encoding};

/// First byte of every sentence.
pub const START: u8 = b'$';

/// XOR checksum over a sentence body (the bytes between `$` and `*`).
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Build a complete sentence, checksum and `\r\n` included, from its body.
///
/// `body` is everything between `$` and `*`, e.g. `GPGGA,092750.000,...`.
pub fn encode_sentence(body: &str) -> Result<String> {
    if body.bytes().any(|b| matches!(b, b'$' | b'*') || !is_printable(b)) {
        return Err(FrameError::Malformed("sentence body contains reserved bytes"));
    }
    Ok(format!("${body}*{:02X}\r\n", checksum(body.as_bytes())))
}

/// Check the trailing `*hh` of a sentence (without line terminator).
pub fn verify(sentence: &[u8]) -> Result<()> {
    let len = sentence.len();
    if len < 4 || sentence[0] != START || sentence[len - 3] != b'*' {
        return Err(FrameError::MissingChecksum);
    }
    let received = match (hex_value(sentence[len - 2]), hex_value(sentence[len - 1])) {
        (Some(hi), Some(lo)) => (hi << 4) | lo,
        _ => return Err(FrameError::MissingChecksum),
    };
    let computed = checksum(&sentence[1..len - 3]);
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }
    Ok(())
}

/// Scan a candidate sentence at the start of `buf` (which begins with `$`).
pub(crate) fn scan(buf: &[u8], max_len: usize) -> Scan {
    let mut end = None;
    let mut i = 1;
    while i < buf.len() {
        if i > max_len + 1 {
            return Scan::Unparseable;
        }
        match buf[i] {
            b'\n' => {
                end = Some((i, i + 1));
                break;
            }
            b'\r' => match buf.get(i + 1) {
                Some(b'\n') => {
                    end = Some((i, i + 2));
                    break;
                }
                Some(_) => return Scan::Unparseable,
                None => return Scan::Incomplete,
            },
            START => return Scan::Unparseable,
            b if !is_printable(b) => return Scan::Unparseable,
            _ => {}
        }
        i += 1;
    }

    let Some((sentence_end, frame_len)) = end else {
        return Scan::Incomplete;
    };
    if sentence_end > max_len {
        return Scan::Unparseable;
    }
    let sentence = &buf[..sentence_end];

    let ident_end = sentence[1..]
        .iter()
        .position(|b| matches!(b, b',' | b'*'))
        .map_or(sentence.len(), |p| p + 1);
    let identifier = &sentence[1..ident_end];
    if identifier.is_empty() || !identifier.iter().all(u8::is_ascii_alphanumeric) {
        return Scan::Unparseable;
    }

    let message = DecodedMessage {
        identifier: String::from_utf8_lossy(identifier).into_owned(),
        payload: Bytes::copy_from_slice(sentence),
        encoding: Encoding::Ascii,
        valid: verify(sentence).is_ok(),
    };
    Scan::Frame { message, frame_len }
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &[u8] = b"$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76";

    fn frame(scan: Scan) -> (DecodedMessage, usize) {
        match scan {
            Scan::Frame { message, frame_len } => (message, frame_len),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn checksum_of_known_sentence() {
        assert_eq!(checksum(&GGA[1..GGA.len() - 3]), 0x76);
        verify(GGA).unwrap();
    }

    #[test]
    fn encode_renders_uppercase_hex() {
        let sentence = encode_sentence("GPTXT,01,01,02,ANTARIS").unwrap();
        assert!(sentence.ends_with("\r\n"));
        let star = sentence.rfind('*').unwrap();
        let digits = &sentence[star + 1..star + 3];
        assert_eq!(digits, digits.to_ascii_uppercase());
        verify(sentence.trim_end().as_bytes()).unwrap();
    }

    #[test]
    fn encode_rejects_reserved_bytes() {
        assert!(encode_sentence("GP$GGA").is_err());
        assert!(encode_sentence("GPGGA*").is_err());
        assert!(encode_sentence("GPGGA\n").is_err());
    }

    #[test]
    fn verify_accepts_lowercase_digits() {
        let mut sentence = encode_sentence("PSSN,HRP,1,2").unwrap().trim_end().to_string();
        sentence = sentence.to_ascii_lowercase().replacen("$pssn,hrp", "$PSSN,HRP", 1);
        verify(sentence.as_bytes()).unwrap();
    }

    #[test]
    fn verify_reports_mismatch() {
        let mut corrupted = GGA.to_vec();
        corrupted[8] = b'8';
        assert!(matches!(
            verify(&corrupted),
            Err(FrameError::ChecksumMismatch { received: 0x76, .. })
        ));
        assert!(matches!(verify(b"$GPGGA,1,2"), Err(FrameError::MissingChecksum)));
    }

    #[test]
    fn scan_crlf_sentence() {
        let mut wire = GGA.to_vec();
        wire.extend_from_slice(b"\r\n$GP");
        let (message, frame_len) = frame(scan(&wire, 1024));
        assert_eq!(message.identifier, "GPGGA");
        assert!(message.valid);
        assert_eq!(message.payload.as_ref(), GGA);
        assert_eq!(frame_len, GGA.len() + 2);
    }

    #[test]
    fn scan_bare_lf_sentence() {
        let mut wire = GGA.to_vec();
        wire.push(b'\n');
        let (message, frame_len) = frame(scan(&wire, 1024));
        assert!(message.valid);
        assert_eq!(frame_len, wire.len());
    }

    #[test]
    fn scan_waits_for_terminator() {
        assert!(matches!(scan(GGA, 1024), Scan::Incomplete));
        let mut wire = GGA.to_vec();
        wire.push(b'\r');
        assert!(matches!(scan(&wire, 1024), Scan::Incomplete));
    }

    #[test]
    fn scan_rejects_garbage() {
        assert!(matches!(scan(b"$GP\x01GGA\r\n", 1024), Scan::Unparseable));
        assert!(matches!(scan(b"$GPG$GPGGA,1*00\r\n", 1024), Scan::Unparseable));
        assert!(matches!(scan(b"$,1,2*00\r\n", 1024), Scan::Unparseable));
        assert!(matches!(scan(b"$GP-GGA,1*00\r\n", 1024), Scan::Unparseable));
        assert!(matches!(scan(b"$GPGGA,1\rX", 1024), Scan::Unparseable));
    }

    #[test]
    fn scan_enforces_max_len() {
        let long = format!("$GPTXT,{}", "A".repeat(64));
        assert!(matches!(scan(long.as_bytes(), 32), Scan::Unparseable));
        let terminated = encode_sentence(&format!("GPTXT,{}", "A".repeat(40))).unwrap();
        assert!(matches!(scan(terminated.as_bytes(), 32), Scan::Unparseable));
    }

    #[test]
    fn identifier_without_fields() {
        let sentence = encode_sentence("PSSNX").unwrap();
        let (message, _) = frame(scan(sentence.as_bytes(), 1024));
        assert_eq!(message.identifier, "PSSNX");
        assert!(message.valid);
    }

    #[test]
    fn missing_checksum_is_invalid_frame() {
        let (message, _) = frame(scan(b"$GPTXT,hello\r\n", 1024));
        assert_eq!(message.identifier, "GPTXT");
        assert!(!message.valid);
    }
}
