//! # Compression Layer
//!
//! Binary files frame every record (and the end-of-file marker) as its own
//! complete gzip member, so a byte range taken from the index always bounds
//! one independently decodable unit. This module owns that framing.
//!
//! A [`Press`] is held per file handle, never shared: it accumulates input
//! into the member under construction and releases the member's bytes once
//! [`Press::finish_on_next_write`] has been armed. Decompression of a single
//! frame leaves no state behind, so the same handle can inflate members
//! record-after-record, and [`Press::decompress_one_shot`] serves
//! index-driven random access without touching any session state.

use std::io::{Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{HeaderError, PressError, Result};

/// Compression methods for binary files.
///
/// `None` is byte-identity (still allocating a copy so ownership stays
/// uniform across methods); `Gzip` frames each unit as one gzip member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    None,
    Gzip,
}
impl Method {
    /// The one-byte tag stored in the binary preamble.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Method::None => 0,
            Method::Gzip => 1,
        }
    }

    /// Decodes a preamble tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Method::None),
            1 => Ok(Method::Gzip),
            other => Err(HeaderError::UnknownMethodTag(other).into()),
        }
    }
}

/// Per-handle compression context.
#[derive(Debug)]
pub struct Press {
    method: Method,
    /// Member under construction; `None` between members.
    encoder: Option<GzEncoder<Vec<u8>>>,
    /// Armed by [`Press::finish_on_next_write`]: the next compress call
    /// terminates the member and resets the stream.
    finish_next: bool,
}
impl Press {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            encoder: None,
            finish_next: false,
        }
    }

    /// The method this context was created with.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Arms member finalization: the next [`Press::compress`] call flushes
    /// and terminates the current gzip member, emitting a complete,
    /// independently decodable frame, then resets the stream for the next
    /// record. A no-op under `Method::None`.
    pub fn finish_on_next_write(&mut self) {
        self.finish_next = true;
    }

    /// Feeds `bytes` into the current member and returns whatever is ready
    /// to hit the disk.
    ///
    /// Under `Method::None` this is an owned copy of the input. Under
    /// `Method::Gzip` output stays empty until the armed finalization call,
    /// which returns the whole member at once.
    pub fn compress(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        match self.method {
            Method::None => {
                self.finish_next = false;
                Ok(bytes.to_vec())
            }
            Method::Gzip => {
                let mut encoder = self
                    .encoder
                    .take()
                    .unwrap_or_else(|| GzEncoder::new(Vec::new(), Compression::default()));
                encoder.write_all(bytes)?;
                if self.finish_next {
                    self.finish_next = false;
                    Ok(encoder.finish()?)
                } else {
                    self.encoder = Some(encoder);
                    Ok(Vec::new())
                }
            }
        }
    }

    /// Compresses one whole buffer into one whole frame: arms finalization
    /// and feeds `bytes` in a single call.
    pub fn compress_now(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.finish_on_next_write();
        self.compress(bytes)
    }

    /// Inflates exactly one frame using this session context.
    ///
    /// The stream resets after each call, so the same context serves
    /// sequential reads record-after-record.
    pub fn decompress(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        Self::decompress_one_shot(self.method, frame)
    }

    /// Inflates one already-closed frame with a fresh context.
    ///
    /// Used for index-driven random access, where the frame to decode is
    /// unrelated to any sequential stream position.
    pub fn decompress_one_shot(method: Method, frame: &[u8]) -> Result<Vec<u8>> {
        match method {
            Method::None => Ok(frame.to_vec()),
            Method::Gzip => {
                let mut decoder = GzDecoder::new(frame);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| PressError::BadFrame(e.to_string()))?;
                let remainder = decoder.into_inner().len();
                if remainder != 0 {
                    return Err(PressError::FrameOverrun(remainder).into());
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_none_is_identity() {
        let mut press = Press::new(Method::None);
        let bytes = b"raw signal payload".to_vec();
        let out = press.compress_now(&bytes).unwrap();
        assert_eq!(out, bytes);
        assert_eq!(press.decompress(&out).unwrap(), bytes);
    }

    #[test]
    fn test_gzip_round_trip_sizes() {
        // zero bytes, below one chunk, and spanning multiple internal chunks
        for size in [0usize, 100, 64 * 1024] {
            let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let mut press = Press::new(Method::Gzip);
            let frame = press.compress_now(&bytes).unwrap();
            assert!(!frame.is_empty());
            assert_eq!(press.decompress(&frame).unwrap(), bytes);
            assert_eq!(
                Press::decompress_one_shot(Method::Gzip, &frame).unwrap(),
                bytes
            );
        }
    }

    #[test]
    fn test_member_accumulates_until_armed() {
        let mut press = Press::new(Method::Gzip);
        assert!(press.compress(b"first ").unwrap().is_empty());
        assert!(press.compress(b"second ").unwrap().is_empty());
        press.finish_on_next_write();
        let frame = press.compress(b"third").unwrap();
        assert_eq!(press.decompress(&frame).unwrap(), b"first second third");
    }

    #[test]
    fn test_stream_resets_between_members() {
        let mut press = Press::new(Method::Gzip);
        let a = press.compress_now(b"record a").unwrap();
        let b = press.compress_now(b"record b").unwrap();
        // each frame decodes on its own
        assert_eq!(press.decompress(&a).unwrap(), b"record a");
        assert_eq!(press.decompress(&b).unwrap(), b"record b");
    }

    #[test]
    fn test_concatenated_members_rejected() {
        let mut press = Press::new(Method::Gzip);
        let mut both = press.compress_now(b"one").unwrap();
        both.extend(press.compress_now(b"two").unwrap());
        let err = press.decompress(&both).unwrap_err();
        assert!(matches!(
            err,
            Error::PressError(PressError::FrameOverrun(_))
        ));
    }

    #[test]
    fn test_unknown_method_tag() {
        assert!(Method::from_tag(0).is_ok());
        assert!(Method::from_tag(1).is_ok());
        assert!(matches!(
            Method::from_tag(9),
            Err(Error::HeaderError(HeaderError::UnknownMethodTag(9)))
        ));
    }
}
