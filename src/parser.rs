//! Low-level parsing of CPTV sections
//!
//! See [`crate::Reader`] for the high-level interface.

use std::io::{Read, Take};

use crate::error::{Error, Result};
use crate::fields::{FieldReader, FRAME_SIZE};
use crate::{FORMAT_MAGIC, FORMAT_VERSION, FRAME_SECTION, HEADER_SECTION};

/// Consumes the section framing of a CPTV stream
///
/// Construction validates the file preamble and parses the header
/// section, stopping just before the first frame.
pub struct Parser<R> {
    r: R,
    version: u8,
    header: FieldReader,
}

impl<R: Read> Parser<R> {
    /// Parse the preamble and header section from `r`
    pub fn new(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != FORMAT_MAGIC {
            return Err(Error::BadMagic);
        }

        let mut pre = [0u8; 3]; // version, section marker, field count
        r.read_exact(&mut pre)?;
        let [version, marker, count] = pre;
        if !(1..=FORMAT_VERSION).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        if marker != HEADER_SECTION {
            return Err(Error::CorruptField);
        }
        let header = FieldReader::parse(&mut r, count)?;

        Ok(Parser { r, version, header })
    }

    /// Container version of the stream being parsed
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The header section's fields
    pub fn header(&self) -> &FieldReader {
        &self.header
    }

    /// Fields of the next frame plus a reader bounded to exactly its
    /// thermal payload
    ///
    /// Returns [`Error::EndOfStream`] once the recording is exhausted;
    /// that is the normal termination signal.
    pub fn next_frame(&mut self) -> Result<(FieldReader, Take<&mut R>)> {
        let mut byte = [0u8; 1];
        self.r.read_exact(&mut byte)?; // EndOfStream when done
        if byte[0] != FRAME_SECTION {
            return Err(Error::CorruptField);
        }

        self.r.read_exact(&mut byte)?;
        let fields = FieldReader::parse(&mut self.r, byte[0])?;
        let size = fields.uint32(FRAME_SIZE)?;
        Ok((fields, (&mut self.r).take(u64::from(size))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::fields::{FieldWriter, X_RESOLUTION};

    fn sample_stream() -> Vec<u8> {
        let mut fields = FieldWriter::new();
        fields.uint32(X_RESOLUTION, 160);

        let mut out = Vec::new();
        let mut bldr = Builder::new();
        bldr.write_header(&mut out, &fields).unwrap();

        let mut frame_fields = FieldWriter::new();
        frame_fields.uint32(FRAME_SIZE, 3);
        bldr.write_frame(&mut out, &frame_fields, &[1, 2, 3]).unwrap();
        out
    }

    #[test]
    fn parses_header_then_frames() {
        let stream = sample_stream();
        let mut parser = Parser::new(stream.as_slice()).unwrap();

        assert_eq!(parser.version(), FORMAT_VERSION);
        assert_eq!(parser.header().uint32(X_RESOLUTION).unwrap(), 160);

        let (fields, mut payload) = parser.next_frame().unwrap();
        assert_eq!(fields.uint32(FRAME_SIZE).unwrap(), 3);
        let mut data = Vec::new();
        payload.read_to_end(&mut data).unwrap();
        assert_eq!(data, [1, 2, 3]);

        assert!(matches!(parser.next_frame(), Err(Error::EndOfStream)));
    }

    #[test]
    fn bad_magic() {
        let mut stream = sample_stream();
        stream[0] = b'X';
        assert!(matches!(Parser::new(stream.as_slice()), Err(Error::BadMagic)));
    }

    #[test]
    fn unsupported_version() {
        let mut stream = sample_stream();
        stream[4] = 9;
        assert!(matches!(
            Parser::new(stream.as_slice()),
            Err(Error::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn version_one_is_accepted() {
        let mut stream = sample_stream();
        stream[4] = 1;
        assert_eq!(Parser::new(stream.as_slice()).unwrap().version(), 1);
    }

    #[test]
    fn wrong_section_marker() {
        let mut stream = sample_stream();
        stream[5] = b'Q';
        assert!(matches!(Parser::new(stream.as_slice()), Err(Error::CorruptField)));
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        assert!(matches!(Parser::new(&[][..]), Err(Error::EndOfStream)));
    }
}
