//! Low-level construction of CPTV sections
//!
//! See [`crate::Writer`] for the high-level interface.

use std::io::Write;

use crate::error::{Error, Result};
use crate::fields::FieldWriter;
use crate::{FORMAT_MAGIC, FORMAT_VERSION, FRAME_SECTION, HEADER_SECTION};

/// Emits the section framing of a CPTV stream
///
/// The builder writes into whatever scratch stream the caller hands it
/// and remembers where the header's fields begin, so the writer can
/// patch the placeholder fields once the real values are known.
#[derive(Debug, Default)]
pub struct Builder {
    field_offset: u64,
}

impl Builder {
    /// A builder with no header written yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the file header section: magic, version, marker, field
    /// count, then the fields
    pub fn write_header<W: Write>(&mut self, w: &mut W, fields: &FieldWriter) -> Result<()> {
        let (field_data, num_fields) = fields.bytes();
        w.write_all(FORMAT_MAGIC)?;
        w.write_all(&[FORMAT_VERSION, HEADER_SECTION, section_count(num_fields)?])?;
        self.field_offset = (FORMAT_MAGIC.len() + 3) as u64;
        w.write_all(field_data)?;
        Ok(())
    }

    /// Write one frame section: marker, field count, fields, then the
    /// compressed thermal payload
    pub fn write_frame<W: Write>(
        &self,
        w: &mut W,
        fields: &FieldWriter,
        frame_data: &[u8],
    ) -> Result<()> {
        let (field_data, num_fields) = fields.bytes();
        w.write_all(&[FRAME_SECTION, section_count(num_fields)?])?;
        w.write_all(field_data)?;
        w.write_all(frame_data)?;
        Ok(())
    }

    /// Byte offset of the first header field, for patching
    pub fn field_offset(&self) -> u64 {
        self.field_offset
    }
}

fn section_count(n: usize) -> Result<u8> {
    u8::try_from(n).map_err(|_| Error::InvalidField("section has more than 255 fields"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FPS, X_RESOLUTION};

    #[test]
    fn header_layout() {
        let mut fields = FieldWriter::new();
        fields.uint32(X_RESOLUTION, 160);

        let mut out = Vec::new();
        let mut bldr = Builder::new();
        bldr.write_header(&mut out, &fields).unwrap();

        assert_eq!(&out[..4], b"CPTV");
        assert_eq!(out[4], FORMAT_VERSION);
        assert_eq!(out[5], HEADER_SECTION);
        assert_eq!(out[6], 1); // field count
        assert_eq!(bldr.field_offset(), 7);
        assert_eq!(out[7], X_RESOLUTION); // first field key
    }

    #[test]
    fn frame_layout() {
        let mut fields = FieldWriter::new();
        fields.uint8(FPS, 9);

        let mut out = Vec::new();
        let bldr = Builder::new();
        bldr.write_frame(&mut out, &fields, &[0xAA, 0xBB]).unwrap();

        assert_eq!(out[0], FRAME_SECTION);
        assert_eq!(out[1], 1);
        assert_eq!(&out[out.len() - 2..], &[0xAA, 0xBB]);
    }

    #[test]
    fn too_many_fields_is_invalid() {
        let mut fields = FieldWriter::new();
        for _ in 0..256 {
            fields.uint8(FPS, 1);
        }
        let mut out = Vec::new();
        let mut bldr = Builder::new();
        assert!(matches!(
            bldr.write_header(&mut out, &fields),
            Err(Error::InvalidField(_))
        ));
    }
}
