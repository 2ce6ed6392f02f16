//! Two-stage output sinks
//!
//! A CPTV header carries counts and pixel extremes that are only known
//! once the last frame has been written. Writers therefore stage the
//! uncompressed stream in a scratch store, patch the header fields in
//! place, and only then run the staged bytes through gzip into the
//! final sink.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

/// The two-stage output a [`crate::Writer`] drives
///
/// Normal operation appends to the scratch stream; `patch` overwrites
/// bytes already staged there; `seal` compresses the whole scratch
/// stream into the final sink and disposes of the scratch store. A
/// failed `seal` must leave the scratch store intact for diagnosis.
pub trait DualSink {
    /// The scratch stream staged writes go to
    type Scratch: Write;

    /// Scratch stream for appending
    fn scratch(&mut self) -> &mut Self::Scratch;

    /// Flush buffered scratch writes
    fn flush_scratch(&mut self) -> Result<()>;

    /// Overwrite already-staged bytes at `offset`
    ///
    /// Leaves the scratch position unspecified; only `seal` may follow.
    fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()>;

    /// Gzip the scratch stream into the final sink, then dispose of
    /// the scratch store
    fn seal(&mut self) -> Result<()>;
}

/// File-backed sink: the final recording at a caller-chosen path, the
/// scratch store in a `.tmp` sibling
///
/// The scratch file is deleted only when sealing succeeds; on error it
/// stays on disk so the staged recording can be recovered.
pub struct DualFileSink {
    final_path: PathBuf,
    scratch_path: PathBuf,
    scratch: BufWriter<File>,
}

impl DualFileSink {
    /// Create the scratch store for a recording that will end up at
    /// `path`
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let mut scratch_os = final_path.clone().into_os_string();
        scratch_os.push(".tmp");
        let scratch_path = PathBuf::from(scratch_os);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&scratch_path)?;
        Ok(DualFileSink {
            final_path,
            scratch_path,
            scratch: BufWriter::new(file),
        })
    }

    /// Where the sealed recording is written
    pub fn path(&self) -> &Path {
        &self.final_path
    }
}

impl DualSink for DualFileSink {
    type Scratch = BufWriter<File>;

    fn scratch(&mut self) -> &mut BufWriter<File> {
        &mut self.scratch
    }

    fn flush_scratch(&mut self) -> Result<()> {
        self.scratch.flush()?;
        Ok(())
    }

    fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.scratch.flush()?;
        let file = self.scratch.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn seal(&mut self) -> Result<()> {
        self.scratch.flush()?;
        let scratch = self.scratch.get_mut();
        scratch.seek(SeekFrom::Start(0))?;

        let out = File::create(&self.final_path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
        io::copy(&mut BufReader::new(&mut *scratch), &mut encoder)?;
        encoder.finish()?.flush()?;

        fs::remove_file(&self.scratch_path)?;
        Ok(())
    }
}

/// Memory-backed sink for tests and in-process consumers
#[derive(Debug, Default)]
pub struct DualBufferSink {
    scratch: Cursor<Vec<u8>>,
    sealed: Vec<u8>,
}

impl DualBufferSink {
    /// An empty buffer sink
    pub fn new() -> Self {
        Self::default()
    }

    /// The gzip-compressed recording; empty until `seal` has run
    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }

    /// Consume the sink, returning the compressed recording
    pub fn into_sealed(self) -> Vec<u8> {
        self.sealed
    }
}

impl DualSink for DualBufferSink {
    type Scratch = Cursor<Vec<u8>>;

    fn scratch(&mut self) -> &mut Cursor<Vec<u8>> {
        &mut self.scratch
    }

    fn flush_scratch(&mut self) -> Result<()> {
        Ok(())
    }

    fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let end = self.scratch.position();
        self.scratch.set_position(offset);
        self.scratch.write_all(bytes)?;
        self.scratch.set_position(end);
        Ok(())
    }

    fn seal(&mut self) -> Result<()> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(self.scratch.get_ref())?;
        self.sealed = encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn buffer_sink_patches_and_seals() {
        let mut sink = DualBufferSink::new();
        sink.scratch().write_all(b"hello, placeholder").unwrap();
        sink.patch(7, b"patched....").unwrap();
        sink.seal().unwrap();

        assert_eq!(gunzip(sink.sealed()), b"hello, patched....");
    }

    #[test]
    fn file_sink_removes_scratch_on_seal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.cptv");

        let mut sink = DualFileSink::create(&path).unwrap();
        sink.scratch().write_all(b"0000 then the rest").unwrap();
        sink.flush_scratch().unwrap();
        sink.patch(0, b"1234").unwrap();
        sink.seal().unwrap();

        let scratch_path = dir.path().join("clip.cptv.tmp");
        assert!(!scratch_path.exists());
        assert_eq!(gunzip(&fs::read(&path).unwrap()), b"1234 then the rest");
    }

    #[test]
    fn scratch_survives_until_seal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.cptv");

        let mut sink = DualFileSink::create(&path).unwrap();
        sink.scratch().write_all(b"staged").unwrap();
        sink.flush_scratch().unwrap();

        assert!(dir.path().join("clip.cptv.tmp").exists());
        assert!(!path.exists());
    }
}
