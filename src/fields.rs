//! Tagged header and frame fields
//!
//! Every field is `key(u8) ‖ length(u8) ‖ payload`, so no single
//! payload can exceed 255 bytes. Multi-byte values are little-endian;
//! timestamps are u64 microseconds since the Unix epoch.

use std::collections::HashMap;
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

// Header field keys
/// Recording start time (timestamp)
pub const TIMESTAMP: u8 = b'T';
/// Horizontal resolution (u32)
pub const X_RESOLUTION: u8 = b'X';
/// Vertical resolution (u32)
pub const Y_RESOLUTION: u8 = b'Y';
/// Compression scheme (u8, always 1)
pub const COMPRESSION: u8 = b'C';
/// Recording device name (string)
pub const DEVICE_NAME: u8 = b'D';
/// Recording device identifier (u32)
pub const DEVICE_ID: u8 = b'I';
/// Motion detector configuration (string)
pub const MOTION_CONFIG: u8 = b'M';
/// Seconds of preview before motion was detected (u8)
pub const PREVIEW_SECS: u8 = b'P';
/// Device latitude (f32)
pub const LATITUDE: u8 = b'L';
/// Device longitude (f32)
pub const LONGITUDE: u8 = b'O';
/// When the device location was established (timestamp)
pub const LOC_TIMESTAMP: u8 = b'S';
/// Device altitude (f32)
pub const ALTITUDE: u8 = b'A';
/// Estimated accuracy of the device location (f32)
pub const ACCURACY: u8 = b'U';
/// Frame rate (u8)
pub const FPS: u8 = b'Z';
/// Camera model name (string)
pub const MODEL: u8 = b'E';
/// Camera brand name (string)
pub const BRAND: u8 = b'B';
/// Camera firmware version (string)
pub const FIRMWARE: u8 = b'V';
/// Camera module serial number (u32)
pub const CAMERA_SERIAL: u8 = b'N';
/// Total frames in the recording (u16, patched on close)
pub const NUM_FRAMES: u8 = b'd';
/// Largest interior pixel across the recording (u16, patched on close)
pub const MAX_TEMP: u8 = b'e';
/// Smallest interior pixel across the recording (u16, patched on close)
pub const MIN_TEMP: u8 = b'h';

// Frame field keys
/// Camera power-on time at capture (u32 milliseconds)
pub const TIME_ON: u8 = b't';
/// Bits per packed adjacent delta (u8)
pub const BIT_WIDTH: u8 = b'w';
/// Length of the compressed thermal payload (u32)
pub const FRAME_SIZE: u8 = b'f';
/// Power-on time of the last flat-field correction (u32 milliseconds)
pub const LAST_FFC_TIME: u8 = b'c';
/// Sensor temperature (f32, degrees Celsius)
pub const TEMP_C: u8 = b'a';
/// Sensor temperature at the last flat-field correction (f32)
pub const LAST_FFC_TEMP_C: u8 = b'b';
/// Background-frame flag (u8, 1 when set); also used in the header
pub const BACKGROUND_FRAME: u8 = b'g';

/// Accumulates the fields of one section in insertion order
#[derive(Debug, Default)]
pub struct FieldWriter {
    data: Vec<u8>,
    count: usize,
}

impl FieldWriter {
    /// An empty field writer
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoded fields and how many there are
    pub fn bytes(&self) -> (&[u8], usize) {
        (&self.data, self.count)
    }

    /// Add a u8 field
    pub fn uint8(&mut self, key: u8, v: u8) {
        self.raw(key, &[v]);
    }

    /// Add a u16 field
    pub fn uint16(&mut self, key: u8, v: u16) {
        self.raw(key, &v.to_le_bytes());
    }

    /// Add a u32 field
    pub fn uint32(&mut self, key: u8, v: u32) {
        self.raw(key, &v.to_le_bytes());
    }

    /// Add an f32 field
    pub fn float32(&mut self, key: u8, v: f32) {
        self.raw(key, &v.to_le_bytes());
    }

    /// Add a string field; at most 255 bytes of UTF-8
    pub fn string(&mut self, key: u8, v: &str) -> Result<()> {
        if v.len() > usize::from(u8::MAX) {
            return Err(Error::InvalidField("string field longer than 255 bytes"));
        }
        self.raw(key, v.as_bytes());
        Ok(())
    }

    /// Add a timestamp field (microseconds since the Unix epoch)
    pub fn timestamp(&mut self, key: u8, t: SystemTime) {
        let micros = t
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        self.raw(key, &micros.to_le_bytes());
    }

    fn raw(&mut self, key: u8, payload: &[u8]) {
        self.data.push(key);
        self.data.push(payload.len() as u8);
        self.data.extend_from_slice(payload);
        self.count += 1;
    }
}

/// The parsed fields of one section, with typed accessors
///
/// Typed reads of a key that is absent, or whose payload is shorter
/// than the requested type, fail with [`Error::CorruptField`]; callers
/// that treat a field as optional substitute their own default.
#[derive(Debug)]
pub struct FieldReader {
    fields: HashMap<u8, Vec<u8>>,
}

impl FieldReader {
    /// Parse `count` fields from `r`; the first occurrence of a key wins
    pub fn parse<R: Read>(r: &mut R, count: u8) -> Result<Self> {
        let mut fields = HashMap::with_capacity(usize::from(count));
        for _ in 0..count {
            let mut head = [0u8; 2]; // key, length
            r.read_exact(&mut head)?;
            let mut payload = vec![0u8; usize::from(head[1])];
            r.read_exact(&mut payload)?;
            fields.entry(head[0]).or_insert(payload);
        }
        Ok(FieldReader { fields })
    }

    /// Whether a field with this key is present
    pub fn has(&self, key: u8) -> bool {
        self.fields.contains_key(&key)
    }

    /// Read a u8 field
    pub fn uint8(&self, key: u8) -> Result<u8> {
        match self.payload(key)? {
            [v, ..] => Ok(*v),
            _ => Err(Error::CorruptField),
        }
    }

    /// Read a u16 field
    pub fn uint16(&self, key: u8) -> Result<u16> {
        let p = self.payload(key)?;
        if p.len() < 2 {
            return Err(Error::CorruptField);
        }
        Ok(u16::from_le_bytes([p[0], p[1]]))
    }

    /// Read a u32 field
    pub fn uint32(&self, key: u8) -> Result<u32> {
        let p = self.payload(key)?;
        if p.len() < 4 {
            return Err(Error::CorruptField);
        }
        Ok(u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
    }

    /// Read an f32 field
    pub fn float32(&self, key: u8) -> Result<f32> {
        let p = self.payload(key)?;
        if p.len() < 4 {
            return Err(Error::CorruptField);
        }
        Ok(f32::from_le_bytes([p[0], p[1], p[2], p[3]]))
    }

    /// Read a string field (lossy UTF-8)
    pub fn string(&self, key: u8) -> Result<String> {
        Ok(String::from_utf8_lossy(self.payload(key)?).into_owned())
    }

    /// Read a timestamp field
    pub fn timestamp(&self, key: u8) -> Result<SystemTime> {
        let p = self.payload(key)?;
        if p.len() < 8 {
            return Err(Error::CorruptField);
        }
        let micros = u64::from_le_bytes([p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]]);
        Ok(UNIX_EPOCH + Duration::from_micros(micros))
    }

    fn payload(&self, key: u8) -> Result<&[u8]> {
        self.fields
            .get(&key)
            .map(Vec::as_slice)
            .ok_or(Error::CorruptField)
    }
}
