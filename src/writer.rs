//! High-level CPTV recording writer

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::builder::Builder;
use crate::compress::Compressor;
use crate::error::Result;
use crate::fields::{
    FieldWriter, ACCURACY, ALTITUDE, BACKGROUND_FRAME, BIT_WIDTH, BRAND, CAMERA_SERIAL,
    COMPRESSION, DEVICE_ID, DEVICE_NAME, FIRMWARE, FPS, FRAME_SIZE, LAST_FFC_TEMP_C,
    LAST_FFC_TIME, LATITUDE, LOC_TIMESTAMP, LONGITUDE, MAX_TEMP, MIN_TEMP, MODEL,
    MOTION_CONFIG, NUM_FRAMES, PREVIEW_SECS, TEMP_C, TIMESTAMP, TIME_ON, X_RESOLUTION,
    Y_RESOLUTION,
};
use crate::frame::{CameraSpec, Frame};
use crate::sink::{DualFileSink, DualSink};

/// The information stored in the header of a CPTV file
///
/// Every field is optional; zero or empty values are left off the wire
/// (resolution, compression scheme and serial are always written).
#[derive(Debug, Clone, Default)]
pub struct Header {
    /// Recording start time; the current time is used when `None`
    pub timestamp: Option<SystemTime>,
    /// Recording device name
    pub device_name: String,
    /// Recording device identifier
    pub device_id: u32,
    /// Camera module serial number
    pub camera_serial: u32,
    /// Camera firmware version
    pub firmware: String,
    /// Seconds of preview included before motion was detected
    pub preview_secs: u8,
    /// Motion detector configuration in use during the recording
    pub motion_config: String,
    /// Device latitude
    pub latitude: f32,
    /// Device longitude
    pub longitude: f32,
    /// When the device location was established
    pub loc_timestamp: Option<SystemTime>,
    /// Device altitude
    pub altitude: f32,
    /// Estimated accuracy of the device location
    pub accuracy: f32,
    /// Frame rate
    pub fps: u8,
    /// Camera brand name
    pub brand: String,
    /// Camera model name
    pub model: String,
    /// Background frame to store ahead of the live frames
    pub background_frame: Option<Frame>,
}

/// Writes CPTV recordings through a [`DualSink`]
///
/// Frames are staged uncompressed in the sink's scratch stream; `close`
/// patches the frame count and pixel extremes into the header and seals
/// the sink, producing the gzip-compressed recording.
pub struct Writer<S: DualSink> {
    sink: S,
    bldr: Builder,
    comp: Compressor,
    frames: u16,
    min_pixel: Option<u16>,
    max_pixel: Option<u16>,
}

impl Writer<DualFileSink> {
    /// Write a recording to `path`, staging in a `.tmp` sibling file
    pub fn create<P: AsRef<Path>>(path: P, camera: &impl CameraSpec) -> Result<Self> {
        Ok(Writer::new(DualFileSink::create(path)?, camera))
    }
}

impl<S: DualSink> Writer<S> {
    /// A writer emitting into `sink`, sized for `camera`'s frames
    pub fn new(sink: S, camera: &impl CameraSpec) -> Self {
        Writer {
            sink,
            bldr: Builder::new(),
            comp: Compressor::new(camera),
            frames: 0,
            min_pixel: None,
            max_pixel: None,
        }
    }

    /// Write the file header
    ///
    /// `NumFrames`, `MaxTemp` and `MinTemp` are emitted as placeholder
    /// zeros and patched with the real values on `close`. When the
    /// header carries a background frame it is written immediately,
    /// ahead of any live frames.
    pub fn write_header(&mut self, header: Header) -> Result<()> {
        let timestamp = header.timestamp.unwrap_or_else(SystemTime::now);

        let mut fields = FieldWriter::new();
        // Placeholders; these get rewritten on close.
        fields.uint16(NUM_FRAMES, 0);
        fields.uint16(MAX_TEMP, 0);
        fields.uint16(MIN_TEMP, 0);
        fields.timestamp(TIMESTAMP, timestamp);
        fields.uint32(X_RESOLUTION, self.comp.cols() as u32);
        fields.uint32(Y_RESOLUTION, self.comp.rows() as u32);
        fields.uint8(COMPRESSION, 1);
        fields.uint32(CAMERA_SERIAL, header.camera_serial);

        if !header.device_name.is_empty() {
            fields.string(DEVICE_NAME, &header.device_name)?;
        }
        if !header.firmware.is_empty() {
            fields.string(FIRMWARE, &header.firmware)?;
        }
        if !header.model.is_empty() {
            fields.string(MODEL, &header.model)?;
        }
        if !header.brand.is_empty() {
            fields.string(BRAND, &header.brand)?;
        }
        if header.fps > 0 {
            fields.uint8(FPS, header.fps);
        }
        if header.device_id > 0 {
            fields.uint32(DEVICE_ID, header.device_id);
        }
        fields.uint8(PREVIEW_SECS, header.preview_secs);
        if !header.motion_config.is_empty() {
            fields.string(MOTION_CONFIG, &header.motion_config)?;
        }
        // Location fields go on the wire only when they carry a value.
        if header.latitude != 0.0 {
            fields.float32(LATITUDE, header.latitude);
        }
        if header.longitude != 0.0 {
            fields.float32(LONGITUDE, header.longitude);
        }
        if let Some(lts) = header.loc_timestamp {
            fields.timestamp(LOC_TIMESTAMP, lts);
        }
        if header.altitude != 0.0 {
            fields.float32(ALTITUDE, header.altitude);
        }
        if header.accuracy != 0.0 {
            fields.float32(ACCURACY, header.accuracy);
        }
        if header.background_frame.is_some() {
            fields.uint8(BACKGROUND_FRAME, 1);
        }

        self.bldr.write_header(self.sink.scratch(), &fields)?;

        if let Some(mut frame) = header.background_frame {
            frame.telemetry.background_frame = true;
            self.write_frame(&frame)?;
        }
        Ok(())
    }

    /// Compress and write one frame
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames = self.frames.wrapping_add(1);
        let compressed = self.comp.next(frame);
        self.min_pixel = fold_min(self.min_pixel, compressed.min_pixel);
        self.max_pixel = fold_max(self.max_pixel, compressed.max_pixel);

        let mut fields = FieldWriter::new();
        if frame.telemetry.background_frame {
            fields.uint8(BACKGROUND_FRAME, 1);
        } else {
            fields.uint32(TIME_ON, duration_millis(frame.telemetry.time_on));
            fields.uint32(LAST_FFC_TIME, duration_millis(frame.telemetry.last_ffc_time));
            fields.float32(TEMP_C, frame.telemetry.temp_c as f32);
            fields.float32(LAST_FFC_TEMP_C, frame.telemetry.last_ffc_temp_c as f32);
        }
        fields.uint8(BIT_WIDTH, compressed.bit_width);
        fields.uint32(FRAME_SIZE, compressed.data.len() as u32);

        self.bldr.write_frame(self.sink.scratch(), &fields, compressed.data)
    }

    /// Patch the header placeholders, seal the sink and return it
    ///
    /// On failure the sink's scratch store is left in place so the
    /// staged recording can be recovered.
    pub fn close(mut self) -> Result<S> {
        let mut fields = FieldWriter::new();
        fields.uint16(NUM_FRAMES, self.frames);
        fields.uint16(MAX_TEMP, self.max_pixel.unwrap_or(0));
        fields.uint16(MIN_TEMP, self.min_pixel.unwrap_or(0));
        let (bytes, _) = fields.bytes();

        self.sink.flush_scratch()?;
        self.sink.patch(self.bldr.field_offset(), bytes)?;
        self.sink.seal()?;
        debug!(
            frames = self.frames,
            min_pixel = self.min_pixel,
            max_pixel = self.max_pixel,
            "sealed recording"
        );
        Ok(self.sink)
    }
}

fn fold_min(acc: Option<u16>, v: Option<u16>) -> Option<u16> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn fold_max(acc: Option<u16>, v: Option<u16>) -> Option<u16> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn duration_millis(d: Duration) -> u32 {
    d.as_millis() as u32
}
