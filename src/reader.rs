//! High-level CPTV recording reader

use std::io::{self, BufReader, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use tracing::debug;

use crate::compress::Decompressor;
use crate::error::{Error, Result};
use crate::fields::{
    ACCURACY, ALTITUDE, BACKGROUND_FRAME, BIT_WIDTH, BRAND, CAMERA_SERIAL, DEVICE_ID,
    DEVICE_NAME, FIRMWARE, FPS, LAST_FFC_TEMP_C, LAST_FFC_TIME, LATITUDE, LOC_TIMESTAMP,
    LONGITUDE, MODEL, MOTION_CONFIG, NUM_FRAMES, PREVIEW_SECS, TEMP_C, TIMESTAMP, TIME_ON,
    X_RESOLUTION, Y_RESOLUTION,
};
use crate::frame::{CameraSpec, Frame, Telemetry};
use crate::parser::Parser;

struct FileCamera {
    res_x: usize,
    res_y: usize,
    fps: usize,
}

impl CameraSpec for FileCamera {
    fn res_x(&self) -> usize {
        self.res_x
    }
    fn res_y(&self) -> usize {
        self.res_y
    }
    fn fps(&self) -> usize {
        self.fps
    }
}

/// Reads CPTV recordings from any sequential byte source
///
/// Construction decodes the header; frames are then decoded strictly in
/// order with [`Reader::read_frame`]. The reader implements
/// [`CameraSpec`] with the resolution and frame rate recorded in the
/// header, so [`Reader::empty_frame`] yields buffers of the right size.
pub struct Reader<R: Read> {
    parser: Parser<BufReader<GzDecoder<R>>>,
    decomp: Decompressor,
    camera: FileCamera,
}

impl<R: Read> Reader<R> {
    /// Decode the header of the recording supplied by `source`
    pub fn new(source: R) -> Result<Self> {
        let parser = Parser::new(BufReader::new(GzDecoder::new(source)))?;

        let header = parser.header();
        let res_x = header.uint32(X_RESOLUTION).unwrap_or(0) as usize;
        let res_y = header.uint32(Y_RESOLUTION).unwrap_or(0) as usize;
        if res_x == 0 || res_y == 0 {
            return Err(Error::CorruptField);
        }
        let fps = header.uint8(FPS).map(usize::from).unwrap_or(0);

        debug!(version = parser.version(), res_x, res_y, "decoded header");

        let camera = FileCamera { res_x, res_y, fps };
        Ok(Reader {
            decomp: Decompressor::new(&camera),
            parser,
            camera,
        })
    }

    /// Container version of the recording
    pub fn version(&self) -> u8 {
        self.parser.version()
    }

    /// An initialized frame sized for this recording, for use with
    /// [`Reader::read_frame`]
    pub fn empty_frame(&self) -> Frame {
        Frame::new(self)
    }

    /// Recording start time; the Unix epoch when absent
    pub fn timestamp(&self) -> SystemTime {
        self.parser.header().timestamp(TIMESTAMP).unwrap_or(UNIX_EPOCH)
    }

    /// Recording device name, or `""`
    pub fn device_name(&self) -> String {
        self.parser.header().string(DEVICE_NAME).unwrap_or_default()
    }

    /// Recording device identifier, or 0
    pub fn device_id(&self) -> u32 {
        self.parser.header().uint32(DEVICE_ID).unwrap_or(0)
    }

    /// Camera module serial number, or 0
    pub fn serial_number(&self) -> u32 {
        self.parser.header().uint32(CAMERA_SERIAL).unwrap_or(0)
    }

    /// Camera firmware version, or `"<unknown>"`
    pub fn firmware_version(&self) -> String {
        let version = self.parser.header().string(FIRMWARE).unwrap_or_default();
        if version.is_empty() {
            "<unknown>".to_string()
        } else {
            version
        }
    }

    /// Camera model name, or `""`
    pub fn model_name(&self) -> String {
        self.parser.header().string(MODEL).unwrap_or_default()
    }

    /// Camera brand name, or `""`
    pub fn brand_name(&self) -> String {
        self.parser.header().string(BRAND).unwrap_or_default()
    }

    /// Seconds of preview before motion was detected, or 0
    pub fn preview_secs(&self) -> u8 {
        self.parser.header().uint8(PREVIEW_SECS).unwrap_or(0)
    }

    /// Motion detector configuration, or `""`
    pub fn motion_config(&self) -> String {
        self.parser.header().string(MOTION_CONFIG).unwrap_or_default()
    }

    /// Device latitude, or 0
    pub fn latitude(&self) -> f32 {
        self.parser.header().float32(LATITUDE).unwrap_or(0.0)
    }

    /// Device longitude, or 0
    pub fn longitude(&self) -> f32 {
        self.parser.header().float32(LONGITUDE).unwrap_or(0.0)
    }

    /// When the device location was established; the Unix epoch when
    /// absent
    pub fn loc_timestamp(&self) -> SystemTime {
        self.parser
            .header()
            .timestamp(LOC_TIMESTAMP)
            .unwrap_or(UNIX_EPOCH)
    }

    /// Device altitude, or 0
    pub fn altitude(&self) -> f32 {
        self.parser.header().float32(ALTITUDE).unwrap_or(0.0)
    }

    /// Estimated accuracy of the device location, or 0
    pub fn accuracy(&self) -> f32 {
        self.parser.header().float32(ACCURACY).unwrap_or(0.0)
    }

    /// Number of frames recorded in the header, or 0
    ///
    /// Includes the background frame when one is present.
    pub fn num_frames(&self) -> u16 {
        self.parser.header().uint16(NUM_FRAMES).unwrap_or(0)
    }

    /// Whether the recording opens with a stored background frame
    pub fn has_background_frame(&self) -> bool {
        self.parser.header().uint8(BACKGROUND_FRAME).unwrap_or(0) == 1
    }

    /// Decode the next frame into `out`
    ///
    /// `out` is usually obtained from [`Reader::empty_frame`] and
    /// reused across calls. Returns [`Error::EndOfStream`] at the end
    /// of the recording.
    pub fn read_frame(&mut self, out: &mut Frame) -> Result<()> {
        let version = self.parser.version();
        let (fields, mut payload) = self.parser.next_frame()?;
        let bit_width = fields.uint8(BIT_WIDTH)?;

        let mut telemetry = Telemetry::default();
        // TimeOn is garbage in files older than v2, so skip it there.
        if version >= 2 {
            if let Ok(millis) = fields.uint32(TIME_ON) {
                telemetry.time_on = Duration::from_millis(u64::from(millis));
            }
        }
        if let Ok(millis) = fields.uint32(LAST_FFC_TIME) {
            telemetry.last_ffc_time = Duration::from_millis(u64::from(millis));
        }
        if let Ok(temp) = fields.float32(TEMP_C) {
            telemetry.temp_c = f64::from(temp);
        }
        if let Ok(temp) = fields.float32(LAST_FFC_TEMP_C) {
            telemetry.last_ffc_temp_c = f64::from(temp);
        }
        telemetry.background_frame = fields.uint8(BACKGROUND_FRAME).unwrap_or(0) == 1;
        out.telemetry = telemetry;

        self.decomp.next(bit_width, &mut payload, out)?;
        // Skip any payload bytes the decoder did not need, keeping the
        // stream positioned at the next section.
        io::copy(&mut payload, &mut io::sink())?;
        Ok(())
    }

    /// Count the remaining frames, consuming them
    pub fn frame_count(&mut self) -> Result<usize> {
        let mut count = 0;
        loop {
            match self.parser.next_frame() {
                Ok((_, mut payload)) => {
                    io::copy(&mut payload, &mut io::sink())?;
                    count += 1;
                }
                Err(Error::EndOfStream) => return Ok(count),
                Err(err) => return Err(err),
            }
        }
    }
}

impl<R: Read> CameraSpec for Reader<R> {
    fn res_x(&self) -> usize {
        self.camera.res_x
    }
    fn res_y(&self) -> usize {
        self.camera.res_y
    }
    fn fps(&self) -> usize {
        self.camera.fps
    }
}
