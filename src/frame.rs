//! Thermal frames, per-frame telemetry and the camera descriptor

use std::time::Duration;

/// Constant descriptor of the camera behind a recording
///
/// Implemented by caller-supplied camera types on the write side and by
/// [`crate::Reader`] on the read side (resolution and frame rate come
/// from the file header there). Values must stay fixed for the lifetime
/// of a writer or reader.
pub trait CameraSpec {
    /// Horizontal resolution in pixels
    fn res_x(&self) -> usize;
    /// Vertical resolution in pixels
    fn res_y(&self) -> usize;
    /// Nominal frame rate in frames per second
    fn fps(&self) -> usize;
}

/// Per-frame metadata, independent of the pixel values
///
/// Every field is optional on the wire; fields that were not recorded
/// decode to their zero values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// How long the camera had been powered on at capture time
    pub time_on: Duration,
    /// Flat-field correction state reported by the camera
    pub ffc_state: String,
    /// Camera-side frame counter
    pub frame_count: u32,
    /// Mean pixel value reported by the camera
    pub frame_mean: u16,
    /// Sensor temperature in degrees Celsius
    pub temp_c: f64,
    /// Sensor temperature at the last flat-field correction
    pub last_ffc_temp_c: f64,
    /// Power-on time of the last flat-field correction
    pub last_ffc_time: Duration,
    /// Marks the stored background frame rather than a live frame
    pub background_frame: bool,
}

/// The thermal readings for a single frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Row-major 16-bit pixels, indexed as `pix[y][x]`
    pub pix: Vec<Vec<u16>>,
    /// Frame telemetry
    pub telemetry: Telemetry,
}

impl Frame {
    /// Create a zero-filled frame sized for the given camera
    pub fn new(camera: &impl CameraSpec) -> Self {
        Self {
            pix: vec![vec![0; camera.res_x()]; camera.res_y()],
            telemetry: Telemetry::default(),
        }
    }
}
