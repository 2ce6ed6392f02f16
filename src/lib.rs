//! CPTV: a lossless container codec for 16-bit thermal video
//!
//! This crate encodes and decodes streams of 16-bit thermal frames,
//! together with per-file and per-frame metadata, into the
//! self-describing, gzip-framed CPTV format. Frames are compressed by
//! interframe prediction, snake-ordered adjacent deltas and variable
//! bit-width packing; the round trip is exact for any input.
//!
//! # File Format
//!
//! The whole stream is gzip-compressed. Inside:
//!
//! ```text
//! +--------+---------+-----+-------------+----------------+
//! | "CPTV" | version | 'H' | field count | header fields  |
//! +--------+---------+-----+-------------+----------------+
//! | per frame:                                            |
//! |   'F' | field count | frame fields | thermal payload  |
//! +-------------------------------------------------------+
//! ```
//!
//! Each field is `key(u8) ‖ length(u8) ‖ payload`; the thermal payload
//! is the frame's starting delta followed by bit-packed residuals.
//!
//! # Example
//!
//! ```no_run
//! use cptv::{CameraSpec, Frame, Header, Reader, Writer};
//!
//! struct Lepton3;
//!
//! impl CameraSpec for Lepton3 {
//!     fn res_x(&self) -> usize { 160 }
//!     fn res_y(&self) -> usize { 120 }
//!     fn fps(&self) -> usize { 9 }
//! }
//!
//! # fn main() -> cptv::Result<()> {
//! let mut writer = Writer::create("clip.cptv", &Lepton3)?;
//! writer.write_header(Header {
//!     device_name: "nz42".to_string(),
//!     ..Header::default()
//! })?;
//! writer.write_frame(&Frame::new(&Lepton3))?;
//! writer.close()?;
//!
//! let mut reader = Reader::new(std::fs::File::open("clip.cptv")?)?;
//! let mut frame = reader.empty_frame();
//! while reader.read_frame(&mut frame).is_ok() {
//!     // use frame.pix / frame.telemetry
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bitpack;
pub mod builder;
pub mod compress;
pub mod error;
pub mod fields;
pub mod frame;
pub mod parser;
pub mod reader;
pub mod sink;
pub mod writer;

// Re-export main types
pub use compress::{CompressedFrame, Compressor, Decompressor};
pub use error::{Error, Result};
pub use frame::{CameraSpec, Frame, Telemetry};
pub use reader::Reader;
pub use sink::{DualBufferSink, DualFileSink, DualSink};
pub use writer::{Header, Writer};

/// Magic bytes at the start of every recording
pub const FORMAT_MAGIC: &[u8; 4] = b"CPTV";

/// Container version written by this crate
pub const FORMAT_VERSION: u8 = 2;

/// Marker byte introducing the header section
pub const HEADER_SECTION: u8 = b'H';

/// Marker byte introducing each frame section
pub const FRAME_SECTION: u8 = b'F';
