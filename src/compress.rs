//! Delta + bit-packed compression of thermal frames
//!
//! Each frame is predicted from the previous one. The interframe deltas
//! are serialized in snake order, reduced to adjacent deltas, and
//! bit-packed at the smallest width that holds the frame's largest
//! residual plus a sign bit.

use std::io::Read;

use crate::bitpack::{pack_bits, BitUnpacker, MAX_BIT_WIDTH};
use crate::error::{Error, Result};
use crate::frame::{CameraSpec, Frame};

/// One compressed frame produced by [`Compressor::next`]
pub struct CompressedFrame<'a> {
    /// Bits per packed adjacent delta; needed again for unpacking
    pub bit_width: u8,
    /// Smallest pixel in the frame interior, `None` when the frame has
    /// no interior (resolution of 2 or less on either axis)
    pub min_pixel: Option<u16>,
    /// Largest pixel in the frame interior
    pub max_pixel: Option<u16>,
    /// Compressed thermal payload; only valid until the next call
    pub data: &'a [u8],
}

/// Generates the compressed representation of successive frames
///
/// All working buffers are sized at construction from the camera spec
/// and reused, so compressing a frame does not allocate.
pub struct Compressor {
    cols: usize,
    rows: usize,
    frame_delta: Vec<i32>,
    adj_deltas: Vec<i32>,
    out_buf: Vec<u8>,
    prev_pix: Vec<Vec<u16>>,
}

impl Compressor {
    /// A compressor for frames of the given camera's resolution
    pub fn new(camera: &impl CameraSpec) -> Self {
        let elems = camera.res_x() * camera.res_y();
        Compressor {
            cols: camera.res_x(),
            rows: camera.res_y(),
            frame_delta: vec![0; elems],
            adj_deltas: vec![0; elems.saturating_sub(1)],
            out_buf: Vec::with_capacity(2 * elems),
            prev_pix: vec![vec![0; camera.res_x()]; camera.res_y()],
        }
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    /// Compress the next frame of a recording
    ///
    /// The returned payload slice is reused and is only valid until the
    /// next call.
    pub fn next(&mut self, curr: &Frame) -> CompressedFrame<'_> {
        // Interframe delta, stored in snake order so that serially
        // adjacent samples stay physical neighbours across row ends.
        let mut min_pixel: Option<u16> = None;
        let mut max_pixel: Option<u16> = None;
        const EDGE: usize = 1;
        for y in 0..self.rows {
            let mut i = y * self.cols;
            if y & 1 == 1 {
                i += self.cols - 1;
            }
            for x in 0..self.cols {
                let pix = curr.pix[y][x];
                if y >= EDGE && y < self.rows - EDGE && x >= EDGE && x < self.cols - EDGE {
                    min_pixel = Some(min_pixel.map_or(pix, |m| m.min(pix)));
                    max_pixel = Some(max_pixel.map_or(pix, |m| m.max(pix)));
                }
                self.frame_delta[i] = i32::from(pix) - i32::from(self.prev_pix[y][x]);
                // prev[y][x] has been consumed; store the current value
                // for the next call.
                self.prev_pix[y][x] = pix;
                if y & 1 == 0 {
                    i += 1;
                } else {
                    i = i.wrapping_sub(1);
                }
            }
        }

        // Adjacent "delta of deltas".
        let mut max_d: u32 = 0;
        for i in 0..self.frame_delta.len() - 1 {
            let d = self.frame_delta[i + 1] - self.frame_delta[i];
            self.adj_deltas[i] = d;
            max_d = max_d.max(d.unsigned_abs());
        }

        let bit_width = (num_bits(max_d) + 1).min(MAX_BIT_WIDTH); // +1 sign bit

        // Starting delta value, then the packed residuals.
        self.out_buf.clear();
        self.out_buf.extend_from_slice(&self.frame_delta[0].to_le_bytes());
        pack_bits(bit_width, &self.adj_deltas, &mut self.out_buf);

        CompressedFrame {
            bit_width,
            min_pixel,
            max_pixel,
            data: &self.out_buf,
        }
    }
}

/// Decompresses successive frames of a recording
pub struct Decompressor {
    cols: usize,
    rows: usize,
    pixel_count: usize,
    prev_pix: Vec<Vec<u16>>,
    deltas: Vec<Vec<i32>>,
}

impl Decompressor {
    /// A decompressor for frames of the given camera's resolution
    pub fn new(camera: &impl CameraSpec) -> Self {
        Decompressor {
            cols: camera.res_x(),
            rows: camera.res_y(),
            pixel_count: camera.res_x() * camera.res_y(),
            prev_pix: vec![vec![0; camera.res_x()]; camera.res_y()],
            deltas: vec![vec![0; camera.res_x()]; camera.res_y()],
        }
    }

    /// Decompress the next frame into `out`
    ///
    /// `bit_width` must be the width recorded when the frame was
    /// compressed. Reads exactly the frame's payload bytes from
    /// `compressed`; a truncated payload surfaces as
    /// [`Error::EndOfStream`].
    pub fn next<R: Read>(&mut self, bit_width: u8, compressed: &mut R, out: &mut Frame) -> Result<()> {
        if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
            return Err(Error::CorruptField);
        }

        let mut start = [0u8; 4];
        compressed.read_exact(&mut start)?;
        let mut v = i32::from_le_bytes(start);

        let mut unpacker = BitUnpacker::new(bit_width, compressed);
        self.deltas[0][0] = v;
        for i in 1..self.pixel_count {
            let y = i / self.cols;
            let mut x = i % self.cols;
            // Deltas are snaked, so odd rows run right to left.
            if y & 1 == 1 {
                x = self.cols - x - 1;
            }
            v = v.wrapping_add(unpacker.next()?);
            self.deltas[y][x] = v;
        }

        // Apply the delta frame to the previous frame.
        for y in 0..self.rows {
            for x in 0..self.cols {
                let pix = i32::from(self.prev_pix[y][x]).wrapping_add(self.deltas[y][x]) as u16;
                out.pix[y][x] = pix;
                self.prev_pix[y][x] = pix;
            }
        }
        Ok(())
    }
}

fn num_bits(x: u32) -> u8 {
    if x == 0 {
        0
    } else {
        (32 - x.leading_zeros()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCamera;

    impl CameraSpec for TestCamera {
        fn res_x(&self) -> usize {
            20
        }
        fn res_y(&self) -> usize {
            10
        }
        fn fps(&self) -> usize {
            9
        }
    }

    fn test_frame(camera: &impl CameraSpec, offset: u16) -> Frame {
        let mut frame = Frame::new(camera);
        for y in 0..camera.res_y() {
            for x in 0..camera.res_x() {
                frame.pix[y][x] = ((y * x) % 7172) as u16 + 1024 + offset;
            }
        }
        frame
    }

    #[test]
    fn roundtrip_three_frames() {
        let camera = TestCamera;
        let mut comp = Compressor::new(&camera);
        let mut decomp = Decompressor::new(&camera);
        let mut out = Frame::new(&camera);

        for offset in [0, 1, 2] {
            let frame = test_frame(&camera, offset);
            let compressed = comp.next(&frame);
            let bit_width = compressed.bit_width;
            let data = compressed.data.to_vec();

            decomp.next(bit_width, &mut data.as_slice(), &mut out).unwrap();
            assert_eq!(out.pix, frame.pix);
        }
    }

    #[test]
    fn identical_frame_packs_to_width_one() {
        let camera = TestCamera;
        let mut comp = Compressor::new(&camera);
        let frame = test_frame(&camera, 0);

        comp.next(&frame);
        let second = comp.next(&frame);

        // All deltas are zero: width 1, payload of 4 bytes for the
        // starting delta plus one bit per remaining pixel.
        let pixels = camera.res_x() * camera.res_y();
        assert_eq!(second.bit_width, 1);
        assert_eq!(second.data.len(), 4 + (pixels - 1).div_ceil(8));
    }

    #[test]
    fn extremes_exclude_the_border() {
        let camera = TestCamera;
        let mut comp = Compressor::new(&camera);
        let mut frame = test_frame(&camera, 0);

        // Spike the border; interior extremes must not see it.
        frame.pix[0][0] = u16::MAX;
        frame.pix[camera.res_y() - 1][camera.res_x() - 1] = 0;

        let compressed = comp.next(&frame);
        assert_eq!(compressed.min_pixel, Some(1025));
        assert!(compressed.max_pixel.unwrap() < u16::MAX);
    }

    #[test]
    fn interior_zero_is_a_legitimate_minimum() {
        let camera = TestCamera;
        let mut comp = Compressor::new(&camera);
        let mut frame = test_frame(&camera, 0);
        frame.pix[1][1] = 0;

        let compressed = comp.next(&frame);
        assert_eq!(compressed.min_pixel, Some(0));
    }

    #[test]
    fn truncated_payload_is_end_of_stream() {
        let camera = TestCamera;
        let mut comp = Compressor::new(&camera);
        let mut decomp = Decompressor::new(&camera);
        let mut out = Frame::new(&camera);

        let frame = test_frame(&camera, 0);
        let compressed = comp.next(&frame);
        let bit_width = compressed.bit_width;
        let truncated = &compressed.data[..compressed.data.len() / 2];

        let err = decomp.next(bit_width, &mut &truncated[..], &mut out).unwrap_err();
        assert!(err.is_end_of_stream());
    }

    #[test]
    fn zero_bit_width_is_rejected() {
        let camera = TestCamera;
        let mut decomp = Decompressor::new(&camera);
        let mut out = Frame::new(&camera);
        let data = [0u8; 64];

        assert!(matches!(
            decomp.next(0, &mut &data[..], &mut out),
            Err(crate::Error::CorruptField)
        ));
        assert!(matches!(
            decomp.next(MAX_BIT_WIDTH + 1, &mut &data[..], &mut out),
            Err(crate::Error::CorruptField)
        ));
    }
}
