//! Write a small CPTV recording, then read it back and dump the header
//!
//! Run with: cargo run --example roundtrip

use std::fs::File;
use std::time::Duration;

use cptv::{CameraSpec, Frame, Header, Reader, Writer};

struct TestCamera;

impl CameraSpec for TestCamera {
    fn res_x(&self) -> usize {
        200
    }
    fn res_y(&self) -> usize {
        20
    }
    fn fps(&self) -> usize {
        9
    }
}

fn make_frame(seed: u16) -> Frame {
    let mut frame = Frame::new(&TestCamera);
    for y in 0..TestCamera.res_y() {
        for x in 0..TestCamera.res_x() {
            frame.pix[y][x] = ((y * x) % 7172) as u16 + 1024 + seed;
        }
    }
    frame.telemetry.time_on = Duration::from_secs(60 + u64::from(seed));
    frame
}

fn main() -> cptv::Result<()> {
    let path = "demo.cptv";

    let mut writer = Writer::create(path, &TestCamera)?;
    writer.write_header(Header {
        device_name: "nz42".to_string(),
        device_id: 90,
        preview_secs: 8,
        motion_config: "keep on movin".to_string(),
        latitude: -36.86667,
        longitude: 174.76667,
        altitude: 200.0,
        accuracy: 10.0,
        fps: TestCamera.fps() as u8,
        ..Header::default()
    })?;
    for seed in 0..3 {
        writer.write_frame(&make_frame(seed))?;
    }
    writer.close()?;
    println!("wrote {path}");

    let mut reader = Reader::new(File::open(path)?)?;
    println!("version:     {}", reader.version());
    println!("timestamp:   {:?}", reader.timestamp());
    println!("device name: {}", reader.device_name());
    println!("resolution:  {}x{}", reader.res_x(), reader.res_y());
    println!("frames:      {}", reader.num_frames());

    let mut frame = reader.empty_frame();
    let mut frames = 0;
    while reader.read_frame(&mut frame).is_ok() {
        frames += 1;
        println!(
            "frame {frames}: time_on={:?} pix[10][100]={}",
            frame.telemetry.time_on, frame.pix[10][100]
        );
    }
    println!("read {frames} frames back");

    Ok(())
}
