//! Criterion benchmarks for the CPTV codec
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cptv::bitpack::{pack_bits, BitUnpacker};
use cptv::{CameraSpec, Compressor, DualBufferSink, Frame, Header, Reader, Writer};

struct Lepton3;

impl CameraSpec for Lepton3 {
    fn res_x(&self) -> usize {
        160
    }
    fn res_y(&self) -> usize {
        120
    }
    fn fps(&self) -> usize {
        9
    }
}

fn synthetic_frame(seed: u16) -> Frame {
    let mut frame = Frame::new(&Lepton3);
    for y in 0..Lepton3.res_y() {
        for x in 0..Lepton3.res_x() {
            frame.pix[y][x] = ((y * x) % 7172) as u16 + 1024 + seed;
        }
    }
    frame
}

fn bench_pack_bits(c: &mut Criterion) {
    let deltas: Vec<i32> = (0..19_199).map(|i| ((i * 31) % 257) - 128).collect();
    let mut out = Vec::with_capacity(64 * 1024);

    c.bench_function("pack_bits_w9", |b| {
        b.iter(|| {
            out.clear();
            pack_bits(9, black_box(&deltas), &mut out);
            black_box(out.len());
        });
    });

    let mut packed = Vec::new();
    pack_bits(9, &deltas, &mut packed);

    c.bench_function("unpack_bits_w9", |b| {
        b.iter(|| {
            let mut unpacker = BitUnpacker::new(9, packed.as_slice());
            for _ in 0..deltas.len() {
                black_box(unpacker.next().unwrap());
            }
        });
    });
}

fn bench_compress(c: &mut Criterion) {
    let even = synthetic_frame(0);
    let odd = synthetic_frame(7);

    c.bench_function("compress_frame", |b| {
        let mut comp = Compressor::new(&Lepton3);
        let mut flip = false;
        b.iter(|| {
            let frame = if flip { &even } else { &odd };
            flip = !flip;
            let compressed = comp.next(black_box(frame));
            black_box(compressed.data.len());
        });
    });
}

fn bench_file_roundtrip(c: &mut Criterion) {
    let frames: Vec<Frame> = (0..9u16).map(synthetic_frame).collect();

    c.bench_function("write_read_9_frames", |b| {
        b.iter(|| {
            let mut writer = Writer::new(DualBufferSink::new(), &Lepton3);
            writer.write_header(Header::default()).unwrap();
            for frame in &frames {
                writer.write_frame(frame).unwrap();
            }
            let bytes = writer.close().unwrap().into_sealed();

            let mut reader = Reader::new(black_box(&bytes[..])).unwrap();
            let mut frame = reader.empty_frame();
            while reader.read_frame(&mut frame).is_ok() {
                black_box(frame.pix[0][0]);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_pack_bits,
    bench_compress,
    bench_file_roundtrip
);
criterion_main!(benches);
