extern crate g7codec;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use g7codec::bitstream::{BitReader, BitWriter};
use g7codec::golomb::{GolombCoder, SignMode};
use std::time::Duration;

fn bitstream_round_trip(n: usize) {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut w = BitWriter::new(&mut buf);
        for i in 0..n {
            w.write_bits((i as u64) & 0x7, 3).unwrap();
        }
        w.finish().unwrap();
    }

    let mut r = BitReader::new(&buf[..]);
    for _ in 0..n {
        black_box(r.read_bits(3).unwrap());
    }
}

fn golomb_round_trip(n: usize, m: u32) {
    let coder = GolombCoder::new(m, SignMode::Interleave).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut w = BitWriter::new(&mut buf);
        for i in 0..n {
            coder.encode(&mut w, (i as i32 % 2000) - 1000).unwrap();
        }
        w.finish().unwrap();
    }

    let mut r = BitReader::new(&buf[..]);
    for _ in 0..n {
        black_box(coder.decode(&mut r).unwrap());
    }
}

fn bench_bitstream(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitstream");
    group.sample_size(20).measurement_time(Duration::new(10, 0));
    group.bench_function("write_read_bits_100k", |b| b.iter(|| bitstream_round_trip(black_box(100_000))));
    group.finish();
}

fn bench_golomb(c: &mut Criterion) {
    let mut group = c.benchmark_group("golomb");
    group.sample_size(20).measurement_time(Duration::new(10, 0));
    group.bench_function("encode_decode_100k_m32", |b| b.iter(|| golomb_round_trip(black_box(100_000), 32)));
    group.finish();
}

criterion_group!(benches, bench_bitstream, bench_golomb);
criterion_main!(benches);
