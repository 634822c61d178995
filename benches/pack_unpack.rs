//! Benchmark: validate, unpack and pack a mixed record, in both byte orders and both
//! addressing modes. Also a long flat run of scalars to show per-field cost.

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::mem::{offset_of, size_of};
use structpack::{Format, MAX_GROUP_DEPTH};

const RECORD_BE: &str = ">IqiQhH 3(qI) [5]h b 3x";
const RECORD_LE: &str = "<IqiQhH 3(qI) [5]h b 3x";

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Pair {
    a: i64,
    b: u32,
    _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Record {
    q: i64,
    bq: u64,
    pairs: [Pair; 3],
    u: u32,
    i: i32,
    h: i16,
    bh: u16,
    arr: [i16; 5],
    b: i8,
    _pad: [u8; 9],
}

fn offsets() -> Vec<usize> {
    let mut v = vec![
        offset_of!(Record, u),
        offset_of!(Record, q),
        offset_of!(Record, i),
        offset_of!(Record, bq),
        offset_of!(Record, h),
        offset_of!(Record, bh),
    ];
    for k in 0..3 {
        let base = offset_of!(Record, pairs) + k * size_of::<Pair>();
        v.push(base + offset_of!(Pair, a));
        v.push(base + offset_of!(Pair, b));
    }
    v.push(offset_of!(Record, arr));
    v.push(offset_of!(Record, b));
    v
}

fn sample() -> Record {
    let mut r = Record::zeroed();
    r.u = 100_000;
    r.q = -8_000_000_000;
    r.i = -100_000;
    r.bq = 8_000_000_000;
    r.h = -30_000;
    r.bh = 60_000;
    for (k, p) in r.pairs.iter_mut().enumerate() {
        p.a = -7_000_000_000 - k as i64;
        p.b = 200_000 + k as u32;
    }
    r.arr = [1000, 2000, 3000, 4000, 5000];
    r.b = 0x73;
    r
}

fn bench_pack_unpack(c: &mut Criterion) {
    let offsets = offsets();
    let record = sample();

    c.bench_function("validate_record", |b| {
        b.iter(|| Format::new(black_box(RECORD_BE)).map(|f| f.field_count()))
    });

    let nested = "2(".repeat(MAX_GROUP_DEPTH) + "B" + &")".repeat(MAX_GROUP_DEPTH);
    c.bench_function("validate_max_depth", |b| b.iter(|| Format::new(black_box(&nested)).is_ok()));

    for fmt in [RECORD_BE, RECORD_LE] {
        let format = Format::new(fmt).expect("format");
        let mut buf = vec![0u8; format.packed_size()];
        format
            .pack_offset(offsets.len(), &offsets, bytemuck::bytes_of(&record), &mut buf)
            .expect("pack");
        let tag = if fmt.starts_with('>') { "be" } else { "le" };

        c.bench_function(&format!("unpack_offset_{}", tag), |b| {
            let mut out = Record::zeroed();
            b.iter(|| {
                format
                    .unpack_offset(offsets.len(), &offsets, bytemuck::bytes_of_mut(&mut out), black_box(&buf))
                    .expect("unpack")
            })
        });

        c.bench_function(&format!("pack_offset_{}", tag), |b| {
            let mut out = vec![0u8; buf.len()];
            b.iter(|| {
                format
                    .pack_offset(offsets.len(), &offsets, bytemuck::bytes_of(black_box(&record)), &mut out)
                    .expect("pack")
            })
        });
    }

    let format = Format::new("<4(I)").expect("format");
    let buf = [0u8; 16];
    c.bench_function("unpack_ptr_small", |b| {
        let mut v = [0u32; 4];
        b.iter(|| {
            let [a, bb, cc, d] = &mut v;
            let mut fields: [&mut [u8]; 4] = [
                bytemuck::bytes_of_mut(a),
                bytemuck::bytes_of_mut(bb),
                bytemuck::bytes_of_mut(cc),
                bytemuck::bytes_of_mut(d),
            ];
            format.unpack_ptr(4, &mut fields, black_box(&buf)).expect("unpack")
        })
    });

    let flat = Format::new(">1024H").expect("format");
    let values = vec![0x1234u16; 1024];
    let mut out = vec![0u8; flat.packed_size()];
    let fields: Vec<&[u8]> = values.iter().map(bytemuck::bytes_of).collect();
    c.bench_function("pack_ptr_1024_scalars", |b| {
        b.iter(|| flat.pack_ptr(fields.len(), black_box(&fields), &mut out).expect("pack"))
    });
}

criterion_group!(benches, bench_pack_unpack);
criterion_main!(benches);
