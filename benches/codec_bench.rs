use criterion::{black_box, criterion_group, criterion_main, Criterion};
use packview::codec;
use packview::multivector::Multivector;
use packview::source::MemorySource;
use packview::structs::{Field, StructLayout, INDEX_TYPE_32};
use packview::vector::Vector;

const POINT: StructLayout = StructLayout::new("Point", 5, &[
    Field::signed("x", 0, 17),
    Field::signed("y", 17, 17),
    Field::unsigned("tag", 34, 6),
]);

const VARIANTS: &[&StructLayout] = &[&POINT, &INDEX_TYPE_32];

fn framed(payload: &[u8]) -> Vec<u8> {
    let mut buf = (payload.len() as u64).to_le_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&[0u8; 8]);
    buf
}

fn noise(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(2_654_435_761) >> 7) as u8).collect()
}

fn bench_read_bits(c: &mut Criterion) {
    let src = MemorySource::new(noise(1024 * 1024));

    c.bench_function("read_bits_unaligned_17", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for i in 0..100_000usize {
                acc ^= codec::read_bits(&src, black_box(i * 17 + 3), 17);
            }
            acc
        })
    });

    c.bench_function("read_bits_aligned_64", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for i in 0..100_000usize {
                acc ^= codec::read_bits(&src, black_box(i * 64), 64);
            }
            acc
        })
    });
}

fn bench_vector_iter(c: &mut Criterion) {
    let vector = Vector::new(Box::new(MemorySource::new(framed(&noise(5 * 200_000)))), &POINT);
    let x = &POINT.fields[0];

    c.bench_function("vector_iter_200k", |b| {
        b.iter(|| vector.iter().map(|p| i64::from(p.read::<i32>(x))).sum::<i64>())
    });
}

fn bench_buckets(c: &mut Criterion) {
    // 10k buckets of [Point, IndexType32]
    let mut payload = Vec::new();
    let mut index = Vec::new();
    for i in 0..10_000u32 {
        index.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        payload.push(0);
        payload.extend_from_slice(&noise(5));
        payload.push(1);
        payload.extend_from_slice(&i.to_le_bytes());
    }
    let mv = Multivector::new(
        Box::new(MemorySource::new(framed(&payload))),
        Vector::new(Box::new(MemorySource::new(framed(&index))), &INDEX_TYPE_32),
        VARIANTS,
    );

    c.bench_function("multivector_buckets_10k", |b| {
        b.iter(|| {
            (0..mv.size())
                .map(|i| mv.bucket(black_box(i)).filter(Result::is_ok).count())
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_read_bits, bench_vector_iter, bench_buckets);
criterion_main!(benches);
