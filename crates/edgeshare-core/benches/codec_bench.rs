//! Criterion benchmarks for the EdgeShare packet codec.
//!
//! Pointer moves and key events dominate traffic while the pointer is on the
//! peer, so those are measured on their own as well as alongside the rest.
//!
//! Run with:
//! ```bash
//! cargo bench --package edgeshare-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edgeshare_core::keymap::{KeyIdentifier, Modifiers};
use edgeshare_core::protocol::{decode_packet, encode_packet, frame_payload, Packet};

fn fixtures() -> Vec<(&'static str, Packet)> {
    vec![
        ("MouseMove", Packet::MouseMove { x: 32768, y: 16384 }),
        ("MouseClick", Packet::MouseClick { button: "left".into() }),
        ("MouseWheel", Packet::MouseWheel { delta: -120 }),
        ("KeyPress", Packet::KeyPress { key: "Escape".into() }),
        (
            "KeyDown",
            Packet::KeyDown {
                key: KeyIdentifier::SHIFT_LEFT,
                modifiers: Modifiers::SHIFT | Modifiers::CONTROL,
            },
        ),
        ("AudioFrame(4K)", Packet::AudioFrame(vec![0x5A; 4096])),
        (
            "Handshake",
            Packet::Handshake {
                machine_name: "bench-node".into(),
            },
        ),
        ("Ping", Packet::Ping),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_packet");
    for (name, packet) in fixtures() {
        group.bench_with_input(BenchmarkId::new("packet", name), &packet, |b, packet| {
            b.iter(|| encode_packet(black_box(packet)).expect("encode must succeed"))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_packet");
    for (name, packet) in fixtures() {
        let bytes = encode_packet(&packet).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("packet", name), &bytes, |b, bytes| {
            b.iter(|| decode_packet(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Encode, frame and decode the two hot-path packet types.
fn bench_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame_decode");

    let mouse = Packet::MouseMove { x: 1000, y: 2000 };
    group.bench_function("MouseMove", |b| {
        b.iter(|| {
            let payload = encode_packet(black_box(&mouse)).unwrap();
            let frame = frame_payload(&payload).unwrap();
            decode_packet(black_box(&frame[4..])).unwrap()
        })
    });

    let key = Packet::KeyDown {
        key: KeyIdentifier::ENTER,
        modifiers: Modifiers::empty(),
    };
    group.bench_function("KeyDown", |b| {
        b.iter(|| {
            let payload = encode_packet(black_box(&key)).unwrap();
            let frame = frame_payload(&payload).unwrap();
            decode_packet(black_box(&frame[4..])).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_hot_path);
criterion_main!(benches);
