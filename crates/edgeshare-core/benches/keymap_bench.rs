//! Criterion benchmarks for key code translation.
//!
//! Every forwarded key event goes through a host-to-identifier lookup and
//! every injected one through the reverse lookup.
//!
//! Run with:
//! ```bash
//! cargo bench --package edgeshare-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use edgeshare_core::keymap::{KeyIdentifier, KeyTable};

/// Windows VK codes for common keys.
const BENCH_HOST_CODES: &[u16] = &[
    0x41, // 'A'
    0x5A, // 'Z'
    0x0D, // VK_RETURN
    0x1B, // VK_ESCAPE
    0x08, // VK_BACK
    0x20, // VK_SPACE
    0x70, // VK_F1
    0x7B, // VK_F12
    0xA0, // VK_LSHIFT
    0xA2, // VK_LCONTROL
    0x25, // VK_LEFT
    0x28, // VK_DOWN
    0x31, // '1'
    0x67, // VK_NUMPAD7
    0xFF, // unmapped
];

fn bench_host_to_identifier(c: &mut Criterion) {
    let table = KeyTable::global();
    c.bench_function("host_to_identifier", |b| {
        b.iter(|| {
            for &code in BENCH_HOST_CODES {
                black_box(table.to_identifier(black_box(code)));
            }
        })
    });
}

fn bench_identifier_to_host(c: &mut Criterion) {
    let table = KeyTable::global();
    let ids: Vec<KeyIdentifier> = BENCH_HOST_CODES
        .iter()
        .filter_map(|&code| table.to_identifier(code))
        .collect();
    c.bench_function("identifier_to_host", |b| {
        b.iter(|| {
            for &id in &ids {
                black_box(table.to_host_key_code(black_box(id)));
            }
        })
    });
}

fn bench_identifier_names(c: &mut Criterion) {
    let ids = [
        KeyIdentifier::ESCAPE,
        KeyIdentifier::F12,
        KeyIdentifier::SHIFT_LEFT,
    ];
    c.bench_function("identifier_name_round_trip", |b| {
        b.iter(|| {
            for &id in &ids {
                let name = id.name();
                black_box(KeyIdentifier::from_name(black_box(&name)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_host_to_identifier,
    bench_identifier_to_host,
    bench_identifier_names
);
criterion_main!(benches);
