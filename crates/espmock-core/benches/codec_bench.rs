//! Criterion benchmarks for the Native API framing and payload codec.
//!
//! Run with:
//! ```bash
//! cargo bench --package espmock-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use espmock_core::protocol::messages::{
    LogLevel, SubscribeLogsResponse, SwitchCommandRequest, SwitchStateResponse,
};
use espmock_core::{FrameAssembler, NativeMessage, PayloadCodec, ProstCodec};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_switch_state() -> NativeMessage {
    NativeMessage::SwitchStateResponse(SwitchStateResponse {
        key: 1,
        state: true,
        device_id: 0,
    })
}

fn make_switch_command() -> NativeMessage {
    NativeMessage::SwitchCommandRequest(SwitchCommandRequest {
        key: 1,
        state: false,
        device_id: 0,
    })
}

fn make_log_line() -> NativeMessage {
    NativeMessage::SubscribeLogsResponse(SubscribeLogsResponse::line(
        LogLevel::Debug,
        "[mock-switch-1] Heartbeat #42, switch=ON",
    ))
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in [
        ("switch_state", make_switch_state()),
        ("switch_command", make_switch_command()),
        ("log_line", make_log_line()),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, msg| {
            b.iter(|| {
                let frame = ProstCodec.encode(black_box(msg)).unwrap();
                black_box(frame.to_bytes())
            })
        });
    }
    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    // 64 log frames back to back, fed in 7-byte chunks.
    let wire: Vec<u8> = (0..64)
        .flat_map(|_| ProstCodec.encode(&make_log_line()).unwrap().to_bytes())
        .collect();

    c.bench_function("reassemble_64_frames_7_byte_chunks", |b| {
        b.iter(|| {
            let mut assembler = FrameAssembler::new();
            let mut count = 0;
            for chunk in wire.chunks(7) {
                for frame in assembler.feed(black_box(chunk)) {
                    count += 1;
                    black_box(ProstCodec.decode(&frame).unwrap());
                }
            }
            assert_eq!(count, 64);
        })
    });
}

criterion_group!(benches, bench_encode, bench_reassemble);
criterion_main!(benches);
