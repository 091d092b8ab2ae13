//! Benchmarks for the frame ingestion path
//!
//! Run with: cargo bench

use canscope::frame::FrameEvent;
use canscope::ingest::{FilterSettings, MonitorConfig, MonitorState};
use canscope::telemetry::{FilteredLog, StatsAggregator};
use canscope::websocket::HubConfig;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::num::NonZeroUsize;
use canscope::websocket::mailbox;

fn create_test_frames(count: usize) -> Vec<FrameEvent> {
    (0..count)
        .map(|i| FrameEvent::new(0x680 + (i % 256) as u32, vec![i as u8; 8]).at(i as f64))
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    let frames = create_test_frames(10_000);
    group.throughput(Throughput::Elements(frames.len() as u64));

    group.bench_function("stats_record", |b| {
        b.iter(|| {
            let mut stats = StatsAggregator::new();
            for frame in &frames {
                stats.record(black_box(frame.identifier));
            }
            stats
        })
    });

    group.bench_function("filtered_log_offer", |b| {
        b.iter(|| {
            let mut log = FilteredLog::new(0x700..=0x77F, NonZeroUsize::new(50).unwrap());
            for frame in &frames {
                log.offer(black_box(frame));
            }
            log
        })
    });

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    let frames = create_test_frames(1_000);
    group.throughput(Throughput::Elements(frames.len() as u64));

    for observers in [0usize, 1, 10] {
        group.bench_function(format!("observers_{}", observers), |b| {
            b.iter(|| {
                let mut state = MonitorState::new(MonitorConfig {
                    filter: Some(FilterSettings {
                        range: 0x700..=0x77F,
                        capacity: NonZeroUsize::new(50).unwrap(),
                    }),
                    unique_id_count: false,
                    hub: HubConfig::default(),
                });
                let mut receivers = Vec::new();
                for _ in 0..observers {
                    let (tx, rx) = mailbox::channel();
                    state.add_observer(tx).unwrap();
                    receivers.push(rx);
                }
                for frame in &frames {
                    state.ingest(black_box(frame));
                }
                receivers
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation, bench_ingest);
criterion_main!(benches);
