//! Cost of one begin/end zone pair under each tracking preset.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use cyclezone_profiler::{next_zone_index, Disabled, Full, Profiler, TimingOnly, Tracking};

fn bench_zone_pair<C: Tracking>(c: &mut Criterion, label: &str) {
    let profiler: Profiler<C> = Profiler::new();
    let index = if C::ENABLED {
        next_zone_index::<C>()
    } else {
        cyclezone_profiler::ZoneIndex::ROOT
    };
    profiler.begin_session();

    c.bench_function(label, |b| {
        b.iter(|| {
            let zone = profiler.begin_zone("bench", index, black_box(64));
            profiler.end_zone(zone);
        });
    });

    profiler.end_session();
}

fn bench_nested(c: &mut Criterion) {
    let profiler: Profiler<TimingOnly> = Profiler::new();
    let outer = next_zone_index::<TimingOnly>();
    let inner = next_zone_index::<TimingOnly>();
    profiler.begin_session();

    c.bench_function("zone_pair/nested", |b| {
        b.iter(|| {
            let _outer = profiler.zone("outer", outer);
            let _inner = profiler.zone("inner", inner);
        });
    });

    profiler.end_session();
}

fn bench_presets(c: &mut Criterion) {
    bench_zone_pair::<Full>(c, "zone_pair/full");
    bench_zone_pair::<TimingOnly>(c, "zone_pair/timing_only");
    bench_zone_pair::<Disabled>(c, "zone_pair/disabled");
}

criterion_group!(benches, bench_presets, bench_nested);
criterion_main!(benches);
