use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ms_core::{EngineConfig, FrameStats, Mindscape, SpawnRequest, Zone};

fn populated(particles: usize) -> Mindscape {
    let mut config = EngineConfig {
        seed: Some(7),
        ..EngineConfig::default()
    };
    config.particles.count = particles;
    let mut engine = Mindscape::new(config).expect("default config is valid");
    for (i, zone) in Zone::ALL.iter().cycle().take(12).enumerate() {
        engine
            .spawn_node(SpawnRequest::new(*zone).with_panel(if i % 2 == 0 { "a" } else { "b" }))
            .expect("spawn");
    }
    engine.request_text_formation("mindscape");
    // Let nodes fade in so the graph has visible pairs to score.
    for _ in 0..60 {
        engine.tick();
    }
    engine
}

fn bench_frame(c: &mut Criterion) {
    let mut engine = populated(25_000);
    let mut sink = FrameStats::default();
    c.bench_function("tick_25k_particles_12_nodes", |b| {
        b.iter(|| {
            engine.tick_and_submit(&mut sink);
            black_box(sink.frames)
        })
    });

    let mut small = populated(2_000);
    c.bench_function("tick_2k_particles_12_nodes", |b| {
        b.iter(|| {
            small.tick();
            black_box(small.frame())
        })
    });
}

fn bench_export(c: &mut Criterion) {
    let engine = populated(2_000);
    c.bench_function("export_json", |b| b.iter(|| black_box(engine.export_json())));
}

criterion_group!(benches, bench_frame, bench_export);
criterion_main!(benches);
